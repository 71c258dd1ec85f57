//! Statement layout detection from the first page banner

use releve_core::Source;
use serde::{Deserialize, Serialize};

/// Banner printed at the top of ledger-style exports
pub const DEFAULT_LEDGER_BANNER: &str = "Historique des transactions";

/// Parsing strategy selected for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    TableStyle,
    LedgerStyle,
}

impl Strategy {
    pub fn source(&self) -> Source {
        match self {
            Strategy::TableStyle => Source::ProviderA,
            Strategy::LedgerStyle => Source::ProviderB,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormatDetector {
    banner: String,
}

impl FormatDetector {
    pub fn new(banner: &str) -> Self {
        Self {
            banner: banner.trim().to_lowercase(),
        }
    }

    /// Ledger style when the banner appears on the first page, table style otherwise.
    pub fn detect(&self, first_page: &str) -> Strategy {
        if !self.banner.is_empty() && first_page.to_lowercase().contains(&self.banner) {
            Strategy::LedgerStyle
        } else {
            Strategy::TableStyle
        }
    }
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_BANNER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_selects_ledger_style() {
        let detector = FormatDetector::default();
        let page = "Mon Commerce\nHISTORIQUE DES TRANSACTIONS\n05/03/2024\n";
        assert_eq!(detector.detect(page), Strategy::LedgerStyle);
        assert_eq!(detector.detect(page).source(), Source::ProviderB);
    }

    #[test]
    fn test_missing_banner_defaults_to_table_style() {
        let detector = FormatDetector::default();
        assert_eq!(detector.detect("RELEVE DE COMPTE\n01.03 05.03.24 1 234,56"), Strategy::TableStyle);
        assert_eq!(detector.detect(""), Strategy::TableStyle);
    }

    #[test]
    fn test_blank_banner_never_matches() {
        let detector = FormatDetector::new("   ");
        assert_eq!(detector.detect("anything"), Strategy::TableStyle);
    }
}
