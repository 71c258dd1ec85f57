//! releve-ingest: statement layout detection and provider-specific segmenters over extracted PDF text.

pub mod detect;
pub mod parsers;
pub mod types;

pub use detect::{FormatDetector, Strategy};
pub use types::{Alignment, IngestConfig, RawLine, Segmented, split_pages};

use tracing::debug;

/// Segment a whole document with the strategy its first page calls for.
pub fn segment_document(text: &str, config: &IngestConfig) -> (Strategy, Segmented) {
    let detector = FormatDetector::new(&config.ledger_banner);
    let first_page = split_pages(text).into_iter().next().unwrap_or_default();
    let strategy = detector.detect(first_page);
    debug!(?strategy, "detected statement layout");

    let segmented = match strategy {
        Strategy::TableStyle => parsers::segment_table_style(text, config),
        Strategy::LedgerStyle => parsers::segment_ledger_style(text, config),
    };
    (strategy, segmented)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_document_routes_by_banner() {
        let config = IngestConfig::default();

        let (strategy, out) = segment_document(
            "Historique des transactions\n05/03/2024\nPAIEMENT CB\nApprouvé 0.00 12.50 0.30 540.00\n",
            &config,
        );
        assert_eq!(strategy, Strategy::LedgerStyle);
        assert_eq!(out.candidates.len(), 1);

        let (strategy, out) = segment_document("RELEVE DE COMPTE\n01.03 05.03.24 PRLV EDF 80,00\n", &config);
        assert_eq!(strategy, Strategy::TableStyle);
        assert_eq!(out.candidates.len(), 1);
    }

    #[test]
    fn test_banner_on_later_page_is_ignored() {
        let config = IngestConfig::default();
        let (strategy, _) = segment_document("page one\x0cHistorique des transactions\n", &config);
        assert_eq!(strategy, Strategy::TableStyle);
    }
}
