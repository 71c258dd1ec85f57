use releve_core::{Direction, TransactionCandidate};
use serde::{Deserialize, Serialize};

use crate::detect::DEFAULT_LEDGER_BANNER;

/// Page separator emitted by PDF-to-text tools
pub const PAGE_BREAK: char = '\x0c';

/// Description used when the statement gives nothing to describe a line with
pub const DEFAULT_PLACEHOLDER: &str = "Mouvement";

/// One line of extracted text with its page index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLine<'a> {
    pub page: usize,
    pub text: &'a str,
}

/// Split a document into pages on form feeds. Always yields at least one page.
pub fn split_pages(text: &str) -> Vec<&str> {
    text.split(PAGE_BREAK).collect()
}

/// Every line of the document, tagged with its page
pub fn raw_lines(text: &str) -> impl Iterator<Item = RawLine<'_>> {
    split_pages(text)
        .into_iter()
        .enumerate()
        .flat_map(|(page, body)| body.lines().map(move |text| RawLine { page, text }))
}

/// Segmentation knobs, normally read from the `[ingest]` config section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// First-page banner identifying ledger-style statements (case-insensitive)
    pub ledger_banner: String,
    /// Description for lines that recovered no text
    pub placeholder: String,
    /// Direction assumed for a single-amount table line no keyword explains
    pub single_amount_default: Direction,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            ledger_banner: DEFAULT_LEDGER_BANNER.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            single_amount_default: Direction::In,
        }
    }
}

/// How descriptions were matched up with table lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    /// Oldest header blocks discarded because there were more blocks than lines
    pub dropped_descriptions: usize,
    /// Table lines that received no header block
    pub padded_slots: usize,
}

impl Alignment {
    pub fn absorb(&mut self, other: Alignment) {
        self.dropped_descriptions += other.dropped_descriptions;
        self.padded_slots += other.padded_slots;
    }
}

/// Output of a segmenter over one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmented {
    pub candidates: Vec<TransactionCandidate>,
    /// Lines or blocks that looked like transactions but could not be parsed
    pub dropped: usize,
    pub alignment: Alignment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_lines_track_pages() {
        let text = "a\nb\x0cc\n";
        let lines: Vec<_> = raw_lines(text).collect();
        assert_eq!(
            lines,
            vec![
                RawLine { page: 0, text: "a" },
                RawLine { page: 0, text: "b" },
                RawLine { page: 1, text: "c" },
            ]
        );
        assert_eq!(split_pages("no breaks").len(), 1);
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let cfg: IngestConfig = serde_json::from_str(r#"{"placeholder":"Opération"}"#).unwrap();
        assert_eq!(cfg.placeholder, "Opération");
        assert_eq!(cfg.single_amount_default, Direction::In);
        assert_eq!(cfg.ledger_banner, DEFAULT_LEDGER_BANNER);
    }
}
