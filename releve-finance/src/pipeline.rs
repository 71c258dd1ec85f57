//! Detection, segmentation and classification of one document.

use releve_core::{ClassifiedTransaction, Direction, Source};
use releve_ingest::{Alignment, IngestConfig, Strategy, segment_document, split_pages};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::category_rules::Categorized;
use crate::rule_store::RuleStore;

/// Everything recovered from one document. Parsing never fails as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    pub source: Source,
    pub strategy: Strategy,
    pub transactions: Vec<ClassifiedTransaction>,
    /// Lines or blocks skipped as unparseable
    pub dropped: usize,
    pub pages: usize,
    pub alignment: Alignment,
    /// Rule set version the transactions were classified with
    pub rules_version: u64,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: IngestConfig,
    rules: Arc<RuleStore>,
}

impl Pipeline {
    pub fn new(config: IngestConfig, rules: Arc<RuleStore>) -> Self {
        Self { config, rules }
    }

    pub fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    pub fn parse_document(&self, text: &str) -> ParseReport {
        // one snapshot for the whole document, even if a reload lands midway
        let snapshot = self.rules.snapshot();
        let (strategy, segmented) = segment_document(text, &self.config);
        let source = strategy.source();

        let transactions: Vec<ClassifiedTransaction> = segmented
            .candidates
            .into_iter()
            .map(|candidate| {
                let category = snapshot.classify(&candidate.description, candidate.direction).category;
                ClassifiedTransaction::from_candidate(candidate, category, source)
            })
            .collect();
        let pages = split_pages(text).iter().filter(|page| !page.trim().is_empty()).count();

        info!(
            source = source.as_str(),
            transactions = transactions.len(),
            dropped = segmented.dropped,
            pages,
            rules_version = snapshot.version,
            "parsed document"
        );

        ParseReport {
            source,
            strategy,
            transactions,
            dropped: segmented.dropped,
            pages,
            alignment: segmented.alignment,
            rules_version: snapshot.version,
        }
    }

    pub fn classify(&self, description: &str, direction: Direction) -> Categorized {
        self.rules.snapshot().classify(description, direction)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(IngestConfig::default(), Arc::new(RuleStore::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category_rules::CategoryRule;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_report_counts() {
        let pipeline = Pipeline::default();
        let text = "RELEVE DE COMPTE\n01.03 05.03.24 PRLV EDF 80,00\nn'importe quoi\x0c02.03 05.03.24 VIR RECU ACME 120,00\n\x0c";
        let report = pipeline.parse_document(text);
        assert_eq!(report.source, Source::ProviderA);
        assert_eq!(report.pages, 2);
        assert_eq!(report.transactions.len(), 2);
        assert_eq!(report.transactions[0].category, "Énergie");
        assert_eq!(report.transactions[0].amount, dec!(80.00));
        assert_eq!(report.rules_version, 1);
    }

    #[test]
    fn test_classify_follows_reloads() {
        let pipeline = Pipeline::default();
        assert_eq!(pipeline.classify("VIR ACME", Direction::In).category, "Encaissement");
        pipeline
            .rules()
            .reload_vendor_rules(vec![CategoryRule::new(&["ACME"], "Clients", None)]);
        assert_eq!(pipeline.classify("VIR ACME", Direction::In).category, "Clients");
    }

    #[test]
    fn test_empty_document_yields_empty_report() {
        let report = Pipeline::default().parse_document("");
        assert_eq!(report.transactions, Vec::new());
        assert_eq!(report.pages, 0);
        assert_eq!(report.dropped, 0);
    }
}
