//! releve-finance: category rules, rule snapshots, grouping presets, period aggregation and the parse pipeline

pub mod aggregator;
pub mod category_rules;
pub mod pipeline;
pub mod presets;
pub mod rule_store;
pub mod vendor_rules;

pub use aggregator::{AggregateOptions, Granularity, PeriodAggregator, PeriodBucket, Summary, SummaryReport};
pub use category_rules::{CategoryRule, Categorized, RuleSet, categorize};
pub use pipeline::{ParseReport, Pipeline};
pub use presets::{GroupSpec, GroupingPreset, PresetCatalog};
pub use rule_store::RuleStore;
pub use vendor_rules::{RuleSourceError, load_vendor_rules, read_vendor_rules};
