//! Period aggregation: daily, ISO-weekly and monthly buckets, preset group
//! totals and a naive forecast over classified transactions.
//!
//! Accumulation uses full precision; amounts are rounded to cents only when a
//! `SummaryReport` is rendered.

use chrono::{Datelike, Months, NaiveDate};
use releve_core::{ClassifiedTransaction, Direction, iso_week_key, period_key};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::presets::{GroupingPreset, PresetCatalog};

/// Months of history the forecast averages over
pub const FORECAST_MONTHS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBucket {
    pub inflow: Decimal,
    pub outflow: Decimal,
}

impl PeriodBucket {
    pub fn add(&mut self, direction: Direction, amount: Decimal) {
        match direction {
            Direction::In => self.inflow += amount,
            Direction::Out => self.outflow += amount,
        }
    }

    pub fn net(&self) -> Decimal {
        self.inflow - self.outflow
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown granularity '{0}' (expected daily, weekly or monthly)")]
pub struct UnknownGranularity(pub String);

impl FromStr for Granularity {
    type Err = UnknownGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" | "d" => Ok(Granularity::Daily),
            "weekly" | "week" | "w" => Ok(Granularity::Weekly),
            "monthly" | "month" | "m" => Ok(Granularity::Monthly),
            _ => Err(UnknownGranularity(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Preset name; unknown names use the default preset
    pub preset: Option<String>,
    /// Calendar months to keep, counting the anchor's month. `None` or 0 keeps everything.
    pub months: Option<u32>,
    /// Window end. Defaults to the latest transaction date.
    pub as_of: Option<NaiveDate>,
}

/// Totals for one preset group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupTotal {
    pub name: String,
    pub inflow: Decimal,
    pub outflow: Decimal,
    pub count: usize,
}

impl GroupTotal {
    pub fn net(&self) -> Decimal {
        self.inflow - self.outflow
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub preset: String,
    pub label: String,
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
    pub daily: BTreeMap<NaiveDate, PeriodBucket>,
    pub weekly: BTreeMap<String, PeriodBucket>,
    pub monthly: BTreeMap<String, PeriodBucket>,
    pub groups: Vec<GroupTotal>,
    /// Transactions inside the window
    pub transactions: usize,
    pub available_presets: Vec<String>,
}

impl Summary {
    pub fn totals(&self) -> PeriodBucket {
        self.monthly.values().fold(PeriodBucket::default(), |mut acc, b| {
            acc.inflow += b.inflow;
            acc.outflow += b.outflow;
            acc
        })
    }

    /// Mean net flow of the last months, up to `FORECAST_MONTHS`
    pub fn forecast(&self) -> Option<Decimal> {
        let recent: Vec<Decimal> = self
            .monthly
            .values()
            .rev()
            .take(FORECAST_MONTHS)
            .map(PeriodBucket::net)
            .collect();
        if recent.is_empty() {
            return None;
        }
        let sum: Decimal = recent.iter().copied().sum();
        Some(sum / Decimal::from(recent.len()))
    }

    /// Series keyed for the requested granularity
    pub fn series(&self, granularity: Granularity) -> Vec<(String, PeriodBucket)> {
        match granularity {
            Granularity::Daily => self
                .daily
                .iter()
                .map(|(day, bucket)| (day.format("%Y-%m-%d").to_string(), *bucket))
                .collect(),
            Granularity::Weekly => self.weekly.iter().map(|(k, b)| (k.clone(), *b)).collect(),
            Granularity::Monthly => self.monthly.iter().map(|(k, b)| (k.clone(), *b)).collect(),
        }
    }

    /// Report view with amounts rounded to cents
    pub fn render(&self, granularity: Granularity) -> SummaryReport {
        let totals = self.totals();
        SummaryReport {
            preset: self.preset.clone(),
            label: self.label.clone(),
            granularity,
            window_start: self.window_start,
            window_end: self.window_end,
            series: self
                .series(granularity)
                .into_iter()
                .map(|(period, bucket)| ReportLine::new(period, bucket.inflow, bucket.outflow))
                .collect(),
            groups: self
                .groups
                .iter()
                .map(|g| ReportGroup {
                    name: g.name.clone(),
                    inflow: cents(g.inflow),
                    outflow: cents(g.outflow),
                    net: cents(g.net()),
                    count: g.count,
                })
                .collect(),
            totals: ReportLine::new("total".to_string(), totals.inflow, totals.outflow),
            forecast: self.forecast().map(cents),
            transactions: self.transactions,
            available_presets: self.available_presets.clone(),
        }
    }
}

fn cents(value: Decimal) -> Decimal {
    value.round_dp(2)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub period: String,
    pub inflow: Decimal,
    pub outflow: Decimal,
    pub net: Decimal,
}

impl ReportLine {
    fn new(period: String, inflow: Decimal, outflow: Decimal) -> Self {
        Self {
            period,
            inflow: cents(inflow),
            outflow: cents(outflow),
            net: cents(inflow - outflow),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportGroup {
    pub name: String,
    pub inflow: Decimal,
    pub outflow: Decimal,
    pub net: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryReport {
    pub preset: String,
    pub label: String,
    pub granularity: Granularity,
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
    pub series: Vec<ReportLine>,
    pub groups: Vec<ReportGroup>,
    pub totals: ReportLine,
    pub forecast: Option<Decimal>,
    pub transactions: usize,
    pub available_presets: Vec<String>,
}

/// Folds classified transactions into a `Summary` under one preset
pub struct PeriodAggregator<'a> {
    catalog: &'a PresetCatalog,
}

impl<'a> PeriodAggregator<'a> {
    pub fn new(catalog: &'a PresetCatalog) -> Self {
        Self { catalog }
    }

    pub fn aggregate(&self, txns: &[ClassifiedTransaction], options: &AggregateOptions) -> Summary {
        let preset = self.catalog.get(options.preset.as_deref());
        let window_end = options
            .as_of
            .or_else(|| txns.iter().map(ClassifiedTransaction::period_date).max());
        let window_start = match (window_end, options.months.filter(|m| *m > 0)) {
            (Some(end), Some(months)) => month_window_start(end, months),
            _ => None,
        };

        let mut daily: BTreeMap<NaiveDate, PeriodBucket> = BTreeMap::new();
        let mut weekly: BTreeMap<String, PeriodBucket> = BTreeMap::new();
        let mut monthly: BTreeMap<String, PeriodBucket> = BTreeMap::new();
        let mut groups = GroupAccumulator::new(preset);
        let mut kept = 0usize;

        for txn in txns {
            let day = txn.period_date();
            if window_start.is_some_and(|start| day < start) || window_end.is_some_and(|end| day > end) {
                continue;
            }
            kept += 1;
            daily.entry(day).or_default().add(txn.direction, txn.amount);
            weekly.entry(iso_week_key(day)).or_default().add(txn.direction, txn.amount);
            monthly.entry(period_key(day)).or_default().add(txn.direction, txn.amount);
            groups.add(txn);
        }

        debug!(
            preset = %preset.name,
            kept,
            skipped = txns.len() - kept,
            months = monthly.len(),
            "aggregated transactions"
        );

        Summary {
            preset: preset.name.clone(),
            label: preset.label.clone(),
            window_start,
            window_end,
            daily,
            weekly,
            monthly,
            groups: groups.finish(),
            transactions: kept,
            available_presets: self.catalog.names(),
        }
    }
}

/// First day of the month `months - 1` months before `end`'s month
fn month_window_start(end: NaiveDate, months: u32) -> Option<NaiveDate> {
    end.with_day(1)?.checked_sub_months(Months::new(months - 1))
}

struct GroupAccumulator<'p> {
    preset: &'p GroupingPreset,
    totals: Vec<GroupTotal>,
}

impl<'p> GroupAccumulator<'p> {
    fn new(preset: &'p GroupingPreset) -> Self {
        Self {
            preset,
            totals: Vec::new(),
        }
    }

    fn add(&mut self, txn: &ClassifiedTransaction) {
        let name = self.preset.resolve_group(&txn.category, txn.direction);
        let index = match self.totals.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                self.totals.push(GroupTotal {
                    name: name.to_string(),
                    inflow: Decimal::ZERO,
                    outflow: Decimal::ZERO,
                    count: 0,
                });
                self.totals.len() - 1
            }
        };
        let group = &mut self.totals[index];
        if txn.is_inflow() {
            group.inflow += txn.amount;
        } else {
            group.outflow += txn.amount;
        }
        group.count += 1;
    }

    /// Groups in preset order
    fn finish(mut self) -> Vec<GroupTotal> {
        let order = self.preset.group_order();
        self.totals.sort_by_key(|g| {
            order
                .iter()
                .position(|name| *name == g.name)
                .unwrap_or(order.len())
        });
        self.totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use releve_core::{Source, TransactionCandidate};
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn txn(date: NaiveDate, amount: Decimal, direction: Direction, category: &str) -> ClassifiedTransaction {
        let candidate = TransactionCandidate::new(date, None, "x", amount, direction).unwrap();
        ClassifiedTransaction::from_candidate(candidate, category, Source::ProviderB)
    }

    fn sample() -> Vec<ClassifiedTransaction> {
        vec![
            txn(d(2024, 1, 5), dec!(1000), Direction::In, "Ventes CB"),
            txn(d(2024, 1, 20), dec!(400), Direction::Out, "Loyer"),
            txn(d(2024, 2, 2), dec!(800), Direction::In, "Ventes CB"),
            txn(d(2024, 2, 14), dec!(300.555), Direction::Out, "Charges sociales"),
            txn(d(2024, 3, 1), dec!(1200), Direction::In, "Encaissement"),
            txn(d(2024, 3, 1), dec!(100), Direction::Out, "Autres"),
            txn(d(2024, 3, 28), dec!(500), Direction::Out, "Loyer"),
        ]
    }

    #[test]
    fn test_three_month_forecast_is_mean_of_nets() {
        let catalog = PresetCatalog::builtin();
        let summary = PeriodAggregator::new(&catalog).aggregate(&sample(), &AggregateOptions::default());

        let nets: Vec<Decimal> = summary.monthly.values().map(PeriodBucket::net).collect();
        assert_eq!(nets, vec![dec!(600), dec!(499.445), dec!(600)]);
        assert_eq!(summary.forecast(), Some((dec!(600) + dec!(499.445) + dec!(600)) / dec!(3)));

        let report = summary.render(Granularity::Monthly);
        assert_eq!(report.series.len(), 3);
        assert_eq!(report.series[1].outflow, dec!(300.56));
        assert_eq!(report.forecast, Some(dec!(566.48)));
    }

    #[test]
    fn test_forecast_uses_only_last_three_months() {
        let mut txns = sample();
        txns.push(txn(d(2023, 12, 10), dec!(9999), Direction::In, "Ventes CB"));
        let catalog = PresetCatalog::builtin();
        let summary = PeriodAggregator::new(&catalog).aggregate(&txns, &AggregateOptions::default());
        assert_eq!(summary.monthly.len(), 4);
        assert_eq!(summary.forecast(), Some((dec!(600) + dec!(499.445) + dec!(600)) / dec!(3)));
    }

    #[test]
    fn test_no_transactions_no_forecast() {
        let catalog = PresetCatalog::builtin();
        let summary = PeriodAggregator::new(&catalog).aggregate(&[], &AggregateOptions::default());
        assert_eq!(summary.forecast(), None);
        assert_eq!(summary.window_end, None);
        assert!(summary.groups.is_empty());
    }

    #[test]
    fn test_daily_sums_match_monthly_totals() {
        let catalog = PresetCatalog::builtin();
        let summary = PeriodAggregator::new(&catalog).aggregate(&sample(), &AggregateOptions::default());

        for (month, bucket) in &summary.monthly {
            let (inflow, outflow) = summary
                .daily
                .iter()
                .filter(|(day, _)| period_key(**day) == *month)
                .fold((Decimal::ZERO, Decimal::ZERO), |(i, o), (_, b)| (i + b.inflow, o + b.outflow));
            assert_eq!(inflow, bucket.inflow, "inflow for {month}");
            assert_eq!(outflow, bucket.outflow, "outflow for {month}");
        }
    }

    #[test]
    fn test_month_window_counts_back_from_anchor() {
        let catalog = PresetCatalog::builtin();
        let options = AggregateOptions {
            months: Some(2),
            as_of: Some(d(2024, 3, 15)),
            ..Default::default()
        };
        let summary = PeriodAggregator::new(&catalog).aggregate(&sample(), &options);
        assert_eq!(summary.window_start, Some(d(2024, 2, 1)));
        // March 28 is after the anchor
        assert_eq!(summary.transactions, 4);
        assert_eq!(summary.monthly.keys().cloned().collect::<Vec<_>>(), vec!["2024-02", "2024-03"]);
        assert_eq!(summary.monthly["2024-03"].outflow, dec!(100));
    }

    #[test]
    fn test_groups_follow_preset_order() {
        let catalog = PresetCatalog::builtin();
        let summary = PeriodAggregator::new(&catalog).aggregate(&sample(), &AggregateOptions::default());
        let names: Vec<&str> = summary.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Chiffre d'affaires", "Personnel", "Frais généraux", "Autres sorties"]);
        assert_eq!(summary.groups[0].inflow, dec!(3000));
        assert_eq!(summary.groups[0].count, 3);
        assert_eq!(summary.available_presets, vec!["default", "flux", "charges"]);
    }

    #[test]
    fn test_unknown_preset_uses_default() {
        let catalog = PresetCatalog::builtin();
        let options = AggregateOptions {
            preset: Some("does-not-exist".to_string()),
            ..Default::default()
        };
        let summary = PeriodAggregator::new(&catalog).aggregate(&sample(), &options);
        assert_eq!(summary.preset, "default");
    }

    #[test]
    fn test_weekly_series_uses_iso_weeks() {
        let catalog = PresetCatalog::builtin();
        let summary = PeriodAggregator::new(&catalog).aggregate(
            &[
                txn(d(2024, 12, 30), dec!(10), Direction::In, "Ventes CB"),
                txn(d(2025, 1, 3), dec!(5), Direction::Out, "Autres"),
            ],
            &AggregateOptions::default(),
        );
        let weekly = summary.series(Granularity::Weekly);
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].0, "2025-W01");
        assert_eq!(weekly[0].1.net(), dec!(5));
        assert_eq!(summary.monthly.len(), 2);
    }

    #[test]
    fn test_granularity_parsing() {
        assert_eq!("weekly".parse::<Granularity>().unwrap(), Granularity::Weekly);
        assert_eq!("M".parse::<Granularity>().unwrap(), Granularity::Monthly);
        assert!("yearly".parse::<Granularity>().is_err());
        assert_eq!(serde_json::to_string(&Granularity::Daily).unwrap(), "\"daily\"");
    }
}
