//! Transaction record types shared by the segmenters, the classifier and the aggregator

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Whether money comes in (credit) or goes out (debit)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown direction '{0}' (expected IN or OUT)")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" | "CREDIT" | "C" => Ok(Direction::In),
            "OUT" | "DEBIT" | "D" => Ok(Direction::Out),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}

/// Statement layout a transaction was recovered from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Source {
    /// Table-style statements (dated operation table, narrative header blocks)
    #[serde(rename = "provider_A")]
    ProviderA,
    /// Ledger-style statements (date-anchored blocks closed by a status line)
    #[serde(rename = "provider_B")]
    ProviderB,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::ProviderA => "provider_A",
            Source::ProviderB => "provider_B",
        }
    }
}

/// A transaction recovered by a segmenter, not yet categorized.
///
/// `amount` is always strictly positive; the sign lives in `direction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCandidate {
    /// Operation date
    pub date: NaiveDate,
    /// Value date, when the statement prints one
    pub value_date: Option<NaiveDate>,
    pub description: String,
    pub amount: Decimal,
    pub direction: Direction,
}

impl TransactionCandidate {
    /// Build a candidate, rejecting zero and negative amounts.
    pub fn new(
        date: NaiveDate,
        value_date: Option<NaiveDate>,
        description: impl Into<String>,
        amount: Decimal,
        direction: Direction,
    ) -> Option<Self> {
        if amount <= Decimal::ZERO {
            return None;
        }
        Some(Self {
            date,
            value_date,
            description: description.into(),
            amount,
            direction,
        })
    }

    /// Month used for reporting: the value date's month when present.
    pub fn period_key(&self) -> String {
        period_key(self.value_date.unwrap_or(self.date))
    }

    pub fn signed_amount(&self) -> Decimal {
        signed(self.amount, self.direction)
    }
}

/// A categorized transaction, ready for persistence or aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedTransaction {
    pub date: NaiveDate,
    pub value_date: Option<NaiveDate>,
    pub description: String,
    pub amount: Decimal,
    pub direction: Direction,
    pub category: String,
    /// Reporting month (YYYY-MM)
    pub period_key: String,
    pub source: Source,
}

impl ClassifiedTransaction {
    pub fn from_candidate(
        candidate: TransactionCandidate,
        category: impl Into<String>,
        source: Source,
    ) -> Self {
        let period_key = candidate.period_key();
        Self {
            date: candidate.date,
            value_date: candidate.value_date,
            description: candidate.description,
            amount: candidate.amount,
            direction: candidate.direction,
            category: category.into(),
            period_key,
            source,
        }
    }

    /// Date the transaction is reported under
    pub fn period_date(&self) -> NaiveDate {
        self.value_date.unwrap_or(self.date)
    }

    pub fn is_inflow(&self) -> bool {
        self.direction == Direction::In
    }

    pub fn signed_amount(&self) -> Decimal {
        signed(self.amount, self.direction)
    }
}

fn signed(amount: Decimal, direction: Direction) -> Decimal {
    match direction {
        Direction::In => amount,
        Direction::Out => -amount,
    }
}

/// "YYYY-MM" month key
pub fn period_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// ISO week key, e.g. "2024-W09"
pub fn iso_week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}
