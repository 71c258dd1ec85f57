//! Ledger-style statement segmenter (provider B)
//!
//! Expected extracted-text layout, one block per transaction:
//!   05/03/2024
//!   12:30
//!   PAIEMENT CB BOULANGERIE
//!   Approuvé 0.00 12.50 0.30 540.00
//!
//! The status line reads `<status> <debit> <credit> <fee> <balance>`.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use releve_core::text::fold_upper;
use releve_core::{Direction, TransactionCandidate, normalize_amount};
use rust_decimal::Decimal;
use tracing::debug;

use crate::types::{IngestConfig, Segmented, raw_lines};

const STATUS_KEYWORDS: &[&str] = &[
    "APPROUVE",
    "ENTRANT",
    "REMBOURSE",
    "ANNULE",
    "REFUSE",
    "APPROVED",
    "INCOMING",
    "REFUNDED",
    "CANCELLED",
    "REFUSED",
];

const MIN_STATUS_TOKENS: usize = 5;
const DEBIT_POS: usize = 1;
const CREDIT_POS: usize = 2;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").expect("regex"));

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{2}(?::\d{2})?$").expect("regex"));

/// A block in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBlock {
    /// `None` when the anchor token looked like a date but is not one (31/02/2024)
    pub date: Option<NaiveDate>,
    pub fragments: Vec<String>,
    /// A time token may still follow the date
    pub expect_time: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockState {
    /// Waiting for a date anchor; lines here belong to no block
    SeekDate,
    /// Collecting description fragments after the date
    BlockDescription(OpenBlock),
    /// Status line consumed; trailing lines are ignored until the next date
    BlockStatus,
}

/// Date anchor on a line: the parsed date (if valid) and the rest of the line
fn date_anchor(line: &str) -> Option<(Option<NaiveDate>, &str)> {
    let trimmed = line.trim();
    let (first, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (trimmed, ""),
    };
    let caps = DATE_RE.captures(first)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    Some((NaiveDate::from_ymd_opt(year, month, day), rest))
}

pub fn is_status_line(line: &str) -> bool {
    let first = line.split_whitespace().next().map(fold_upper);
    first.is_some_and(|token| STATUS_KEYWORDS.contains(&token.as_str()))
}

/// Amount and direction from a status line, `None` when the block must be dropped.
pub fn resolve_status_line(line: &str) -> Option<(Decimal, Direction)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < MIN_STATUS_TOKENS {
        return None;
    }
    let debit = normalize_amount(tokens[DEBIT_POS]).ok()?;
    let credit = normalize_amount(tokens[CREDIT_POS]).ok()?;
    if credit > Decimal::ZERO {
        Some((credit, Direction::In))
    } else if debit > Decimal::ZERO {
        Some((debit, Direction::Out))
    } else {
        None
    }
}

struct LedgerSegmenter<'c> {
    config: &'c IngestConfig,
    state: BlockState,
    out: Segmented,
}

impl<'c> LedgerSegmenter<'c> {
    fn new(config: &'c IngestConfig) -> Self {
        Self {
            config,
            state: BlockState::SeekDate,
            out: Segmented::default(),
        }
    }

    fn open(&mut self, date: Option<NaiveDate>, rest: &str) {
        if let BlockState::BlockDescription(unfinished) = &self.state {
            debug!(date = ?unfinished.date, "dropping ledger block without status line");
            self.out.dropped += 1;
        }
        let mut block = OpenBlock {
            date,
            fragments: Vec::new(),
            expect_time: true,
        };
        let (first, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let rest = if TIME_RE.is_match(first) {
            block.expect_time = false;
            tail.trim()
        } else {
            rest
        };
        if !rest.is_empty() {
            block.expect_time = false;
            block.fragments.push(rest.to_string());
        }
        self.state = BlockState::BlockDescription(block);
    }

    fn feed(&mut self, line: &str) {
        if let Some((date, rest)) = date_anchor(line) {
            self.open(date, rest);
            return;
        }
        let trimmed = line.trim();
        let state = std::mem::replace(&mut self.state, BlockState::SeekDate);
        self.state = match state {
            BlockState::BlockDescription(block) if is_status_line(trimmed) => {
                self.close(block, trimmed);
                BlockState::BlockStatus
            }
            BlockState::BlockDescription(mut block) => {
                if block.expect_time && TIME_RE.is_match(trimmed) {
                    block.expect_time = false;
                } else if !trimmed.is_empty() {
                    block.expect_time = false;
                    block.fragments.push(trimmed.to_string());
                }
                BlockState::BlockDescription(block)
            }
            other => other,
        };
    }

    fn close(&mut self, block: OpenBlock, status_line: &str) {
        let description = if block.fragments.is_empty() {
            self.config.placeholder.clone()
        } else {
            block.fragments.join(" ")
        };
        let candidate = block.date.and_then(|date| {
            let (amount, direction) = resolve_status_line(status_line)?;
            TransactionCandidate::new(date, None, &description, amount, direction)
        });
        match candidate {
            Some(c) => self.out.candidates.push(c),
            None => {
                debug!(date = ?block.date, status_line, "dropping unparseable ledger block");
                self.out.dropped += 1;
            }
        }
    }

    fn finish(mut self) -> Segmented {
        if let BlockState::BlockDescription(block) = &self.state {
            debug!(date = ?block.date, "dropping trailing ledger block without status line");
            self.out.dropped += 1;
        }
        self.out
    }
}

/// Segment a ledger-style document; pages are read as one continuous stream.
pub fn segment_ledger_style(text: &str, config: &IngestConfig) -> Segmented {
    let mut segmenter = LedgerSegmenter::new(config);
    for line in raw_lines(text) {
        segmenter.feed(line.text);
    }
    segmenter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn parse(text: &str) -> Segmented {
        segment_ledger_style(text, &IngestConfig::default())
    }

    #[test]
    fn test_card_payment_block() {
        let out = parse("05/03/2024\n12:30\nPAIEMENT CB BOULANGERIE\nApprouvé 0.00 12.50 0.30 540.00\n");
        assert_eq!(out.dropped, 0);
        assert_eq!(out.candidates.len(), 1);
        let txn = &out.candidates[0];
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(txn.description, "PAIEMENT CB BOULANGERIE");
        assert_eq!(txn.amount, dec!(12.50));
        assert_eq!(txn.direction, Direction::In);
        assert_eq!(txn.period_key(), "2024-03");
    }

    #[test]
    fn test_debit_side_when_credit_is_zero() {
        let out = parse("06/03/2024\nREMBOURSEMENT CLIENT\nRemboursé 8,00 0,00 0,00 532,00\n");
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].amount, dec!(8.00));
        assert_eq!(out.candidates[0].direction, Direction::Out);
    }

    #[test]
    fn test_status_prefixed_line_closes_block() {
        let out = parse("06/03/2024\nRemboursé client\nRemboursé 8,00 0,00 0,00 532,00\n");
        assert!(out.candidates.is_empty());
        assert_eq!(out.dropped, 1);
    }

    #[test]
    fn test_short_status_line_drops_block() {
        let text = "\
05/03/2024
PAIEMENT CB A
Approuvé 0.00 12.50 0.30 540.00
06/03/2024
PAIEMENT CB B
Approuvé 0.00 9.00
07/03/2024
PAIEMENT CB C
Approuvé 0.00 4.00 0.10 544.00
";
        let out = parse(text);
        assert_eq!(out.candidates.len(), 2);
        assert_eq!(out.dropped, 1);
        let descriptions: Vec<_> = out.candidates.iter().map(|c| c.description.as_str()).collect();
        assert_eq!(descriptions, vec!["PAIEMENT CB A", "PAIEMENT CB C"]);
    }

    #[test]
    fn test_invalid_date_and_zero_amount_drop_blocks() {
        let text = "\
31/02/2024
PAIEMENT CB X
Approuvé 0.00 12.50 0.30 540.00
01/03/2024
PAIEMENT CB Y
Refusé 0.00 0.00 0.00 540.00
";
        let out = parse(text);
        assert!(out.candidates.is_empty());
        assert_eq!(out.dropped, 2);
    }

    #[test]
    fn test_time_and_description_on_date_line() {
        let out = parse("05/03/2024 12:30 VIREMENT STRIPE\nEntrant 0,00 150,00 0,00 690,00\n08/03/2024 09:15\nTERMINAL 2\nAnnulé 3.00 0.00 0.00 1.00\n");
        assert_eq!(out.candidates.len(), 2);
        assert_eq!(out.candidates[0].description, "VIREMENT STRIPE");
        assert_eq!(out.candidates[0].amount, dec!(150.00));
        assert_eq!(out.candidates[0].direction, Direction::In);
        assert_eq!(out.candidates[1].description, "TERMINAL 2");
        assert_eq!(out.candidates[1].direction, Direction::Out);
    }

    #[test]
    fn test_blocks_span_pages_and_unclosed_blocks_drop() {
        let text = "05/03/2024\nPAIEMENT CB\x0cApprouvé 0.00 12.50 0.30 540.00\n06/03/2024\nPAIEMENT CB SANS STATUT\n";
        let out = parse(text);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].description, "PAIEMENT CB");
        assert_eq!(out.dropped, 1);
    }

    #[test]
    fn test_lines_outside_blocks_are_ignored() {
        let text = "Historique des transactions\nMon Commerce SAS\n05/03/2024\nX\nApprouvé 0.00 1.00 0.00 1.00\nTotal 1.00\n";
        let out = parse(text);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].description, "X");
    }
}
