//! Table-style statement segmenter (provider A)
//!
//! Expected extracted-text layout, per page:
//!   PRLV SEPA URSSAF                      <- header block opened by a header-start prefix
//!   ID EMETTEUR FR12ZZZ123456             <- detail continuation
//!   VIR SEPA RECU /DE ACME
//!   Date      Valeur      Débit      Crédit      <- stop prefix
//!   01.03     05.03.24    1 234,56
//!   04.03     04.03.24               2 500,00
//!
//! Header blocks are matched positionally with the dated table lines. Some
//! layouts print the label inline instead:
//!   01.03  PRLV SEPA URSSAF  05.03.24  1 234,56

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use releve_core::text::{contains_word, fold_upper, starts_with_word};
use releve_core::{Direction, TransactionCandidate, normalize_amount};
use rust_decimal::Decimal;
use tracing::debug;

use crate::types::{Alignment, IngestConfig, Segmented, split_pages};

/// Transfer, withdrawal, deposit and fee vocabulary opening a header block
const HEADER_START_PREFIXES: &[&str] = &[
    "VIREMENT",
    "VIR",
    "PRELEVEMENT",
    "PRLV",
    "RETRAIT",
    "DAB",
    "REMISE",
    "VERSEMENT",
    "DEPOT",
    "FRAIS",
    "COMMISSION",
    "COTISATION",
    "AGIOS",
    "CB",
    "CARTE",
    "PAIEMENT",
    "ECHEANCE",
    "INTERETS",
    "AVOIR",
    "REMBOURSEMENT",
    "CHEQUE",
    "CHQ",
];

/// Lines continuing the current header block
const DETAIL_PREFIXES: &[&str] = &[
    "REF",
    "REFERENCE",
    "IBAN",
    "BIC",
    "MANDAT",
    "RUM",
    "ID EMETTEUR",
    "ID CREANCIER",
    "MOTIF",
    "DE:",
    "DE :",
    "POUR:",
    "POUR :",
    "/DE",
    "/MOTIF",
    "/REF",
];

/// Boilerplate, footers, balances and table headings
const STOP_PREFIXES: &[&str] = &[
    "PAGE",
    "SOLDE",
    "ANCIEN SOLDE",
    "NOUVEAU SOLDE",
    "TOTAL",
    "TOTAUX",
    "RELEVE",
    "DATE",
    "SUITE",
    "REPORT",
    "SOUS RESERVE",
    "MONTANT",
    "LIBELLE",
];

const CREDIT_KEYWORDS: &[&str] = &[
    "VIR SEPA RECU",
    "VIREMENT RECU",
    "VIR RECU",
    "VIR INST RECU",
    "REMISE",
    "VERSEMENT",
    "DEPOT",
    "AVOIR",
    "REMBOURSEMENT",
    "ENCAISSEMENT",
    "INTERETS CREDITEURS",
];

const DEBIT_KEYWORDS: &[&str] = &[
    "VIR SEPA EMIS",
    "VIREMENT EMIS",
    "VIR EMIS",
    "PRLV",
    "PRELEVEMENT",
    "RETRAIT",
    "DAB",
    "CB",
    "CARTE",
    "PAIEMENT",
    "FRAIS",
    "COMMISSION",
    "COTISATION",
    "AGIOS",
    "ECHEANCE",
    "CHEQUE",
    "CHQ",
];

static OP_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})\.(\d{2})(?:\.(\d{4}|\d{2}))?$").expect("regex"));

static VALUE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})\.(\d{2})\.(\d{4}|\d{2})$").expect("regex"));

// One or two trailing amounts: debit then credit.
static AMOUNTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?:^|\s)(?P<first>\d{1,3}(?: \d{3})*,\d{2})",
        r"(?:\s+(?P<second>\d{1,3}(?: \d{3})*,\d{2}))?\s*$"
    ))
    .expect("regex")
});

static NUMERIC_FRAGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s./-]*\d[\d\s./-]*$").expect("regex"));

/// Segmenter state within one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Before the first dated line: gathering narrative description blocks
    HeaderCollect,
    /// Inside the dated operation table
    TransactionCollect,
}

/// A dated operation row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLine {
    pub date: NaiveDate,
    pub value_date: NaiveDate,
    /// Free text printed on the row itself, if any
    pub text: String,
    pub amounts: Vec<Decimal>,
}

/// Classification of a single extracted line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Transaction(TableLine),
    /// Dated like a transaction row but unusable (bad date, no amount)
    Malformed,
    Stop,
    HeaderStart,
    Detail,
    Noise,
}

fn is_stop(folded: &str) -> bool {
    STOP_PREFIXES.iter().any(|p| starts_with_word(folded, p))
}

pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Noise;
    }
    let folded = fold_upper(trimmed);
    if is_stop(&folded) {
        return LineKind::Stop;
    }

    match parse_transaction_line(trimmed) {
        Some(Ok(row)) if is_stop(&fold_upper(&row.text)) => return LineKind::Stop,
        Some(Ok(row)) => return LineKind::Transaction(row),
        Some(Err(reason)) => {
            debug!(line = trimmed, reason, "skipping malformed table line");
            return LineKind::Malformed;
        }
        None => {}
    }

    if HEADER_START_PREFIXES.iter().any(|p| starts_with_word(&folded, p)) {
        LineKind::HeaderStart
    } else if DETAIL_PREFIXES.iter().any(|p| starts_with_word(&folded, p))
        || NUMERIC_FRAGMENT_RE.is_match(trimmed)
    {
        LineKind::Detail
    } else {
        LineKind::Noise
    }
}

/// `None` when the line is not shaped like a dated row at all.
fn parse_transaction_line(line: &str) -> Option<Result<TableLine, &'static str>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let op = OP_DATE_RE.captures(tokens.first()?)?;
    let value_idx = tokens.iter().skip(1).position(|t| VALUE_DATE_RE.is_match(t))? + 1;
    Some(build_row(&tokens, &op, value_idx))
}

fn build_row(tokens: &[&str], op: &Captures<'_>, value_idx: usize) -> Result<TableLine, &'static str> {
    let value_caps = VALUE_DATE_RE
        .captures(tokens[value_idx])
        .ok_or("unreadable value date")?;
    let value_date = date_from_caps(&value_caps, None).ok_or("invalid value date")?;
    let date = date_from_caps(op, Some(value_date)).ok_or("invalid operation date")?;

    let tail = tokens[value_idx + 1..].join(" ");
    let caps = AMOUNTS_RE.captures(&tail).ok_or("no amount")?;
    let mut amounts = Vec::with_capacity(2);
    for name in ["first", "second"] {
        if let Some(m) = caps.name(name) {
            amounts.push(normalize_amount(m.as_str()).map_err(|_| "invalid amount")?);
        }
    }

    let amounts_start = caps.get(0).map_or(tail.len(), |m| m.start());
    let mut text: Vec<&str> = tokens[1..value_idx].to_vec();
    let trailing = tail[..amounts_start].trim();
    if !trailing.is_empty() {
        text.push(trailing);
    }

    Ok(TableLine {
        date,
        value_date,
        text: text.join(" "),
        amounts,
    })
}

/// Operation dates without a year take the value date's year, stepping back
/// one when the operation month is later (31.12 valued 02.01).
fn date_from_caps(caps: &Captures<'_>, value_date: Option<NaiveDate>) -> Option<NaiveDate> {
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year = match caps.get(3) {
        Some(y) => expand_year(y.as_str())?,
        None => {
            let value = value_date?;
            if month > value.month() {
                value.year() - 1
            } else {
                value.year()
            }
        }
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    Some(if s.len() == 2 { 2000 + year } else { year })
}

/// Match descriptions to rows: drop the oldest excess, pad missing slots with "".
pub fn align(mut descriptions: Vec<String>, rows: usize) -> (Vec<String>, Alignment) {
    let mut alignment = Alignment::default();
    if descriptions.len() > rows {
        let excess = descriptions.len() - rows;
        descriptions.drain(..excess);
        alignment.dropped_descriptions = excess;
    } else {
        alignment.padded_slots = rows - descriptions.len();
        descriptions.resize(rows, String::new());
    }
    (descriptions, alignment)
}

/// Direction of a single-amount row from its label.
pub fn infer_direction(description: &str, default: Direction) -> Direction {
    let folded = fold_upper(description);
    if CREDIT_KEYWORDS.iter().any(|k| contains_word(&folded, k)) {
        Direction::In
    } else if DEBIT_KEYWORDS.iter().any(|k| contains_word(&folded, k)) {
        Direction::Out
    } else {
        default
    }
}

/// Pick the non-zero side. Two amounts are (debit, credit); debit wins when both are set.
pub fn resolve_amount(
    amounts: &[Decimal],
    description: &str,
    default: Direction,
) -> Option<(Decimal, Direction)> {
    match amounts {
        [debit, credit] => {
            if *debit > Decimal::ZERO {
                Some((*debit, Direction::Out))
            } else if *credit > Decimal::ZERO {
                Some((*credit, Direction::In))
            } else {
                None
            }
        }
        [single] if *single > Decimal::ZERO => {
            Some((*single, infer_direction(description, default)))
        }
        _ => None,
    }
}

fn compose_description(inline: &str, block: &str) -> String {
    let inline = inline.trim();
    let block = block.trim();
    if inline.is_empty() {
        return block.to_string();
    }
    if block.is_empty() {
        return inline.to_string();
    }
    if fold_upper(block).contains(&fold_upper(inline)) {
        return block.to_string();
    }
    format!("{inline} {block}")
}

struct PageSegmenter {
    state: PageState,
    blocks: Vec<String>,
    current: Option<String>,
    rows: Vec<TableLine>,
    dropped: usize,
}

impl PageSegmenter {
    fn new() -> Self {
        Self {
            state: PageState::HeaderCollect,
            blocks: Vec::new(),
            current: None,
            rows: Vec::new(),
            dropped: 0,
        }
    }

    fn close_block(&mut self) {
        if let Some(block) = self.current.take() {
            self.blocks.push(block);
        }
    }

    fn feed(&mut self, line: &str) {
        match (self.state, classify_line(line)) {
            (_, LineKind::Transaction(row)) => {
                self.close_block();
                self.state = PageState::TransactionCollect;
                self.rows.push(row);
            }
            (_, LineKind::Malformed) => self.dropped += 1,
            (PageState::HeaderCollect, LineKind::Stop) => self.close_block(),
            (PageState::HeaderCollect, LineKind::HeaderStart) => {
                self.close_block();
                self.current = Some(line.trim().to_string());
            }
            (PageState::HeaderCollect, LineKind::Detail) => {
                if let Some(block) = self.current.as_mut() {
                    block.push(' ');
                    block.push_str(line.trim());
                }
            }
            _ => {}
        }
    }

    fn finish(mut self, config: &IngestConfig) -> Segmented {
        self.close_block();
        let (descriptions, alignment) = align(self.blocks, self.rows.len());
        let mut out = Segmented {
            dropped: self.dropped,
            alignment,
            ..Segmented::default()
        };

        for (row, block) in self.rows.into_iter().zip(descriptions) {
            let mut description = compose_description(&row.text, &block);
            if description.is_empty() {
                description = config.placeholder.clone();
            }
            let resolved = resolve_amount(&row.amounts, &description, config.single_amount_default)
                .and_then(|(amount, direction)| {
                    TransactionCandidate::new(row.date, Some(row.value_date), &description, amount, direction)
                });
            match resolved {
                Some(candidate) => out.candidates.push(candidate),
                None => {
                    debug!(date = %row.date, description = %description, "dropping table row without a positive amount");
                    out.dropped += 1;
                }
            }
        }
        out
    }
}

/// Segment every page of a table-style statement.
pub fn segment_table_style(text: &str, config: &IngestConfig) -> Segmented {
    let mut out = Segmented::default();
    for page in split_pages(text) {
        let mut segmenter = PageSegmenter::new();
        for line in page.lines() {
            segmenter.feed(line);
        }
        let page_out = segmenter.finish(config);
        out.candidates.extend(page_out.candidates);
        out.dropped += page_out.dropped;
        out.alignment.absorb(page_out.alignment);
    }
    out
}
