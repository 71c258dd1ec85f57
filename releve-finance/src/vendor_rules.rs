//! Vendor rules from a CSV source.
//!
//! Expected columns (header row required):
//!   aliases,category,directions
//!   BOULANGERIE DUPONT|DUPONT PAINS,Fournisseurs pain,OUT
//!   MARKETPLACE XYZ,Ventes en ligne,
//!
//! `aliases` are `|`-separated; `directions` is `IN`, `OUT`, `IN|OUT` or empty (both).

use anyhow::{Context, Result};
use releve_core::{Direction, UnknownDirection};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::category_rules::{CategoryRule, RuleSet};

#[derive(Debug, Error)]
pub enum RuleSourceError {
    #[error("reading vendor rules: {0}")]
    Csv(#[from] csv::Error),
    #[error("vendor rule on line {line}: {source}")]
    Direction {
        line: u64,
        #[source]
        source: UnknownDirection,
    },
    #[error("vendor rule on line {line} has no category")]
    MissingCategory { line: u64 },
}

#[derive(Debug, Deserialize)]
struct VendorRow {
    aliases: String,
    category: String,
    #[serde(default)]
    directions: String,
}

fn parse_directions(raw: &str, line: u64) -> Result<Option<Vec<Direction>>, RuleSourceError> {
    let mut dirs = Vec::new();
    for part in raw.split('|').map(str::trim).filter(|p| !p.is_empty()) {
        let dir = part
            .parse::<Direction>()
            .map_err(|source| RuleSourceError::Direction { line, source })?;
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    Ok(if dirs.is_empty() { None } else { Some(dirs) })
}

/// Read vendor rules in source order. Rows without aliases are skipped.
pub fn read_vendor_rules<R: Read>(reader: R) -> Result<Vec<CategoryRule>, RuleSourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut rules = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let row: VendorRow = record.deserialize(Some(&headers))?;
        let aliases: Vec<&str> = row.aliases.split('|').map(str::trim).filter(|a| !a.is_empty()).collect();
        if aliases.is_empty() {
            warn!(line, "skipping vendor rule without aliases");
            continue;
        }
        if row.category.is_empty() {
            return Err(RuleSourceError::MissingCategory { line });
        }
        let directions = parse_directions(&row.directions, line)?;
        rules.push(CategoryRule::new(aliases.as_slice(), row.category.as_str(), directions.as_deref()));
    }

    debug!(count = rules.len(), "loaded vendor rules");
    Ok(rules)
}

impl RuleSet {
    /// Append vendor rules read from CSV.
    pub fn with_vendor_csv<R: Read>(self, reader: R) -> Result<Self, RuleSourceError> {
        Ok(self.with_vendor_rules(read_vendor_rules(reader)?))
    }
}

/// Load vendor rules from a CSV file.
pub fn load_vendor_rules(path: impl AsRef<Path>) -> Result<Vec<CategoryRule>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_vendor_rules(file).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reads_aliases_and_directions() {
        let csv = "\
aliases,category,directions
BOULANGERIE DUPONT|dupont pains,Fournisseurs pain,OUT
MARKETPLACE XYZ,Ventes en ligne,
# comment rows are ignored
LA FOURCHETTE,Réservations,in|out
";
        let rules = read_vendor_rules(csv.as_bytes()).unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].keywords, vec!["BOULANGERIE DUPONT".to_string(), "DUPONT PAINS".to_string()]);
        assert_eq!(rules[0].allowed_directions, Some(vec![Direction::Out]));
        assert_eq!(rules[1].allowed_directions, None);
        assert_eq!(rules[2].allowed_directions, Some(vec![Direction::In, Direction::Out]));
        assert_eq!(rules[2].category, "Réservations");
    }

    #[test]
    fn test_missing_directions_column_means_both() {
        let rules = read_vendor_rules("aliases,category\nACME,Divers\n".as_bytes()).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].allowed_directions, None);
    }

    #[test]
    fn test_rejects_unknown_direction() {
        let err = read_vendor_rules("aliases,category,directions\nACME,Divers,SIDEWAYS\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, RuleSourceError::Direction { line: 2, .. }));
    }

    #[test]
    fn test_rejects_rule_without_category() {
        let err = read_vendor_rules("aliases,category,directions\nACME,,OUT\n".as_bytes()).unwrap_err();
        assert!(matches!(err, RuleSourceError::MissingCategory { line: 2 }));
    }

    #[test]
    fn test_skips_rows_without_aliases() {
        let rules = read_vendor_rules("aliases,category,directions\n |,Divers,\nACME,Divers,\n".as_bytes()).unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_with_vendor_csv_appends() {
        let rules = RuleSet::builtin()
            .with_vendor_csv("aliases,category,directions\nACME,Clients,IN\n".as_bytes())
            .unwrap();
        assert_eq!(rules.classify("VIR ACME", Direction::In).category, "Clients");
        assert_eq!(rules.classify("VIR ACME", Direction::Out).category, "Autres");
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = load_vendor_rules("/nonexistent/vendor_rules.csv").unwrap_err();
        assert!(err.to_string().contains("opening /nonexistent/vendor_rules.csv"));
    }
}
