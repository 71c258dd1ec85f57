//! Locale amount normalization: "1 234,56" -> 1234.56

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,
    #[error("not a number: '{raw}'")]
    NotNumeric { raw: String },
}

/// Thousands separators printed by statement generators (space, NBSP, narrow NBSP, apostrophe)
fn is_group_separator(c: char) -> bool {
    matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '\'' | '\t')
}

/// Parse a locale-formatted amount.
///
/// Separators are stripped and the decimal comma becomes a period. When both
/// `.` and `,` appear, the last one is the decimal separator.
pub fn normalize_amount(raw: &str) -> Result<Decimal, AmountError> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('€')
        .chars()
        .filter(|c| !is_group_separator(*c))
        .collect();
    if cleaned.is_empty() {
        return Err(AmountError::Empty);
    }

    let canonical = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };
    let unsigned = canonical.strip_prefix('+').unwrap_or(&canonical);

    if !unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(AmountError::NotNumeric { raw: raw.to_string() });
    }

    Decimal::from_str(unsigned).map_err(|_| AmountError::NotNumeric { raw: raw.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_space_thousands_and_decimal_comma() {
        assert_eq!(normalize_amount("1 234,56").unwrap(), dec!(1234.56));
        assert_eq!(normalize_amount("12\u{a0}000,00").unwrap(), dec!(12000.00));
        assert_eq!(normalize_amount("3\u{202f}450,1").unwrap(), dec!(3450.1));
        assert_eq!(normalize_amount(" 45,00 ").unwrap(), dec!(45.00));
    }

    #[test]
    fn test_mixed_separators() {
        assert_eq!(normalize_amount("1.234,56").unwrap(), dec!(1234.56));
        assert_eq!(normalize_amount("1,234.56").unwrap(), dec!(1234.56));
        assert_eq!(normalize_amount("12.50").unwrap(), dec!(12.50));
    }

    #[test]
    fn test_signs_and_currency() {
        assert_eq!(normalize_amount("-15,00").unwrap(), dec!(-15.00));
        assert_eq!(normalize_amount("+7,5").unwrap(), dec!(7.5));
        assert_eq!(normalize_amount("99,90 €").unwrap(), dec!(99.90));
    }

    #[test]
    fn test_rejects_non_numeric() {
        assert_eq!(normalize_amount(""), Err(AmountError::Empty));
        assert_eq!(normalize_amount("   "), Err(AmountError::Empty));
        assert!(matches!(normalize_amount("abc"), Err(AmountError::NotNumeric { .. })));
        assert!(matches!(normalize_amount("12,3x"), Err(AmountError::NotNumeric { .. })));
        assert!(matches!(normalize_amount("1,2,3"), Err(AmountError::NotNumeric { .. })));
    }

    #[test]
    fn test_idempotent_on_clean_output() {
        for raw in ["1 234,56", "0,30", "540.00", "-15,00", "1.234,56", "7"] {
            let once = normalize_amount(raw).unwrap();
            let twice = normalize_amount(&once.to_string()).unwrap();
            assert_eq!(once, twice, "not idempotent for {raw}");
        }
    }
}
