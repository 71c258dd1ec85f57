use releve_finance::ParseReport;
use std::fmt::Write;

const DESCRIPTION_WIDTH: usize = 40;

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Plain-text listing of one report, one transaction per line
pub fn render_report(file: &str, report: &ParseReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{file}: {} ({} transactions, {} dropped, {} pages, rules v{})",
        report.source.as_str(),
        report.transactions.len(),
        report.dropped,
        report.pages,
        report.rules_version
    );
    if report.alignment.dropped_descriptions > 0 || report.alignment.padded_slots > 0 {
        let _ = writeln!(
            out,
            "  alignment: {} descriptions dropped, {} lines padded",
            report.alignment.dropped_descriptions, report.alignment.padded_slots
        );
    }
    for txn in &report.transactions {
        let _ = writeln!(
            out,
            "  {}  {:<3}  {:>12}  {:<width$}  {}",
            txn.date,
            txn.direction.as_str(),
            txn.amount.round_dp(2).to_string(),
            clip(&txn.description, DESCRIPTION_WIDTH),
            txn.category,
            width = DESCRIPTION_WIDTH
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use releve_finance::Pipeline;

    #[test]
    fn test_render_lists_each_transaction() {
        let report = Pipeline::default().parse_document("01.03  PRLV SEPA URSSAF  05.03.24  1 234,56\n");
        let text = render_report("mars.txt", &report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("mars.txt: provider_A (1 transactions"));
        assert!(lines[1].contains("2024-03-01  OUT"));
        assert!(lines[1].contains("1234.56"));
        assert!(lines[1].ends_with("Charges sociales"));
    }

    #[test]
    fn test_clip_long_descriptions() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghijkl", 5), "abcd…");
    }
}
