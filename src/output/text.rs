// src/output/text.rs
use std::fmt::Write;

use super::RenderOptions;
use crate::compare::{ComparisonReport, Notice, PairComparison, PairFailure};

pub fn render_text(report: &ComparisonReport, options: &RenderOptions) -> String {
    let mut out = String::new();
    for (key, outcome) in report.pairs.iter() {
        if let Some(pair) = outcome.comparison() {
            write_pair(&mut out, key, pair, options);
        } else if let Some(failure) = outcome.failure() {
            write_failure(&mut out, key, failure);
        }
        out.push('\n');
    }

    let failed = report.failures().count();
    let _ = writeln!(
        out,
        "{} pair(s): {} compared, {} failed",
        report.pairs.len(),
        report.pairs.len() - failed,
        failed
    );
    out
}

fn write_pair(out: &mut String, key: &str, pair: &PairComparison, options: &RenderOptions) {
    let status = if pair.is_identical() { "identical" } else { "differs" };
    let _ = writeln!(out, "{}  [{}]", key, status);

    for notice in &pair.notices {
        let _ = match notice {
            Notice::ColumnCountMismatch {
                left_columns,
                right_columns,
            } => writeln!(
                out,
                "  note: {} vs {} columns, only {} compared",
                left_columns,
                right_columns,
                left_columns.min(right_columns)
            ),
            Notice::RowCountMismatch {
                left_rows,
                right_rows,
            } => writeln!(
                out,
                "  note: {} vs {} rows, only {} compared",
                left_rows,
                right_rows,
                left_rows.min(right_rows)
            ),
        };
    }

    let width = pair.columns.keys().map(str::len).max().unwrap_or(0);
    for (col_key, col) in pair.columns.iter() {
        let _ = writeln!(
            out,
            "  {:<width$}  {}/{} rows equal ({:.2}%)",
            col_key,
            col.rows_equal,
            col.rows_compared,
            col.fraction_equal * 100.0,
            width = width
        );
        for d in col.discrepancies.iter().take(options.max_discrepancies) {
            let _ = writeln!(out, "      row {}: {} != {}", d.row, d.left, d.right);
        }
        let hidden = col
            .discrepancies
            .len()
            .saturating_sub(options.max_discrepancies);
        if hidden > 0 {
            let _ = writeln!(out, "      ... {} more", hidden);
        }
    }
}

fn write_failure(out: &mut String, key: &str, failure: &PairFailure) {
    let _ = writeln!(out, "{}  [failed]", key);
    for err in &failure.errors {
        let _ = writeln!(out, "  {}: {}", err.kind(), err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{compare_tables, CompareError, PairError, PairOutcome};
    use crate::table::{CellValue, Column, Table};

    fn report_with(outcomes: Vec<(&str, PairOutcome)>) -> ComparisonReport {
        let mut report = ComparisonReport::default();
        for (k, o) in outcomes {
            report.pairs.insert_unique(k.to_string(), o);
        }
        report
    }

    #[test]
    fn lists_columns_discrepancies_and_summary() {
        let a = Table::new(
            "a.csv",
            vec![
                Column::new("ID", vec![CellValue::Int(1), CellValue::Int(2)]),
                Column::new("Name", vec!["Alice".into(), "Bob".into()]),
            ],
        )
        .unwrap();
        let b = Table::new(
            "b.csv",
            vec![
                Column::new("ID", vec![CellValue::Int(1), CellValue::Int(2)]),
                Column::new("Name", vec!["Alice".into(), "Robert".into()]),
            ],
        )
        .unwrap();
        let pair = compare_tables(&a, &b).unwrap();
        let text = render_text(
            &report_with(vec![("a.csv_vs_b.csv", PairOutcome::Compared(pair))]),
            &RenderOptions::default(),
        );

        assert!(text.starts_with("a.csv_vs_b.csv  [differs]\n"));
        assert!(text.contains("ID_vs_ID      2/2 rows equal (100.00%)"));
        assert!(text.contains("Name_vs_Name  1/2 rows equal (50.00%)"));
        assert!(text.contains("row 1: \"Bob\" != \"Robert\""));
        assert!(text.ends_with("1 pair(s): 1 compared, 0 failed\n"));
    }

    #[test]
    fn truncates_long_discrepancy_lists() {
        let a = Table::new("a", vec![Column::new("v", (0..5).map(CellValue::Int).collect())]).unwrap();
        let b = Table::new("b", vec![Column::new("v", (10..15).map(CellValue::Int).collect())]).unwrap();
        let pair = compare_tables(&a, &b).unwrap();
        let text = render_text(
            &report_with(vec![("a_vs_b", PairOutcome::Compared(pair))]),
            &RenderOptions {
                max_discrepancies: 2,
            },
        );
        assert_eq!(text.matches("      row ").count(), 2);
        assert!(text.contains("... 3 more"));
    }

    #[test]
    fn failures_show_error_kind() {
        let failure = PairFailure {
            left_source: "a".into(),
            right_source: "b".into(),
            errors: vec![PairError::from(CompareError::EmptyColumnComparison {
                left_column: "x".into(),
                right_column: "x".into(),
            })],
        };
        let text = render_text(
            &report_with(vec![("a_vs_b", PairOutcome::Failed(failure))]),
            &RenderOptions::default(),
        );
        assert!(text.contains("a_vs_b  [failed]"));
        assert!(text.contains("EmptyColumnComparison: no rows to compare"));
        assert!(text.contains("1 pair(s): 0 compared, 1 failed"));
    }
}
