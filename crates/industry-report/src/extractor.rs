/// Extraction of the EV/EBITDA median multiple from report tables.
///
/// Reports carry a peer-comparison table whose median row is labeled `中央値` in the first
/// cell and holds the EV/EBITDA multiple (e.g. `8.4倍`) in the last cell.
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::model::Document;

const MEDIAN_LABEL: &str = "中央値";

fn multiple_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)倍").expect("valid regex"))
}

/// Return the multiple from the first median-labeled row whose last cell contains one.
///
/// Later median rows are never consulted once a match is found.
pub fn extract_ev_ebitda_median(document: &Document) -> Option<String> {
    for (table_index, table) in document.tables.iter().enumerate() {
        debug!(table = table_index + 1, rows = table.rows.len(), "checking table");
        for (row_index, cells) in table.rows.iter().enumerate() {
            debug!(table = table_index + 1, row = row_index + 1, ?cells, "checking row");

            let (Some(label), Some(value)) = (cells.first(), cells.last()) else {
                continue;
            };
            if !label.contains(MEDIAN_LABEL) {
                continue;
            }
            debug!(
                table = table_index + 1,
                row = row_index + 1,
                value = %value,
                "median row found"
            );

            if let Some(m) = multiple_re().find(value) {
                info!(
                    table = table_index + 1,
                    row = row_index + 1,
                    ev_ebitda_median = m.as_str(),
                    "extracted median EV/EBITDA"
                );
                return Some(m.as_str().to_string());
            }
        }
    }

    warn!(tables = document.tables.len(), "EV/EBITDA median not found");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Table;

    fn table(rows: &[&[&str]]) -> Table {
        Table {
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    fn doc(tables: Vec<Table>) -> Document {
        Document {
            paragraphs: vec!["本文".to_string()],
            tables,
        }
    }

    #[test]
    fn test_no_tables() {
        assert_eq!(extract_ev_ebitda_median(&doc(vec![])), None);
    }

    #[test]
    fn test_median_row() {
        let d = doc(vec![table(&[
            &["企業名", "売上高", "EV/EBITDA"],
            &["A社", "120億円", "7.9倍"],
            &["中央値", "-", "8.4倍"],
        ])]);
        assert_eq!(extract_ev_ebitda_median(&d), Some("8.4倍".to_string()));
    }

    #[test]
    fn test_first_match_wins_across_tables() {
        let d = doc(vec![
            table(&[&["中央値", "7倍"]]),
            table(&[&["中央値", "9倍"]]),
        ]);
        assert_eq!(extract_ev_ebitda_median(&d), Some("7倍".to_string()));
    }

    #[test]
    fn test_label_must_be_in_first_cell() {
        let d = doc(vec![table(&[
            &["平均値", "中央値", "6.1倍"],
            &["EV/EBITDA中央値（倍）", "", "10.25倍"],
        ])]);
        assert_eq!(extract_ev_ebitda_median(&d), Some("10.25倍".to_string()));
    }

    #[test]
    fn test_median_row_without_multiple_is_skipped() {
        let d = doc(vec![
            table(&[&["中央値", "n/a"], &["中央値", "8.4"]]),
            table(&[&["中央値", "約 123.45倍（前年比）"]]),
        ]);
        assert_eq!(extract_ev_ebitda_median(&d), Some("123.45倍".to_string()));
    }

    #[test]
    fn test_value_comes_from_last_cell_only() {
        let d = doc(vec![table(&[&["中央値", "5.0倍", "—"]])]);
        assert_eq!(extract_ev_ebitda_median(&d), None);
    }

    #[test]
    fn test_more_than_three_integer_digits_keeps_trailing_digits() {
        let d = doc(vec![table(&[&["中央値", "1234倍"]])]);
        assert_eq!(extract_ev_ebitda_median(&d), Some("234倍".to_string()));
    }

    #[test]
    fn test_ragged_and_empty_rows() {
        let d = doc(vec![table(&[&[], &["中央値"], &["中央値 12.3倍"]])]);
        // Single-cell rows use the same cell as label and value.
        assert_eq!(extract_ev_ebitda_median(&d), Some("12.3倍".to_string()));
    }
}
