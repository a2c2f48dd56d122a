//! Row construction: one rendered row per record, and before/after merging for diff tables.

use tablefill_model::Value;
use tablefill_spec::ColumnDefinition;

pub fn render_row(columns: &[ColumnDefinition], record: &Value) -> Vec<String> {
    columns.iter().map(|c| c.render(record)).collect()
}

/// Collapse whitespace runs to one space and trim, so reflowed text compares equal.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_different(new: &str, old: &str) -> bool {
    normalize_whitespace(new) != normalize_whitespace(old)
}

/// Merge a current and a previous rendering of the same entity into one row.
///
/// Column 0 is the identity: the current value, or the previous one when the current is
/// empty. Every other changed column becomes `"<new><marker><old>"`.
pub fn merge_diff_row(new: &[String], old: &[String], marker: &str) -> Vec<String> {
    let width = new.len().max(old.len());
    (0..width)
        .map(|idx| {
            let n = new.get(idx).map(String::as_str).unwrap_or_default();
            let o = old.get(idx).map(String::as_str).unwrap_or_default();
            if idx == 0 {
                (if n.is_empty() { o } else { n }).to_string()
            } else if is_different(n, o) {
                format!("{n}{marker}{o}")
            } else {
                n.to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_rows_merge_to_the_new_row() {
        let new = row(&["B1", "0.48", "25"]);
        assert_eq!(merge_diff_row(&new, &new.clone(), "\nwas: "), new);
    }

    #[test]
    fn changed_columns_carry_both_values() {
        let merged = merge_diff_row(
            &row(&["B1", "0.48", "25"]),
            &row(&["B1", "0.48", "22"]),
            "\nwas: ",
        );
        assert_eq!(merged, row(&["B1", "0.48", "25\nwas: 22"]));
    }

    #[test]
    fn identity_falls_back_to_previous() {
        let merged = merge_diff_row(&row(&["", ""]), &row(&["B9", "12"]), " | ");
        assert_eq!(merged, row(&["B9", " | 12"]));
    }

    #[test]
    fn reflow_is_not_a_change() {
        assert!(!is_different("Main  breaker\nopen", " Main breaker open "));
        assert!(is_different("Mainbreaker", "Main breaker"));
    }
}
