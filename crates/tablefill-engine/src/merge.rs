//! Vertical merge runs.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MergeFlag {
    None,
    /// First cell of a run.
    Restart,
    /// Cell merged into the run above it.
    Continuation,
}

fn cell(rows: &[Vec<String>], row: usize, column: usize) -> &str {
    rows.get(row)
        .and_then(|r| r.get(column))
        .map(String::as_str)
        .unwrap_or_default()
}

/// Whether a break column changes between `row - 1` and `row`.
fn broken(rows: &[Vec<String>], row: usize, column: usize, break_columns: &[usize]) -> bool {
    break_columns
        .iter()
        .filter(|&&b| b != column)
        .any(|&b| cell(rows, row, b) != cell(rows, row - 1, b))
}

/// Compute the merge flag of every row in `column`.
///
/// A row continues the run above when its (non-empty) value equals the previous row's and no
/// break column changed. A row starts a run when the next row continues it, or when it
/// repeats the previous value but a break column ended the run. Empty values never merge.
pub fn compute_merge_flags(
    rows: &[Vec<String>],
    column: usize,
    break_columns: &[usize],
) -> Vec<MergeFlag> {
    let same_as_prev = |r: usize| {
        r > 0 && r < rows.len() && {
            let value = cell(rows, r, column);
            !value.is_empty() && value == cell(rows, r - 1, column)
        }
    };
    let joins_prev = |r: usize| same_as_prev(r) && !broken(rows, r, column, break_columns);

    (0..rows.len())
        .map(|r| {
            if joins_prev(r) {
                MergeFlag::Continuation
            } else if joins_prev(r + 1) || same_as_prev(r) {
                MergeFlag::Restart
            } else {
                MergeFlag::None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use MergeFlag::*;

    fn column(values: &[&str]) -> Vec<Vec<String>> {
        values.iter().map(|v| vec![v.to_string()]).collect()
    }

    #[test]
    fn runs_of_equal_values() {
        let rows = column(&["A", "A", "B", "B", "B"]);
        assert_eq!(
            compute_merge_flags(&rows, 0, &[]),
            vec![Restart, Continuation, Restart, Continuation, Continuation]
        );
    }

    #[test]
    fn singletons_and_empties_do_not_merge() {
        let rows = column(&["A", "B", "", "", "C"]);
        assert_eq!(compute_merge_flags(&rows, 0, &[]), vec![None; 5]);
        assert!(compute_merge_flags(&[], 0, &[]).is_empty());
    }

    #[test]
    fn break_column_change_restarts_run() {
        let rows: Vec<Vec<String>> = [
            ("A", "g1"),
            ("A", "g1"),
            ("B", "g1"),
            ("B", "g1"),
            ("B", "g2"),
        ]
        .iter()
        .map(|(v, g)| vec![v.to_string(), g.to_string()])
        .collect();
        assert_eq!(
            compute_merge_flags(&rows, 0, &[1]),
            vec![Restart, Continuation, Restart, Continuation, Restart]
        );
    }

    #[test]
    fn break_on_the_merged_column_itself_is_ignored() {
        let rows = column(&["A", "A"]);
        assert_eq!(compute_merge_flags(&rows, 0, &[0]), vec![Restart, Continuation]);
    }
}
