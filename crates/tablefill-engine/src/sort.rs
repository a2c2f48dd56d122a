use std::cmp::Ordering;

use tablefill_expr::parse_leading_number;
use tablefill_spec::{SortDirection, SortSpec};

use crate::result::EvaluationResult;

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare_cells(a: &str, b: &str, spec: &SortSpec) -> Ordering {
    let ordering = if spec.numeric {
        match (parse_leading_number(a), parse_leading_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            // Non-numeric cells sort after every number in either direction.
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    } else {
        compare_text(a, b)
    };
    match spec.direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Stable multi-key sort of the result rows; aligned arrays move with their rows.
pub fn sort_result(result: &mut EvaluationResult, specs: &[SortSpec]) {
    if specs.is_empty() || result.rows.len() < 2 {
        return;
    }
    let rows = &result.rows;
    let cell = |row: usize, col: usize| rows[row].get(col).map(String::as_str).unwrap_or_default();

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        specs
            .iter()
            .map(|spec| compare_cells(cell(a, spec.column), cell(b, spec.column), spec))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    result.permute(&order);
}
