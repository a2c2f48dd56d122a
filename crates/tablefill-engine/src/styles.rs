//! Row and cell style resolution.
//!
//! Fixed order per row: the first matching row condition gives the row default; each cell then
//! layers the first matching global cell condition and the first matching condition of its
//! column on top. `ApplyToRow` conditions also become the default for the cells after them.
//! In diff mode, cells showing the diff marker get the diff fill unless already filled.

use tablefill_spec::{CellStyle, Color, Condition, TableDefinition};

use crate::result::EvaluationResult;

fn first_match<'c>(conditions: &'c [Condition], pass: impl Fn(&Condition) -> bool) -> Option<&'c Condition> {
    conditions.iter().find(|c| pass(c))
}

pub(crate) struct DiffHighlight<'a> {
    pub marker: &'a str,
    pub fill: &'a Color,
}

pub(crate) fn resolve_styles(
    table: &TableDefinition,
    result: &mut EvaluationResult,
    diff: Option<DiffHighlight<'_>>,
) {
    let rows = result.rows.len();
    result.row_fills = Vec::with_capacity(rows);
    result.row_text_colors = Vec::with_capacity(rows);
    result.cell_fills = Vec::with_capacity(rows);
    result.cell_text_colors = Vec::with_capacity(rows);

    for (row, source) in result.rows.iter().zip(&result.source_objects) {
        let record = source.record();
        let row_style = first_match(&table.row_conditions, |c| c.predicate.matches(record))
            .map(Condition::style)
            .unwrap_or_default();

        let mut default = row_style.clone();
        let mut fills = Vec::with_capacity(row.len());
        let mut text_colors = Vec::with_capacity(row.len());

        for (idx, text) in row.iter().enumerate() {
            let mut style = default.clone();
            let column_conditions = table
                .columns
                .get(idx)
                .map(|c| c.conditions.as_slice())
                .unwrap_or_default();

            for layer in [table.global_cell_conditions.as_slice(), column_conditions] {
                if let Some(cond) = first_match(layer, |c| c.predicate.matches_cell(record, text)) {
                    let resolved = cond.style();
                    style = style.overlay(&resolved);
                    if cond.apply_to_row {
                        default = default.overlay(&resolved);
                    }
                }
            }

            if let Some(diff) = &diff {
                if style.fill.is_none() && text.contains(diff.marker) {
                    style.fill = Some(diff.fill.clone());
                }
            }

            let CellStyle { fill, text_color } = style;
            fills.push(fill);
            text_colors.push(text_color);
        }

        result.row_fills.push(row_style.fill);
        result.row_text_colors.push(row_style.text_color);
        result.cell_fills.push(fills);
        result.cell_text_colors.push(text_colors);
    }
}
