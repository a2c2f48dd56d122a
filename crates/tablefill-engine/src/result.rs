use tablefill_model::{CompositeKey, Value};
use tablefill_spec::{CellStyle, Color};

/// The record(s) an output row was rendered from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceObject {
    pub key: Option<CompositeKey>,
    pub current: Option<Value>,
    /// Previous-state record; only set in diff mode.
    pub previous: Option<Value>,
}

impl SourceObject {
    pub fn current(key: CompositeKey, record: Value) -> Self {
        Self {
            key: Some(key),
            current: Some(record),
            previous: None,
        }
    }

    /// Record conditions are evaluated against: the current one, else the previous one.
    pub fn record(&self) -> &Value {
        static EMPTY: Value = Value::Empty;
        self.current
            .as_ref()
            .or(self.previous.as_ref())
            .unwrap_or(&EMPTY)
    }
}

/// Output of evaluating one table.
///
/// `rows`, `source_objects` and (when present) the row/cell style arrays are index-aligned;
/// [`EvaluationResult::permute`] is the only way rows are reordered. Style arrays are empty
/// when the table has no conditions and is not in diff mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationResult {
    pub table_id: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub source_objects: Vec<SourceObject>,
    pub row_fills: Vec<Option<Color>>,
    pub row_text_colors: Vec<Option<Color>>,
    pub cell_fills: Vec<Vec<Option<Color>>>,
    pub cell_text_colors: Vec<Vec<Option<Color>>>,
    /// 0-based columns rendered with vertical merge.
    pub merge_columns: Vec<usize>,
    /// 0-based columns whose value change ends merge runs.
    pub merge_break_columns: Vec<usize>,
    pub warnings: Vec<String>,
}

impl EvaluationResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_styles(&self) -> bool {
        !self.cell_fills.is_empty()
    }

    pub fn cell_style(&self, row: usize, column: usize) -> CellStyle {
        let pick = |matrix: &Vec<Vec<Option<Color>>>| {
            matrix
                .get(row)
                .and_then(|r| r.get(column))
                .cloned()
                .flatten()
        };
        CellStyle {
            fill: pick(&self.cell_fills),
            text_color: pick(&self.cell_text_colors),
        }
    }

    /// Reorder rows so that new row `i` is old row `order[i]`, keeping every aligned array in
    /// step. `order` must be a permutation of `0..row_count()`.
    pub fn permute(&mut self, order: &[usize]) {
        debug_assert_eq!(order.len(), self.rows.len());
        permute_vec(&mut self.rows, order);
        permute_vec(&mut self.source_objects, order);
        permute_vec(&mut self.row_fills, order);
        permute_vec(&mut self.row_text_colors, order);
        permute_vec(&mut self.cell_fills, order);
        permute_vec(&mut self.cell_text_colors, order);
    }
}

fn permute_vec<T: Default>(items: &mut Vec<T>, order: &[usize]) {
    if items.len() != order.len() {
        return;
    }
    let mut taken: Vec<T> = items.drain(..).collect();
    items.extend(order.iter().map(|&idx| std::mem::take(&mut taken[idx])));
}
