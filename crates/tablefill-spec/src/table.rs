use tablefill_expr::FilterSet;

use crate::column::ColumnDefinition;
use crate::style::{Color, Condition, HorizontalAlignment, VerticalAlignment};

pub const DEFAULT_FONT_NAME: &str = "Calibri";
pub const DEFAULT_FONT_SIZE: f64 = 9.0;
pub const DEFAULT_HEADER_FILL: &str = "D9D9D9";
pub const DEFAULT_ALTERNATE_ROW_FILL: &str = "F2F2F2";
pub const DEFAULT_DIFF_MARKER: &str = "\nwas: ";
pub const DEFAULT_DIFF_FILL: &str = "FFF2CC";
pub const DEFAULT_EMPTY_MESSAGE: &str = "No data.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    New,
    Diff,
}

impl Mode {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "" | "new" => Some(Mode::New),
            "diff" => Some(Mode::Diff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "" | "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    /// 0-based column index.
    pub column: usize,
    pub direction: SortDirection,
    pub numeric: bool,
}

/// Table-wide formatting, already merged with the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct TableFormatting {
    pub font_name: String,
    pub font_size: f64,
    pub horizontal_alignment: HorizontalAlignment,
    pub vertical_alignment: VerticalAlignment,
    pub header_fill: Option<Color>,
    pub header_text_color: Option<Color>,
    pub alternate_row_fill: Option<Color>,
    pub remove_duplicate_lines: bool,
    pub remove_duplicate_lines_strict: bool,
    pub fit_to_window: bool,
    pub repeat_header: bool,
    pub bold_header: bool,
    pub allow_row_break_across_pages: bool,
    pub diff_marker: String,
    pub diff_fill: Color,
    /// 0-based columns whose value change ends every merge run.
    pub merge_break_columns: Vec<usize>,
}

impl Default for TableFormatting {
    fn default() -> Self {
        Self {
            font_name: DEFAULT_FONT_NAME.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            horizontal_alignment: HorizontalAlignment::default(),
            vertical_alignment: VerticalAlignment::default(),
            header_fill: Some(Color::known(DEFAULT_HEADER_FILL)),
            header_text_color: None,
            alternate_row_fill: Some(Color::known(DEFAULT_ALTERNATE_ROW_FILL)),
            remove_duplicate_lines: false,
            remove_duplicate_lines_strict: false,
            fit_to_window: true,
            repeat_header: true,
            bold_header: true,
            allow_row_break_across_pages: false,
            diff_marker: DEFAULT_DIFF_MARKER.to_string(),
            diff_fill: Color::known(DEFAULT_DIFF_FILL),
            merge_break_columns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableDefinition {
    pub id: String,
    pub alt_text: String,
    /// Collection override; otherwise the identity prefix of `id` picks the collection.
    pub source: Option<String>,
    pub mode: Mode,
    pub empty_message: String,
    pub columns: Vec<ColumnDefinition>,
    pub sort_specs: Vec<SortSpec>,
    pub filters: FilterSet,
    pub row_conditions: Vec<Condition>,
    pub global_cell_conditions: Vec<Condition>,
    pub formatting: TableFormatting,
}

impl TableDefinition {
    /// A bare `New`-mode table with default formatting; used when building definitions in
    /// code rather than from JSON.
    pub fn new(id: impl Into<String>, alt_text: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            id: id.into(),
            alt_text: alt_text.into(),
            source: None,
            mode: Mode::New,
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
            columns,
            sort_specs: Vec::new(),
            filters: FilterSet::default(),
            row_conditions: Vec::new(),
            global_cell_conditions: Vec::new(),
            formatting: TableFormatting::default(),
        }
    }

    /// Part of `id` before the first `.`.
    pub fn identity_prefix(&self) -> &str {
        self.id.split('.').next().unwrap_or_default().trim()
    }

    /// Dataset collection this table reads.
    pub fn collection_name(&self) -> &str {
        match self.source.as_deref().map(str::trim) {
            Some(source) if !source.is_empty() => source,
            _ => self.identity_prefix(),
        }
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.header.clone()).collect()
    }

    pub fn merge_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.merge_vertically)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Whether evaluation needs the style pass.
    pub fn has_conditions(&self) -> bool {
        !self.row_conditions.is_empty()
            || !self.global_cell_conditions.is_empty()
            || self.columns.iter().any(|c| !c.conditions.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_prefix_and_source_override() {
        let mut table = TableDefinition::new("Buses.Summary", "BUS_TABLE", Vec::new());
        assert_eq!(table.identity_prefix(), "Buses");
        assert_eq!(table.collection_name(), "Buses");
        table.source = Some("ArcFlash".into());
        assert_eq!(table.collection_name(), "ArcFlash");
        table.source = Some("  ".into());
        assert_eq!(table.collection_name(), "Buses");
    }

    #[test]
    fn parses_modes_and_directions() {
        assert_eq!(Mode::parse("Diff"), Some(Mode::Diff));
        assert_eq!(Mode::parse(""), Some(Mode::New));
        assert_eq!(Mode::parse("delta"), None);
        assert_eq!(SortDirection::parse("DESC"), Some(SortDirection::Descending));
        assert_eq!(SortDirection::parse("up"), None);
    }

    #[test]
    fn default_formatting() {
        let f = TableFormatting::default();
        assert_eq!(f.diff_marker, "\nwas: ");
        assert_eq!(f.diff_fill.hex(), "FFF2CC");
        assert!(f.repeat_header && f.bold_header && !f.allow_row_break_across_pages);
    }
}
