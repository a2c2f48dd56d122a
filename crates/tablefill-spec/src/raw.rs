//! Serde mirror of the JSON spec document. Everything is optional here; defaults and
//! validation happen in the loader.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as Json;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RawDocument {
    #[serde(default)]
    pub tables: Vec<RawTable>,
    #[serde(default)]
    pub property_mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub spec_version: Option<Json>,
    #[serde(default)]
    pub spec_checksum: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct RawTable {
    pub id: Option<String>,
    pub alt_text: Option<String>,
    pub source: Option<String>,
    pub mode: Option<String>,
    pub empty_message: Option<String>,
    pub formatting: RawFormatting,
    pub sort_specs: Vec<RawSortSpec>,
    pub filter_specs: Vec<RawPredicate>,
    pub filter_groups: Vec<RawFilterGroup>,
    pub filter_logic: Option<String>,
    pub row_conditions: Vec<RawPredicate>,
    pub global_cell_conditions: Vec<RawPredicate>,
    pub columns: Vec<RawColumn>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct RawFormatting {
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub horizontal_alignment: Option<String>,
    pub vertical_alignment: Option<String>,
    pub header_fill: Option<String>,
    pub header_text_color: Option<String>,
    pub alternate_row_fill: Option<String>,
    pub remove_duplicate_lines: Option<bool>,
    pub remove_duplicate_lines_strict: Option<bool>,
    pub fit_to_window: Option<bool>,
    pub repeat_header: Option<bool>,
    pub bold_header: Option<bool>,
    pub allow_row_break_across_pages: Option<bool>,
    pub diff_marker: Option<String>,
    pub diff_fill: Option<String>,
    pub merge_break_columns: Vec<Json>,
    pub merge_break_column_headers: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct RawSortSpec {
    /// 1-based column number or header text.
    pub column: Option<Json>,
    pub direction: Option<String>,
    pub numeric: bool,
}

/// Shared shape of filter specs and row/cell conditions; the condition-only fields are
/// ignored for filters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct RawPredicate {
    pub property_path: Option<String>,
    pub operator: Option<String>,
    pub value: Option<Json>,
    pub right_property_path: Option<String>,
    pub numeric: bool,
    pub ignore_case: bool,
    pub target: Option<String>,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub apply_to_row: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct RawFilterGroup {
    pub logic: Option<String>,
    pub filters: Vec<RawPredicate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct RawColumn {
    pub header: Option<String>,
    pub name: Option<String>,
    pub literal: Option<String>,
    pub format: Option<String>,
    pub expression: Option<String>,
    pub number_format: Option<String>,
    pub property_paths: Vec<String>,
    pub join_with: Option<String>,
    pub merge_vertically: bool,
    pub width_percent: Option<f64>,
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub horizontal_alignment: Option<String>,
    pub vertical_alignment: Option<String>,
    pub conditions: Vec<RawPredicate>,
}

/// Render a scalar JSON value as spec text (`"10"`, `true`, `12.5`); `null` is empty.
pub(crate) fn json_text(value: &Json) -> String {
    match value {
        Json::Null => String::new(),
        Json::String(s) => s.clone(),
        Json::Bool(b) => b.to_string(),
        Json::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
