//! JSON spec → [`TableDefinition`]s.
//!
//! Passes run in a fixed order: PascalCase field names, duplicate ids, per-table defaults and
//! semantic checks (operators, content modes, widths), then the optional checksum.
//! Structural failures stop loading with no tables; problems confined to one table drop
//! only that table unless loading is strict.

use std::collections::{BTreeSet, HashSet};

use serde_json::Value as Json;
use tablefill_expr::{
    compile_cached, FieldPredicate, FilterGroup, FilterSet, FormatTemplate, GroupLogic,
    LogicExpression, Operator,
};
use tablefill_model::PropertyPath;
use thiserror::Error;

use crate::checksum::{checksums_match, compute_checksum};
use crate::column::{ColumnContent, ColumnDefinition};
use crate::mappings::PropertyMappings;
use crate::naming::pascal_case_violations;
use crate::raw::{json_text, RawColumn, RawDocument, RawFormatting, RawPredicate, RawTable};
use crate::style::{Color, Condition, ConditionTarget, HorizontalAlignment, VerticalAlignment};
use crate::table::{
    Mode, SortDirection, SortSpec, TableDefinition, TableFormatting, DEFAULT_EMPTY_MESSAGE,
};
use crate::widths::reconcile_widths;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("spec is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("spec does not match the table schema: {0}")]
    Schema(#[source] serde_json::Error),
    #[error("spec root must be an array of tables or an object with `Tables`")]
    InvalidRoot,
    #[error("spec rejected with {} error(s): {}", .0.len(), .0.join("; "))]
    Rejected(Vec<String>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fail on any accumulated error instead of returning it in [`LoadedSpec::errors`].
    pub strict: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedSpec {
    pub tables: Vec<TableDefinition>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub version: Option<String>,
}

impl LoadedSpec {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn table(&self, id: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.id.eq_ignore_ascii_case(id))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpecLoader {
    options: LoadOptions,
}

impl SpecLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn strict() -> Self {
        Self::new(LoadOptions { strict: true })
    }

    pub fn load(&self, text: &str) -> Result<LoadedSpec, SpecError> {
        let root: Json = serde_json::from_str(text)?;
        let mut spec = LoadedSpec::default();

        let violations = pascal_case_violations(&root);
        if !violations.is_empty() {
            spec.errors = violations;
            return self.finish(spec);
        }

        let doc: RawDocument = match root {
            Json::Array(_) => RawDocument {
                tables: serde_json::from_value(root).map_err(SpecError::Schema)?,
                ..RawDocument::default()
            },
            Json::Object(_) => serde_json::from_value(root).map_err(SpecError::Schema)?,
            _ => return Err(SpecError::InvalidRoot),
        };
        spec.version = doc.spec_version.as_ref().map(json_text);

        let duplicates = duplicate_ids(&doc.tables);
        if !duplicates.is_empty() {
            spec.errors = duplicates
                .into_iter()
                .map(|id| format!("duplicate table id `{id}`"))
                .collect();
            return self.finish(spec);
        }

        let mappings = PropertyMappings::new(&doc.property_mappings);
        for (idx, raw) in doc.tables.iter().enumerate() {
            let mut builder = TableBuilder::new(idx, raw, &mappings);
            let table = builder.build();
            spec.warnings.append(&mut builder.warnings);
            match table {
                Some(table) if builder.errors.is_empty() => spec.tables.push(table),
                _ => spec.errors.append(&mut builder.errors),
            }
        }

        if let Some(declared) = doc.spec_checksum.as_deref().filter(|s| !s.trim().is_empty()) {
            let computed = compute_checksum(doc.tables.iter().map(|t| {
                (
                    t.id.as_deref().unwrap_or_default(),
                    t.columns.iter().map(|c| c.header.as_deref().unwrap_or_default()),
                )
            }));
            if !checksums_match(declared, &computed) {
                spec.warnings.push(format!(
                    "spec checksum mismatch: declared {}, computed {computed}",
                    declared.trim()
                ));
            }
        }

        self.finish(spec)
    }

    fn finish(&self, spec: LoadedSpec) -> Result<LoadedSpec, SpecError> {
        for warning in &spec.warnings {
            log::warn!("{warning}");
        }
        for error in &spec.errors {
            log::error!("{error}");
        }
        if self.options.strict && spec.has_errors() {
            return Err(SpecError::Rejected(spec.errors));
        }
        log::debug!(
            "loaded {} table definition(s) ({} warning(s), {} error(s))",
            spec.tables.len(),
            spec.warnings.len(),
            spec.errors.len()
        );
        Ok(spec)
    }
}

/// Load leniently.
pub fn load_spec(text: &str) -> Result<LoadedSpec, SpecError> {
    SpecLoader::default().load(text)
}

fn duplicate_ids(tables: &[RawTable]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = BTreeSet::new();
    for id in tables.iter().filter_map(|t| t.id.as_deref()) {
        let id = id.trim();
        if id.is_empty() {
            continue;
        }
        if !seen.insert(id.to_lowercase()) {
            reported.insert(id.to_string());
        }
    }
    reported.into_iter().collect()
}

struct TableBuilder<'a> {
    label: String,
    raw: &'a RawTable,
    mappings: &'a PropertyMappings,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl<'a> TableBuilder<'a> {
    fn new(index: usize, raw: &'a RawTable, mappings: &'a PropertyMappings) -> Self {
        let label = match raw.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => format!("table `{id}`"),
            _ => format!("table #{}", index + 1),
        };
        Self {
            label,
            raw,
            mappings,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn warn(&mut self, message: impl std::fmt::Display) {
        self.warnings.push(format!("{}: {message}", self.label));
    }

    fn error(&mut self, message: impl std::fmt::Display) {
        self.errors.push(format!("{}: {message}", self.label));
    }

    fn build(&mut self) -> Option<TableDefinition> {
        let raw = self.raw;
        let id = match raw.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                self.error("missing Id");
                return None;
            }
        };
        let alt_text = match raw.alt_text.as_deref().map(str::trim) {
            Some(alt) if !alt.is_empty() => alt.to_string(),
            _ => {
                self.warn("missing AltText; using the table id as the document anchor");
                id.clone()
            }
        };
        let mode = match Mode::parse(raw.mode.as_deref().unwrap_or_default()) {
            Some(mode) => mode,
            None => {
                self.error(format_args!(
                    "unknown Mode `{}` (expected `new` or `diff`)",
                    raw.mode.as_deref().unwrap_or_default()
                ));
                Mode::New
            }
        };
        if raw.columns.is_empty() {
            self.error("no Columns defined");
        }

        let mut columns: Vec<ColumnDefinition> = raw
            .columns
            .iter()
            .enumerate()
            .map(|(idx, col)| self.column(idx, col))
            .collect();

        let mut seen_headers = HashSet::new();
        for col in &columns {
            if !seen_headers.insert(col.header.trim().to_lowercase()) {
                let header = col.header.clone();
                self.warn(format_args!("duplicate column header `{header}`"));
            }
        }

        let declared: Vec<Option<f64>> = raw.columns.iter().map(|c| c.width_percent).collect();
        let mut width_warnings = Vec::new();
        let widths = reconcile_widths(&declared, &mut width_warnings);
        for w in width_warnings {
            self.warn(w);
        }
        for (col, width) in columns.iter_mut().zip(widths) {
            col.width_percent = width;
        }

        let formatting = self.formatting(&raw.formatting, &columns);
        let sort_specs = self.sort_specs(&columns);
        let filters = self.filters();
        let row_conditions = self.conditions(&raw.row_conditions, "row condition");
        let global_cell_conditions =
            self.conditions(&raw.global_cell_conditions, "global cell condition");

        let empty_message = raw
            .empty_message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EMPTY_MESSAGE.to_string());

        Some(TableDefinition {
            id,
            alt_text,
            source: raw.source.clone().filter(|s| !s.trim().is_empty()),
            mode,
            empty_message,
            columns,
            sort_specs,
            filters,
            row_conditions,
            global_cell_conditions,
            formatting,
        })
    }

    fn column(&mut self, idx: usize, raw: &RawColumn) -> ColumnDefinition {
        let mappings = self.mappings;
        let header = raw.header.clone().unwrap_or_default();
        let name = raw
            .name
            .as_deref()
            .map(|n| mappings.resolve(n).to_string())
            .filter(|n| !n.is_empty());
        let label = format!("column {} (`{header}`)", idx + 1);

        let modes = [
            raw.literal.is_some(),
            raw.format.is_some(),
            raw.expression.is_some(),
            !raw.property_paths.is_empty(),
        ];
        let content = if modes.iter().filter(|m| **m).count() > 1 {
            self.error(format_args!(
                "{label} declares more than one of Literal, Format, Expression, PropertyPaths"
            ));
            ColumnContent::Empty
        } else if let Some(literal) = &raw.literal {
            ColumnContent::Literal(literal.clone())
        } else if let Some(format) = &raw.format {
            match FormatTemplate::parse(&mappings.rewrite_placeholders(format)) {
                Ok(template) => ColumnContent::Template(template),
                Err(err) => {
                    self.error(format_args!("{label} has an invalid Format: {err}"));
                    ColumnContent::Empty
                }
            }
        } else if let Some(expression) = &raw.expression {
            let source = mappings.rewrite_placeholders(expression);
            match compile_cached(&source, raw.number_format.as_deref()) {
                Ok(program) => ColumnContent::Expression(program),
                Err(err) => {
                    self.error(format_args!("{label} has an invalid Expression: {err}"));
                    ColumnContent::Empty
                }
            }
        } else if !raw.property_paths.is_empty() {
            let paths = raw
                .property_paths
                .iter()
                .map(|p| self.path(p, &label))
                .collect();
            ColumnContent::Paths {
                paths,
                join_with: raw.join_with.clone().unwrap_or_else(|| "\n".to_string()),
            }
        } else if let Some(name) = &name {
            ColumnContent::Paths {
                paths: vec![self.path(name, &label)],
                join_with: "\n".to_string(),
            }
        } else {
            ColumnContent::Empty
        };

        if raw.number_format.is_some() && raw.expression.is_none() {
            self.warn(format_args!("{label} sets NumberFormat without an Expression"));
        }

        let horizontal_alignment = raw
            .horizontal_alignment
            .as_deref()
            .and_then(|a| self.alignment(a, HorizontalAlignment::parse, &label));
        let vertical_alignment = raw
            .vertical_alignment
            .as_deref()
            .and_then(|a| self.alignment(a, VerticalAlignment::parse, &label));
        let font_size = raw.font_size.and_then(|s| self.font_size(s, &label));
        let conditions = self.conditions(&raw.conditions, &format!("{label} condition"));

        ColumnDefinition {
            header,
            name,
            content,
            merge_vertically: raw.merge_vertically,
            width_percent: 0.0,
            font_name: raw.font_name.clone().filter(|f| !f.trim().is_empty()),
            font_size,
            horizontal_alignment,
            vertical_alignment,
            conditions,
        }
    }

    fn path(&mut self, path: &str, label: &str) -> Option<PropertyPath> {
        let mappings = self.mappings;
        let resolved = mappings.resolve(path);
        let parsed = PropertyPath::parse(resolved);
        if parsed.is_none() {
            self.warn(format_args!(
                "{label} has malformed property path `{resolved}`; it will render empty"
            ));
        }
        parsed
    }

    fn alignment<T>(&mut self, text: &str, parse: fn(&str) -> Option<T>, label: &str) -> Option<T> {
        let parsed = parse(text);
        if parsed.is_none() {
            self.warn(format_args!("{label}: unknown alignment `{text}`; using the default"));
        }
        parsed
    }

    fn font_size(&mut self, size: f64, label: &str) -> Option<f64> {
        if size.is_finite() && size > 0.0 {
            Some(size)
        } else {
            self.warn(format_args!("{label}: invalid FontSize {size}; using the default"));
            None
        }
    }

    fn color(&mut self, text: Option<&str>, label: &str) -> Option<Color> {
        let text = text?.trim();
        if text.is_empty() {
            return None;
        }
        let parsed = Color::parse(text);
        if parsed.is_none() {
            self.warn(format_args!("{label}: unknown color `{text}`"));
        }
        parsed
    }

    fn formatting(&mut self, raw: &RawFormatting, columns: &[ColumnDefinition]) -> TableFormatting {
        let mut f = TableFormatting::default();
        if let Some(font) = raw.font_name.as_deref().filter(|f| !f.trim().is_empty()) {
            f.font_name = font.trim().to_string();
        }
        if let Some(size) = raw.font_size.and_then(|s| self.font_size(s, "Formatting")) {
            f.font_size = size;
        }
        if let Some(a) = raw.horizontal_alignment.as_deref() {
            if let Some(a) = self.alignment(a, HorizontalAlignment::parse, "Formatting") {
                f.horizontal_alignment = a;
            }
        }
        if let Some(a) = raw.vertical_alignment.as_deref() {
            if let Some(a) = self.alignment(a, VerticalAlignment::parse, "Formatting") {
                f.vertical_alignment = a;
            }
        }
        if let Some(c) = self.color(raw.header_fill.as_deref(), "HeaderFill") {
            f.header_fill = Some(c);
        }
        if let Some(c) = self.color(raw.header_text_color.as_deref(), "HeaderTextColor") {
            f.header_text_color = Some(c);
        }
        if let Some(c) = self.color(raw.alternate_row_fill.as_deref(), "AlternateRowFill") {
            f.alternate_row_fill = Some(c);
        }
        if let Some(c) = self.color(raw.diff_fill.as_deref(), "DiffFill") {
            f.diff_fill = c;
        }
        if let Some(marker) = &raw.diff_marker {
            if marker.is_empty() {
                self.warn("empty DiffMarker; using the default");
            } else {
                f.diff_marker = marker.clone();
            }
        }
        f.remove_duplicate_lines = raw.remove_duplicate_lines.unwrap_or(f.remove_duplicate_lines);
        f.remove_duplicate_lines_strict = raw
            .remove_duplicate_lines_strict
            .unwrap_or(f.remove_duplicate_lines_strict);
        f.fit_to_window = raw.fit_to_window.unwrap_or(f.fit_to_window);
        f.repeat_header = raw.repeat_header.unwrap_or(f.repeat_header);
        f.bold_header = raw.bold_header.unwrap_or(f.bold_header);
        f.allow_row_break_across_pages = raw
            .allow_row_break_across_pages
            .unwrap_or(f.allow_row_break_across_pages);

        let mut breaks = BTreeSet::new();
        for entry in &raw.merge_break_columns {
            let text = json_text(entry);
            match text.trim().parse::<usize>() {
                Ok(n) if (1..=columns.len()).contains(&n) => {
                    breaks.insert(n - 1);
                }
                _ => self.warn(format_args!(
                    "MergeBreakColumns entry `{text}` is not a column number between 1 and {}",
                    columns.len()
                )),
            }
        }
        for header in &raw.merge_break_column_headers {
            match find_header(columns, header) {
                Some(idx) => {
                    breaks.insert(idx);
                }
                None => self.warn(format_args!(
                    "MergeBreakColumnHeaders entry `{header}` matches no column"
                )),
            }
        }
        f.merge_break_columns = breaks.into_iter().collect();
        f
    }

    fn sort_specs(&mut self, columns: &[ColumnDefinition]) -> Vec<SortSpec> {
        let table = self.raw;
        let mut specs = Vec::new();
        for (idx, raw) in table.sort_specs.iter().enumerate() {
            let column_text = raw.column.as_ref().map(json_text).unwrap_or_default();
            let column = match raw.column.as_ref() {
                Some(Json::Number(n)) => n
                    .as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .filter(|n| (1..=columns.len()).contains(n))
                    .map(|n| n - 1),
                Some(Json::String(s)) => match s.trim().parse::<usize>() {
                    Ok(n) if (1..=columns.len()).contains(&n) => Some(n - 1),
                    Ok(_) => None,
                    Err(_) => find_header(columns, s),
                },
                _ => None,
            };
            let Some(column) = column else {
                self.error(format_args!(
                    "sort spec {} references unknown column `{column_text}`",
                    idx + 1
                ));
                continue;
            };
            let direction_text = raw.direction.as_deref().unwrap_or_default();
            let direction = SortDirection::parse(direction_text).unwrap_or_else(|| {
                self.warn(format_args!(
                    "sort spec {} has unknown Direction `{direction_text}`; sorting ascending",
                    idx + 1
                ));
                SortDirection::Ascending
            });
            specs.push(SortSpec {
                column,
                direction,
                numeric: raw.numeric,
            });
        }
        specs
    }

    fn filters(&mut self) -> FilterSet {
        let raw = self.raw;
        let predicates: Vec<FieldPredicate> = raw
            .filter_specs
            .iter()
            .enumerate()
            .map(|(idx, p)| self.predicate(p, &format!("filter {}", idx + 1)))
            .collect();

        let mut groups = Vec::with_capacity(raw.filter_groups.len());
        for (idx, group) in raw.filter_groups.iter().enumerate() {
            let label = format!("filter group {}", idx + 1);
            let logic_text = group.logic.as_deref().unwrap_or("and");
            let logic = GroupLogic::parse(logic_text).unwrap_or_else(|| {
                self.warn(format_args!("{label} has unknown Logic `{logic_text}`; using `and`"));
                GroupLogic::And
            });
            let predicates = group
                .filters
                .iter()
                .enumerate()
                .map(|(n, p)| self.predicate(p, &format!("{label} filter {}", n + 1)))
                .collect();
            groups.push(FilterGroup::new(logic, predicates));
        }

        let logic = match raw.filter_logic.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                match LogicExpression::parse(text)
                    .and_then(|expr| expr.check_range(predicates.len()).map(|_| expr))
                {
                    Ok(expr) => Some(expr),
                    Err(err) => {
                        self.error(format_args!("invalid FilterLogic `{text}`: {err}"));
                        None
                    }
                }
            }
            _ => None,
        };

        FilterSet {
            predicates,
            groups,
            logic,
        }
    }

    fn predicate(&mut self, raw: &RawPredicate, label: &str) -> FieldPredicate {
        let mappings = self.mappings;
        let op_text = raw.operator.as_deref().unwrap_or("eq");
        let op = Operator::parse(op_text).unwrap_or_else(|| {
            self.warn(format_args!("{label} has unknown Operator `{op_text}`; using `eq`"));
            Operator::Eq
        });
        let path = raw
            .property_path
            .as_deref()
            .map(|p| mappings.resolve(p))
            .unwrap_or_default();
        if !path.is_empty() && PropertyPath::parse(path).is_none() {
            self.warn(format_args!("{label} has malformed PropertyPath `{path}`"));
        }
        let value = raw.value.as_ref().map(json_text).unwrap_or_default();
        let mut predicate = FieldPredicate::new(path, op, value)
            .with_numeric(raw.numeric)
            .with_ignore_case(raw.ignore_case);
        if let Some(right) = raw.right_property_path.as_deref().filter(|r| !r.trim().is_empty()) {
            predicate = predicate.with_right_path(mappings.resolve(right));
        }
        predicate
    }

    fn conditions(&mut self, raw: &[RawPredicate], kind: &str) -> Vec<Condition> {
        let mut out = Vec::with_capacity(raw.len());
        for (idx, cond) in raw.iter().enumerate() {
            let label = format!("{kind} {}", idx + 1);
            let predicate = self.predicate(cond, &label);
            let target_text = cond.target.as_deref().unwrap_or("fill");
            let target = ConditionTarget::parse(target_text).unwrap_or_else(|| {
                self.warn(format_args!("{label} has unknown Target `{target_text}`; using `fill`"));
                ConditionTarget::Fill
            });
            let Some(color) = self.color(cond.color.as_deref(), &label) else {
                self.warn(format_args!("{label} has no usable Color and is ignored"));
                continue;
            };
            let text_color = self.color(cond.text_color.as_deref(), &label);
            out.push(Condition {
                predicate,
                target,
                color,
                text_color,
                apply_to_row: cond.apply_to_row,
            });
        }
        out
    }
}

fn find_header(columns: &[ColumnDefinition], header: &str) -> Option<usize> {
    let header = header.trim();
    columns
        .iter()
        .position(|c| c.header.trim().eq_ignore_ascii_case(header))
}
