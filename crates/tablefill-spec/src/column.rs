use std::sync::Arc;

use tablefill_expr::{CompiledExpression, FormatTemplate};
use tablefill_model::{PropertyPath, Value};

use crate::style::{Condition, HorizontalAlignment, VerticalAlignment};

/// How a column turns a record into cell text. Exactly one mode is chosen at load time.
#[derive(Debug, Clone)]
pub enum ColumnContent {
    /// Nothing to render; every cell is empty.
    Empty,
    Literal(String),
    Template(FormatTemplate),
    Expression(Arc<CompiledExpression>),
    /// Each path rendered and joined; empty parts are skipped.
    Paths {
        paths: Vec<Option<PropertyPath>>,
        join_with: String,
    },
}

impl ColumnContent {
    pub fn render(&self, record: &Value) -> String {
        match self {
            ColumnContent::Empty => String::new(),
            ColumnContent::Literal(text) => text.clone(),
            ColumnContent::Template(template) => template.render(record),
            ColumnContent::Expression(program) => program.render(record),
            ColumnContent::Paths { paths, join_with } => {
                let mut out = String::new();
                let mut first = true;
                for path in paths.iter().flatten() {
                    let text = path
                        .resolve(record)
                        .map(|v| v.to_text())
                        .unwrap_or_default();
                    if text.is_empty() {
                        continue;
                    }
                    if !first {
                        out.push_str(join_with);
                    }
                    out.push_str(&text);
                    first = false;
                }
                out
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    pub header: String,
    /// Bound property, when the column declares `Name`.
    pub name: Option<String>,
    pub content: ColumnContent,
    pub merge_vertically: bool,
    /// Reconciled share of the table width.
    pub width_percent: f64,
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub horizontal_alignment: Option<HorizontalAlignment>,
    pub vertical_alignment: Option<VerticalAlignment>,
    pub conditions: Vec<Condition>,
}

impl ColumnDefinition {
    /// A plain column rendering one property path, used by tests and callers building
    /// definitions in code.
    pub fn property(header: impl Into<String>, path: &str) -> Self {
        Self {
            header: header.into(),
            name: Some(path.to_string()),
            content: ColumnContent::Paths {
                paths: vec![PropertyPath::parse(path)],
                join_with: "\n".to_string(),
            },
            merge_vertically: false,
            width_percent: 0.0,
            font_name: None,
            font_size: None,
            horizontal_alignment: None,
            vertical_alignment: None,
            conditions: Vec::new(),
        }
    }

    pub fn render(&self, record: &Value) -> String {
        self.content.render(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tablefill_expr::compile;

    fn device() -> Value {
        Value::from(json!({"Tag": "CB-1", "Frame": 800, "Trip": 600, "Notes": ""}))
    }

    #[test]
    fn renders_each_mode() {
        let record = device();
        assert_eq!(ColumnContent::Empty.render(&record), "");
        assert_eq!(ColumnContent::Literal("N/A".into()).render(&record), "N/A");
        let template = FormatTemplate::parse("{Tag}: {Frame}AF").unwrap();
        assert_eq!(ColumnContent::Template(template).render(&record), "CB-1: 800AF");
        let program = Arc::new(compile("{Trip} / {Frame} * 100", Some("0.0")).unwrap());
        assert_eq!(ColumnContent::Expression(program).render(&record), "75.0");
    }

    #[test]
    fn joined_paths_skip_empty_parts() {
        let content = ColumnContent::Paths {
            paths: ["Tag", "Notes", "Missing", "Frame"]
                .iter()
                .map(|p| PropertyPath::parse(p))
                .collect(),
            join_with: " / ".into(),
        };
        assert_eq!(content.render(&device()), "CB-1 / 800");
    }
}
