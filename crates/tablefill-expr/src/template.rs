//! `{Path}` format templates (`"{Tag} - {Rating} A"`).

use tablefill_model::{PropertyPath, Value};

use crate::placeholders::{split_placeholders, Piece};
use crate::CompileError;

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(String),
    /// `None` when the placeholder text is not a valid path; it renders empty.
    Path(Option<PropertyPath>),
}

/// A parsed format template. Placeholders render through the property-path evaluator, so a
/// missing member renders as empty text.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatTemplate {
    source: String,
    parts: Vec<Part>,
}

impl FormatTemplate {
    pub fn parse(source: &str) -> Result<Self, CompileError> {
        let mut parts: Vec<Part> = Vec::new();
        for piece in split_placeholders(source)? {
            match piece {
                Piece::Text(text, _) => push_literal(&mut parts, text),
                Piece::Brace(ch, _) => push_literal(&mut parts, ch.encode_utf8(&mut [0; 4])),
                Piece::Placeholder(path, _) => parts.push(Part::Path(PropertyPath::parse(path))),
            }
        }
        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder paths in order of appearance (invalid paths omitted).
    pub fn paths(&self) -> impl Iterator<Item = &PropertyPath> {
        self.parts.iter().filter_map(|p| match p {
            Part::Path(Some(path)) => Some(path),
            _ => None,
        })
    }

    pub fn render(&self, record: &Value) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Path(Some(path)) => {
                    if let Some(value) = path.resolve(record) {
                        out.push_str(&value.to_text());
                    }
                }
                Part::Path(None) => {}
            }
        }
        out
    }
}

fn push_literal(parts: &mut Vec<Part>, text: &str) {
    if let Some(Part::Literal(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(Part::Literal(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_placeholders_and_literals() {
        let record = Value::from(json!({"Tag": "CB-12", "Frame": {"Amps": 800}}));
        let t = FormatTemplate::parse("{Tag} ({ Frame.Amps } A) {{spare}}").unwrap();
        assert_eq!(t.render(&record), "CB-12 (800 A) {spare}");
        assert_eq!(t.paths().count(), 2);
    }

    #[test]
    fn missing_members_render_empty() {
        let record = Value::from(json!({"Tag": "CB-12"}));
        let t = FormatTemplate::parse("{Tag}/{Missing}/{Bad[x]}").unwrap();
        assert_eq!(t.render(&record), "CB-12//");
    }

    #[test]
    fn rejects_unterminated_placeholders() {
        assert_eq!(
            FormatTemplate::parse("{Tag"),
            Err(CompileError::UnterminatedPlaceholder { pos: 0 })
        );
    }
}
