//! Colors, alignments and the conditional-formatting rules attached to tables and columns.

use std::fmt;

use serde::{Deserialize, Serialize};
use tablefill_expr::FieldPredicate;

/// An `RRGGBB` color, stored upper-case without a leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

const NAMED_COLORS: &[(&str, &str)] = &[
    ("black", "000000"),
    ("white", "FFFFFF"),
    ("red", "FF0000"),
    ("green", "00B050"),
    ("blue", "0070C0"),
    ("yellow", "FFFF00"),
    ("orange", "FFC000"),
    ("gray", "808080"),
    ("grey", "808080"),
    ("lightgray", "D9D9D9"),
    ("lightgrey", "D9D9D9"),
    ("lightred", "FFC7CE"),
    ("lightgreen", "C6EFCE"),
    ("lightyellow", "FFF2CC"),
    ("lightblue", "DDEBF7"),
];

impl Color {
    /// Parse `RRGGBB`, `#RRGGBB` or a named color.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let hex = text.strip_prefix('#').unwrap_or(text);
        if hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Some(Color(hex.to_ascii_uppercase()));
        }
        let lower = text.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, hex)| Color((*hex).to_string()))
    }

    /// A color from a hex literal already in canonical form.
    pub(crate) fn known(hex: &'static str) -> Self {
        Color(hex.to_string())
    }

    pub fn hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl HorizontalAlignment {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Self::Left),
            "center" | "centre" => Some(Self::Center),
            "right" | "end" => Some(Self::Right),
            "justify" | "both" => Some(Self::Justify),
            _ => None,
        }
    }

    /// `w:jc/@w:val`.
    pub fn as_ooxml(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "both",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerticalAlignment {
    Top,
    #[default]
    Center,
    Bottom,
}

impl VerticalAlignment {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "top" => Some(Self::Top),
            "center" | "centre" | "middle" => Some(Self::Center),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }

    /// `w:vAlign/@w:val`.
    pub fn as_ooxml(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Center => "center",
            Self::Bottom => "bottom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionTarget {
    #[default]
    Fill,
    Text,
    Both,
}

impl ConditionTarget {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "fill" | "background" => Some(Self::Fill),
            "text" | "font" => Some(Self::Text),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

/// Resolved fill and text color of a row or cell. `None` means "not set here".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellStyle {
    pub fill: Option<Color>,
    pub text_color: Option<Color>,
}

impl CellStyle {
    pub fn is_empty(&self) -> bool {
        self.fill.is_none() && self.text_color.is_none()
    }

    /// `self` with every part that `over` sets replaced.
    pub fn overlay(&self, over: &CellStyle) -> CellStyle {
        CellStyle {
            fill: over.fill.clone().or_else(|| self.fill.clone()),
            text_color: over.text_color.clone().or_else(|| self.text_color.clone()),
        }
    }
}

/// A row or cell formatting rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub predicate: FieldPredicate,
    pub target: ConditionTarget,
    pub color: Color,
    /// Text color used with [`ConditionTarget::Both`]; falls back to `color`.
    pub text_color: Option<Color>,
    /// Promote the resolved style to the row default for the remaining cells.
    pub apply_to_row: bool,
}

impl Condition {
    pub fn style(&self) -> CellStyle {
        match self.target {
            ConditionTarget::Fill => CellStyle {
                fill: Some(self.color.clone()),
                text_color: None,
            },
            ConditionTarget::Text => CellStyle {
                fill: None,
                text_color: Some(self.color.clone()),
            },
            ConditionTarget::Both => CellStyle {
                fill: Some(self.color.clone()),
                text_color: Some(self.text_color.clone().unwrap_or_else(|| self.color.clone())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablefill_expr::Operator;

    #[test]
    fn parses_colors() {
        assert_eq!(Color::parse("#ffc7ce").unwrap().hex(), "FFC7CE");
        assert_eq!(Color::parse("00b050").unwrap().hex(), "00B050");
        assert_eq!(Color::parse("LightRed").unwrap().hex(), "FFC7CE");
        assert_eq!(Color::parse("#FFF"), None);
        assert_eq!(Color::parse("chartreuse-ish"), None);
    }

    #[test]
    fn both_target_uses_text_color_when_given() {
        let cond = Condition {
            predicate: FieldPredicate::new("Status", Operator::Eq, "New"),
            target: ConditionTarget::Both,
            color: Color::parse("FFFF00").unwrap(),
            text_color: Color::parse("red"),
            apply_to_row: false,
        };
        let style = cond.style();
        assert_eq!(style.fill.unwrap().hex(), "FFFF00");
        assert_eq!(style.text_color.unwrap().hex(), "FF0000");
    }

    #[test]
    fn overlay_keeps_unset_parts() {
        let base = CellStyle {
            fill: Color::parse("D9D9D9"),
            text_color: Color::parse("000000"),
        };
        let over = CellStyle {
            fill: Color::parse("FFC7CE"),
            text_color: None,
        };
        let merged = base.overlay(&over);
        assert_eq!(merged.fill.unwrap().hex(), "FFC7CE");
        assert_eq!(merged.text_color.unwrap().hex(), "000000");
    }
}
