//! Single field predicates shared by filters, row conditions and cell conditions.

use std::fmt;

use tablefill_model::{PropertyPath, Value};

use crate::numeric::parse_leading_number;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
}

impl Operator {
    /// Parse an operator name (case-insensitive) or symbolic alias.
    pub fn parse(text: &str) -> Option<Self> {
        let op = match text.trim().to_ascii_lowercase().as_str() {
            "eq" | "=" | "==" => Operator::Eq,
            "neq" | "ne" | "!=" | "<>" => Operator::Neq,
            "lt" | "<" => Operator::Lt,
            "lte" | "le" | "<=" => Operator::Lte,
            "gt" | ">" => Operator::Gt,
            "gte" | "ge" | ">=" => Operator::Gte,
            "contains" => Operator::Contains,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Contains => "contains",
        }
    }

    fn holds<T: PartialOrd + ?Sized>(self, left: &T, right: &T) -> bool {
        match self {
            Operator::Eq => left == right,
            Operator::Neq => left != right,
            Operator::Lt => left < right,
            Operator::Lte => left <= right,
            Operator::Gt => left > right,
            Operator::Gte => left >= right,
            // Handled as a string test by the caller.
            Operator::Contains => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    /// Empty left path: the rendered cell text when there is one, else empty text.
    CellText,
    Path(Option<PropertyPath>),
    Literal(String),
}

impl Operand {
    fn text(&self, record: &Value, cell: Option<&str>) -> String {
        match self {
            Operand::CellText => cell.unwrap_or_default().to_string(),
            Operand::Path(Some(path)) => path
                .resolve(record)
                .map(|v| v.to_text())
                .unwrap_or_default(),
            Operand::Path(None) => String::new(),
            Operand::Literal(text) => text.clone(),
        }
    }
}

/// `<left> <op> <right>` where the left side is a property path and the right side is a
/// literal or a second property path.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    left: Operand,
    op: Operator,
    right: Operand,
    numeric: bool,
    ignore_case: bool,
}

impl FieldPredicate {
    pub fn new(path: &str, op: Operator, value: impl Into<String>) -> Self {
        let path = path.trim();
        let left = if path.is_empty() {
            Operand::CellText
        } else {
            Operand::Path(PropertyPath::parse(path))
        };
        Self {
            left,
            op,
            right: Operand::Literal(value.into()),
            numeric: false,
            ignore_case: false,
        }
    }

    /// Compare against a second property path instead of the literal value.
    pub fn with_right_path(mut self, path: &str) -> Self {
        self.right = Operand::Path(PropertyPath::parse(path));
        self
    }

    pub fn with_numeric(mut self, numeric: bool) -> Self {
        self.numeric = numeric;
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn operator(&self) -> Operator {
        self.op
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.compare(record, None)
    }

    /// Like [`FieldPredicate::matches`], but an empty left path reads `cell_text`.
    pub fn matches_cell(&self, record: &Value, cell_text: &str) -> bool {
        self.compare(record, Some(cell_text))
    }

    fn compare(&self, record: &Value, cell: Option<&str>) -> bool {
        let mut left = self.left.text(record, cell);
        let mut right = self.right.text(record, cell);

        if self.numeric && self.op != Operator::Contains {
            return match (parse_leading_number(&left), parse_leading_number(&right)) {
                (Some(l), Some(r)) => self.op.holds(&l, &r),
                _ => false,
            };
        }

        if self.ignore_case {
            left = left.to_lowercase();
            right = right.to_lowercase();
        }
        match self.op {
            Operator::Contains => left.contains(right.as_str()),
            op => op.holds(left.as_str(), right.as_str()),
        }
    }
}
