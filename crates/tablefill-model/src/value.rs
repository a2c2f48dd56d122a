use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::record::Record;

/// Dynamic value flowing from the dataset into table rendering.
///
/// `List` and `Map` are reference counted so that cloning a source record for every
/// output row stays cheap.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Missing / null value. Renders as empty text.
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Arc<Vec<Value>>),
    /// String-keyed bag of members (JSON objects land here).
    Map(Arc<BTreeMap<String, Value>>),
    /// Strongly typed record exposed through the [`Record`] accessor trait.
    Record(Arc<dyn Record>),
}

impl Value {
    /// Returns true if the value is [`Value::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Arc::new(entries))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }

    pub fn record<R: Record>(record: R) -> Self {
        Value::Record(Arc::new(record))
    }

    /// Index into a sequence value. Non-sequences and out-of-range indexes yield `None`.
    pub fn index(&self, idx: usize) -> Option<Value> {
        match self {
            Value::List(items) => items.get(idx).cloned(),
            _ => None,
        }
    }

    /// Render the value as report text.
    ///
    /// Booleans are lowercase, integral numbers drop the fractional part and lists are
    /// joined with `", "`. Maps and records have no scalar form and render empty.
    pub fn to_text(&self) -> String {
        match self {
            Value::Empty | Value::Map(_) | Value::Record(_) => String::new(),
            Value::Bool(true) => "true".to_string(),
            Value::Bool(false) => "false".to_string(),
            Value::Number(n) => format_number_plain(*n),
            Value::Text(s) => s.clone(),
            Value::List(items) => {
                let mut out = String::new();
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&item.to_text());
                }
                out
            }
        }
    }
}

fn format_number_plain(n: f64) -> String {
    if n == 0.0 {
        // Avoid rendering `-0`.
        return "0".to_string();
    }
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    n.to_string()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Empty, Value::Empty) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Empty)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::list(value.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Empty,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Empty),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::list(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_scalars() {
        assert_eq!(Value::Bool(true).to_text(), "true");
        assert_eq!(Value::Bool(false).to_text(), "false");
        assert_eq!(Value::Number(5.0).to_text(), "5");
        assert_eq!(Value::Number(-0.0).to_text(), "0");
        assert_eq!(Value::Number(0.25).to_text(), "0.25");
        assert_eq!(Value::Empty.to_text(), "");
    }

    #[test]
    fn lists_join_items() {
        let v = Value::from(vec!["a", "b"]);
        assert_eq!(v.to_text(), "a, b");
        assert_eq!(v.index(1), Some(Value::from("b")));
        assert_eq!(v.index(2), None);
        assert_eq!(Value::from("x").index(0), None);
    }

    #[test]
    fn converts_json_objects() {
        let json: serde_json::Value = serde_json::json!({"Name": "B1", "Kv": 0.48, "Tags": [1, 2]});
        let v = Value::from(json);
        let Value::Map(map) = v else {
            panic!("expected map");
        };
        assert_eq!(map.get("Name"), Some(&Value::from("B1")));
        assert_eq!(map.get("Kv"), Some(&Value::Number(0.48)));
        assert_eq!(map.get("Tags").map(Value::to_text).as_deref(), Some("1, 2"));
    }
}
