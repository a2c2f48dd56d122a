//! Dotted/indexed property paths (`"Protection.Devices[0].Tag"`).
//!
//! Resolution never fails loudly: an unknown member, an index into a non-sequence, an
//! out-of-range index or a malformed path all resolve to "nothing", which renders as
//! empty text.

use std::fmt;

use crate::record::{accessor_cache, member_key};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Member name; empty when the segment only indexes (e.g. the leading `[0]` in `[0].Tag`).
    pub name: String,
    pub indexes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    segments: Vec<Segment>,
}

impl PropertyPath {
    /// Parse a path. Returns `None` for empty or malformed input.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let segments = text
            .split('.')
            .map(parse_segment)
            .collect::<Option<Vec<_>>>()?;
        Some(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn resolve(&self, root: &Value) -> Option<Value> {
        let mut current = root.clone();
        for segment in &self.segments {
            if !segment.name.is_empty() {
                current = member(&current, &segment.name)?;
            }
            for &idx in &segment.indexes {
                current = current.index(idx)?;
            }
        }
        Some(current)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&seg.name)?;
            for idx in &seg.indexes {
                write!(f, "[{idx}]")?;
            }
        }
        Ok(())
    }
}

fn parse_segment(raw: &str) -> Option<Segment> {
    let raw = raw.trim();
    let (name, mut rest) = match raw.find('[') {
        Some(pos) => (&raw[..pos], &raw[pos..]),
        None => (raw, ""),
    };
    let name = name.trim();
    let mut indexes = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let idx: usize = inner[..close].trim().parse().ok()?;
        indexes.push(idx);
        rest = inner[close + 1..].trim_start();
    }
    if name.is_empty() && indexes.is_empty() {
        return None;
    }
    Some(Segment {
        name: name.to_string(),
        indexes,
    })
}

/// Read one named member off a value.
pub fn member(value: &Value, name: &str) -> Option<Value> {
    match value {
        Value::Map(entries) => {
            if let Some(v) = entries.get(name) {
                return Some(v.clone());
            }
            let key = member_key(name);
            entries
                .iter()
                .find(|(k, _)| member_key(k) == key)
                .map(|(_, v)| v.clone())
        }
        Value::Record(record) => accessor_cache().get(record.as_ref(), name),
        _ => None,
    }
}

/// Resolve `path` against `root`, returning `None` when any step misses.
pub fn resolve(root: &Value, path: &str) -> Option<Value> {
    PropertyPath::parse(path)?.resolve(root)
}

/// Resolve `path` against `root` and render it as text; misses render as empty text.
pub fn evaluate(root: &Value, path: &str) -> String {
    resolve(root, path).map(|v| v.to_text()).unwrap_or_default()
}
