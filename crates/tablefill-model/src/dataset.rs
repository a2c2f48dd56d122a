//! Read-only dataset handed to the engine by the upstream import layer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::evaluate;
use crate::value::Value;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("collection `{0}` must be an array of records")]
    NotAnArray(String),
    #[error("snapshot `{0}` must be an object of collections")]
    NotAnObject(String),
}

/// Multi-field identity used to pair "new" and "old" records of the same entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompositeKey(pub Vec<String>);

impl CompositeKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("|"))
    }
}

#[derive(Debug, Clone)]
pub struct KeyedRecord {
    pub key: CompositeKey,
    pub record: Value,
}

impl KeyedRecord {
    pub fn new(key: CompositeKey, record: Value) -> Self {
        Self { key, record }
    }
}

/// One state of the project: named collections of keyed records, in import order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    collections: BTreeMap<String, Vec<KeyedRecord>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_collection(&mut self, name: impl Into<String>, records: Vec<KeyedRecord>) {
        self.collections.insert(name.into(), records);
    }

    pub fn push(&mut self, collection: &str, record: KeyedRecord) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record);
    }

    /// Look up a collection by name (exact match first, then ASCII case-insensitive).
    pub fn collection(&self, name: &str) -> Option<&[KeyedRecord]> {
        if let Some(records) = self.collections.get(name) {
            return Some(records);
        }
        self.collections
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Build a snapshot from a JSON object of record arrays.
    ///
    /// `key_paths` lists, per collection, the property paths forming the composite key.
    /// Collections without an entry use the record's `Id` member, or the record position
    /// when `Id` is empty.
    pub fn from_json(
        json: serde_json::Value,
        key_paths: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self, DatasetError> {
        let serde_json::Value::Object(obj) = json else {
            return Err(DatasetError::NotAnObject("snapshot".to_string()));
        };
        let mut snapshot = Snapshot::new();
        for (name, records) in obj {
            let serde_json::Value::Array(items) = records else {
                return Err(DatasetError::NotAnArray(name));
            };
            let paths = key_paths
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(&name))
                .map(|(_, v)| v.as_slice());
            let keyed = items
                .into_iter()
                .enumerate()
                .map(|(pos, item)| {
                    let record = Value::from(item);
                    let key = derive_key(&record, paths, pos);
                    KeyedRecord::new(key, record)
                })
                .collect();
            snapshot.insert_collection(name, keyed);
        }
        Ok(snapshot)
    }
}

fn derive_key(record: &Value, paths: Option<&[String]>, position: usize) -> CompositeKey {
    match paths {
        Some(paths) if !paths.is_empty() => {
            CompositeKey::new(paths.iter().map(|p| evaluate(record, p)))
        }
        _ => {
            let id = evaluate(record, "Id");
            if id.is_empty() {
                CompositeKey::new([format!("#{position}")])
            } else {
                CompositeKey::new([id])
            }
        }
    }
}

/// Dataset view for one population run: the current state plus an optional previous one.
#[derive(Debug, Clone, Default)]
pub struct ProjectContext {
    pub new: Snapshot,
    pub old: Option<Snapshot>,
}

impl ProjectContext {
    pub fn new(new: Snapshot) -> Self {
        Self { new, old: None }
    }

    pub fn with_old(mut self, old: Snapshot) -> Self {
        self.old = Some(old);
        self
    }

    /// Parse the `{ "New": {...}, "Old": {...}, "Keys": {...} }` interchange layout.
    pub fn from_json_str(text: &str) -> Result<Self, DatasetError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Layout {
            #[serde(default)]
            new: Option<serde_json::Value>,
            #[serde(default)]
            old: Option<serde_json::Value>,
            #[serde(default)]
            keys: BTreeMap<String, Vec<String>>,
        }

        let layout: Layout = serde_json::from_str(text)?;
        let new = match layout.new {
            Some(json) => Snapshot::from_json(json, &layout.keys)?,
            None => Snapshot::new(),
        };
        let old = layout
            .old
            .map(|json| Snapshot::from_json(json, &layout.keys))
            .transpose()?;
        Ok(Self { new, old })
    }
}
