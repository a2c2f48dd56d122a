use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::value::Value;

/// Capability-based member access for strongly typed dataset records.
///
/// A type lists its readable members once (in a fixed order) and hands out a member by
/// position. Name resolution goes through the process-wide [`AccessorCache`], so each
/// type's name table is built once no matter how many records are rendered.
///
/// Most implementations come from the [`record!`](crate::record!) macro.
pub trait Record: Send + Sync + fmt::Debug + 'static {
    /// Identity of the concrete type; keys the accessor cache.
    fn type_key(&self) -> TypeId;

    /// Readable member names, in declaration order.
    fn member_names(&self) -> &'static [&'static str];

    /// Member value by position in [`Record::member_names`]. Out-of-range positions
    /// yield [`Value::Empty`].
    fn member(&self, index: usize) -> Value;
}

impl<R: Record> From<Arc<R>> for Value {
    fn from(value: Arc<R>) -> Self {
        Value::Record(value)
    }
}

/// Implement [`Record`] for a struct by listing the fields that paths may read.
///
/// ```
/// use tablefill_model::{record, Value};
///
/// #[derive(Debug, Clone)]
/// struct Bus {
///     name: String,
///     voltage_kv: f64,
/// }
///
/// record!(Bus { name, voltage_kv });
///
/// let bus = Value::record(Bus { name: "SWGR-1".into(), voltage_kv: 13.8 });
/// assert_eq!(tablefill_model::evaluate(&bus, "VoltageKv"), "13.8");
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn type_key(&self) -> ::std::any::TypeId {
                ::std::any::TypeId::of::<$ty>()
            }

            fn member_names(&self) -> &'static [&'static str] {
                &[$(stringify!($field)),*]
            }

            #[allow(unused_assignments)]
            fn member(&self, index: usize) -> $crate::Value {
                let mut position = 0usize;
                $(
                    if index == position {
                        return $crate::Value::from(::std::clone::Clone::clone(&self.$field));
                    }
                    position += 1;
                )*
                $crate::Value::Empty
            }
        }
    };
}

/// Normalize a member name for lookup: ASCII case-folded with `_` removed, so `VoltageKv`,
/// `voltagekv` and `voltage_kv` all address the same member.
pub fn member_key(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Name table for one record type.
#[derive(Debug, Default)]
pub struct MemberIndex {
    by_key: HashMap<String, usize>,
}

impl MemberIndex {
    fn build(names: &[&str]) -> Self {
        let mut by_key = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            // First declaration wins when two members normalize to the same key.
            by_key.entry(member_key(name)).or_insert(idx);
        }
        Self { by_key }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_key.get(&member_key(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Append-only cache of per-type member name tables.
///
/// Safe to share between concurrent population runs; entries are keyed by immutable
/// type identity and never invalidated (except by [`AccessorCache::clear`] in tests).
#[derive(Default)]
pub struct AccessorCache {
    types: DashMap<TypeId, Arc<MemberIndex>>,
}

impl AccessorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of record types with a cached name table.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn clear(&self) {
        self.types.clear();
    }

    pub fn member_index(&self, record: &dyn Record) -> Arc<MemberIndex> {
        let key = record.type_key();
        if let Some(existing) = self.types.get(&key) {
            return existing.clone();
        }
        self.types
            .entry(key)
            .or_insert_with(|| Arc::new(MemberIndex::build(record.member_names())))
            .clone()
    }

    /// Resolve a member by (case-insensitive) name.
    pub fn get(&self, record: &dyn Record, name: &str) -> Option<Value> {
        let index = self.member_index(record);
        index.position(name).map(|pos| record.member(pos))
    }
}

static ACCESSORS: OnceLock<AccessorCache> = OnceLock::new();

/// The process-wide accessor cache used by property-path evaluation.
pub fn accessor_cache() -> &'static AccessorCache {
    ACCESSORS.get_or_init(AccessorCache::new)
}

/// Drop every cached name table. Intended for test isolation.
pub fn clear_accessor_cache() {
    accessor_cache().clear();
}
