#![forbid(unsafe_code)]

//! Data-side building blocks for tablefill.
//!
//! - [`Value`]: the dynamic value that records, members and rendered cells are built from.
//! - [`Record`]: capability-based member access for strongly typed records, backed by a
//!   process-wide [`AccessorCache`].
//! - [`path`]: dotted/indexed property-path resolution with a silent-miss policy.
//! - [`dataset`]: the read-only "new"/"old" snapshot boundary supplied by the importer.

pub mod dataset;
pub mod path;
mod record;
mod value;

pub use dataset::{CompositeKey, DatasetError, KeyedRecord, ProjectContext, Snapshot};
pub use path::{evaluate, resolve, PropertyPath};
pub use record::{
    accessor_cache, clear_accessor_cache, member_key, AccessorCache, MemberIndex, Record,
};
pub use value::Value;
