//! Table evaluation: turns [`TableDefinition`](tablefill_spec::TableDefinition)s and a
//! dataset into value matrices with styles, then hands them to a [`TableRenderer`].

#![forbid(unsafe_code)]

mod engine;
mod error;
pub mod merge;
mod populate;
mod result;
pub mod rows;
mod sort;
mod styles;

pub use engine::{EngineOptions, TableEngine};
pub use error::EvalError;
pub use merge::{compute_merge_flags, MergeFlag};
pub use populate::{
    populate, PopulateOptions, RenderOutcome, RunSummary, TableRenderer, TableReport, TableStatus,
};
pub use result::{EvaluationResult, SourceObject};
pub use sort::sort_result;
