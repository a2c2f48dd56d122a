//! Column expressions, number formatting and record filtering for tablefill.
//!
//! Everything here follows one of two failure policies. Column content (expressions,
//! templates, number formats) degrades to empty text or zero, because one bad record must
//! not block a report. Filter logic reports malformed input as a [`LogicError`].

#![forbid(unsafe_code)]

mod error;
pub mod expression;
pub mod filter;
pub mod logic;
mod number_format;
mod numeric;
mod placeholders;
pub mod predicate;
mod template;

pub use error::{CompileError, LogicError, RenderError};
pub use expression::{
    clear_expression_cache, compile, compile_cached, expression_cache, CompiledExpression,
    ExpressionCache,
};
pub use filter::{FilterGroup, FilterSet, GroupLogic};
pub use logic::LogicExpression;
pub use number_format::{format_number, DEFAULT_NUMBER_FORMAT};
pub use numeric::parse_leading_number;
pub use placeholders::{split_placeholders, Piece};
pub use predicate::{FieldPredicate, Operator};
pub use template::FormatTemplate;
