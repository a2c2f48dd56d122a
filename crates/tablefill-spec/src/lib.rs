//! Table specifications: the JSON format, its loader and the in-memory definitions the engine
//! evaluates.

#![forbid(unsafe_code)]

mod checksum;
mod column;
mod loader;
mod mappings;
mod naming;
mod raw;
mod style;
mod table;
mod widths;

pub use checksum::{checksums_match, compute_checksum};
pub use column::{ColumnContent, ColumnDefinition};
pub use loader::{load_spec, LoadOptions, LoadedSpec, SpecError, SpecLoader};
pub use mappings::PropertyMappings;
pub use naming::{is_pascal_case, pascal_case_violations};
pub use style::{
    CellStyle, Color, Condition, ConditionTarget, HorizontalAlignment, VerticalAlignment,
};
pub use table::{
    Mode, SortDirection, SortSpec, TableDefinition, TableFormatting, DEFAULT_ALTERNATE_ROW_FILL,
    DEFAULT_DIFF_FILL, DEFAULT_DIFF_MARKER, DEFAULT_EMPTY_MESSAGE, DEFAULT_FONT_NAME,
    DEFAULT_FONT_SIZE, DEFAULT_HEADER_FILL,
};
pub use widths::reconcile_widths;
