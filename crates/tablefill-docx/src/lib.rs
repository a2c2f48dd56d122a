//! DOCX output for tablefill: package I/O and in-place rendering of anchored tables.

#![forbid(unsafe_code)]

mod document;
mod error;
mod package;
mod renderer;
mod table;
mod text;
pub mod xml;

pub use document::{document_anchors, is_anchored, replace_anchored_table, table_anchors};
pub use error::DocxError;
pub use package::{
    part_names_equivalent, DocxLimits, DocxPackage, CONTENT_TYPES_PART, DEFAULT_DOCUMENT_PART,
    DEFAULT_MAX_PART_BYTES, DEFAULT_MAX_TOTAL_BYTES,
};
pub use renderer::DocxTableRenderer;
pub use table::{RenderOptions, DEFAULT_FONT_SIZE_HALF_POINTS, DEFAULT_TABLE_WIDTH_TWIPS};
pub use text::remove_duplicate_lines;
pub use xml::{XmlElement, XmlNode};
