//! PDF document access, content stream lexing and graph traversal.

mod document;
pub mod lexer;
pub mod walker;

pub use document::PressDocument;
pub(crate) use document::decoded_content;
pub use walker::{
    ContentUnit, ImageSlot, ObjectGraphWalker, UnitKind, WalkItem, WalkMode, walk,
};

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;
