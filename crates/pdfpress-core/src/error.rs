//! Error types for the pdfpress-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the pdfpress library.
#[derive(Error, Debug)]
pub enum PressError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Image loading or embedding error.
    #[error("image error: {0}")]
    Image(#[from] ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to reading and writing the PDF document.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF bytes.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// Failed to write the mutated document back to bytes.
    #[error("failed to serialize PDF: {0}")]
    Serialize(String),

    /// A stream could not be decoded with its declared filters.
    #[error("failed to decode stream {id:?}: {reason}")]
    StreamDecode { id: (u32, u16), reason: String },
}

/// Errors related to source and replacement images.
#[derive(Error, Debug)]
pub enum ImageError {
    /// The image file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image bytes could not be decoded.
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// The image uses a layout this engine cannot compare or embed.
    #[error("unsupported image: {0}")]
    Unsupported(String),
}

/// Result type for the pdfpress library.
pub type Result<T> = std::result::Result<T, PressError>;
