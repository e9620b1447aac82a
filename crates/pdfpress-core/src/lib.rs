//! Core library for PDF press post-processing.
//!
//! This crate provides:
//! - RGB to CMYK conversion of `rg`/`RG` color operators through an explicit color table
//! - Cycle-safe traversal of page contents, Form XObjects and annotation appearances
//! - Replacement of embedded images that are pixel-identical to a given source image

pub mod color;
pub mod engine;
pub mod error;
pub mod models;
pub mod pdf;
pub mod raster;

pub use color::{Cmyk, ColorTable, RgbKey, SCALE};
pub use engine::{CmykConverter, ImageReplacer, convert_cmyk_colors, replace_images};
pub use error::{ImageError, PdfError, PressError, Result};
pub use models::config::{ColorMapping, ImageReplacement, PressConfig};
pub use pdf::{PressDocument, WalkMode};
pub use raster::{ColorFamily, DecodedImage, images_equal};
