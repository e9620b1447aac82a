//! Raster image decoding, identity matching and replacement embedding.

mod decoded;
mod replacement;

pub use decoded::{ColorFamily, DecodedImage, images_equal};
pub(crate) use decoded::positive_int;
pub use replacement::{ImagePair, ReplacementImage};
