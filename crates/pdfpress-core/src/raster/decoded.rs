//! Decoded raster images and pixel-exact comparison.

use std::path::Path;

use image::DynamicImage;
use lopdf::{Document, Object, Stream};
use tracing::trace;

use crate::error::ImageError;
use crate::pdf::decoded_content;

/// Color space family of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFamily {
    Gray,
    Rgb,
    Cmyk,
}

impl ColorFamily {
    /// Number of color components per pixel.
    pub fn components(self) -> u32 {
        match self {
            ColorFamily::Gray => 1,
            ColorFamily::Rgb => 3,
            ColorFamily::Cmyk => 4,
        }
    }
}

/// Raw samples of an image, as stored in a PDF image XObject: rows packed
/// to whole bytes, 16-bit samples big-endian, no alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub family: ColorFamily,
    pub bits_per_component: u8,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Byte length of the sample data for the given layout, or `None` if
    /// it does not fit in memory.
    fn expected_len(width: u32, height: u32, family: ColorFamily, bits: u8) -> Option<usize> {
        let row_bits = (width as usize)
            .checked_mul(family.components() as usize)?
            .checked_mul(bits as usize)?;
        row_bits.div_ceil(8).checked_mul(height as usize)
    }

    /// Convert an image decoded by the `image` crate. Alpha is dropped.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let (family, bits_per_component, pixels) = match image {
            DynamicImage::ImageLuma8(buf) => (ColorFamily::Gray, 8, buf.as_raw().clone()),
            DynamicImage::ImageLumaA8(_) => (ColorFamily::Gray, 8, image.to_luma8().into_raw()),
            DynamicImage::ImageRgb8(buf) => (ColorFamily::Rgb, 8, buf.as_raw().clone()),
            DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => (
                ColorFamily::Gray,
                16,
                big_endian(image.to_luma16().as_raw()),
            ),
            DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgba16(_) => (
                ColorFamily::Rgb,
                16,
                big_endian(image.to_rgb16().as_raw()),
            ),
            _ => (ColorFamily::Rgb, 8, image.to_rgb8().into_raw()),
        };
        Self {
            width,
            height,
            family,
            bits_per_component,
            pixels,
        }
    }

    /// Decode an image file's bytes.
    pub fn from_file_bytes(bytes: &[u8], path: &Path) -> Result<Self, ImageError> {
        let image = image::load_from_memory(bytes).map_err(|e| ImageError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_dynamic(&image))
    }

    /// Decode an Image XObject stream.
    ///
    /// JPEG (`DCTDecode`) data goes through the `image` crate; other data is
    /// unfiltered by the document library and read as raw samples. Image
    /// masks, indexed and separation spaces are not supported.
    pub fn from_xobject(doc: &Document, stream: &Stream) -> Result<Self, ImageError> {
        let dict = &stream.dict;
        let width = positive_int(dict.get(b"Width").ok())
            .ok_or_else(|| ImageError::Unsupported("missing /Width".to_string()))?;
        let height = positive_int(dict.get(b"Height").ok())
            .ok_or_else(|| ImageError::Unsupported("missing /Height".to_string()))?;

        if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
            return Err(ImageError::Unsupported("image mask".to_string()));
        }

        let filters: Vec<&[u8]> = match dict.get(b"Filter") {
            Ok(Object::Name(name)) => vec![name.as_slice()],
            Ok(Object::Array(arr)) => arr.iter().filter_map(|o| o.as_name().ok()).collect(),
            _ => Vec::new(),
        };

        match filters.as_slice() {
            [b"DCTDecode"] => {
                trace!("Decoding JPEG image XObject {}x{}", width, height);
                let image = image::load_from_memory_with_format(
                    &stream.content,
                    image::ImageFormat::Jpeg,
                )
                .map_err(|e| ImageError::Unsupported(format!("JPEG: {}", e)))?;
                return Ok(Self::from_dynamic(&image));
            }
            f if f.iter().any(|n| is_image_codec(n)) => {
                return Err(ImageError::Unsupported(format!(
                    "filter {:?}",
                    f.iter().map(|n| String::from_utf8_lossy(n)).collect::<Vec<_>>()
                )));
            }
            _ => {}
        }

        let family = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|cs| color_family(doc, cs))
            .ok_or_else(|| ImageError::Unsupported("color space".to_string()))?;
        let bits = positive_int(dict.get(b"BitsPerComponent").ok()).unwrap_or(8);
        if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
            return Err(ImageError::Unsupported(format!("{} bits per component", bits)));
        }
        let bits = bits as u8;

        let mut pixels = decoded_content(stream).map_err(ImageError::Unsupported)?;
        let expected = Self::expected_len(width, height, family, bits).ok_or_else(|| {
            ImageError::Unsupported(format!("image too large: {}x{}", width, height))
        })?;
        if pixels.len() < expected {
            return Err(ImageError::Unsupported(format!(
                "sample data too short: {} < {}",
                pixels.len(),
                expected
            )));
        }
        pixels.truncate(expected);

        Ok(Self {
            width,
            height,
            family,
            bits_per_component: bits,
            pixels,
        })
    }
}

/// True when two images have the same dimensions, color family, depth and
/// samples. Different families never match; no conversion is attempted.
pub fn images_equal(a: &DecodedImage, b: &DecodedImage) -> bool {
    if a.width != b.width || a.height != b.height {
        return false;
    }
    if a.family != b.family || a.bits_per_component != b.bits_per_component {
        return false;
    }
    a.pixels == b.pixels
}

fn is_image_codec(filter: &[u8]) -> bool {
    matches!(
        filter,
        b"DCTDecode" | b"JPXDecode" | b"CCITTFaxDecode" | b"JBIG2Decode"
    )
}

pub(crate) fn positive_int(object: Option<&Object>) -> Option<u32> {
    match object? {
        Object::Integer(i) if *i > 0 && *i <= u32::MAX as i64 => Some(*i as u32),
        Object::Real(f) if *f > 0.0 => Some(*f as u32),
        _ => None,
    }
}

fn big_endian(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_be_bytes()).collect()
}

/// Resolve a `/ColorSpace` value to a family.
fn color_family(doc: &Document, cs: &Object) -> Option<ColorFamily> {
    let (_, cs) = doc.dereference(cs).ok()?;
    match cs {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => Some(ColorFamily::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(ColorFamily::Rgb),
            b"DeviceCMYK" | b"CMYK" => Some(ColorFamily::Cmyk),
            _ => None,
        },
        Object::Array(arr) => match arr.first()?.as_name().ok()? {
            b"CalGray" => Some(ColorFamily::Gray),
            b"CalRGB" => Some(ColorFamily::Rgb),
            b"ICCBased" => {
                let (_, profile) = doc.dereference(arr.get(1)?).ok()?;
                match profile.as_stream().ok()?.dict.get(b"N").ok()?.as_i64().ok()? {
                    1 => Some(ColorFamily::Gray),
                    3 => Some(ColorFamily::Rgb),
                    4 => Some(ColorFamily::Cmyk),
                    _ => None,
                }
            }
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, RgbImage, Rgba, RgbaImage};
    use lopdf::dictionary;
    use pretty_assertions::assert_eq;

    fn rgb(width: u32, height: u32, pixels: &[u8]) -> DecodedImage {
        DecodedImage {
            width,
            height,
            family: ColorFamily::Rgb,
            bits_per_component: 8,
            pixels: pixels.to_vec(),
        }
    }

    #[test]
    fn test_identical_images_match() {
        let a = rgb(2, 1, &[1, 2, 3, 4, 5, 6]);
        assert!(images_equal(&a, &a.clone()));
    }

    #[test]
    fn test_one_pixel_difference() {
        let a = rgb(2, 1, &[1, 2, 3, 4, 5, 6]);
        let b = rgb(2, 1, &[1, 2, 3, 4, 5, 7]);
        assert!(!images_equal(&a, &b));
    }

    #[test]
    fn test_dimension_mismatch_short_circuits() {
        let a = rgb(2, 1, &[1, 2, 3, 4, 5, 6]);
        let b = rgb(1, 2, &[1, 2, 3, 4, 5, 6]);
        assert!(!images_equal(&a, &b));
    }

    #[test]
    fn test_family_mismatch() {
        let a = DecodedImage {
            width: 1,
            height: 1,
            family: ColorFamily::Cmyk,
            bits_per_component: 8,
            pixels: vec![0, 0, 0],
        };
        let b = rgb(1, 1, &[0, 0, 0]);
        assert!(!images_equal(&a, &b));
    }

    #[test]
    fn test_bit_depth_mismatch() {
        let mut a = rgb(1, 1, &[0, 0, 0]);
        let b = a.clone();
        a.bits_per_component = 16;
        assert!(!images_equal(&a, &b));
    }

    #[test]
    fn test_from_dynamic_drops_alpha() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([10, 20, 30, 40]));
        let decoded = DecodedImage::from_dynamic(&DynamicImage::ImageRgba8(img));
        assert_eq!(decoded.family, ColorFamily::Rgb);
        assert_eq!(decoded.pixels, vec![10, 20, 30]);
    }

    #[test]
    fn test_from_dynamic_gray() {
        let img = GrayImage::from_raw(2, 1, vec![7, 9]).unwrap();
        let decoded = DecodedImage::from_dynamic(&DynamicImage::ImageLuma8(img));
        assert_eq!(decoded.family, ColorFamily::Gray);
        assert_eq!(decoded.bits_per_component, 8);
        assert_eq!(decoded.pixels, vec![7, 9]);
    }

    #[test]
    fn test_from_xobject_raw_rgb() {
        let doc = Document::with_version("1.7");
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            vec![1, 2, 3, 0],
        );
        let decoded = DecodedImage::from_xobject(&doc, &stream).unwrap();
        assert_eq!(decoded, rgb(1, 1, &[1, 2, 3]));
    }

    #[test]
    fn test_from_xobject_huge_dimensions() {
        let doc = Document::with_version("1.7");
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 4_000_000_000i64,
                "Height" => 4_000_000_000i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 16,
            },
            vec![0; 6],
        );
        let err = DecodedImage::from_xobject(&doc, &stream).unwrap_err();
        assert!(matches!(err, ImageError::Unsupported(_)));
    }

    #[test]
    fn test_positive_int_accepts_reals() {
        assert_eq!(positive_int(Some(&Object::Real(2.0))), Some(2));
        assert_eq!(positive_int(Some(&Object::Integer(0))), None);
        assert_eq!(positive_int(None), None);
    }

    #[test]
    fn test_from_xobject_icc_based() {
        let mut doc = Document::with_version("1.7");
        let profile = doc.add_object(Stream::new(dictionary! { "N" => 4 }, vec![]));
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => vec!["ICCBased".into(), profile.into()],
                "BitsPerComponent" => 8,
            },
            vec![1, 2, 3, 4],
        );
        let decoded = DecodedImage::from_xobject(&doc, &stream).unwrap();
        assert_eq!(decoded.family, ColorFamily::Cmyk);
    }

    #[test]
    fn test_from_xobject_matches_file() {
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(1, 1, Rgb([255, 0, 0]));
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(img.clone())
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let doc = Document::with_version("1.7");
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            img.into_raw(),
        );
        let from_pdf = DecodedImage::from_xobject(&doc, &stream).unwrap();
        let from_file = DecodedImage::from_file_bytes(&png, Path::new("a.png")).unwrap();
        assert!(images_equal(&from_pdf, &from_file));
    }

    #[test]
    fn test_unsupported_xobjects() {
        let doc = Document::with_version("1.7");
        let indexed = Stream::new(
            dictionary! {
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => vec!["Indexed".into(), "DeviceRGB".into(), 0.into()],
            },
            vec![0],
        );
        assert!(DecodedImage::from_xobject(&doc, &indexed).is_err());

        let jpx = Stream::new(
            dictionary! { "Width" => 1, "Height" => 1, "Filter" => "JPXDecode" },
            vec![0],
        );
        assert!(DecodedImage::from_xobject(&doc, &jpx).is_err());

        let short = Stream::new(
            dictionary! { "Width" => 4, "Height" => 4, "ColorSpace" => "DeviceGray" },
            vec![0],
        );
        assert!(DecodedImage::from_xobject(&doc, &short).is_err());
    }
}
