//! Source/replacement image pairs and replacement embedding.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, ImageReader};
use lopdf::{Object, ObjectId, Stream, dictionary};
use tracing::{debug, trace};

use super::DecodedImage;
use crate::error::ImageError;
use crate::models::config::ImageReplacement;
use crate::pdf::PressDocument;

/// A loaded source image and the replacement that takes its place.
#[derive(Debug)]
pub struct ImagePair {
    /// Decoded pixels identifying the image to replace.
    pub source: DecodedImage,
    /// Replacement file contents, decoded only when embedded.
    pub replacement: ReplacementImage,
    pub source_path: PathBuf,
}

impl ImagePair {
    /// Read and decode both files of a configured pair.
    pub fn load(config: &ImageReplacement) -> Result<Self, ImageError> {
        let source_bytes = read(&config.source)?;
        let source = DecodedImage::from_file_bytes(&source_bytes, &config.source)?;
        let replacement = ReplacementImage::load(&config.replacement)?;
        debug!(
            "Loaded image pair {} ({}x{}) -> {}",
            config.source.display(),
            source.width,
            source.height,
            config.replacement.display()
        );
        Ok(Self {
            source,
            replacement,
            source_path: config.source.clone(),
        })
    }
}

/// Replacement image bytes, validated but not yet decoded.
#[derive(Debug)]
pub struct ReplacementImage {
    bytes: Vec<u8>,
    format: ImageFormat,
    path: PathBuf,
}

impl ReplacementImage {
    /// Read the file and check that its header decodes.
    pub fn load(path: &Path) -> Result<Self, ImageError> {
        let bytes = read(path)?;
        let decode_err = |reason: String| ImageError::Decode {
            path: path.to_path_buf(),
            reason,
        };
        let reader = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| decode_err(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| decode_err("unknown image format".to_string()))?;
        reader
            .into_dimensions()
            .map_err(|e| decode_err(e.to_string()))?;
        Ok(Self {
            bytes,
            format,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add the image to `doc` as a new Image XObject.
    ///
    /// Baseline JPEG data is embedded as is with `DCTDecode`. Anything else
    /// is decoded to 8-bit gray or RGB samples, with alpha moved to an
    /// `/SMask`.
    pub fn embed(&self, doc: &mut PressDocument) -> Result<ObjectId, ImageError> {
        if self.format == ImageFormat::Jpeg {
            if let Some(header) = JpegHeader::parse(&self.bytes) {
                trace!("Embedding {} as DCTDecode", self.path.display());
                return Ok(doc.add_object(header.stream(self.bytes.clone())));
            }
        }

        let image = image::load_from_memory_with_format(&self.bytes, self.format).map_err(
            |e| ImageError::Decode {
                path: self.path.clone(),
                reason: e.to_string(),
            },
        )?;
        trace!("Embedding {} as raw samples", self.path.display());
        Ok(embed_samples(doc, &image))
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ImageError> {
    std::fs::read(path).map_err(|source| ImageError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn embed_samples(doc: &mut PressDocument, image: &DynamicImage) -> ObjectId {
    let (width, height) = (image.width() as i64, image.height() as i64);
    let color = image.color();

    let smask = color.has_alpha().then(|| {
        let alpha: Vec<u8> = image.to_luma_alpha8().pixels().map(|p| p.0[1]).collect();
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ))
    });

    let (color_space, samples) = if color.has_color() {
        ("DeviceRGB", image.to_rgb8().into_raw())
    } else {
        ("DeviceGray", image.to_luma8().into_raw())
    };
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    };
    if let Some(smask) = smask {
        dict.set("SMask", smask);
    }
    doc.add_object(Stream::new(dict, samples))
}

/// Frame header fields of a JPEG file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    width: u16,
    height: u16,
    components: u8,
    precision: u8,
    /// Adobe APP14 marker present; CMYK data is then stored inverted.
    adobe: bool,
}

impl JpegHeader {
    /// Walk the marker segments up to the first start-of-frame.
    fn parse(bytes: &[u8]) -> Option<Self> {
        if !bytes.starts_with(&[0xFF, 0xD8]) {
            return None;
        }
        let mut pos = 2;
        let mut adobe = false;
        while pos + 4 <= bytes.len() {
            if bytes[pos] != 0xFF {
                return None;
            }
            let marker = bytes[pos + 1];
            if marker == 0xFF {
                pos += 1;
                continue;
            }
            let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
            let segment = bytes.get(pos + 4..pos + 2 + len)?;
            match marker {
                0xEE if segment.starts_with(b"Adobe") => adobe = true,
                0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                    if segment.len() < 6 {
                        return None;
                    }
                    return Some(Self {
                        precision: segment[0],
                        height: u16::from_be_bytes([segment[1], segment[2]]),
                        width: u16::from_be_bytes([segment[3], segment[4]]),
                        components: segment[5],
                        adobe,
                    })
                    .filter(|h| h.width > 0 && h.height > 0 && h.color_space().is_some());
                }
                0xDA | 0xD9 => return None,
                _ => {}
            }
            pos += 2 + len;
        }
        None
    }

    fn color_space(&self) -> Option<&'static str> {
        match self.components {
            1 => Some("DeviceGray"),
            3 => Some("DeviceRGB"),
            4 => Some("DeviceCMYK"),
            _ => None,
        }
    }

    fn stream(&self, data: Vec<u8>) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => self.color_space().unwrap_or("DeviceRGB"),
            "BitsPerComponent" => self.precision as i64,
            "Filter" => "DCTDecode",
        };
        if self.components == 4 && self.adobe {
            dict.set(
                "Decode",
                Object::Array([1, 0, 1, 0, 1, 0, 1, 0].into_iter().map(Object::Integer).collect()),
            );
        }
        Stream::new(dict, data)
    }
}
