//! Configuration structures for the post-processing passes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::color::{Cmyk, ColorTable, RgbKey};
use crate::error::PressError;

/// Main configuration for a pdfpress run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PressConfig {
    /// RGB to CMYK conversion configuration.
    pub color: ColorConfig,

    /// Image replacement configuration.
    pub images: ImageConfig,

    /// Serialization configuration.
    pub output: OutputConfig,
}

/// Color conversion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Explicit RGB to CMYK mappings, in registration order.
    pub table: Vec<ColorMapping>,

    /// Log each distinct RGB color that has no mapping.
    pub warn_unmapped: bool,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            table: Vec::new(),
            warn_unmapped: true,
        }
    }
}

impl ColorConfig {
    /// Build the lookup table. A later mapping for the same key wins.
    pub fn table(&self) -> ColorTable {
        self.table
            .iter()
            .map(|m| (RgbKey::from(m.rgb), Cmyk::from(m.cmyk)))
            .collect()
    }
}

/// One table entry. Components are on the 0-10000 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorMapping {
    /// Source color (r, g, b).
    pub rgb: [u16; 3],

    /// Target color (c, m, y, k).
    pub cmyk: [u16; 4],
}

/// Image replacement configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Source/replacement pairs. The first matching pair wins.
    pub replacements: Vec<ImageReplacement>,
}

/// A source image to look for and the image that takes its place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReplacement {
    /// Image file whose pixels identify the embedded image.
    pub source: PathBuf,

    /// Image file embedded in its place.
    pub replacement: PathBuf,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Flate-compress unfiltered streams when saving.
    pub compress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { compress: true }
    }
}

impl PressConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| PressError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
