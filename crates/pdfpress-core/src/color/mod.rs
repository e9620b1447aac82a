//! Explicit RGB to CMYK color table.
//!
//! Colors are keyed on a fixed integer scale so that `0.2` written by one
//! renderer and `0.20000001` written by another land on the same entry.
//! There is no interpolation: a color is either tabulated or left alone.

mod rewriter;

pub use rewriter::{ContentRewriter, RewriteOutcome, UnmappedColors};

use std::collections::HashMap;
use std::fmt;

/// Integer units per 1.0 of a color component.
pub const SCALE: u32 = 10_000;

/// Normalize one operand to the integer scale.
pub fn normalize(value: f64) -> i32 {
    (value * SCALE as f64).round() as i32
}

/// A device RGB color on the integer scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RgbKey {
    pub r: i32,
    pub g: i32,
    pub b: i32,
}

impl RgbKey {
    /// Build a key from `rg`/`RG` operands in the 0.0-1.0 range.
    pub fn from_components(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: normalize(r),
            g: normalize(g),
            b: normalize(b),
        }
    }
}

impl From<[u16; 3]> for RgbKey {
    fn from([r, g, b]: [u16; 3]) -> Self {
        Self {
            r: r as i32,
            g: g as i32,
            b: b as i32,
        }
    }
}

impl fmt::Display for RgbKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgb({}, {}, {})",
            format_component(self.r),
            format_component(self.g),
            format_component(self.b)
        )
    }
}

/// A CMYK color on the integer scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cmyk {
    pub c: u16,
    pub m: u16,
    pub y: u16,
    pub k: u16,
}

impl Cmyk {
    /// Operand text for a `k`/`K` operator, e.g. `0.25 0 1 0.5`.
    pub fn operands(&self) -> String {
        [self.c, self.m, self.y, self.k]
            .iter()
            .map(|&v| format_component(v as i32))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<[u16; 4]> for Cmyk {
    fn from([c, m, y, k]: [u16; 4]) -> Self {
        Self { c, m, y, k }
    }
}

/// Render a scaled component as a PDF real with no trailing zeros.
pub fn format_component(value: i32) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let whole = abs / SCALE;
    let frac = abs % SCALE;
    if frac == 0 {
        return format!("{}{}", sign, whole);
    }
    let digits = format!("{:04}", frac);
    format!("{}{}.{}", sign, whole, digits.trim_end_matches('0'))
}

/// Immutable lookup from normalized RGB to CMYK.
///
/// An empty table is valid; the rewriter then passes every color through.
#[derive(Debug, Clone, Default)]
pub struct ColorTable {
    entries: HashMap<RgbKey, Cmyk>,
}

impl ColorTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the CMYK target for a color.
    pub fn lookup(&self, key: RgbKey) -> Option<Cmyk> {
        self.entries.get(&key).copied()
    }

    /// Number of distinct source colors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no colors are tabulated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(RgbKey, Cmyk)> for ColorTable {
    fn from_iter<I: IntoIterator<Item = (RgbKey, Cmyk)>>(iter: I) -> Self {
        let mut entries = HashMap::new();
        for (key, value) in iter {
            entries.insert(key, value);
        }
        Self { entries }
    }
}
