//! Entry points: RGB to CMYK color conversion and image replacement.
//!
//! Each call owns one parsed document from load to serialization. Only a
//! document that cannot be parsed or written back is an error; anything
//! else (odd structure, undecodable streams, unloadable image files) is
//! logged and skipped.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use crate::color::{ColorTable, ContentRewriter};
use crate::error::Result;
use crate::models::config::ImageReplacement;
use crate::pdf::{PressDocument, WalkItem, WalkMode, walk};
use crate::raster::{DecodedImage, ImagePair, images_equal, positive_int};

/// Rewrites `rg`/`RG` operators to `k`/`K` using a color table.
pub struct CmykConverter<'t> {
    table: &'t ColorTable,
    warn_unmapped: bool,
    compress: bool,
}

impl<'t> CmykConverter<'t> {
    pub fn new(table: &'t ColorTable) -> Self {
        Self {
            table,
            warn_unmapped: false,
            compress: true,
        }
    }

    /// Log one warning per distinct color missing from the table.
    pub fn with_warn_unmapped(mut self, warn: bool) -> Self {
        self.warn_unmapped = warn;
        self
    }

    /// Compress unfiltered streams when saving.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Convert every page content stream, Form XObject and annotation
    /// appearance stream of `pdf`, returning a new document.
    pub fn convert(&self, pdf: &[u8]) -> Result<Vec<u8>> {
        let mut doc = PressDocument::load(pdf)?;
        let plan = walk(doc.document(), WalkMode::Colors);
        let mut rewriter =
            ContentRewriter::new(self.table).with_warn_unmapped(self.warn_unmapped);

        let (mut rewritten, mut converted) = (0usize, 0usize);
        for item in &plan {
            let WalkItem::Content(unit) = item else {
                continue;
            };
            let parts = match unit
                .parts
                .iter()
                .map(|id| doc.stream_content(*id))
                .collect::<std::result::Result<Vec<_>, _>>()
            {
                Ok(parts) => parts,
                Err(e) => {
                    warn!("Skipping {:?} stream: {}", unit.kind, e);
                    continue;
                }
            };
            let outcome = rewriter.rewrite_parts(&parts);
            if !outcome.changed() {
                continue;
            }
            trace!(
                "{:?} {:?}: {} operators converted",
                unit.kind, unit.parts, outcome.converted
            );
            converted += outcome.converted;
            for ((id, old), new) in unit.parts.iter().zip(&parts).zip(outcome.content) {
                if *old == new {
                    continue;
                }
                match doc.set_stream_content(*id, new) {
                    Ok(()) => rewritten += 1,
                    Err(e) => warn!("Could not write {:?} stream: {}", unit.kind, e),
                }
            }
        }

        debug!(
            "Converted {} color operators, rewrote {} streams of {} content units ({} unmapped colors)",
            converted,
            rewritten,
            plan.len(),
            rewriter.unmapped().len()
        );
        Ok(doc.into_bytes(self.compress)?)
    }
}

/// Convert device RGB colors in `pdf` to CMYK with `table`.
///
/// Colors missing from the table are kept as RGB.
pub fn convert_cmyk_colors(
    pdf: &[u8],
    table: &ColorTable,
    warn_unmapped: bool,
) -> Result<Vec<u8>> {
    CmykConverter::new(table)
        .with_warn_unmapped(warn_unmapped)
        .convert(pdf)
}

/// Replaces embedded images that are pixel-identical to a source image.
pub struct ImageReplacer {
    pairs: Vec<ImagePair>,
    compress: bool,
}

impl ImageReplacer {
    /// Use already loaded pairs. Earlier pairs take precedence.
    pub fn new(pairs: Vec<ImagePair>) -> Self {
        Self {
            pairs,
            compress: true,
        }
    }

    /// Load configured pairs, skipping (with a warning) any pair whose
    /// source or replacement cannot be read or decoded.
    pub fn load(config: &[ImageReplacement]) -> Self {
        let pairs = config
            .iter()
            .filter_map(|entry| match ImagePair::load(entry) {
                Ok(pair) => Some(pair),
                Err(e) => {
                    warn!(
                        "Skipping image replacement {} -> {}: {}",
                        entry.source.display(),
                        entry.replacement.display(),
                        e
                    );
                    None
                }
            })
            .collect();
        Self::new(pairs)
    }

    /// Compress unfiltered streams when saving.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Number of usable pairs.
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Replace matching images in `pdf`.
    ///
    /// With no usable pairs the input is returned as is, borrowed.
    pub fn replace<'a>(&self, pdf: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        if self.pairs.is_empty() {
            debug!("No image pairs loaded, leaving PDF untouched");
            return Ok(Cow::Borrowed(pdf));
        }

        let mut doc = PressDocument::load(pdf)?;
        let slots: Vec<_> = walk(doc.document(), WalkMode::Images)
            .into_iter()
            .filter_map(|item| match item {
                WalkItem::Image(slot) => Some(slot),
                WalkItem::Content(_) => None,
            })
            .collect();

        // One decision per image object, however many slots point at it.
        let mut matches: HashMap<ObjectId, Option<usize>> = HashMap::new();
        for slot in &slots {
            if !matches.contains_key(&slot.image) {
                let found = self.match_image(doc.document(), slot.image);
                matches.insert(slot.image, found);
            }
        }

        let mut embedded: HashMap<usize, Option<ObjectId>> = HashMap::new();
        let mut replaced = HashSet::new();
        for slot in &slots {
            let Some(pair_index) = matches[&slot.image] else {
                continue;
            };
            let target = *embedded.entry(pair_index).or_insert_with(|| {
                let pair = &self.pairs[pair_index];
                match pair.replacement.embed(&mut doc) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        warn!(
                            "Could not embed replacement {}: {}",
                            pair.replacement.path().display(),
                            e
                        );
                        None
                    }
                }
            });
            let Some(target) = target else {
                continue;
            };
            match doc.dictionary_at_mut(slot.owner, &slot.path) {
                Some(xobjects) => {
                    xobjects.set(slot.name.clone(), Object::Reference(target));
                    replaced.insert(slot.image);
                }
                None => trace!("XObject dictionary for {:?} not found", slot.image),
            }
        }

        debug!("Replaced {} of {} images", replaced.len(), matches.len());
        Ok(Cow::Owned(doc.into_bytes(self.compress)?))
    }

    /// Index of the first pair whose source is pixel-identical to `image`.
    fn match_image(&self, doc: &Document, image: ObjectId) -> Option<usize> {
        let stream = doc.get_object(image).and_then(Object::as_stream).ok()?;
        let width = positive_int(stream.dict.get(b"Width").ok())?;
        let height = positive_int(stream.dict.get(b"Height").ok())?;
        if !self
            .pairs
            .iter()
            .any(|p| p.source.width == width && p.source.height == height)
        {
            trace!("Image {:?} ({}x{}) matches no source size", image, width, height);
            return None;
        }

        let decoded = match DecodedImage::from_xobject(doc, stream) {
            Ok(decoded) => decoded,
            Err(e) => {
                trace!("Image {:?} not comparable: {}", image, e);
                return None;
            }
        };
        let found = self
            .pairs
            .iter()
            .position(|pair| images_equal(&pair.source, &decoded));
        if let Some(index) = found {
            debug!(
                "Image {:?} matches {}",
                image,
                self.pairs[index].source_path.display()
            );
        }
        found
    }
}

/// Replace embedded images that are pixel-identical to a configured source
/// image. Returns `pdf` itself when no pair could be loaded.
pub fn replace_images<'a>(
    pdf: &'a [u8],
    config: &[ImageReplacement],
) -> Result<Cow<'a, [u8]>> {
    ImageReplacer::load(config).replace(pdf)
}
