//! Cycle-safe traversal of pages, resources, XObjects and annotations.
//!
//! The walker only reads the document. It produces a plan, an ordered list
//! of [`WalkItem`]s, which the caller then applies with mutable access.
//! Missing or oddly typed entries are skipped, never reported as errors.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::trace;

/// What the walk is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Content streams whose color operators get rewritten.
    Colors,
    /// Image XObject slots that may be repointed.
    Images,
}

/// Where a content stream was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// An entry of a page's `/Contents` (1-based page number).
    PageContents(u32),
    /// A Form XObject.
    Form,
    /// An annotation appearance stream from `/AP /N`.
    Appearance,
}

/// Content to process as one logical stream.
///
/// A page whose `/Contents` is an array yields one unit with a part per
/// array entry; operators may straddle part boundaries. Forms and
/// appearances always have a single part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUnit {
    pub parts: Vec<ObjectId>,
    pub kind: UnitKind,
}

/// A named entry of an XObject dictionary that refers to an Image XObject.
///
/// The dictionary holding the entry is reached from the indirect object
/// `owner` by following `path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageSlot {
    pub image: ObjectId,
    pub owner: ObjectId,
    pub path: Vec<Vec<u8>>,
    pub name: Vec<u8>,
}

/// One step of the walk plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkItem {
    Content(ContentUnit),
    Image(ImageSlot),
}

/// Position of a dictionary relative to its nearest indirect ancestor.
#[derive(Debug, Clone)]
struct Location {
    owner: ObjectId,
    path: Vec<Vec<u8>>,
}

impl Location {
    fn root(owner: ObjectId) -> Self {
        Self {
            owner,
            path: Vec::new(),
        }
    }

    /// Location of the value under `key`, which may be a reference.
    fn child(&self, key: &[u8], value: &Object) -> Self {
        match value {
            Object::Reference(id) => Self::root(*id),
            _ => {
                let mut path = self.path.clone();
                path.push(key.to_vec());
                Self {
                    owner: self.owner,
                    path,
                }
            }
        }
    }
}

/// Walks one document and collects a [`WalkItem`] plan.
pub struct ObjectGraphWalker<'d> {
    doc: &'d Document,
    mode: WalkMode,
    visited: HashSet<ObjectId>,
    slots: HashSet<ImageSlot>,
    items: Vec<WalkItem>,
}

impl<'d> ObjectGraphWalker<'d> {
    pub fn new(doc: &'d Document, mode: WalkMode) -> Self {
        Self {
            doc,
            mode,
            visited: HashSet::new(),
            slots: HashSet::new(),
            items: Vec::new(),
        }
    }

    /// Walk every page in document order and return the plan.
    ///
    /// Within a page, contents come first, then resources (recursing into
    /// Form XObjects), then annotation appearances.
    pub fn walk(mut self) -> Vec<WalkItem> {
        for (number, page_id) in self.doc.get_pages() {
            let Ok(page) = self.doc.get_dictionary(page_id) else {
                trace!("Page {} is not a dictionary, skipping", number);
                continue;
            };

            if self.mode == WalkMode::Colors {
                self.walk_contents(number, page);
            }

            if let Some((owner, resources)) = self.page_resources(page_id) {
                let location = Location::root(owner).child(b"Resources", resources);
                self.walk_resources(resources, location);
            }

            self.walk_annotations(page);
        }
        self.items
    }

    fn walk_contents(&mut self, number: u32, page: &'d Dictionary) {
        let Ok(contents) = page.get(b"Contents") else {
            return;
        };
        let kind = UnitKind::PageContents(number);
        let parts: Vec<ObjectId> = match self.doc.dereference(contents) {
            Ok((_, Object::Array(parts))) => parts
                .iter()
                .filter_map(|part| self.claim(part, kind))
                .map(|(id, _)| id)
                .collect(),
            Ok(_) => self.claim(contents, kind).map(|(id, _)| id).into_iter().collect(),
            Err(_) => return,
        };
        if !parts.is_empty() {
            self.items.push(WalkItem::Content(ContentUnit { parts, kind }));
        }
    }

    /// Mark a content stream as visited.
    ///
    /// Returns its id and dictionary the first time it is seen.
    fn claim(
        &mut self,
        object: &'d Object,
        kind: UnitKind,
    ) -> Option<(ObjectId, &'d Dictionary)> {
        let (id, stream) = match self.doc.dereference(object) {
            Ok((Some(id), Object::Stream(stream))) => (id, stream),
            Ok((None, Object::Stream(_))) => {
                trace!("Direct {:?} stream has no identity, skipping", kind);
                return None;
            }
            _ => return None,
        };
        if !self.visited.insert(id) {
            trace!("Object {:?} already visited", id);
            return None;
        }
        Some((id, &stream.dict))
    }

    /// The page's own `/Resources`, or the nearest inherited one.
    fn page_resources(&self, page_id: ObjectId) -> Option<(ObjectId, &'d Object)> {
        let mut node_id = page_id;
        let mut seen = HashSet::new();
        while seen.insert(node_id) {
            let node = self.doc.get_dictionary(node_id).ok()?;
            if let Ok(resources) = node.get(b"Resources") {
                return Some((node_id, resources));
            }
            node_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        }
        None
    }

    fn walk_resources(&mut self, resources: &'d Object, location: Location) {
        let Ok((_, Object::Dictionary(resources))) = self.doc.dereference(resources) else {
            return;
        };
        let Ok(xobjects) = resources.get(b"XObject") else {
            return;
        };
        let location = location.child(b"XObject", xobjects);
        let Ok((_, Object::Dictionary(xobjects))) = self.doc.dereference(xobjects) else {
            return;
        };

        for (name, value) in xobjects.iter() {
            let Ok((Some(id), Object::Stream(stream))) = self.doc.dereference(value) else {
                continue;
            };
            match stream.dict.get(b"Subtype").and_then(Object::as_name) {
                Ok(b"Form") => self.walk_form(value),
                Ok(b"Image") if self.mode == WalkMode::Images => {
                    let slot = ImageSlot {
                        image: id,
                        owner: location.owner,
                        path: location.path.clone(),
                        name: name.clone(),
                    };
                    if self.slots.insert(slot.clone()) {
                        self.items.push(WalkItem::Image(slot));
                    }
                }
                _ => {}
            }
        }
    }

    /// Process a Form XObject (or appearance stream) and recurse into its
    /// resources. Already visited forms end the recursion.
    fn walk_form(&mut self, object: &'d Object) {
        self.walk_form_as(object, UnitKind::Form);
    }

    fn walk_form_as(&mut self, object: &'d Object, kind: UnitKind) {
        let Some((id, dict)) = self.claim(object, kind) else {
            return;
        };
        if self.mode == WalkMode::Colors {
            self.items.push(WalkItem::Content(ContentUnit {
                parts: vec![id],
                kind,
            }));
        }
        if let Ok(resources) = dict.get(b"Resources") {
            let location = Location::root(id).child(b"Resources", resources);
            self.walk_resources(resources, location);
        }
    }

    fn walk_annotations(&mut self, page: &'d Dictionary) {
        let Ok(annots) = page.get(b"Annots") else {
            return;
        };
        let Ok((_, Object::Array(annots))) = self.doc.dereference(annots) else {
            return;
        };

        for annot in annots {
            let Ok((_, Object::Dictionary(annot))) = self.doc.dereference(annot) else {
                continue;
            };
            let Ok(ap) = annot.get(b"AP") else {
                continue;
            };
            let Ok((_, Object::Dictionary(ap))) = self.doc.dereference(ap) else {
                continue;
            };
            let Ok(normal) = ap.get(b"N") else {
                continue;
            };
            match self.doc.dereference(normal) {
                Ok((_, Object::Stream(_))) => self.walk_form_as(normal, UnitKind::Appearance),
                Ok((_, Object::Dictionary(states))) => {
                    for (_, state) in states.iter() {
                        self.walk_form_as(state, UnitKind::Appearance);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Convenience wrapper around [`ObjectGraphWalker`].
pub fn walk(doc: &Document, mode: WalkMode) -> Vec<WalkItem> {
    ObjectGraphWalker::new(doc, mode).walk()
}
