//! Owned, mutable PDF document for a single post-processing pass.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use super::Result;
use crate::error::PdfError;

/// A parsed document owned by one conversion call.
///
/// The handle is consumed by [`PressDocument::into_bytes`]; dropping it on
/// an early return releases everything it holds.
pub struct PressDocument {
    inner: Document,
}

impl PressDocument {
    /// Parse a PDF from bytes. Encrypted documents are rejected.
    pub fn load(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;
        if inner.is_encrypted() {
            return Err(PdfError::Encrypted);
        }
        debug!("Loaded PDF with {} pages", inner.get_pages().len());
        Ok(Self { inner })
    }

    /// Wrap a document built in memory.
    pub fn from_document(inner: Document) -> Self {
        Self { inner }
    }

    /// Borrow the underlying document.
    pub fn document(&self) -> &Document {
        &self.inner
    }

    /// Page object ids in document order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().into_values().collect()
    }

    /// Decoded bytes of the stream object `id`.
    ///
    /// Unfiltered streams are returned as stored.
    pub fn stream_content(&self, id: ObjectId) -> Result<Vec<u8>> {
        let stream = self.stream(id)?;
        decoded_content(stream).map_err(|reason| PdfError::StreamDecode { id, reason })
    }

    /// Replace the content of stream `id` with unfiltered bytes.
    pub fn set_stream_content(&mut self, id: ObjectId, content: Vec<u8>) -> Result<()> {
        let stream = self
            .inner
            .get_object_mut(id)
            .and_then(Object::as_stream_mut)
            .map_err(|e| PdfError::StreamDecode {
                id,
                reason: e.to_string(),
            })?;
        stream.set_plain_content(content);
        Ok(())
    }

    /// Borrow stream object `id`.
    pub fn stream(&self, id: ObjectId) -> Result<&Stream> {
        self.inner
            .get_object(id)
            .and_then(Object::as_stream)
            .map_err(|e| PdfError::StreamDecode {
                id,
                reason: e.to_string(),
            })
    }

    /// Add a new indirect object.
    pub fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        self.inner.add_object(object)
    }

    /// Mutable access to the dictionary reached from indirect object `owner`
    /// by following `path` through nested direct dictionaries.
    ///
    /// For a stream owner the path starts at the stream dictionary.
    pub fn dictionary_at_mut(
        &mut self,
        owner: ObjectId,
        path: &[Vec<u8>],
    ) -> Option<&mut Dictionary> {
        let mut dict = match self.inner.get_object_mut(owner).ok()? {
            Object::Dictionary(dict) => dict,
            Object::Stream(stream) => &mut stream.dict,
            _ => return None,
        };
        for key in path {
            dict = dict.get_mut(key).ok()?.as_dict_mut().ok()?;
        }
        Some(dict)
    }

    /// Serialize the document, consuming the handle.
    pub fn into_bytes(mut self, compress: bool) -> Result<Vec<u8>> {
        if compress {
            self.inner.compress();
        }
        let mut out = Vec::new();
        self.inner
            .save_to(&mut out)
            .map_err(|e| PdfError::Serialize(e.to_string()))?;
        debug!("Serialized PDF: {} bytes (compress={})", out.len(), compress);
        Ok(out)
    }
}

/// Decode a stream's filters; a stream without `/Filter` is already plain.
pub(crate) fn decoded_content(stream: &Stream) -> std::result::Result<Vec<u8>, String> {
    if stream.dict.has(b"Filter") {
        stream.decompressed_content().map_err(|e| e.to_string())
    } else {
        Ok(stream.content.clone())
    }
}
