#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// Builds small single-purpose PDFs in memory.
pub struct PdfBuilder {
    pub doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn stream(&mut self, content: &[u8]) -> ObjectId {
        self.doc
            .add_object(Stream::new(dictionary! {}, content.to_vec()))
    }

    /// A Form XObject with the given content and resources.
    pub fn form(&mut self, content: &[u8], resources: Dictionary) -> ObjectId {
        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 10.into(), 10.into()],
                "Resources" => resources,
            },
            content.to_vec(),
        ))
    }

    /// An uncompressed 8-bit DeviceRGB image XObject.
    pub fn image(&mut self, image: &RgbImage) -> ObjectId {
        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width() as i64,
                "Height" => image.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            image.as_raw().clone(),
        ))
    }

    pub fn page(&mut self, contents: ObjectId, resources: Dictionary) -> ObjectId {
        self.page_with(dictionary! {
            "Contents" => contents,
            "Resources" => resources,
        })
    }

    /// Add a page from extra entries; `Type`, `Parent` and `MediaBox` are filled in.
    pub fn page_with(&mut self, mut page: Dictionary) -> ObjectId {
        page.set("Type", "Page");
        page.set("Parent", self.pages_id);
        page.set(
            "MediaBox",
            vec![0.into(), 0.into(), 100.into(), 100.into()],
        );
        let id = self.doc.add_object(page);
        self.kids.push(id.into());
        id
    }

    pub fn build(mut self) -> Vec<u8> {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        self.doc.save_to(&mut out).unwrap();
        out
    }
}

pub fn xobjects(entries: Vec<(&str, ObjectId)>) -> Dictionary {
    let mut xobjects = Dictionary::new();
    for (name, id) in entries {
        xobjects.set(name, id);
    }
    dictionary! { "XObject" => xobjects }
}

/// Decoded content of stream `id` in a serialized PDF.
pub fn content_of(pdf: &[u8], id: ObjectId) -> Vec<u8> {
    let doc = Document::load_mem(pdf).unwrap();
    let stream = doc.get_object(id).unwrap().as_stream().unwrap();
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

/// The object a page's `/Resources /XObject /<name>` entry points to.
pub fn page_xobject(pdf: &[u8], page: ObjectId, name: &str) -> ObjectId {
    let doc = Document::load_mem(pdf).unwrap();
    let page = doc.get_dictionary(page).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    xobjects
        .get(name.as_bytes())
        .unwrap()
        .as_reference()
        .unwrap()
}

pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(rgb))
}

pub fn write_png(dir: &Path, name: &str, image: &RgbImage) -> PathBuf {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
