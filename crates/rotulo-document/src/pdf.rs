// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF file handle — ordered page access over a loaded `lopdf` document.
//
// One `PdfFile` per input file per consumer. The underlying decoder is not
// reentrant, so concurrent renders of independent stores must each load
// their own handle from the source bytes.

use lopdf::{Document, Object, ObjectId};
use tracing::{debug, instrument};

use rotulo_core::error::{Result, RotuloError};

use crate::text::{self, PageText};

/// A loaded PDF with zero-based page access.
pub struct PdfFile {
    document: Document,
    /// Page object ids in document order (index 0 = first page).
    pages: Vec<ObjectId>,
}

impl PdfFile {
    /// Load a PDF from raw bytes.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let document = Document::load_mem(bytes)
            .map_err(|err| RotuloError::Pdf(format!("failed to load PDF: {err}")))?;

        let mut keyed: Vec<(u32, ObjectId)> = document
            .get_pages()
            .iter()
            .map(|(number, id)| (*number, *id))
            .collect();
        keyed.sort_by_key(|(number, _)| *number);
        let pages = keyed.into_iter().map(|(_, id)| id).collect::<Vec<_>>();

        debug!(pages = pages.len(), "PDF loaded");
        Ok(Self { document, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Object id for a zero-based page index.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| RotuloError::Pdf(format!("page {index} out of range")))
    }

    /// Page media-box size in points, following /Parent inheritance.
    pub fn page_size(&self, index: usize) -> Result<(f32, f32)> {
        let page_id = self.page_id(index)?;
        media_box(&self.document, page_id)
    }

    /// Positioned text content of a page (top-origin coordinates).
    pub fn page_text(&self, index: usize) -> Result<PageText> {
        let page_id = self.page_id(index)?;
        text::extract_page_text(&self.document, page_id)
    }
}

/// Resolve the /MediaBox for a page, walking up the page tree when the page
/// dictionary does not carry its own.
pub fn media_box(document: &Document, page_id: ObjectId) -> Result<(f32, f32)> {
    let mut current = page_id;
    for _ in 0..16 {
        let object = document
            .get_object(current)
            .map_err(|err| RotuloError::Pdf(format!("cannot read page object: {err}")))?;
        let dict = match object {
            Object::Dictionary(dict) => dict,
            _ => return Err(RotuloError::Pdf("page object is not a dictionary".into())),
        };

        if let Ok(media) = dict.get(b"MediaBox") {
            let media = resolve(document, media);
            if let Object::Array(values) = media {
                let numbers: Vec<f32> = values
                    .iter()
                    .map(|value| number(resolve(document, value)))
                    .collect();
                if numbers.len() == 4 {
                    return Ok((numbers[2] - numbers[0], numbers[3] - numbers[1]));
                }
            }
            return Err(RotuloError::Pdf("malformed /MediaBox".into()));
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => break,
        }
    }
    Err(RotuloError::Pdf("no /MediaBox in page tree".into()))
}

/// Follow a reference one level; non-references pass through.
fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn number(object: &Object) -> f32 {
    match object {
        Object::Integer(value) => *value as f32,
        Object::Real(value) => *value,
        _ => 0.0,
    }
}
