// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region embedding — wrap a source page as a clipped Form XObject inside
// the output document.
//
// The source page's content stream becomes the XObject body; its /BBox is
// the crop rectangle, so everything outside the label region is clipped by
// the viewer. The page's resources are deep-cloned into the target document
// (stream data, fonts, and images referenced by the page become new objects
// there).

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use rotulo_core::error::{Result, RotuloError};
use rotulo_core::types::Rect;

/// Crop rectangle in PDF (bottom-origin) coordinates.
#[derive(Debug, Clone, Copy)]
pub struct PdfRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PdfRect {
    /// Convert a top-origin region to PDF coordinates on a page of
    /// `page_height` points.
    pub fn from_region(region: &Rect, page_height: f32) -> Self {
        Self {
            x0: region.x0,
            y0: page_height - region.y1,
            x1: region.x1,
            y1: page_height - region.y0,
        }
    }
}

/// Embed the clipped content of `source_page` into `target`, returning the
/// id of the new Form XObject.
pub fn embed_region(
    source: &Document,
    source_page: ObjectId,
    clip: PdfRect,
    target: &mut Document,
) -> Result<ObjectId> {
    let content = source
        .get_page_content(source_page)
        .map_err(|err| RotuloError::Compose(format!("source page content: {err}")))?;

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Form".to_vec()));
    dict.set("FormType", Object::Integer(1));
    dict.set(
        "BBox",
        Object::Array(vec![
            Object::Real(clip.x0),
            Object::Real(clip.y0),
            Object::Real(clip.x1),
            Object::Real(clip.y1),
        ]),
    );

    if let Some(resources) = page_resources(source, source_page) {
        let cloned = deep_clone_object(source, target, &Object::Dictionary(resources.clone()))?;
        dict.set("Resources", cloned);
    }

    let xobject_id = target.add_object(Object::Stream(Stream::new(dict, content)));
    debug!(?xobject_id, "region embedded as form xobject");
    Ok(xobject_id)
}

/// Resolve a page's /Resources dictionary, walking up the page tree.
fn page_resources(document: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = page_id;
    for _ in 0..16 {
        let dict = match document.get_object(current) {
            Ok(Object::Dictionary(dict)) => dict,
            _ => return None,
        };
        if let Ok(resources) = dict.get(b"Resources") {
            return match resources {
                Object::Dictionary(resources) => Some(resources),
                Object::Reference(id) => match document.get_object(*id) {
                    Ok(Object::Dictionary(resources)) => Some(resources),
                    _ => None,
                },
                _ => None,
            };
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

/// Deep-clone a single lopdf Object, recursively resolving references
/// (except /Parent which is deliberately skipped to avoid circular cloning).
fn deep_clone_object(
    source: &Document,
    target: &mut Document,
    object: &Object,
) -> Result<Object> {
    match object {
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                // Skip /Parent to avoid circular references.
                if key == b"Parent" {
                    continue;
                }
                let cloned_value = deep_clone_object(source, target, value)?;
                new_dict.set(key.clone(), cloned_value);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let mut new_arr = Vec::with_capacity(arr.len());
            for item in arr {
                new_arr.push(deep_clone_object(source, target, item)?);
            }
            Ok(Object::Array(new_arr))
        }
        Object::Reference(ref_id) => {
            // Resolve the reference in the source, clone it, and return a
            // new reference in the target.
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    let cloned = deep_clone_object(source, target, referenced)?;
                    let new_id = target.add_object(cloned);
                    Ok(Object::Reference(new_id))
                }
                Err(err) => {
                    warn!(?ref_id, %err, "cannot resolve reference, using Null");
                    Ok(Object::Null)
                }
            }
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                let cloned_value = deep_clone_object(source, target, value)?;
                new_dict.set(key.clone(), cloned_value);
            }
            Ok(Object::Stream(Stream::new(new_dict, stream.content.clone())))
        }
        // All other object types (Boolean, Integer, Real, String, Name,
        // Null) are trivially cloneable.
        other => Ok(other.clone()),
    }
}
