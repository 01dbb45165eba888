// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Positioned text extraction from PDF content streams.
//
// A deliberately small interpreter: it tracks the graphics/text state needed
// to anchor each shown string on the page (q/Q/cm, BT/ET, Tm/Td/TD/T*/TL/Tf)
// and decodes string bytes through the font's ToUnicode CMap when one is
// embedded, else as Latin-1. Glyph-level advances are not modelled — the
// anchor point of a string decides which label region it belongs to, which
// is all the layout detector and croppers need.

use std::collections::HashMap;
use std::sync::LazyLock;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use regex::Regex;
use tracing::{debug, trace};

use rotulo_core::error::{Result, RotuloError};
use rotulo_core::types::Rect;

use crate::pdf::media_box;

/// One shown string with its anchor point in top-origin page coordinates.
#[derive(Debug, Clone)]
pub struct TextFragment {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// Nominal font size at the time of showing (used for extent estimates).
    pub size: f32,
}

/// All positioned text of a single page.
#[derive(Debug, Clone)]
pub struct PageText {
    pub width: f32,
    pub height: f32,
    pub fragments: Vec<TextFragment>,
}

impl PageText {
    /// Text of the whole page, line-grouped.
    pub fn full_text(&self) -> String {
        self.text_in(&Rect::new(0.0, 0.0, self.width, self.height))
    }

    /// Text whose anchor falls inside `region`, grouped into lines by
    /// vertical proximity and joined top-to-bottom, left-to-right.
    ///
    /// This line-per-row shape is the substrate every marker regex runs on.
    pub fn text_in(&self, region: &Rect) -> String {
        let mut hits: Vec<&TextFragment> = self
            .fragments
            .iter()
            .filter(|frag| region.contains(frag.x, frag.y) && !frag.text.trim().is_empty())
            .collect();
        hits.sort_by(|a, b| {
            a.y.partial_cmp(&b.y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut lines: Vec<String> = Vec::new();
        let mut current_y = f32::NEG_INFINITY;
        for frag in hits {
            let text = frag.text.trim();
            if (frag.y - current_y).abs() <= 2.0 && !lines.is_empty() {
                let line = lines.last_mut().unwrap();
                if !line.is_empty() {
                    line.push(' ');
                }
                line.push_str(text);
            } else {
                lines.push(text.to_string());
                current_y = frag.y;
            }
        }
        lines.join("\n")
    }

    /// Total extractable text length inside `region` (whitespace trimmed per
    /// fragment) — the cheap half of the label-evidence test.
    pub fn text_len_in(&self, region: &Rect) -> usize {
        self.fragments
            .iter()
            .filter(|frag| region.contains(frag.x, frag.y))
            .map(|frag| frag.text.trim().len())
            .sum()
    }

    /// Bounding box of the non-blank content, padded by `pad` points and
    /// clamped to the page. None when the page has no text.
    pub fn content_bbox(&self, pad: f32) -> Option<Rect> {
        self.content_bbox_in(&Rect::new(0.0, 0.0, self.width, self.height), pad)
    }

    /// Bounding box of the non-blank content anchored inside `region`,
    /// padded by `pad` points and clamped to the region. None when the
    /// region has no text.
    ///
    /// Fragment extents are estimated from the font size (height) and an
    /// average glyph width of half the size.
    pub fn content_bbox_in(&self, region: &Rect, pad: f32) -> Option<Rect> {
        let mut bbox: Option<Rect> = None;
        for frag in &self.fragments {
            if frag.text.trim().is_empty() || !region.contains(frag.x, frag.y) {
                continue;
            }
            let est_width = 0.5 * frag.size * frag.text.chars().count() as f32;
            let frag_rect = Rect::new(
                frag.x,
                frag.y - frag.size,
                frag.x + est_width,
                frag.y + frag.size * 0.3,
            );
            bbox = Some(match bbox {
                None => frag_rect,
                Some(current) => Rect::new(
                    current.x0.min(frag_rect.x0),
                    current.y0.min(frag_rect.y0),
                    current.x1.max(frag_rect.x1),
                    current.y1.max(frag_rect.y1),
                ),
            });
        }
        bbox.map(|b| {
            Rect::new(
                (b.x0 - pad).max(region.x0),
                (b.y0 - pad).max(region.y0),
                (b.x1 + pad).min(region.x1),
                (b.y1 + pad).min(region.y1),
            )
        })
    }
}

/// 2D affine transform `[a b c d e f]` in PDF matrix order.
type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn multiply(m: Matrix, n: Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn translation(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// Per-font decoding info pulled from the page resources.
#[derive(Debug, Default)]
struct FontInfo {
    /// Type0 fonts consume two-byte codes.
    two_byte: bool,
    /// Code → replacement text from the embedded ToUnicode CMap.
    to_unicode: Option<HashMap<u32, String>>,
}

/// Extract the positioned text of one page.
pub fn extract_page_text(document: &Document, page_id: ObjectId) -> Result<PageText> {
    let (width, height) = media_box(document, page_id)?;

    let content_data = document
        .get_page_content(page_id)
        .map_err(|err| RotuloError::TextExtraction(format!("page content: {err}")))?;
    let content = Content::decode(&content_data)
        .map_err(|err| RotuloError::TextExtraction(format!("content decode: {err}")))?;

    let fonts = page_fonts(document, page_id);

    let mut fragments = Vec::new();
    let mut ctm = IDENTITY;
    let mut ctm_stack: Vec<Matrix> = Vec::new();
    let mut text_matrix = IDENTITY;
    let mut line_matrix = IDENTITY;
    let mut leading: f32 = 0.0;
    let mut font_size: f32 = 0.0;
    let mut current_font: Option<String> = None;

    let emit = |text: String,
                tm: &Matrix,
                ctm: &Matrix,
                size: f32,
                fragments: &mut Vec<TextFragment>| {
        if text.is_empty() {
            return;
        }
        let device = multiply(*tm, *ctm);
        fragments.push(TextFragment {
            text,
            x: device[4],
            y: height - device[5],
            size: if size > 0.0 { size } else { 10.0 },
        });
    };

    for operation in &content.operations {
        let op = operation.operator.as_str();
        let operands = &operation.operands;
        match op {
            "q" => ctm_stack.push(ctm),
            "Q" => {
                if let Some(previous) = ctm_stack.pop() {
                    ctm = previous;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operands(operands) {
                    ctm = multiply(m, ctm);
                }
            }
            "BT" => {
                text_matrix = IDENTITY;
                line_matrix = IDENTITY;
            }
            "Tf" => {
                if operands.len() >= 2 {
                    current_font = name_operand(&operands[0]);
                    font_size = number_operand(&operands[1]);
                }
            }
            "TL" => leading = number_operand(operands.first().unwrap_or(&Object::Null)),
            "Td" | "TD" => {
                if operands.len() >= 2 {
                    let tx = number_operand(&operands[0]);
                    let ty = number_operand(&operands[1]);
                    if op == "TD" {
                        leading = -ty;
                    }
                    line_matrix = multiply(translation(tx, ty), line_matrix);
                    text_matrix = line_matrix;
                }
            }
            "Tm" => {
                if let Some(m) = matrix_operands(operands) {
                    text_matrix = m;
                    line_matrix = m;
                }
            }
            "T*" => {
                line_matrix = multiply(translation(0.0, -leading), line_matrix);
                text_matrix = line_matrix;
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = decode_string(bytes, font_for(&fonts, &current_font));
                    emit(text, &text_matrix, &ctm, font_size, &mut fragments);
                }
            }
            "'" => {
                line_matrix = multiply(translation(0.0, -leading), line_matrix);
                text_matrix = line_matrix;
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let text = decode_string(bytes, font_for(&fonts, &current_font));
                    emit(text, &text_matrix, &ctm, font_size, &mut fragments);
                }
            }
            "\"" => {
                line_matrix = multiply(translation(0.0, -leading), line_matrix);
                text_matrix = line_matrix;
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    let text = decode_string(bytes, font_for(&fonts, &current_font));
                    emit(text, &text_matrix, &ctm, font_size, &mut fragments);
                }
            }
            "TJ" => {
                if let Some(Object::Array(parts)) = operands.first() {
                    let mut combined = String::new();
                    for part in parts {
                        if let Object::String(bytes, _) = part {
                            combined.push_str(&decode_string(
                                bytes,
                                font_for(&fonts, &current_font),
                            ));
                        }
                    }
                    emit(combined, &text_matrix, &ctm, font_size, &mut fragments);
                }
            }
            _ => trace!(op, "ignored operator"),
        }
    }

    debug!(fragments = fragments.len(), "page text extracted");
    Ok(PageText {
        width,
        height,
        fragments,
    })
}

fn font_for<'a>(
    fonts: &'a HashMap<String, FontInfo>,
    current: &Option<String>,
) -> Option<&'a FontInfo> {
    current.as_ref().and_then(|name| fonts.get(name))
}

fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = [0.0; 6];
    for (slot, operand) in m.iter_mut().zip(operands.iter()) {
        *slot = number_operand(operand);
    }
    Some(m)
}

fn number_operand(object: &Object) -> f32 {
    match object {
        Object::Integer(value) => *value as f32,
        Object::Real(value) => *value,
        _ => 0.0,
    }
}

fn name_operand(object: &Object) -> Option<String> {
    match object {
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Decode shown-string bytes via the font's ToUnicode map when present.
///
/// Without a map, Type0 fonts cannot be decoded meaningfully (codes are
/// glyph ids) and yield nothing; simple fonts fall back to Latin-1, which
/// covers the WinAnsi range the label sheets use.
fn decode_string(bytes: &[u8], font: Option<&FontInfo>) -> String {
    match font {
        Some(info) if info.two_byte => {
            let mut out = String::new();
            for pair in bytes.chunks_exact(2) {
                let code = u16::from_be_bytes([pair[0], pair[1]]) as u32;
                match info.to_unicode.as_ref().and_then(|map| map.get(&code)) {
                    Some(replacement) => out.push_str(replacement),
                    None => out.push('\u{FFFD}'),
                }
            }
            out
        }
        Some(info) if info.to_unicode.is_some() => {
            let map = info.to_unicode.as_ref().unwrap();
            bytes
                .iter()
                .map(|byte| {
                    map.get(&(*byte as u32))
                        .cloned()
                        .unwrap_or_else(|| latin1_char(*byte))
                })
                .collect()
        }
        _ => bytes.iter().map(|byte| latin1_char(*byte)).collect(),
    }
}

fn latin1_char(byte: u8) -> String {
    (byte as char).to_string()
}

/// Collect the /Font resources of a page into decoding infos.
fn page_fonts(document: &Document, page_id: ObjectId) -> HashMap<String, FontInfo> {
    let mut fonts = HashMap::new();
    let Some(resources) = page_resources(document, page_id) else {
        return fonts;
    };
    let Some(font_dict) = dict_entry(document, resources, b"Font") else {
        return fonts;
    };

    for (name, value) in font_dict.iter() {
        let Some(entry) = as_dict(document, value) else {
            continue;
        };
        let mut info = FontInfo::default();

        if let Ok(Object::Name(subtype_name)) = entry.get(b"Subtype") {
            info.two_byte = subtype_name.as_slice() == b"Type0".as_slice();
        }

        if let Ok(to_unicode) = entry.get(b"ToUnicode")
            && let Some(stream_bytes) = stream_content(document, to_unicode)
        {
            info.to_unicode = Some(parse_tounicode(&stream_bytes));
        }

        fonts.insert(String::from_utf8_lossy(name).into_owned(), info);
    }
    fonts
}

/// Resolve the page's /Resources dictionary, walking up the page tree.
fn page_resources(document: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = page_id;
    for _ in 0..16 {
        let dict = match document.get_object(current) {
            Ok(Object::Dictionary(dict)) => dict,
            _ => return None,
        };
        if let Ok(resources) = dict.get(b"Resources") {
            return as_dict(document, resources);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

fn dict_entry<'a>(
    document: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    dict.get(key).ok().and_then(|value| as_dict(document, value))
}

fn as_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => match document.get_object(*id) {
            Ok(Object::Dictionary(dict)) => Some(dict),
            Ok(Object::Stream(stream)) => Some(&stream.dict),
            _ => None,
        },
        _ => None,
    }
}

fn stream_content(document: &Document, object: &Object) -> Option<Vec<u8>> {
    let stream = match object {
        Object::Stream(stream) => stream,
        Object::Reference(id) => match document.get_object(*id) {
            Ok(Object::Stream(stream)) => stream,
            _ => return None,
        },
        _ => return None,
    };
    stream
        .decompressed_content()
        .ok()
        .or_else(|| Some(stream.content.clone()))
}

static BFCHAR_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)beginbfchar(.*?)endbfchar").expect("valid bfchar pattern"));
static BFRANGE_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)beginbfrange(.*?)endbfrange").expect("valid bfrange pattern")
});
static HEX_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>").expect("valid hex-pair pattern")
});
static HEX_TRIPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>")
        .expect("valid hex-triple pattern")
});

/// Parse a ToUnicode CMap stream into a code → text map.
///
/// Handles `bfchar` pairs and the scalar form of `bfrange`; the array form
/// is rare in label PDFs and is skipped.
fn parse_tounicode(bytes: &[u8]) -> HashMap<u32, String> {
    let text: String = bytes.iter().map(|b| *b as char).collect();
    let mut map = HashMap::new();

    for section in BFRANGE_SECTION.captures_iter(&text) {
        for triple in HEX_TRIPLE.captures_iter(&section[1]) {
            let (Some(lo), Some(hi), Some(dst)) = (
                hex_u32(&triple[1]),
                hex_u32(&triple[2]),
                hex_utf16(&triple[3]),
            ) else {
                continue;
            };
            if hi < lo || hi - lo > 0xFFFF {
                continue;
            }
            for offset in 0..=(hi - lo) {
                let mapped = advance_last_unit(&dst, offset);
                map.insert(lo + offset, mapped);
            }
        }
    }

    for section in BFCHAR_SECTION.captures_iter(&text) {
        for pair in HEX_PAIR.captures_iter(&section[1]) {
            let (Some(code), Some(replacement)) = (hex_u32(&pair[1]), hex_utf16(&pair[2])) else {
                continue;
            };
            map.insert(code, replacement);
        }
    }

    map
}

fn hex_u32(hex: &str) -> Option<u32> {
    u32::from_str_radix(hex, 16).ok()
}

/// Decode a destination hex token as UTF-16BE code units.
fn hex_utf16(hex: &str) -> Option<String> {
    if hex.len() % 4 != 0 || hex.is_empty() {
        // Single-byte destinations appear in some generators.
        return u8::from_str_radix(hex, 16)
            .ok()
            .map(|b| (b as char).to_string());
    }
    let mut units = Vec::with_capacity(hex.len() / 4);
    for chunk in hex.as_bytes().chunks_exact(4) {
        let piece = std::str::from_utf8(chunk).ok()?;
        units.push(u16::from_str_radix(piece, 16).ok()?);
    }
    Some(String::from_utf16_lossy(&units))
}

/// bfrange destinations increment their final UTF-16 unit per code.
fn advance_last_unit(base: &str, offset: u32) -> String {
    let mut units: Vec<u16> = base.encode_utf16().collect();
    if let Some(last) = units.last_mut() {
        *last = last.wrapping_add(offset as u16);
    }
    String::from_utf16_lossy(&units)
}
