// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream builder for output pages.
//
// Pages mix embedded Form XObjects (the cropped label regions) with text,
// rules, and barcode bars, so the stream is written directly instead of
// going through a page-description layer. Coordinates are top-origin and
// converted here; XObject placement takes an explicit matrix.

use std::fmt::Write;

/// Builds one page's content stream.
pub struct ContentBuilder {
    page_height: f32,
    ops: String,
}

impl ContentBuilder {
    pub fn new(page_height: f32) -> Self {
        Self {
            page_height,
            ops: String::new(),
        }
    }

    /// Show `text` with its baseline at `y_top` points from the page top.
    pub fn text(&mut self, font: &str, size: f32, x: f32, y_top: f32, text: &str) {
        let y = self.page_height - y_top;
        let _ = write!(
            self.ops,
            "BT /{font} {} Tf {} {} Td (",
            fmt(size),
            fmt(x),
            fmt(y)
        );
        self.ops.push_str(&escape_text(text));
        self.ops.push_str(") Tj ET\n");
    }

    /// Stroke a straight line between two top-origin points.
    pub fn line(&mut self, x0: f32, y0_top: f32, x1: f32, y1_top: f32, width: f32, gray: f32) {
        let _ = writeln!(
            self.ops,
            "{} G {} w {} {} m {} {} l S",
            fmt(gray),
            fmt(width),
            fmt(x0),
            fmt(self.page_height - y0_top),
            fmt(x1),
            fmt(self.page_height - y1_top),
        );
    }

    /// Fill a rectangle given its top-left corner.
    pub fn fill_rect(&mut self, x: f32, y_top: f32, w: f32, h: f32) {
        let _ = writeln!(
            self.ops,
            "0 g {} {} {} {} re f",
            fmt(x),
            fmt(self.page_height - y_top - h),
            fmt(w),
            fmt(h),
        );
    }

    /// Stroke a rectangle outline given its top-left corner.
    pub fn stroke_rect(&mut self, x: f32, y_top: f32, w: f32, h: f32, width: f32) {
        let _ = writeln!(
            self.ops,
            "0 G {} w {} {} {} {} re S",
            fmt(width),
            fmt(x),
            fmt(self.page_height - y_top - h),
            fmt(w),
            fmt(h),
        );
    }

    /// Place a named Form XObject under the transform
    /// `[scale 0 0 scale tx ty]` (PDF bottom-origin coordinates).
    pub fn xobject(&mut self, name: &str, scale: f32, tx: f32, ty: f32) {
        let _ = writeln!(
            self.ops,
            "q {} 0 0 {} {} {} cm /{name} Do Q",
            fmt(scale),
            fmt(scale),
            fmt(tx),
            fmt(ty),
        );
    }

    pub fn finish(self) -> Vec<u8> {
        self.ops.into_bytes()
    }
}

fn fmt(value: f32) -> String {
    // Trim trailing zeros so streams stay compact.
    let mut s = format!("{value:.2}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s == "-0" { "0".into() } else { s }
}

/// Escape a string for a PDF literal, mapping characters to Latin-1
/// (WinAnsi-compatible for the range the labels use). Unrepresentable
/// characters degrade to '?'.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            '\n' | '\r' => out.push(' '),
            c if (c as u32) < 0x80 => out.push(c),
            c if (c as u32) <= 0xFF => {
                // Latin-1 byte, written as an octal escape.
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}
