// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic label-sheet builder for tests. Compiled only for tests and the
// `fixtures` feature so integration tests in dependent crates can build
// realistic input PDFs without binary fixtures.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

/// One page of a synthetic PDF: size plus absolutely-positioned text runs.
#[derive(Debug, Clone)]
pub struct PageSpec {
    pub width: f32,
    pub height: f32,
    texts: Vec<TextRun>,
}

#[derive(Debug, Clone)]
struct TextRun {
    x: f32,
    /// Distance from the top edge (converted to PDF coordinates on build).
    y_top: f32,
    size: f32,
    text: String,
}

impl PageSpec {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            texts: Vec::new(),
        }
    }

    /// Add a text run at `(x, y_top)` points from the top-left corner.
    pub fn text(mut self, x: f32, y_top: f32, size: f32, text: &str) -> Self {
        self.texts.push(TextRun {
            x,
            y_top,
            size,
            text: text.to_string(),
        });
        self
    }

    /// Add a multi-line block: each line advances by `size + 2` points.
    pub fn block(mut self, x: f32, y_top: f32, size: f32, lines: &[&str]) -> Self {
        for (index, line) in lines.iter().enumerate() {
            self = self.text(x, y_top + index as f32 * (size + 2.0), size, line);
        }
        self
    }
}

/// Serialize the given pages into PDF bytes (Helvetica text only).
pub fn build_pdf(pages: &[PageSpec]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for spec in pages {
        let mut operations = Vec::new();
        for run in &spec.texts {
            let y_pdf = spec.height - run.y_top;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), run.size.into()]));
            operations.push(Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    run.x.into(),
                    y_pdf.into(),
                ],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(run.text.as_str())],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encodes"),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), spec.width.into(), spec.height.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("pdf serializes");
    bytes
}

/// A 600×800 sheet page whose quadrants each look like a label for `orders`
/// (up to four entries of (document number, sender name)).
pub fn grid_sheet_page(quadrant_texts: &[Vec<String>]) -> PageSpec {
    let mut spec = PageSpec::new(600.0, 800.0);
    let anchors = [
        (20.0, 30.0),
        (320.0, 30.0),
        (20.0, 430.0),
        (320.0, 430.0),
    ];
    for (quadrant, lines) in quadrant_texts.iter().enumerate().take(4) {
        let (x, y) = anchors[quadrant];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        spec = spec.block(x, y, 9.0, &refs);
    }
    spec
}

/// Standard quadrant text for a label carrying a resolvable document number.
pub fn label_lines(document_number: &str, sender: &str) -> Vec<String> {
    vec![
        "DANFE Simplificado".to_string(),
        "Pedido: 2602061BMTVXW0".to_string(),
        format!("Emissao: {document_number}"),
        "REMETENTE".to_string(),
        "BR261920610412I".to_string(),
        sender.to_string(),
        "Rua das Flores 123".to_string(),
        "01310-100".to_string(),
    ]
}
