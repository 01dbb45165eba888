// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Rotulo label engine.

use serde::{Deserialize, Serialize};

use crate::sku;

/// One product line on an invoice, manifest entry, or label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub description: String,
    /// Variation name (colour/size) — populated by manifest rows, empty for
    /// invoice-sourced items.
    pub variation: String,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(sku: impl Into<String>, description: impl Into<String>, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            description: description.into(),
            variation: String::new(),
            quantity,
        }
    }
}

/// A parsed tax document (NF-e). Immutable once built; owned by the
/// `InvoiceIndex` and looked up by `number`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Document number (`nNF`).
    pub number: String,
    /// Document series, defaults to "1" when absent.
    pub series: String,
    /// Emission timestamp formatted `%d-%m-%Y %H:%M:%S`, empty when missing.
    pub issued_at: String,
    /// 44-digit access key used for barcode encoding.
    pub access_key: String,
    /// Issuer tax id (CNPJ), digits only.
    pub issuer_tax_id: String,
    /// Raw issuer display name as it appears in the XML.
    pub issuer_name: String,
    pub items: Vec<LineItem>,
}

impl InvoiceRecord {
    /// Sum of item quantities.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Accumulated line items for one order id, built from manifest rows.
/// Multiple rows sharing an order id merge into a single entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderManifestEntry {
    pub order_id: String,
    pub items: Vec<LineItem>,
}

impl OrderManifestEntry {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Identity of the merchant a label belongs to.
///
/// Grouping key for `StoreGroup`s. Labels resolved through an invoice carry
/// the issuer tax id; labels whose store was recovered from the sender text
/// block carry a synthetic named identity; declaration-format labels all
/// share one fixed sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoreId {
    /// Issuer tax id (CNPJ) from a resolved invoice.
    TaxId(String),
    /// Synthetic store derived from the sender name printed on the label.
    Named(String),
    /// Fixed sentinel for the declaration (CPF) special format.
    Declaration,
    /// No tax id and no recoverable sender name.
    Unknown,
}

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaxId(id) => write!(f, "{id}"),
            Self::Named(name) => write!(f, "{name}"),
            Self::Declaration => write!(f, "CPF"),
            Self::Unknown => write!(f, "SEM_LOJA"),
        }
    }
}

/// Which extraction pipeline produced a label record. Drives the product
/// table flavor during composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelOrigin {
    /// Generic grid sheet handled by layout detection + region cropping.
    Sheet,
    /// Declaration/CPF special format (manifest-backed, variation table).
    Declaration,
    /// Direct-import special format (paired label + tax-document pages).
    DirectImport,
}

/// Axis-aligned rectangle in page points, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// How a page is divided into label sub-regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutGeometry {
    /// One label filling the page (compact/pickup formats and the fallback).
    FullPage,
    /// Four labels in a 2×2 grid — the dominant marketplace sheet format.
    Grid2x2,
    /// Two full-width labels stacked vertically.
    Stacked2x1,
}

impl LayoutGeometry {
    /// The sub-rectangles this geometry divides a `width`×`height` page into,
    /// in reading order.
    pub fn regions(&self, width: f32, height: f32) -> Vec<Rect> {
        let mid_x = width / 2.0;
        let mid_y = height / 2.0;
        match self {
            Self::FullPage => vec![Rect::new(0.0, 0.0, width, height)],
            Self::Grid2x2 => vec![
                Rect::new(0.0, 0.0, mid_x, mid_y),
                Rect::new(mid_x, 0.0, width, mid_y),
                Rect::new(0.0, mid_y, mid_x, height),
                Rect::new(mid_x, mid_y, width, height),
            ],
            Self::Stacked2x1 => vec![
                Rect::new(0.0, 0.0, width, mid_y),
                Rect::new(0.0, mid_y, width, height),
            ],
        }
    }
}

/// Build the synthetic source identity for a label region that carries no
/// resolvable document number.
///
/// A pure function of the originating file stem, page index, and quadrant
/// index — reproducible regardless of batch order, and collision-free across
/// input files that share page/quadrant numbering.
pub fn synthetic_source_id(file_stem: &str, page_index: usize, quadrant: usize) -> String {
    format!("{file_stem}-p{page_index}-q{quadrant}")
}

/// One physical shipping label: extracted data plus the cropped visual
/// region it will be re-rendered from.
///
/// Created by the region cropper or a special-format handler; re-sorted by
/// the aggregator; read-only for the page composer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Globally unique identity within a batch: the real document number, or
    /// a synthetic id from [`synthetic_source_id`].
    pub source_id: String,
    /// Real tax-document number, when one was extracted. Dedup key.
    pub document_number: Option<String>,
    /// Marketplace order id, when the record resolved through the manifest.
    pub order_id: Option<String>,
    /// 44-digit access key for barcode encoding, when resolved.
    pub access_key: Option<String>,
    pub store: StoreId,
    /// Sender name recovered from the label text, used for display naming.
    pub store_name: Option<String>,
    pub origin: LabelOrigin,
    /// Name of the input file this region was cropped from.
    pub source_file: String,
    /// Zero-based page index within the source file.
    pub page_index: usize,
    /// Cropped region in top-origin page coordinates.
    pub region: Rect,
    /// Resolved invoice/manifest line items; may be empty (unresolved).
    pub items: Vec<LineItem>,
}

impl LabelRecord {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Single-unit labels sort ahead of everything else: at most one line
    /// item, at most one unit in total.
    pub fn is_single_unit(&self) -> bool {
        self.item_count() <= 1 && self.total_quantity() <= 1
    }

    /// Base product code of the first line item, size suffixes stripped.
    pub fn principal_sku(&self) -> String {
        self.items
            .first()
            .map(|item| sku::principal_sku(&item.sku))
            .unwrap_or_default()
    }

    /// Sort key used inside a store group: ties on principal SKU break by
    /// document number, falling back to the synthetic source id.
    pub fn sort_key(&self) -> (String, String) {
        let number = self
            .document_number
            .clone()
            .unwrap_or_else(|| self.source_id.clone());
        (self.principal_sku(), number)
    }
}

/// A store and its ordered labels, rendered as one output artifact set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreGroup {
    pub store: StoreId,
    pub records: Vec<LabelRecord>,
}

/// Kind tag attached to each input byte stream by the upload layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    /// Compressed archive of tax-document XML records.
    Archive,
    /// A PDF of labels (grid sheet or special format, routed by filename).
    LabelSheet,
    /// Spreadsheet order manifest.
    Manifest,
    /// Optional sku → unit cost sheet, consumed by a downstream collaborator.
    CostSheet,
}

/// One named input byte stream.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub kind: InputKind,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, kind: InputKind, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            bytes,
        }
    }

    /// File name without its extension, used in synthetic identities.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) => stem,
            None => &self.name,
        }
    }
}

/// Severity of a structured log entry in the batch report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Structured log entry surfaced to the caller alongside the artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub severity: Severity,
    pub store: Option<StoreId>,
    pub message: String,
}
