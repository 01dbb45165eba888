// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Order manifest index — spreadsheet rows of (order id, product-info string)
// accumulated into per-order line-item lists.
//
// The product-info cell is semi-structured:
//   [1] Product Name: Tenis Runner; Variation Name: Azul,38;
//       Parent SKU Reference No.: TEN-RUN; Quantity: 2; ...
// Blocks are introduced by a bracketed index and fields follow the
// `key: value;` grammar.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::LazyLock;

use calamine::{Data, Reader, Xlsx};
use regex::Regex;
use tracing::{info, instrument, warn};

use rotulo_core::error::{Result, RotuloError};
use rotulo_core::types::{LineItem, OrderManifestEntry};

static BLOCK_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]\s*").expect("valid block pattern"));
static PARENT_SKU: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Parent SKU Reference No\.:\s*([^;]+)").expect("valid parent-sku pattern")
});
static PLAIN_SKU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SKU Reference No\.:\s*([^;]+)").expect("valid sku pattern"));
static QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Quantity:\s*(\d+)").expect("valid quantity pattern"));
static PRODUCT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Product Name:\s*([^;]+)").expect("valid name pattern"));
static VARIATION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Variation Name:\s*([^;]+)").expect("valid variation pattern"));

/// In-memory lookup of manifest orders, keyed by order id, with a secondary
/// tracking-code map for labels that only print the tracking number.
///
/// Built once per batch, then only read.
#[derive(Debug, Default)]
pub struct ManifestIndex {
    orders: HashMap<String, OrderManifestEntry>,
    tracking_to_order: HashMap<String, String>,
}

impl ManifestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the first worksheet of an XLSX manifest. Requires `order_sn` and
    /// `product_info` columns; `tracking_number` is optional. Returns the
    /// number of rows consumed.
    #[instrument(skip(self, bytes), fields(sheet = name, bytes_len = bytes.len()))]
    pub fn load_sheet(&mut self, name: &str, bytes: &[u8]) -> Result<usize> {
        let mut workbook: Xlsx<_> =
            Xlsx::new(Cursor::new(bytes)).map_err(|err| RotuloError::Spreadsheet {
                name: name.to_string(),
                detail: err.to_string(),
            })?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| RotuloError::Spreadsheet {
                name: name.to_string(),
                detail: "workbook has no sheets".into(),
            })?
            .map_err(|err| RotuloError::Spreadsheet {
                name: name.to_string(),
                detail: err.to_string(),
            })?;

        let mut rows = range.rows();
        let header = rows.next().ok_or_else(|| RotuloError::Spreadsheet {
            name: name.to_string(),
            detail: "sheet is empty".into(),
        })?;

        let mut columns: HashMap<String, usize> = HashMap::new();
        for (index, cell) in header.iter().enumerate() {
            let label = cell_text(cell).to_lowercase();
            if !label.is_empty() {
                columns.entry(label).or_insert(index);
            }
        }

        let order_col = *columns
            .get("order_sn")
            .ok_or_else(|| RotuloError::MissingColumn {
                name: name.to_string(),
                column: "order_sn".into(),
            })?;
        let info_col = *columns
            .get("product_info")
            .ok_or_else(|| RotuloError::MissingColumn {
                name: name.to_string(),
                column: "product_info".into(),
            })?;
        let tracking_col = columns.get("tracking_number").copied();

        let mut consumed = 0;
        for row in rows {
            let order_id = row.get(order_col).map(cell_text).unwrap_or_default();
            let product_info = row.get(info_col).map(cell_text).unwrap_or_default();
            if order_id.is_empty() || product_info.is_empty() {
                continue;
            }
            let tracking = tracking_col
                .and_then(|col| row.get(col))
                .map(cell_text)
                .unwrap_or_default();

            self.insert_row(&order_id, &product_info, &tracking);
            consumed += 1;
        }

        if consumed == 0 {
            warn!("manifest produced no rows");
        }
        info!(rows = consumed, orders = self.orders.len(), "manifest indexed");
        Ok(consumed)
    }

    /// Merge one manifest row into the index. Rows sharing an order id
    /// accumulate their line items in input order.
    pub fn insert_row(&mut self, order_id: &str, product_info: &str, tracking: &str) {
        let items = parse_product_info(product_info);

        let entry = self
            .orders
            .entry(order_id.to_string())
            .or_insert_with(|| OrderManifestEntry {
                order_id: order_id.to_string(),
                items: Vec::new(),
            });
        entry.items.extend(items);

        if !tracking.is_empty() {
            self.tracking_to_order
                .insert(tracking.to_string(), order_id.to_string());
        }
    }

    pub fn resolve(&self, order_id: &str) -> Option<&OrderManifestEntry> {
        self.orders.get(order_id)
    }

    /// Secondary lookup path: tracking code → order entry.
    pub fn resolve_by_tracking(&self, tracking: &str) -> Option<&OrderManifestEntry> {
        self.tracking_to_order
            .get(tracking)
            .and_then(|order_id| self.orders.get(order_id))
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Parse one product-info cell into line items, one per `[index]` block.
pub fn parse_product_info(product_info: &str) -> Vec<LineItem> {
    let mut items = Vec::new();

    for block in BLOCK_SPLIT.split(product_info) {
        if block.trim().is_empty() {
            continue;
        }

        let capture = |re: &Regex| -> String {
            re.captures(block)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        };

        let mut sku = capture(&PARENT_SKU);
        if sku.is_empty() {
            sku = capture(&PLAIN_SKU);
        }
        let description = capture(&PRODUCT_NAME);
        let variation = capture(&VARIATION_NAME);
        let quantity = capture(&QUANTITY).parse::<u32>().unwrap_or(1);

        if sku.is_empty() && description.is_empty() && variation.is_empty() {
            continue;
        }

        items.push(LineItem {
            sku,
            description,
            variation,
            quantity,
        });
    }

    items
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.trim().to_string(),
        Data::Float(value) => {
            if value.fract() == 0.0 {
                format!("{}", *value as i64)
            } else {
                value.to_string()
            }
        }
        Data::Int(value) => value.to_string(),
        other => other.to_string().trim().to_string(),
    }
}
