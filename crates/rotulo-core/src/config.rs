// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use serde::{Deserialize, Serialize};

/// Conversion factor: 1 mm = 72/25.4 pt.
pub const MM_TO_PT: f32 = 72.0 / 25.4;

/// What the main column of the product table shows for each line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Product code only (default).
    Sku,
    /// Description only.
    Title,
    /// Code and description side by side.
    Both,
}

/// Page geometry and table styling for the output PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output page width in points (default 150 mm).
    pub page_width: f32,
    /// Output page height in points (default 230 mm).
    pub page_height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    /// Base font size for the product table.
    pub font_size: f32,
    pub display_mode: DisplayMode,
    /// Hard cap on product rows per page; the rest spill to continuation pages.
    pub max_rows_per_page: usize,
    /// The label image never shrinks below this fraction of the page height.
    pub min_image_ratio: f32,
    /// Vertical space reserved for the barcode row when an access key exists.
    pub barcode_space: f32,
    /// Drawn height of the barcode bars.
    pub barcode_height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_width: 150.0 * MM_TO_PT,
            page_height: 230.0 * MM_TO_PT,
            margin_left: 8.0,
            margin_right: 8.0,
            margin_top: 5.0,
            margin_bottom: 5.0,
            font_size: 7.0,
            display_mode: DisplayMode::Sku,
            max_rows_per_page: 10,
            min_image_ratio: 0.45,
            barcode_space: 37.0,
            barcode_height: 35.0,
        }
    }
}

impl RenderConfig {
    /// Usable width between the horizontal margins.
    pub fn usable_width(&self) -> f32 {
        self.page_width - self.margin_left - self.margin_right
    }

    /// Emphasized font size used for SKU and quantity cells.
    pub fn emphasis_font_size(&self) -> f32 {
        (self.font_size * 1.5).round()
    }

    /// Row advance for product table lines.
    pub fn line_height(&self) -> f32 {
        self.emphasis_font_size() + 2.0
    }
}

/// Batch-level knobs: special-format routing and layout thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub render: RenderConfig,
    /// Filename prefix family routed to the declaration (CPF) handler.
    pub declaration_prefix: String,
    /// Fixed filename routed to the direct-import handler.
    pub direct_import_file: String,
    /// Pages at or below this width are always a single full-page label.
    pub small_page_max_width: f32,
    /// Minimum extractable text length for a region to count as a label.
    pub min_region_text_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            declaration_prefix: "lanim".into(),
            direct_import_file: "shein crua.pdf".into(),
            small_page_max_width: 400.0,
            min_region_text_len: 10,
        }
    }
}

impl EngineConfig {
    /// True when `file_name` belongs to the declaration filename family.
    pub fn is_declaration_file(&self, file_name: &str) -> bool {
        file_name
            .to_lowercase()
            .starts_with(&self.declaration_prefix.to_lowercase())
    }

    /// True when `file_name` is the direct-import input.
    pub fn is_direct_import_file(&self, file_name: &str) -> bool {
        file_name.eq_ignore_ascii_case(&self.direct_import_file)
    }
}
