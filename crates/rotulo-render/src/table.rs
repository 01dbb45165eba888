// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-label layout planning: how tall the embedded label image renders and
// how the product rows split across the label's page sequence.

use std::ops::Range;

use rotulo_core::config::RenderConfig;

/// Vertical space of the table header block.
pub const HEADER_SPACE: f32 = 20.0;
/// Safety allowance below the table.
pub const TABLE_ALLOWANCE: f32 = 15.0;

/// Layout of one label across its page sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlan {
    /// Uniform scale applied to the cropped region.
    pub scale: f32,
    /// Rendered image height in points.
    pub image_height: f32,
    /// Product-row ranges, one entry per page. Empty when the label renders
    /// without a table.
    pub chunks: Vec<Range<usize>>,
}

impl LabelPlan {
    /// Number of output pages this label occupies.
    pub fn page_count(&self) -> usize {
        self.chunks.len().max(1)
    }
}

/// Plan a label's page sequence.
///
/// The image scales uniformly to the usable width; when a product table is
/// present its space requirement pushes the image smaller, but never below
/// the configured fraction of the page height. Rows beyond what fits under
/// the clamped image (and beyond the fixed per-page cap) spill to
/// continuation pages.
pub fn plan_label(
    config: &RenderConfig,
    clip_width: f32,
    clip_height: f32,
    item_count: usize,
) -> LabelPlan {
    let usable_width = config.usable_width();
    let usable_height = config.page_height - config.margin_top - config.margin_bottom;
    let full_height = clip_height * (usable_width / clip_width);
    // The barcode row is always reserved: labels without an access key
    // render a placeholder box of the same height.
    let barcode_space = config.barcode_space;

    if item_count == 0 {
        // Image plus barcode row only, at full height.
        let image_height = full_height.min(usable_height - barcode_space);
        let scale = (usable_width / clip_width).min(image_height / clip_height);
        return LabelPlan {
            scale,
            image_height: clip_height * scale,
            chunks: Vec::new(),
        };
    }

    let line_height = config.line_height();
    let first_page_rows = item_count.min(config.max_rows_per_page);
    let table_space =
        barcode_space + HEADER_SPACE + first_page_rows as f32 * line_height + TABLE_ALLOWANCE;

    let mut image_height = full_height;
    let max_image_height = usable_height - table_space;
    if image_height > max_image_height {
        image_height = max_image_height.max(config.page_height * config.min_image_ratio);
    }
    let scale = (usable_width / clip_width).min(image_height / clip_height);
    let image_height = clip_height * scale;

    let available =
        usable_height - image_height - barcode_space - HEADER_SPACE - TABLE_ALLOWANCE;
    let rows_per_page = ((available / line_height).floor() as usize)
        .clamp(1, config.max_rows_per_page);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < item_count {
        let end = (start + rows_per_page).min(item_count);
        chunks.push(start..end);
        start = end;
    }

    LabelPlan {
        scale,
        image_height,
        chunks,
    }
}
