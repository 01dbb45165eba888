// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout detection — classify a page into one of the known label-grid
// geometries.
//
// The detector is a prioritized chain of (geometry, minimum passing
// sub-regions) pairs over the page's extracted text. Majority acceptance
// comes first so partially-filled sheets keep their grid (a 2×2 sheet with
// one blank quadrant still crops as 2×2); single-hit acceptance follows;
// a page that matches nothing is one full-page label. Under-segmentation is
// preferred over losing a region.

use tracing::debug;

use rotulo_core::config::EngineConfig;
use rotulo_core::types::{LayoutGeometry, Rect};

use crate::patterns;
use crate::text::PageText;

/// Candidate chain in priority order: majority passes for the dominant 2×2
/// sheet format, then for the stacked full-width variant, then single-region
/// hits in the same order.
const CANDIDATES: &[(LayoutGeometry, usize)] = &[
    (LayoutGeometry::Grid2x2, 2),
    (LayoutGeometry::Stacked2x1, 2),
    (LayoutGeometry::Grid2x2, 1),
    (LayoutGeometry::Stacked2x1, 1),
];

/// Classifies pages into label-grid geometries.
#[derive(Debug, Clone, Copy)]
pub struct LayoutDetector {
    small_page_max_width: f32,
    min_region_text_len: usize,
}

impl LayoutDetector {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            small_page_max_width: config.small_page_max_width,
            min_region_text_len: config.min_region_text_len,
        }
    }

    /// Classify a page from its rendered size and extractable text.
    pub fn detect(&self, page: &PageText) -> LayoutGeometry {
        // Compact/pickup formats print one label per page; no grid can fit.
        if page.width <= self.small_page_max_width {
            return LayoutGeometry::FullPage;
        }

        for (candidate, min_passing) in CANDIDATES {
            let regions = candidate.regions(page.width, page.height);
            let passing = regions
                .iter()
                .filter(|region| self.region_has_label_evidence(page, region))
                .count();
            if passing >= *min_passing {
                debug!(?candidate, passing, "grid layout accepted");
                return *candidate;
            }
        }

        debug!("no grid candidate passed, falling back to full page");
        LayoutGeometry::FullPage
    }

    /// The evidence test for one sub-rectangle: enough extractable text plus
    /// any label marker. Deliberately independent of whether an invoice can
    /// be resolved — many labels have no invoice at crop time.
    pub fn region_has_label_evidence(&self, page: &PageText, region: &Rect) -> bool {
        if page.text_len_in(region) < self.min_region_text_len {
            return false;
        }
        patterns::has_label_markers(&page.text_in(region))
    }

    /// Minimum text length a region must carry to be cropped at all.
    pub fn min_region_text_len(&self) -> usize {
        self.min_region_text_len
    }
}
