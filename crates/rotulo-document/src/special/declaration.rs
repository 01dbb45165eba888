// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Declaration (CPF) format — label pages backed by the order manifest
// instead of tax documents.
//
// Source pages are oversized relative to their content, so full-page labels
// are auto-cropped to the non-blank bounding box. Large pages may still
// carry a grid and are sub-divided with the shared layout detector.

use tracing::{debug, instrument, warn};

use rotulo_core::error::Result;
use rotulo_core::types::{
    InputFile, LabelOrigin, LabelRecord, LayoutGeometry, StoreId, synthetic_source_id,
};

use crate::layout::LayoutDetector;
use crate::patterns;
use crate::pdf::PdfFile;
use crate::special::{ExtractContext, SpecialHandler};

/// Padding around the auto-cropped content box, in points.
const AUTOCROP_PAD: f32 = 2.0;

pub struct DeclarationHandler;

impl SpecialHandler for DeclarationHandler {
    fn name(&self) -> &'static str {
        "declaration"
    }

    fn matches(&self, file_name: &str, config: &rotulo_core::config::EngineConfig) -> bool {
        config.is_declaration_file(file_name)
    }

    #[instrument(skip(self, file, ctx), fields(file = %file.name))]
    fn extract(&self, file: &InputFile, ctx: &ExtractContext<'_>) -> Result<Vec<LabelRecord>> {
        let pdf = PdfFile::load(&file.bytes)?;
        let detector = LayoutDetector::new(ctx.config);
        let mut records = Vec::new();

        for page_index in 0..pdf.page_count() {
            let page = match pdf.page_text(page_index) {
                Ok(page) => page,
                Err(err) => {
                    warn!(page_index, %err, "unreadable declaration page");
                    continue;
                }
            };

            // Small pages are always one label; large pages may be gridded.
            let geometry = if page.width > ctx.config.small_page_max_width {
                detector.detect(&page)
            } else {
                LayoutGeometry::FullPage
            };

            for (quadrant, region) in geometry
                .regions(page.width, page.height)
                .into_iter()
                .enumerate()
            {
                if page.text_len_in(&region) < ctx.config.min_region_text_len {
                    continue;
                }
                let text = page.text_in(&region);

                let order_id = patterns::extract_order_id(&text);
                let items = order_id
                    .as_deref()
                    .and_then(|order| ctx.manifest.resolve(order))
                    .map(|entry| entry.items.clone())
                    .unwrap_or_default();
                if items.is_empty() {
                    warn!(page_index, quadrant, ?order_id, "declaration label without manifest match");
                }

                // Source pages are oversized relative to their content:
                // crop each label to the non-blank bounding box inside its
                // sub-region.
                let crop = page.content_bbox_in(&region, AUTOCROP_PAD).unwrap_or(region);

                debug!(page_index, quadrant, ?order_id, items = items.len(), "declaration label");
                records.push(LabelRecord {
                    source_id: synthetic_source_id(file.stem(), page_index, quadrant),
                    document_number: None,
                    order_id: order_id.clone(),
                    access_key: None,
                    store: StoreId::Declaration,
                    store_name: None,
                    origin: LabelOrigin::Declaration,
                    source_file: file.name.clone(),
                    page_index,
                    region: crop,
                    items,
                });
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testpdf::{PageSpec, build_pdf};
    use rotulo_core::config::EngineConfig;
    use rotulo_core::types::InputKind;
    use rotulo_ingest::{InvoiceIndex, ManifestIndex};

    fn declaration_page(order_id: &str) -> PageSpec {
        // A4-sized page with content confined to the upper-left corner.
        PageSpec::new(595.0, 842.0).block(
            30.0,
            40.0,
            9.0,
            &[
                "DECLARACAO DE CONTEUDO",
                &format!("Pedido: {order_id}"),
                "REMETENTE",
            ],
        )
    }

    #[test]
    fn resolves_manifest_items_and_autocrops() {
        let invoices = InvoiceIndex::new();
        let mut manifest = ManifestIndex::new();
        manifest.insert_row(
            "2602061BMTVXW0",
            "[1] Parent SKU Reference No.: CAN-AZ; Quantity: 1; \
             [2] Parent SKU Reference No.: CAN-VM; Quantity: 2;",
            "",
        );
        let config = EngineConfig::default();
        let ctx = ExtractContext {
            config: &config,
            invoices: &invoices,
            manifest: &manifest,
        };

        let bytes = build_pdf(&[declaration_page("2602061BMTVXW0")]);
        let file = InputFile::new("lanim.pdf", InputKind::LabelSheet, bytes);

        let records = DeclarationHandler.extract(&file, &ctx).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.store, StoreId::Declaration);
        assert_eq!(record.origin, LabelOrigin::Declaration);
        assert_eq!(record.source_id, "lanim-p0-q0");
        assert!(record.document_number.is_none());
        assert_eq!(record.items.len(), 2);
        assert_eq!(record.total_quantity(), 3);

        // Auto-crop hugs the corner content instead of keeping the A4 page.
        assert!(record.region.x1 < 595.0 / 2.0);
        assert!(record.region.y1 < 842.0 / 4.0);
    }

    #[test]
    fn unmatched_label_keeps_empty_items() {
        let invoices = InvoiceIndex::new();
        let manifest = ManifestIndex::new();
        let config = EngineConfig::default();
        let ctx = ExtractContext {
            config: &config,
            invoices: &invoices,
            manifest: &manifest,
        };

        let bytes = build_pdf(&[declaration_page("2602061XXXXXX0")]);
        let file = InputFile::new("lanim 2.pdf", InputKind::LabelSheet, bytes);

        let records = DeclarationHandler.extract(&file, &ctx).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].items.is_empty());
        assert_eq!(records[0].source_id, "lanim 2-p0-q0");
    }
}
