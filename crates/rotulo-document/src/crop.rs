// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region cropper — turn the sub-regions of a classified page into label
// records, resolving invoice/manifest data or assigning synthetic
// identities.

use tracing::{debug, instrument};

use rotulo_core::config::EngineConfig;
use rotulo_core::types::{
    LabelOrigin, LabelRecord, LayoutGeometry, LineItem, StoreId, synthetic_source_id,
};
use rotulo_ingest::{InvoiceIndex, ManifestIndex};

use crate::layout::LayoutDetector;
use crate::patterns;
use crate::sender;
use crate::text::PageText;

/// Crops classified pages into label records.
///
/// Holds read-only references to the batch indexes; one cropper serves the
/// whole generic pipeline.
pub struct RegionCropper<'a> {
    invoices: &'a InvoiceIndex,
    manifest: &'a ManifestIndex,
    detector: LayoutDetector,
}

impl<'a> RegionCropper<'a> {
    pub fn new(
        config: &EngineConfig,
        invoices: &'a InvoiceIndex,
        manifest: &'a ManifestIndex,
    ) -> Self {
        Self {
            invoices,
            manifest,
            detector: LayoutDetector::new(config),
        }
    }

    pub fn detector(&self) -> &LayoutDetector {
        &self.detector
    }

    /// Detect the page layout and crop every populated sub-region.
    #[instrument(skip(self, page), fields(file = file_stem, page_index))]
    pub fn crop_page(
        &self,
        file_name: &str,
        file_stem: &str,
        page_index: usize,
        page: &PageText,
    ) -> Vec<LabelRecord> {
        let geometry = self.detector.detect(page);
        self.crop_page_as(file_name, file_stem, page_index, page, geometry)
    }

    /// Crop a page under an already-chosen geometry. Sub-regions without
    /// enough text (blank quadrants of a partial sheet) are skipped.
    pub fn crop_page_as(
        &self,
        file_name: &str,
        file_stem: &str,
        page_index: usize,
        page: &PageText,
        geometry: LayoutGeometry,
    ) -> Vec<LabelRecord> {
        let mut records = Vec::new();

        for (quadrant, region) in geometry
            .regions(page.width, page.height)
            .into_iter()
            .enumerate()
        {
            if page.text_len_in(&region) < self.detector.min_region_text_len() {
                continue;
            }
            let text = page.text_in(&region);

            let document_number = patterns::extract_document_number(&text);
            let invoice = document_number
                .as_deref()
                .and_then(|number| self.invoices.get(number));

            let mut access_key = None;
            let mut items: Vec<LineItem> = Vec::new();
            let mut store = StoreId::Unknown;

            if let Some(invoice) = invoice {
                if !invoice.access_key.is_empty() {
                    access_key = Some(invoice.access_key.clone());
                }
                if !invoice.issuer_tax_id.is_empty() {
                    store = StoreId::TaxId(invoice.issuer_tax_id.clone());
                }
                items = invoice.items.clone();
            }

            // Manifest fallback: labels without invoice items often print
            // the order id (or at least the tracking code) the manifest is
            // keyed by.
            let mut order_id = None;
            if items.is_empty()
                && let Some(entry) = self.lookup_manifest(&text)
            {
                debug!(order_id = %entry.order_id, "resolved items via manifest");
                items = entry.items.clone();
                order_id = Some(entry.order_id.clone());
            }

            // Sender name doubles as store identity when no invoice matched
            // and as a display-name hint otherwise.
            let store_name = sender::extract_sender_store(&text);
            if store == StoreId::Unknown
                && let Some(name) = &store_name
            {
                store = StoreId::Named(name.clone());
            }

            let source_id = match &document_number {
                Some(number) => number.clone(),
                None => {
                    debug!(quadrant, "no document number, assigning synthetic identity");
                    synthetic_source_id(file_stem, page_index, quadrant)
                }
            };

            records.push(LabelRecord {
                source_id,
                document_number: document_number.clone(),
                order_id,
                access_key,
                store,
                store_name,
                origin: LabelOrigin::Sheet,
                source_file: file_name.to_string(),
                page_index,
                region,
                items,
            });
        }

        records
    }

    fn lookup_manifest(&self, text: &str) -> Option<&rotulo_core::types::OrderManifestEntry> {
        if self.manifest.is_empty() {
            return None;
        }
        if let Some(order_id) = patterns::extract_order_id(text)
            && let Some(entry) = self.manifest.resolve(&order_id)
        {
            return Some(entry);
        }
        patterns::extract_tracking(text)
            .and_then(|tracking| self.manifest.resolve_by_tracking(&tracking))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PdfFile;
    use crate::testpdf::{build_pdf, grid_sheet_page, label_lines};
    use rotulo_core::types::InvoiceRecord;

    fn sheet_page_text(quadrants: &[Vec<String>]) -> PageText {
        let bytes = build_pdf(&[grid_sheet_page(quadrants)]);
        PdfFile::load(&bytes).unwrap().page_text(0).unwrap()
    }

    fn invoice(number: &str, tax_id: &str, sku: &str) -> InvoiceRecord {
        InvoiceRecord {
            number: number.into(),
            series: "1".into(),
            issued_at: String::new(),
            access_key: format!("{:0>44}", number),
            issuer_tax_id: tax_id.into(),
            issuer_name: "LOJA AZUL LTDA".into(),
            items: vec![LineItem::new(sku, "produto", 1)],
        }
    }

    #[test]
    fn resolved_quadrants_attach_invoice_data() {
        let mut invoices = InvoiceIndex::new();
        invoices.insert(invoice("12340", "111", "TEN-A"));
        invoices.insert(invoice("12341", "111", "TEN-B"));
        invoices.insert(invoice("12342", "222", "TEN-C"));
        invoices.insert(invoice("12343", "222", "TEN-D"));
        let manifest = ManifestIndex::new();
        let config = EngineConfig::default();
        let cropper = RegionCropper::new(&config, &invoices, &manifest);

        let quadrants: Vec<Vec<String>> = (0..4)
            .map(|i| label_lines(&format!("1234{i}"), "Loja Azul"))
            .collect();
        let page = sheet_page_text(&quadrants);

        let records = cropper.crop_page("sheet.pdf", "sheet", 0, &page);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].source_id, "12340");
        assert_eq!(records[0].store, StoreId::TaxId("111".into()));
        assert_eq!(records[0].items[0].sku, "TEN-A");
        assert!(records[0].access_key.is_some());
        assert_eq!(records[0].store_name.as_deref(), Some("Loja Azul"));
    }

    #[test]
    fn unresolved_quadrant_gets_synthetic_identity_and_named_store() {
        let invoices = InvoiceIndex::new();
        let manifest = ManifestIndex::new();
        let config = EngineConfig::default();
        let cropper = RegionCropper::new(&config, &invoices, &manifest);

        // No document number anywhere: marker-only label text.
        let lines = vec![
            "DANFE Simplificado".to_string(),
            "REMETENTE".to_string(),
            "BR261920610412I".to_string(),
            "Loja Verde".to_string(),
            "Rua das Flores 123".to_string(),
        ];
        let quadrants = vec![lines.clone(), lines.clone(), lines.clone(), lines];
        let page = sheet_page_text(&quadrants);

        let records = cropper.crop_page("loja verde.pdf", "loja verde", 3, &page);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].source_id, "loja verde-p3-q0");
        assert_eq!(records[1].source_id, "loja verde-p3-q1");
        assert!(records[0].document_number.is_none());
        assert_eq!(records[0].store, StoreId::Named("Loja Verde".into()));
        assert!(records[0].items.is_empty());
    }

    #[test]
    fn manifest_fills_items_when_invoice_is_missing() {
        let invoices = InvoiceIndex::new();
        let mut manifest = ManifestIndex::new();
        manifest.insert_row(
            "2602061BMTVXW0",
            "[1] Parent SKU Reference No.: TEN-RUN; Quantity: 2;",
            "BR261920610412I",
        );
        let config = EngineConfig::default();
        let cropper = RegionCropper::new(&config, &invoices, &manifest);

        let quadrants: Vec<Vec<String>> = (0..4)
            .map(|_| label_lines("", "Loja Azul"))
            .collect();
        let page = sheet_page_text(&quadrants);

        let records = cropper.crop_page("sheet.pdf", "sheet", 0, &page);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].items.len(), 1);
        assert_eq!(records[0].items[0].sku, "TEN-RUN");
        assert_eq!(records[0].total_quantity(), 2);
    }
}
