// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page composer — one label per output page: embedded region image, access
// key barcode, product table with continuation pages, and a per-label page
// footer.

use std::collections::HashMap;

use lopdf::{Document, Object, Stream, dictionary};
use tracing::{debug, info, instrument, warn};

use rotulo_core::config::{DisplayMode, RenderConfig};
use rotulo_core::error::{Result, RotuloError};
use rotulo_core::types::{LabelOrigin, LabelRecord, LineItem};
use rotulo_document::PdfFile;

use crate::barcode;
use crate::content::ContentBuilder;
use crate::embed::{PdfRect, embed_region};
use crate::table::{LabelPlan, plan_label};

/// Independent document handles for the source files one store render
/// touches. Each store render builds its own set — the underlying decoder
/// is not shared across stores.
#[derive(Default)]
pub struct SourceSet {
    files: HashMap<String, PdfFile>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and register a source file under its batch name.
    pub fn load(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let file = PdfFile::load(bytes)?;
        self.files.insert(name.to_string(), file);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    fn get(&self, name: &str) -> Result<&PdfFile> {
        self.files
            .get(name)
            .ok_or_else(|| RotuloError::Compose(format!("source file '{name}' not loaded")))
    }
}

/// A finished per-store PDF.
pub struct ComposedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Renders ordered label records into the normalized output PDF.
pub struct PageComposer<'a> {
    config: &'a RenderConfig,
}

impl<'a> PageComposer<'a> {
    pub fn new(config: &'a RenderConfig) -> Self {
        Self { config }
    }

    /// Compose one page sequence per record, in order.
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn compose(&self, records: &[LabelRecord], sources: &SourceSet) -> Result<ComposedPdf> {
        let cfg = self.config;
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let helv_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let hebo_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids: Vec<Object> = Vec::new();

        for record in records {
            let source = sources.get(&record.source_file)?;
            let source_page = source.page_id(record.page_index)?;
            let (_, source_height) = source.page_size(record.page_index)?;

            let clip = PdfRect::from_region(&record.region, source_height);
            let xobject_id = embed_region(source.document(), source_page, clip, &mut doc)?;

            let plan = plan_label(
                cfg,
                record.region.width().max(1.0),
                record.region.height().max(1.0),
                record.item_count(),
            );

            for page_index in 0..plan.page_count() {
                let chunk = plan.chunks.get(page_index).cloned();
                let mut builder = ContentBuilder::new(cfg.page_height);

                self.place_image(&mut builder, &plan, &clip);
                let barcode_top = cfg.margin_top + plan.image_height + 2.0;
                self.draw_barcode_row(&mut builder, record, barcode_top);

                if let Some(chunk) = chunk {
                    let table_top = barcode_top + cfg.barcode_space;
                    match record.origin {
                        LabelOrigin::Declaration => {
                            self.draw_declaration_table(&mut builder, record, chunk, table_top);
                        }
                        _ => self.draw_product_table(&mut builder, record, chunk, table_top),
                    }
                }

                // Footer: 1-based index within this label's own sequence.
                builder.text(
                    "Helv",
                    6.0,
                    cfg.margin_left + 2.0,
                    cfg.page_height - cfg.margin_bottom + 2.0,
                    &format!("p.{}", page_index + 1),
                );

                let content_id = doc.add_object(Stream::new(dictionary! {}, builder.finish()));
                let resources = dictionary! {
                    "Font" => dictionary! {
                        "Helv" => helv_id,
                        "HeBo" => hebo_id,
                    },
                    "XObject" => dictionary! { "Lb" => xobject_id },
                };
                let page_id = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![
                        0.into(),
                        0.into(),
                        cfg.page_width.into(),
                        cfg.page_height.into(),
                    ],
                    "Resources" => resources,
                    "Contents" => content_id,
                });
                kids.push(page_id.into());
            }

            debug!(
                source_id = %record.source_id,
                pages = plan.page_count(),
                "label composed"
            );
        }

        let page_count = kids.len();
        let count = page_count as i64;
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
        doc.save_to(&mut bytes)
            .map_err(|err| RotuloError::Compose(format!("serialize output: {err}")))?;

        info!(page_count, "store PDF composed");
        Ok(ComposedPdf { bytes, page_count })
    }

    /// Place the embedded region scaled into the top band of the page.
    fn place_image(&self, builder: &mut ContentBuilder, plan: &LabelPlan, clip: &PdfRect) {
        let cfg = self.config;
        let dest_bottom = cfg.page_height - cfg.margin_top - plan.image_height;
        let tx = cfg.margin_left - plan.scale * clip.x0;
        let ty = dest_bottom - plan.scale * clip.y0;
        builder.xobject("Lb", plan.scale, tx, ty);
    }

    /// Barcode of the access key, or the placeholder box for labels in the
    /// "no invoice" state.
    fn draw_barcode_row(&self, builder: &mut ContentBuilder, record: &LabelRecord, y_top: f32) {
        let cfg = self.config;
        let x0 = cfg.margin_left + 5.0;
        let x1 = cfg.page_width - cfg.margin_right - 5.0;
        let width = x1 - x0;

        if let Some(key) = record.access_key.as_deref() {
            match barcode::encode(key) {
                Ok(modules) => {
                    let module_width = width / modules.len() as f32;
                    for (offset, run) in barcode::bar_runs(&modules) {
                        builder.fill_rect(
                            x0 + offset as f32 * module_width,
                            y_top,
                            run as f32 * module_width,
                            cfg.barcode_height,
                        );
                    }
                    return;
                }
                Err(err) => {
                    warn!(%err, "barcode encoding failed, rendering placeholder");
                }
            }
        }

        // No access key: an outlined box carrying the source identity is
        // visibly distinct from any real barcode.
        builder.stroke_rect(x0, y_top, width, cfg.barcode_height, 0.8);
        builder.text(
            "HeBo",
            cfg.emphasis_font_size(),
            x0 + 8.0,
            y_top + cfg.barcode_height / 2.0 + 3.0,
            &format!("SEM NF  {}", record.source_id),
        );
    }

    /// Standard product table: code/description columns by display mode.
    fn draw_product_table(
        &self,
        builder: &mut ContentBuilder,
        record: &LabelRecord,
        chunk: std::ops::Range<usize>,
        y_start: f32,
    ) {
        let cfg = self.config;
        let fs = cfg.font_size;
        let fs_emph = cfg.emphasis_font_size();
        let line_h = cfg.line_height();
        let x0 = cfg.margin_left;
        let x1 = cfg.page_width - cfg.margin_right;
        let col_code = x0 + 2.0;
        let col_desc = x0 + 95.0;
        let col_qty = x1 - 25.0;

        let mut y = y_start;
        builder.line(x0, y, x1, y, 0.8, 0.0);
        y += line_h;

        let header_main = match cfg.display_mode {
            DisplayMode::Title => "PRODUTO",
            _ => "CODIGO",
        };
        builder.text("HeBo", fs, col_code, y, header_main);

        let number = record.document_number.as_deref().unwrap_or("-");
        let header_detail = format!(
            "PROD. (NF: {} T-ITENS: {} T-QUANT: {})",
            number,
            record.item_count(),
            record.total_quantity()
        );
        builder.text("HeBo", fs, col_desc, y, &header_detail);
        builder.text("HeBo", fs, col_qty, y, "Q.");

        y += 2.0;
        builder.line(x0, y, x1, y, 0.5, 0.0);
        y += line_h;

        let items = &record.items[chunk.clone()];
        for (index, item) in items.iter().enumerate() {
            match cfg.display_mode {
                DisplayMode::Title => {
                    let main = if item.description.is_empty() {
                        &item.sku
                    } else {
                        &item.description
                    };
                    builder.text("HeBo", fs_emph, col_code, y, &truncate(main, 40));
                }
                DisplayMode::Both => {
                    builder.text("HeBo", fs_emph, col_code, y, &item.sku);
                    builder.text("Helv", fs, col_desc, y, &truncate(&item.description, 30));
                }
                DisplayMode::Sku => {
                    builder.text("HeBo", fs_emph, col_code, y, &item.sku);
                    builder.text("Helv", fs, col_desc, y, "-");
                }
            }
            builder.text("HeBo", fs_emph, col_qty, y, &item.quantity.to_string());
            y += line_h;

            if index + 1 < items.len() {
                builder.line(x0, y - 1.0, x1, y - 1.0, 0.3, 0.6);
            }
        }

        builder.line(x0, y, x1, y, 0.8, 0.0);
        builder.line(col_desc - 5.0, y_start, col_desc - 5.0, y, 0.5, 0.0);
        builder.line(col_qty - 5.0, y_start, col_qty - 5.0, y, 0.5, 0.0);
    }

    /// Declaration-flavor table: SKU / variation columns with an order-id
    /// header line.
    fn draw_declaration_table(
        &self,
        builder: &mut ContentBuilder,
        record: &LabelRecord,
        chunk: std::ops::Range<usize>,
        y_start: f32,
    ) {
        let cfg = self.config;
        let fs = cfg.font_size;
        let fs_emph = cfg.emphasis_font_size();
        let line_h = cfg.line_height();
        let x0 = cfg.margin_left;
        let x1 = cfg.page_width - cfg.margin_right;
        let col_sku = x0 + 2.0;
        let col_var = x0 + 50.0;
        let col_qty = x1 - 35.0;

        let order = record.order_id.as_deref().unwrap_or(&record.source_id);
        let header = format!(
            "Pedido: {}    Total Itens: {}    Total Quantidade: {}",
            order,
            record.item_count(),
            record.total_quantity()
        );

        let mut y = y_start;
        builder.text("HeBo", fs, col_sku, y, &header);
        y += 2.0;
        builder.line(x0, y, x1, y, 0.8, 0.0);
        let rules_top = y;
        y += line_h;

        let (header_sku, header_var) = match cfg.display_mode {
            DisplayMode::Title => ("PRODUTO", "VARIACAO"),
            DisplayMode::Both => ("SKU", "PRODUTO"),
            DisplayMode::Sku => ("SKU", "VARIACAO"),
        };
        builder.text("HeBo", fs, col_sku, y, header_sku);
        builder.text("HeBo", fs, col_var, y, header_var);
        builder.text("HeBo", fs, col_qty, y, "Quant");
        y += 2.0;
        builder.line(x0, y, x1, y, 0.5, 0.0);
        y += line_h;

        let items = &record.items[chunk.clone()];
        for (index, item) in items.iter().enumerate() {
            let (main, secondary) = declaration_columns(cfg.display_mode, item);
            builder.text(
                "HeBo",
                fs_emph,
                col_sku,
                y,
                if main.is_empty() { "-" } else { main.as_str() },
            );
            builder.text(
                "Helv",
                fs,
                col_var,
                y,
                if secondary.is_empty() { "-" } else { secondary.as_str() },
            );
            builder.text("HeBo", fs_emph, col_qty, y, &item.quantity.to_string());
            y += line_h;

            if index + 1 < items.len() {
                builder.line(x0, y - 1.0, x1, y - 1.0, 0.3, 0.6);
            }
        }

        builder.line(x0, y, x1, y, 0.8, 0.0);
        builder.line(col_var - 5.0, rules_top, col_var - 5.0, y, 0.5, 0.0);
        builder.line(col_qty - 5.0, rules_top, col_qty - 5.0, y, 0.5, 0.0);
    }
}

/// Column texts for a declaration-table row under each display mode.
fn declaration_columns(mode: DisplayMode, item: &LineItem) -> (String, String) {
    match mode {
        DisplayMode::Title => {
            let main = if item.description.is_empty() {
                &item.sku
            } else {
                &item.description
            };
            (truncate(main, 10), truncate(&item.variation, 45))
        }
        DisplayMode::Both => {
            let secondary = if item.description.is_empty() {
                &item.variation
            } else {
                &item.description
            };
            (truncate(&item.sku, 10), truncate(secondary, 45))
        }
        DisplayMode::Sku => (
            truncate(&item.sku, 10),
            truncate(&item.variation.to_uppercase(), 45),
        ),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars.saturating_sub(2)).collect();
    format!("{head}..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotulo_core::types::{LabelOrigin, Rect, StoreId};
    use rotulo_document::testpdf::{PageSpec, build_pdf, grid_sheet_page, label_lines};

    fn record_with_items(count: usize) -> LabelRecord {
        LabelRecord {
            source_id: "12345".into(),
            document_number: Some("12345".into()),
            order_id: None,
            access_key: Some("35240134847700000101550010000123451000123450".into()),
            store: StoreId::TaxId("111".into()),
            store_name: None,
            origin: LabelOrigin::Sheet,
            source_file: "sheet.pdf".into(),
            page_index: 0,
            region: Rect::new(0.0, 0.0, 300.0, 400.0),
            items: (0..count)
                .map(|i| LineItem::new(format!("SKU-{i:02}"), format!("Produto {i}"), 1))
                .collect(),
        }
    }

    fn sources_with_sheet() -> SourceSet {
        let quadrants: Vec<Vec<String>> = (0..4)
            .map(|i| label_lines(&format!("1234{i}"), "Loja Azul"))
            .collect();
        let bytes = build_pdf(&[grid_sheet_page(&quadrants)]);
        let mut sources = SourceSet::new();
        sources.load("sheet.pdf", &bytes).unwrap();
        sources
    }

    fn page_count_of(bytes: &[u8]) -> usize {
        lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn one_label_without_overflow_is_one_page() {
        let config = RenderConfig::default();
        let composer = PageComposer::new(&config);
        let sources = sources_with_sheet();

        let composed = composer
            .compose(&[record_with_items(3)], &sources)
            .unwrap();
        assert_eq!(composed.page_count, 1);
        assert_eq!(page_count_of(&composed.bytes), 1);
    }

    #[test]
    fn twenty_three_items_produce_three_pages() {
        let config = RenderConfig::default();
        let composer = PageComposer::new(&config);
        let sources = sources_with_sheet();

        let composed = composer
            .compose(&[record_with_items(23)], &sources)
            .unwrap();
        assert_eq!(composed.page_count, 3);
        assert_eq!(page_count_of(&composed.bytes), 3);
    }

    #[test]
    fn missing_source_file_is_a_compose_error() {
        let config = RenderConfig::default();
        let composer = PageComposer::new(&config);
        let sources = SourceSet::new();

        let result = composer.compose(&[record_with_items(1)], &sources);
        assert!(result.is_err());
    }

    #[test]
    fn label_without_key_renders_placeholder_page() {
        let config = RenderConfig::default();
        let composer = PageComposer::new(&config);
        let sources = sources_with_sheet();

        let mut record = record_with_items(0);
        record.access_key = None;
        record.document_number = None;
        record.source_id = "sheet-p0-q0".into();

        let composed = composer.compose(&[record], &sources).unwrap();
        assert_eq!(composed.page_count, 1);

        // The placeholder text lands in the page content stream.
        let doc = lopdf::Document::load_mem(&composed.bytes).unwrap();
        let pages = doc.get_pages();
        let content = doc.get_page_content(pages[&1]).unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(text.contains("SEM NF  sheet-p0-q0"));
    }

    #[test]
    fn output_pages_use_configured_size() {
        let config = RenderConfig::default();
        let composer = PageComposer::new(&config);
        let sources = sources_with_sheet();

        let composed = composer
            .compose(&[record_with_items(1)], &sources)
            .unwrap();
        let file = rotulo_document::PdfFile::load(&composed.bytes).unwrap();
        let (width, height) = file.page_size(0).unwrap();
        assert!((width - config.page_width).abs() < 0.01);
        assert!((height - config.page_height).abs() < 0.01);
    }
}
