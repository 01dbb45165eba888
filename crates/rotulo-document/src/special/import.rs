// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Direct-import format — one file whose pages alternate label (even index)
// and paired tax-document page (odd index).
//
// The tax page carries everything the label itself lacks: document number,
// 44-digit access key, issuer, and the item table. Attribute text mixes
// Latin and non-Latin script; only the Latin part survives into the
// rendered item code.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use rotulo_core::error::Result;
use rotulo_core::sku::{attribute_code, clean_issuer_name};
use rotulo_core::types::{InputFile, LabelOrigin, LabelRecord, LineItem, Rect, StoreId};

use crate::pdf::PdfFile;
use crate::special::{ExtractContext, SpecialHandler};

static DOC_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)N.{0,2}mero:\s*(\d+)").expect("valid number pattern"));
static ACCESS_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{44})\b").expect("valid access-key pattern"));
static ISSUER_TAX_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CNPJ[^:\n]*:\s*(\d+)").expect("valid tax-id pattern"));
static ISSUER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"NOME/RAZ.{0,2}O SOCIAL[^:\n]*:\s*([^\n]+)").expect("valid issuer pattern")
});
static ITEM_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)ITEM\s+CONTE.*?QUANT\.?\s*\n(.*)").expect("valid item-section pattern")
});
static ATTRIBUTE_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z][a-z]*/.+)$").expect("valid attribute pattern"));

/// Everything extracted from one tax-document page.
#[derive(Debug, Default)]
struct TaxPageData {
    number: String,
    access_key: String,
    issuer_tax_id: String,
    issuer_name: String,
    items: Vec<LineItem>,
}

pub struct DirectImportHandler;

impl SpecialHandler for DirectImportHandler {
    fn name(&self) -> &'static str {
        "direct-import"
    }

    fn matches(&self, file_name: &str, config: &rotulo_core::config::EngineConfig) -> bool {
        config.is_direct_import_file(file_name)
    }

    #[instrument(skip(self, file, ctx), fields(file = %file.name))]
    fn extract(&self, file: &InputFile, ctx: &ExtractContext<'_>) -> Result<Vec<LabelRecord>> {
        let pdf = PdfFile::load(&file.bytes)?;
        let mut records = Vec::new();

        let page_count = pdf.page_count();
        let mut label_index = 0;
        while label_index + 1 < page_count {
            let tax_index = label_index + 1;
            let tax_text = match pdf.page_text(tax_index) {
                Ok(page) => page.full_text(),
                Err(err) => {
                    warn!(tax_index, %err, "unreadable tax page");
                    label_index += 2;
                    continue;
                }
            };

            let upper = tax_text.to_uppercase();
            if !upper.contains("DANFE") && !upper.contains("CHAVE") {
                warn!(label_index, tax_index, "paired page is not a tax document, skipping pair");
                label_index += 2;
                continue;
            }

            let data = parse_tax_page(&tax_text);
            if data.number.is_empty() {
                warn!(label_index, tax_index, "no document number on tax page, skipping pair");
                label_index += 2;
                continue;
            }

            // The batch invoice index, when it knows this document, is more
            // complete than the printed tax page.
            let invoice = ctx.invoices.get(&data.number);
            let access_key = invoice
                .map(|inv| inv.access_key.clone())
                .filter(|key| !key.is_empty())
                .or_else(|| (!data.access_key.is_empty()).then(|| data.access_key.clone()));
            let issuer_tax_id = invoice
                .map(|inv| inv.issuer_tax_id.clone())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| data.issuer_tax_id.clone());

            let store = if issuer_tax_id.is_empty() {
                StoreId::Unknown
            } else {
                StoreId::TaxId(issuer_tax_id)
            };
            let store_name =
                (!data.issuer_name.is_empty()).then(|| clean_issuer_name(&data.issuer_name));

            let (width, height) = pdf.page_size(label_index)?;

            debug!(
                label_index,
                number = %data.number,
                items = data.items.len(),
                "direct-import pair extracted"
            );
            records.push(LabelRecord {
                source_id: data.number.clone(),
                document_number: Some(data.number),
                order_id: None,
                access_key,
                store,
                store_name,
                origin: LabelOrigin::DirectImport,
                source_file: file.name.clone(),
                page_index: label_index,
                region: Rect::new(0.0, 0.0, width, height),
                items: data.items,
            });

            label_index += 2;
        }

        Ok(records)
    }
}

/// Parse the paired tax-document page.
fn parse_tax_page(text: &str) -> TaxPageData {
    let capture = |re: &Regex| -> String {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };

    let mut data = TaxPageData {
        number: capture(&DOC_NUMBER),
        access_key: capture(&ACCESS_KEY),
        issuer_tax_id: capture(&ISSUER_TAX_ID),
        issuer_name: capture(&ISSUER_NAME),
        items: Vec::new(),
    };
    data.items = parse_item_table(text);
    data
}

/// Parse the ITEM / CONTENT / ATTRIBUTES / QUANTITY table.
///
/// The PDF breaks table cells over arbitrary lines: the item code is the
/// first line, the quantity is the last numeric-only line, and everything
/// between is description followed by the attribute run (recognised by its
/// `Name/Colour-…` slash shape).
fn parse_item_table(text: &str) -> Vec<LineItem> {
    let Some(section) = ITEM_SECTION.captures(text) else {
        return Vec::new();
    };

    let lines: Vec<&str> = section[1]
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let item_code = lines[0];

    let mut quantity = 1u32;
    let mut quantity_index = lines.len();
    for (index, line) in lines.iter().enumerate().skip(1).rev() {
        if line.chars().all(|c| c.is_ascii_digit()) {
            quantity = line.parse().unwrap_or(1);
            quantity_index = index;
            break;
        }
    }

    let middle: String = lines[1..quantity_index].concat();
    let (description, attributes) = match ATTRIBUTE_TAIL.captures(&middle) {
        Some(caps) => {
            let attr_start = caps.get(1).map(|m| m.start()).unwrap_or(middle.len());
            (
                middle[..attr_start].trim().to_string(),
                caps[1].trim().to_string(),
            )
        }
        None => (middle.trim().to_string(), String::new()),
    };

    let code = {
        let cleaned = attribute_code(&attributes);
        if cleaned.is_empty() {
            item_code.to_string()
        } else {
            cleaned
        }
    };

    vec![LineItem {
        sku: code,
        description,
        variation: String::new(),
        quantity,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testpdf::{PageSpec, build_pdf};
    use rotulo_core::config::EngineConfig;
    use rotulo_core::types::InputKind;
    use rotulo_ingest::{InvoiceIndex, ManifestIndex};

    fn label_page() -> PageSpec {
        PageSpec::new(300.0, 420.0).block(
            20.0,
            30.0,
            9.0,
            &["PUDO-PGK 123", "Destinatario: Fulano"],
        )
    }

    fn tax_page(number: &str, key: &str) -> PageSpec {
        PageSpec::new(595.0, 842.0).block(
            30.0,
            40.0,
            8.0,
            &[
                "DANFE Simplificado - Etiqueta",
                &format!("Numero: {number}"),
                &format!("CHAVE DE ACESSO: {key}"),
                "CNPJ EMITENTE: 44556677000188",
                "NOME/RAZAO SOCIAL: IMPORTADORA GLOBAL LTDA",
                "ITEM CONTEUDO ATRIBUTOS QUANT.",
                "I12345",
                "Tenis esportivo cano baixo",
                "Rakka/Roxo-BR41/42",
                "2",
            ],
        )
    }

    fn context<'a>(
        config: &'a EngineConfig,
        invoices: &'a InvoiceIndex,
        manifest: &'a ManifestIndex,
    ) -> ExtractContext<'a> {
        ExtractContext {
            config,
            invoices,
            manifest,
        }
    }

    #[test]
    fn pairs_label_and_tax_pages() {
        let key = "12345678901234567890123456789012345678901234";
        let bytes = build_pdf(&[
            label_page(),
            tax_page("778899", key),
            label_page(),
            tax_page("778900", key),
        ]);
        let file = InputFile::new("shein crua.pdf", InputKind::LabelSheet, bytes);
        let config = EngineConfig::default();
        let invoices = InvoiceIndex::new();
        let manifest = ManifestIndex::new();

        let records = DirectImportHandler
            .extract(&file, &context(&config, &invoices, &manifest))
            .unwrap();

        assert_eq!(records.len(), 2);
        let first = &records[0];
        assert_eq!(first.source_id, "778899");
        assert_eq!(first.page_index, 0);
        assert_eq!(first.access_key.as_deref(), Some(key));
        assert_eq!(first.store, StoreId::TaxId("44556677000188".into()));
        assert_eq!(first.store_name.as_deref(), Some("Importadora Global"));
        assert_eq!(first.origin, LabelOrigin::DirectImport);
        assert_eq!(records[1].source_id, "778900");
        assert_eq!(records[1].page_index, 2);
    }

    #[test]
    fn item_table_parses_code_attributes_and_quantity() {
        let key = "12345678901234567890123456789012345678901234";
        let bytes = build_pdf(&[label_page(), tax_page("778899", key)]);
        let file = InputFile::new("shein crua.pdf", InputKind::LabelSheet, bytes);
        let config = EngineConfig::default();
        let invoices = InvoiceIndex::new();
        let manifest = ManifestIndex::new();

        let records = DirectImportHandler
            .extract(&file, &context(&config, &invoices, &manifest))
            .unwrap();

        let items = &records[0].items;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sku, "RakkaRoxoBR4142");
        assert_eq!(items[0].description, "Tenis esportivo cano baixo");
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn non_tax_pair_is_skipped() {
        let bytes = build_pdf(&[label_page(), label_page()]);
        let file = InputFile::new("shein crua.pdf", InputKind::LabelSheet, bytes);
        let config = EngineConfig::default();
        let invoices = InvoiceIndex::new();
        let manifest = ManifestIndex::new();

        let records = DirectImportHandler
            .extract(&file, &context(&config, &invoices, &manifest))
            .unwrap();
        assert!(records.is_empty());
    }
}
