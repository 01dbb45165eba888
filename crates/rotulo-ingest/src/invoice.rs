// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Invoice index — tax-document XML records loaded from ZIP archives and
// looked up by document number.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use chrono::NaiveDateTime;
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use rotulo_core::error::{Result, RotuloError};
use rotulo_core::sku::clean_issuer_name;
use rotulo_core::types::{InvoiceRecord, LineItem};

/// In-memory lookup of parsed tax documents, keyed by document number.
///
/// Built once per batch from every archive in the input set, then only read.
/// The first record seen for a document number wins; later duplicates are
/// ignored.
#[derive(Debug, Default)]
pub struct InvoiceIndex {
    records: HashMap<String, InvoiceRecord>,
    /// Issuer tax id → cleaned display name, fed to the store directory.
    issuer_names: HashMap<String, String>,
}

impl InvoiceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.xml` entry of a ZIP archive. Malformed entries are
    /// skipped; returns the number of new records indexed.
    #[instrument(skip(self, bytes), fields(archive = name, bytes_len = bytes.len()))]
    pub fn load_archive(&mut self, name: &str, bytes: &[u8]) -> Result<usize> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|err| {
            RotuloError::Archive {
                name: name.to_string(),
                detail: err.to_string(),
            }
        })?;

        let mut added = 0;
        let mut skipped = 0;

        for index in 0..archive.len() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(index, %err, "unreadable archive entry");
                    skipped += 1;
                    continue;
                }
            };

            if !entry.name().to_lowercase().ends_with(".xml") {
                continue;
            }

            let mut content = Vec::with_capacity(entry.size() as usize);
            if entry.read_to_end(&mut content).is_err() {
                skipped += 1;
                continue;
            }

            match parse_invoice_xml(&content) {
                Ok(record) => {
                    if self.insert(record) {
                        added += 1;
                    }
                }
                Err(err) => {
                    debug!(entry = entry.name(), %err, "skipping unparseable XML entry");
                    skipped += 1;
                }
            }
        }

        info!(added, skipped, "archive indexed");
        Ok(added)
    }

    /// Insert a record; returns false when the document number was already
    /// indexed (first-seen wins) or empty.
    pub fn insert(&mut self, record: InvoiceRecord) -> bool {
        if record.number.is_empty() || self.records.contains_key(&record.number) {
            return false;
        }
        if !record.issuer_tax_id.is_empty() {
            self.issuer_names
                .entry(record.issuer_tax_id.clone())
                .or_insert_with(|| clean_issuer_name(&record.issuer_name));
        }
        self.records.insert(record.number.clone(), record);
        true
    }

    pub fn get(&self, document_number: &str) -> Option<&InvoiceRecord> {
        self.records.get(document_number)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Issuer tax id → cleaned display name pairs collected during loading.
    pub fn issuer_names(&self) -> impl Iterator<Item = (&String, &String)> {
        self.issuer_names.iter()
    }
}

/// Parse one NF-e XML document into an [`InvoiceRecord`].
///
/// Tag lookup goes by local name so the NF-e default namespace (and the
/// occasional namespace-less export) both work.
pub fn parse_invoice_xml(content: &[u8]) -> Result<InvoiceRecord> {
    let text = String::from_utf8_lossy(content);
    let doc = roxmltree::Document::parse(&text)
        .map_err(|err| RotuloError::InvoiceXml(err.to_string()))?;

    let first_text = |tag: &str| -> String {
        doc.descendants()
            .find(|node| node.tag_name().name() == tag)
            .and_then(|node| node.text())
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };

    let number = first_text("nNF");
    if number.is_empty() {
        return Err(RotuloError::InvoiceXml("missing document number".into()));
    }

    let series = {
        let value = first_text("serie");
        if value.is_empty() { "1".into() } else { value }
    };

    // 44-digit access key from the infNFe Id attribute ("NFe" prefix).
    let access_key = doc
        .descendants()
        .filter_map(|node| node.attribute("Id"))
        .find_map(|id| id.strip_prefix("NFe"))
        .filter(|key| key.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or_default()
        .to_string();

    let emit = doc
        .descendants()
        .find(|node| node.tag_name().name() == "emit");
    let child_text = |parent: Option<roxmltree::Node>, tag: &str| -> String {
        parent
            .and_then(|node| {
                node.descendants()
                    .find(|child| child.tag_name().name() == tag)
            })
            .and_then(|node| node.text())
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };

    let issuer_tax_id = child_text(emit, "CNPJ");
    let issuer_name = child_text(emit, "xNome");

    let mut items = Vec::new();
    for det in doc
        .descendants()
        .filter(|node| node.tag_name().name() == "det")
    {
        let prod = det
            .descendants()
            .find(|node| node.tag_name().name() == "prod");
        let sku = child_text(prod, "cProd");
        let description = child_text(prod, "xProd");
        let quantity = parse_quantity(&child_text(prod, "qCom"));
        items.push(LineItem::new(sku, description, quantity));
    }

    Ok(InvoiceRecord {
        number,
        series,
        issued_at: format_emission(&first_text("dhEmi")),
        access_key,
        issuer_tax_id,
        issuer_name,
        items,
    })
}

/// `qCom` values come as decimals ("2.0000"); quantities are whole units.
fn parse_quantity(raw: &str) -> u32 {
    raw.parse::<f64>().map(|value| value as u32).unwrap_or(1)
}

/// Reformat the ISO emission timestamp to the label-friendly
/// `%d-%m-%Y %H:%M:%S`, falling back to the bare date.
fn format_emission(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let prefix: String = raw.chars().take(19).collect();
    match NaiveDateTime::parse_from_str(&prefix, "%Y-%m-%dT%H:%M:%S") {
        Ok(parsed) => parsed.format("%d-%m-%Y %H:%M:%S").to_string(),
        Err(_) => raw.chars().take(10).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const SAMPLE_NFE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<nfeProc xmlns="http://www.portalfiscal.inf.br/nfe">
  <NFe>
    <infNFe Id="NFe35240134847700000101550010000123451000123450" versao="4.00">
      <ide>
        <nNF>12345</nNF>
        <serie>1</serie>
        <dhEmi>2024-01-15T10:30:00-03:00</dhEmi>
      </ide>
      <emit>
        <CNPJ>34847700000101</CNPJ>
        <xNome>34.847.700 COMERCIO DE CALCADOS LTDA</xNome>
      </emit>
      <det nItem="1">
        <prod>
          <cProd>TEN-BO-BR-38</cProd>
          <xProd>Tenis Bota Branco 38</xProd>
          <qCom>1.0000</qCom>
        </prod>
      </det>
      <det nItem="2">
        <prod>
          <cProd>MEIA-P</cProd>
          <xProd>Meia Preta</xProd>
          <qCom>2.0000</qCom>
        </prod>
      </det>
    </infNFe>
  </NFe>
</nfeProc>"#;

    #[test]
    fn parses_core_invoice_fields() {
        let record = parse_invoice_xml(SAMPLE_NFE.as_bytes()).unwrap();
        assert_eq!(record.number, "12345");
        assert_eq!(record.series, "1");
        assert_eq!(record.issued_at, "15-01-2024 10:30:00");
        assert_eq!(
            record.access_key,
            "35240134847700000101550010000123451000123450"
        );
        assert_eq!(record.issuer_tax_id, "34847700000101");
        assert_eq!(record.items.len(), 2);
        assert_eq!(record.items[0].sku, "TEN-BO-BR-38");
        assert_eq!(record.items[1].quantity, 2);
        assert_eq!(record.total_quantity(), 3);
    }

    #[test]
    fn rejects_xml_without_document_number() {
        let xml = "<NFe><infNFe></infNFe></NFe>";
        assert!(parse_invoice_xml(xml.as_bytes()).is_err());
    }

    fn archive_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn archive_loading_skips_bad_entries_and_dedups() {
        let bytes = archive_with(&[
            ("nota1.xml", SAMPLE_NFE),
            ("nota1_copy.xml", SAMPLE_NFE),
            ("broken.xml", "<not-closed"),
            ("readme.txt", "ignore me"),
        ]);

        let mut index = InvoiceIndex::new();
        let added = index.load_archive("notas.zip", &bytes).unwrap();
        assert_eq!(added, 1);
        assert_eq!(index.len(), 1);
        assert!(index.get("12345").is_some());

        let (tax_id, name) = index.issuer_names().next().unwrap();
        assert_eq!(tax_id, "34847700000101");
        assert_eq!(name, "Comercio De Calcados");
    }

    #[test]
    fn first_record_wins_on_duplicate_number() {
        let mut index = InvoiceIndex::new();
        let mut first = parse_invoice_xml(SAMPLE_NFE.as_bytes()).unwrap();
        first.issuer_name = "FIRST".into();
        let mut second = parse_invoice_xml(SAMPLE_NFE.as_bytes()).unwrap();
        second.issuer_name = "SECOND".into();

        assert!(index.insert(first));
        assert!(!index.insert(second));
        assert_eq!(index.get("12345").unwrap().issuer_name, "FIRST");
    }
}
