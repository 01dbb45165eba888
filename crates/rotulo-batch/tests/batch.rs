// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch-level behavior: fault isolation, end-to-end extraction and
// rendering, dedup across files, and empty-batch rejection.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use rotulo_batch::{BatchInput, StoreDirectory, StoreOutcome, render_groups, run_batch};
use rotulo_core::config::EngineConfig;
use rotulo_core::error::RotuloError;
use rotulo_core::types::{
    InputFile, InputKind, LabelOrigin, LabelRecord, LineItem, LogEntry, Rect, Severity,
    StoreGroup, StoreId,
};
use rotulo_document::testpdf::{PageSpec, build_pdf, grid_sheet_page, label_lines};
use zip::write::SimpleFileOptions;

fn nfe_xml(number: &str, tax_id: &str, issuer: &str, sku: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<nfeProc xmlns="http://www.portalfiscal.inf.br/nfe">
  <NFe>
    <infNFe Id="NFe{tax_id}{number:0>30}" versao="4.00">
      <ide><nNF>{number}</nNF><serie>1</serie><dhEmi>2024-03-01T08:00:00-03:00</dhEmi></ide>
      <emit><CNPJ>{tax_id}</CNPJ><xNome>{issuer}</xNome></emit>
      <det nItem="1"><prod><cProd>{sku}</cProd><xProd>Produto {sku}</xProd><qCom>1.0000</qCom></prod></det>
    </infNFe>
  </NFe>
</nfeProc>"#
    )
}

fn archive_of(xmls: &[(String, String)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in xmls {
        writer
            .start_file(name.as_str(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Sheet with four labels: two for store 111, two for store 222.
fn two_store_sheet() -> Vec<u8> {
    let quadrants: Vec<Vec<String>> = vec![
        label_lines("10001", "Loja Azul"),
        label_lines("10002", "Loja Azul"),
        label_lines("20001", "Loja Verde"),
        label_lines("20002", "Loja Verde"),
    ];
    build_pdf(&[grid_sheet_page(&quadrants)])
}

fn two_store_archive() -> Vec<u8> {
    let xmls: Vec<(String, String)> = [
        ("10001", "11111111000111", "LOJA AZUL LTDA", "TEN-A-38"),
        ("10002", "11111111000111", "LOJA AZUL LTDA", "TEN-B"),
        ("20001", "22222222000122", "LOJA VERDE ME", "CAM-A-M"),
        ("20002", "22222222000122", "LOJA VERDE ME", "CAM-B"),
    ]
    .iter()
    .map(|(number, tax_id, issuer, sku)| {
        (
            format!("{number}.xml"),
            nfe_xml(number, tax_id, issuer, sku),
        )
    })
    .collect();
    archive_of(&xmls)
}

#[test]
fn end_to_end_batch_renders_per_store_artifacts() {
    let out = tempfile::tempdir().unwrap();
    let input = BatchInput::new(vec![
        InputFile::new("notas.zip", InputKind::Archive, two_store_archive()),
        InputFile::new("etiquetas.pdf", InputKind::LabelSheet, two_store_sheet()),
    ]);

    let report = run_batch(&input, &EngineConfig::default(), out.path()).unwrap();

    assert_eq!(report.total_labels, 4);
    assert_eq!(report.duplicates_removed, 0);
    assert_eq!(report.outcomes.len(), 2);

    for outcome in &report.outcomes {
        match outcome {
            StoreOutcome::Rendered {
                labels,
                pages,
                pdf_path,
                summary_path,
                ..
            } => {
                assert_eq!(*labels, 2);
                assert_eq!(*pages, 2);
                assert!(pdf_path.exists());
                assert!(summary_path.exists());
            }
            StoreOutcome::Failed { cause, .. } => panic!("unexpected failure: {cause}"),
        }
    }

    assert!(report.summary_path.as_ref().unwrap().exists());
    assert!(report.breakdown_path.as_ref().unwrap().exists());
}

#[test]
fn duplicate_labels_across_files_are_removed_once() {
    let out = tempfile::tempdir().unwrap();
    let input = BatchInput::new(vec![
        InputFile::new("notas.zip", InputKind::Archive, two_store_archive()),
        InputFile::new("etiquetas.pdf", InputKind::LabelSheet, two_store_sheet()),
        InputFile::new("etiquetas reimpressas.pdf", InputKind::LabelSheet, two_store_sheet()),
    ]);

    let report = run_batch(&input, &EngineConfig::default(), out.path()).unwrap();

    assert_eq!(report.total_labels, 8);
    assert_eq!(report.duplicates_removed, 4);
    for outcome in &report.outcomes {
        if let StoreOutcome::Rendered { labels, .. } = outcome {
            assert_eq!(*labels, 2);
        }
    }
}

#[test]
fn empty_batch_is_rejected_before_the_pipeline() {
    let out = tempfile::tempdir().unwrap();
    let result = run_batch(&BatchInput::new(Vec::new()), &EngineConfig::default(), out.path());
    assert!(matches!(result, Err(RotuloError::EmptyBatch)));
}

#[test]
fn declaration_file_bypasses_the_generic_pipeline() {
    let out = tempfile::tempdir().unwrap();
    // An A4 declaration page; without a manifest its label stays unresolved
    // but still renders under the fixed sentinel store.
    let declaration = build_pdf(&[PageSpec::new(595.0, 842.0).block(
        30.0,
        40.0,
        9.0,
        &[
            "DECLARACAO DE CONTEUDO",
            "Pedido: 2602061BMTVXW0",
            "REMETENTE",
        ],
    )]);
    let input = BatchInput::new(vec![InputFile::new(
        "lanim.pdf",
        InputKind::LabelSheet,
        declaration,
    )]);

    let report = run_batch(&input, &EngineConfig::default(), out.path()).unwrap();

    assert_eq!(report.total_labels, 1);
    assert_eq!(report.unresolved_labels, 1);
    assert_eq!(report.outcomes.len(), 1);
    match &report.outcomes[0] {
        StoreOutcome::Rendered { store, name, .. } => {
            assert_eq!(*store, StoreId::Declaration);
            assert_eq!(name, "CPF");
        }
        StoreOutcome::Failed { cause, .. } => panic!("declaration render failed: {cause}"),
    }
}

fn record_for(store: &str, number: &str, page_index: usize) -> LabelRecord {
    LabelRecord {
        source_id: number.into(),
        document_number: Some(number.into()),
        order_id: None,
        access_key: None,
        store: StoreId::TaxId(store.into()),
        store_name: Some(format!("Loja {store}")),
        origin: LabelOrigin::Sheet,
        source_file: "etiquetas.pdf".into(),
        page_index,
        region: Rect::new(0.0, 0.0, 300.0, 400.0),
        items: vec![LineItem::new("SKU-1", "produto", 1)],
    }
}

#[test]
fn one_failing_store_does_not_affect_the_others() {
    let out = tempfile::tempdir().unwrap();
    let sheet = two_store_sheet();
    let file_bytes: HashMap<&str, &[u8]> =
        HashMap::from([("etiquetas.pdf", sheet.as_slice())]);

    // Store B references a page the sheet does not have.
    let groups = vec![
        StoreGroup {
            store: StoreId::TaxId("A".into()),
            records: vec![record_for("A", "1", 0)],
        },
        StoreGroup {
            store: StoreId::TaxId("B".into()),
            records: vec![record_for("B", "2", 99)],
        },
        StoreGroup {
            store: StoreId::TaxId("C".into()),
            records: vec![record_for("C", "3", 0)],
        },
    ];

    let mut directory = StoreDirectory::new();
    for group in &groups {
        for record in &group.records {
            directory.absorb_record(record);
        }
    }
    let mut logs: Vec<LogEntry> = Vec::new();

    let outcomes = render_groups(
        &groups,
        &file_bytes,
        &EngineConfig::default(),
        out.path(),
        &mut directory,
        &mut logs,
    );

    assert_eq!(outcomes.len(), 3);
    let rendered: Vec<&StoreOutcome> = outcomes
        .iter()
        .filter(|o| matches!(o, StoreOutcome::Rendered { .. }))
        .collect();
    assert_eq!(rendered.len(), 2);

    match &outcomes[1] {
        StoreOutcome::Failed { store, cause, .. } => {
            assert_eq!(*store, StoreId::TaxId("B".into()));
            assert!(!cause.is_empty());
        }
        StoreOutcome::Rendered { .. } => panic!("store B should have failed"),
    }

    // The failure is logged with the store identity; artifacts exist for A
    // and C only.
    assert!(logs.iter().any(|entry| entry.severity == Severity::Error
        && entry.store == Some(StoreId::TaxId("B".into()))));
    for outcome in rendered {
        if let StoreOutcome::Rendered { pdf_path, .. } = outcome {
            assert!(pdf_path.exists());
        }
    }
}
