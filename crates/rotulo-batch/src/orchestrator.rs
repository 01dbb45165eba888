// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestrator — drives the full pipeline with per-store fault
// isolation and produces the batch report.
//
// Failure policy: nothing in here is fatal to the batch except a completely
// empty input set. Malformed archives, manifests, and sheets lose their own
// records; a store whose render fails is absent from the output; everything
// else proceeds.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use rotulo_core::config::EngineConfig;
use rotulo_core::error::{Result, RotuloError};
use rotulo_core::types::{InputFile, InputKind, LogEntry, Severity, StoreGroup, StoreId};
use rotulo_document::special::{ExtractContext, SpecialRegistry};
use rotulo_document::{PdfFile, RegionCropper};
use rotulo_ingest::{InvoiceIndex, ManifestIndex};
use rotulo_render::{
    PageComposer, SourceSet, StoreTotals, batch_summary_csv, sku_breakdown_csv, sku_counts,
    store_summary_csv,
};

use crate::aggregate;
use crate::directory::StoreDirectory;

/// The batch of named input byte streams handed over by the upload layer.
#[derive(Debug, Default)]
pub struct BatchInput {
    pub files: Vec<InputFile>,
}

impl BatchInput {
    pub fn new(files: Vec<InputFile>) -> Self {
        Self { files }
    }
}

/// Per-store result: artifacts or a cause, never a shared failure channel.
#[derive(Debug, Serialize)]
pub enum StoreOutcome {
    Rendered {
        store: StoreId,
        name: String,
        labels: usize,
        pages: usize,
        pdf_path: PathBuf,
        summary_path: PathBuf,
    },
    Failed {
        store: StoreId,
        name: String,
        cause: String,
    },
}

/// Everything the caller needs to present the batch: outcomes, structured
/// logs, counts, and the cross-store summary artifacts.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<StoreOutcome>,
    pub logs: Vec<LogEntry>,
    pub total_labels: usize,
    pub duplicates_removed: usize,
    /// Labels that resolved neither an invoice nor manifest data.
    pub unresolved_labels: usize,
    pub summary_path: Option<PathBuf>,
    pub breakdown_path: Option<PathBuf>,
}

/// Run the whole pipeline: index, extract, aggregate, render per store,
/// summarize.
#[instrument(skip_all, fields(files = input.files.len()))]
pub fn run_batch(
    input: &BatchInput,
    config: &EngineConfig,
    output_dir: &Path,
) -> Result<BatchReport> {
    if input.files.is_empty() {
        return Err(RotuloError::EmptyBatch);
    }

    let mut report = BatchReport::default();

    let invoices = build_invoice_index(input, &mut report.logs);
    let manifest = build_manifest_index(input, &mut report.logs);

    let mut directory = StoreDirectory::new();
    directory.absorb_invoices(&invoices);

    let records = collect_records(input, config, &invoices, &manifest, &mut report.logs);
    for record in &records {
        directory.absorb_record(record);
    }

    report.total_labels = records.len();
    report.unresolved_labels = records
        .iter()
        .filter(|record| record.document_number.is_none() && record.items.is_empty())
        .count();

    let (groups, removed) = aggregate::aggregate(records);
    report.duplicates_removed = removed.len();
    for duplicate in &removed {
        report.logs.push(LogEntry {
            severity: Severity::Warning,
            store: Some(duplicate.store.clone()),
            message: format!(
                "duplicate label removed: document {}",
                duplicate.source_id
            ),
        });
    }

    fs::create_dir_all(output_dir)?;

    let file_bytes: HashMap<&str, &[u8]> = input
        .files
        .iter()
        .map(|file| (file.name.as_str(), file.bytes.as_slice()))
        .collect();

    report.outcomes = render_groups(
        &groups,
        &file_bytes,
        config,
        output_dir,
        &mut directory,
        &mut report.logs,
    );

    write_cross_store_summaries(&groups, &mut report, output_dir, &directory)?;

    info!(
        stores = report.outcomes.len(),
        labels = report.total_labels,
        duplicates = report.duplicates_removed,
        unresolved = report.unresolved_labels,
        "batch complete"
    );
    Ok(report)
}

/// Render every store group inside its own failure boundary.
///
/// Each group loads its own document handles from the source bytes, so no
/// decoder state is shared between stores, and a failed store affects only
/// its own outcome entry.
pub fn render_groups(
    groups: &[StoreGroup],
    file_bytes: &HashMap<&str, &[u8]>,
    config: &EngineConfig,
    output_dir: &Path,
    directory: &mut StoreDirectory,
    logs: &mut Vec<LogEntry>,
) -> Vec<StoreOutcome> {
    let mut outcomes = Vec::with_capacity(groups.len());

    for group in groups {
        let name = directory.display_name(&group.store);
        match render_store(group, file_bytes, config, output_dir, directory) {
            Ok((pages, pdf_path, summary_path)) => {
                logs.push(LogEntry {
                    severity: Severity::Info,
                    store: Some(group.store.clone()),
                    message: format!(
                        "{name}: {} labels rendered across {pages} pages",
                        group.records.len()
                    ),
                });
                outcomes.push(StoreOutcome::Rendered {
                    store: group.store.clone(),
                    name,
                    labels: group.records.len(),
                    pages,
                    pdf_path,
                    summary_path,
                });
            }
            Err(err) => {
                let failure = RotuloError::StoreRender {
                    store: name.clone(),
                    cause: err.to_string(),
                };
                error!(store = %group.store, %failure, "store render failed");
                logs.push(LogEntry {
                    severity: Severity::Error,
                    store: Some(group.store.clone()),
                    message: failure.to_string(),
                });
                outcomes.push(StoreOutcome::Failed {
                    store: group.store.clone(),
                    name,
                    cause: err.to_string(),
                });
            }
        }
    }

    outcomes
}

/// Compose and write one store's artifact set.
fn render_store(
    group: &StoreGroup,
    file_bytes: &HashMap<&str, &[u8]>,
    config: &EngineConfig,
    output_dir: &Path,
    directory: &mut StoreDirectory,
) -> Result<(usize, PathBuf, PathBuf)> {
    let dir_name = directory.unique_dir_name(&group.store);
    let store_dir = output_dir.join(&dir_name);
    fs::create_dir_all(&store_dir)?;

    // Independent handles per store: load fresh documents from the bytes.
    let mut sources = SourceSet::new();
    for record in &group.records {
        if sources.contains(&record.source_file) {
            continue;
        }
        let bytes = file_bytes.get(record.source_file.as_str()).ok_or_else(|| {
            RotuloError::Compose(format!("missing source bytes for {}", record.source_file))
        })?;
        sources.load(&record.source_file, bytes)?;
    }

    let composer = PageComposer::new(&config.render);
    let composed = composer.compose(&group.records, &sources)?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let pdf_path = store_dir.join(format!("etiquetas_{dir_name}_{timestamp}.pdf"));
    fs::write(&pdf_path, &composed.bytes)?;

    let summary_path = store_dir.join(format!("resumo_{dir_name}_{timestamp}.csv"));
    fs::write(&summary_path, store_summary_csv(&group.records)?)?;

    Ok((composed.page_count, pdf_path, summary_path))
}

/// Cross-store rollup and SKU breakdown, covering the rendered stores.
fn write_cross_store_summaries(
    groups: &[StoreGroup],
    report: &mut BatchReport,
    output_dir: &Path,
    directory: &StoreDirectory,
) -> Result<()> {
    let rendered: Vec<&StoreGroup> = groups
        .iter()
        .filter(|group| {
            report.outcomes.iter().any(|outcome| {
                matches!(outcome, StoreOutcome::Rendered { store, .. } if *store == group.store)
            })
        })
        .collect();

    if rendered.is_empty() {
        return Ok(());
    }

    let totals: Vec<StoreTotals> = rendered
        .iter()
        .map(|group| {
            let counts = sku_counts(&group.records);
            StoreTotals {
                store_name: directory.display_name(&group.store),
                labels: group.records.len(),
                skus: counts.len(),
                units: counts.values().sum(),
            }
        })
        .collect();

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let summary_path = output_dir.join(format!("resumo_geral_{timestamp}.csv"));
    fs::write(&summary_path, batch_summary_csv(&totals)?)?;
    report.summary_path = Some(summary_path);

    let per_store: Vec<(String, Vec<rotulo_core::types::LabelRecord>)> = rendered
        .iter()
        .map(|group| {
            (
                directory.display_name(&group.store),
                group.records.clone(),
            )
        })
        .collect();
    let breakdown_path = output_dir.join(format!("skus_por_loja_{timestamp}.csv"));
    fs::write(&breakdown_path, sku_breakdown_csv(&per_store)?)?;
    report.breakdown_path = Some(breakdown_path);

    Ok(())
}

fn build_invoice_index(input: &BatchInput, logs: &mut Vec<LogEntry>) -> InvoiceIndex {
    let mut invoices = InvoiceIndex::new();
    for file in input.files.iter().filter(|f| f.kind == InputKind::Archive) {
        match invoices.load_archive(&file.name, &file.bytes) {
            Ok(added) => logs.push(LogEntry {
                severity: Severity::Info,
                store: None,
                message: format!("{}: {added} invoices indexed", file.name),
            }),
            Err(err) => {
                warn!(file = %file.name, %err, "archive skipped");
                logs.push(LogEntry {
                    severity: Severity::Warning,
                    store: None,
                    message: format!("{}: archive skipped ({err})", file.name),
                });
            }
        }
    }
    invoices
}

fn build_manifest_index(input: &BatchInput, logs: &mut Vec<LogEntry>) -> ManifestIndex {
    let mut manifest = ManifestIndex::new();
    for file in input.files.iter().filter(|f| f.kind == InputKind::Manifest) {
        match manifest.load_sheet(&file.name, &file.bytes) {
            Ok(rows) => logs.push(LogEntry {
                severity: Severity::Info,
                store: None,
                message: format!("{}: {rows} manifest rows indexed", file.name),
            }),
            Err(err) => {
                warn!(file = %file.name, %err, "manifest skipped");
                logs.push(LogEntry {
                    severity: Severity::Warning,
                    store: None,
                    message: format!("{}: manifest skipped ({err})", file.name),
                });
            }
        }
    }
    manifest
}

/// Route every label sheet: special handlers first, generic layout/crop
/// otherwise. Per-file failures are logged and skipped.
fn collect_records(
    input: &BatchInput,
    config: &EngineConfig,
    invoices: &InvoiceIndex,
    manifest: &ManifestIndex,
    logs: &mut Vec<LogEntry>,
) -> Vec<rotulo_core::types::LabelRecord> {
    let registry = SpecialRegistry::with_defaults();
    let cropper = RegionCropper::new(config, invoices, manifest);
    let ctx = ExtractContext {
        config,
        invoices,
        manifest,
    };

    let mut records = Vec::new();
    for file in input
        .files
        .iter()
        .filter(|f| f.kind == InputKind::LabelSheet)
    {
        if let Some(handler) = registry.route(&file.name, config) {
            match handler.extract(file, &ctx) {
                Ok(mut extracted) => {
                    info!(file = %file.name, handler = handler.name(), labels = extracted.len(), "special format extracted");
                    records.append(&mut extracted);
                }
                Err(err) => {
                    warn!(file = %file.name, handler = handler.name(), %err, "special format failed");
                    logs.push(LogEntry {
                        severity: Severity::Warning,
                        store: None,
                        message: format!("{}: {} extraction failed ({err})", file.name, handler.name()),
                    });
                }
            }
            continue;
        }

        let pdf = match PdfFile::load(&file.bytes) {
            Ok(pdf) => pdf,
            Err(err) => {
                warn!(file = %file.name, %err, "sheet skipped");
                logs.push(LogEntry {
                    severity: Severity::Warning,
                    store: None,
                    message: format!("{}: sheet skipped ({err})", file.name),
                });
                continue;
            }
        };

        let mut sheet_labels = 0;
        for page_index in 0..pdf.page_count() {
            match pdf.page_text(page_index) {
                Ok(page) => {
                    let cropped = cropper.crop_page(&file.name, file.stem(), page_index, &page);
                    sheet_labels += cropped.len();
                    records.extend(cropped);
                }
                Err(err) => {
                    warn!(file = %file.name, page_index, %err, "page skipped");
                    logs.push(LogEntry {
                        severity: Severity::Warning,
                        store: None,
                        message: format!("{} page {page_index}: skipped ({err})", file.name),
                    });
                }
            }
        }
        info!(file = %file.name, labels = sheet_labels, "sheet cropped");
    }

    records
}
