// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rotulo — normalize a folder of marketplace label sheets into per-store
// one-label-per-page PDFs with summaries.
//
// The engine itself consumes named byte streams; this binary maps a local
// directory onto that interface by file extension and prints the report.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rotulo_batch::{BatchInput, StoreOutcome, run_batch};
use rotulo_core::config::{DisplayMode, EngineConfig};
use rotulo_core::types::{InputFile, InputKind};

#[derive(Debug, Parser)]
#[command(name = "rotulo", version, about = "Shipping-label normalizer")]
struct Args {
    /// Directory with the input files (PDF sheets, XML archives, manifests).
    input_dir: PathBuf,

    /// Directory receiving the per-store output folders.
    output_dir: PathBuf,

    /// Product table font size in points.
    #[arg(long, default_value_t = 7.0)]
    font_size: f32,

    /// Product column mode: sku, title, or both.
    #[arg(long, default_value = "sku")]
    display: String,

    /// Filename prefix routed to the declaration (CPF) handler.
    #[arg(long, default_value = "lanim")]
    declaration_prefix: String,

    /// Filename routed to the direct-import handler.
    #[arg(long, default_value = "shein crua.pdf")]
    direct_import: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("rotulo starting");

    let args = Args::parse();

    let mut config = EngineConfig {
        declaration_prefix: args.declaration_prefix.clone(),
        direct_import_file: args.direct_import.clone(),
        ..EngineConfig::default()
    };
    config.render.font_size = args.font_size;
    config.render.display_mode = match args.display.as_str() {
        "title" => DisplayMode::Title,
        "both" => DisplayMode::Both,
        _ => DisplayMode::Sku,
    };

    let input = match read_input_dir(&args) {
        Ok(input) => input,
        Err(err) => {
            eprintln!("cannot read {}: {err}", args.input_dir.display());
            return ExitCode::FAILURE;
        }
    };

    match run_batch(&input, &config, &args.output_dir) {
        Ok(report) => {
            for outcome in &report.outcomes {
                match outcome {
                    StoreOutcome::Rendered {
                        name,
                        labels,
                        pages,
                        pdf_path,
                        ..
                    } => println!("{name}: {labels} labels, {pages} pages -> {}", pdf_path.display()),
                    StoreOutcome::Failed { name, cause, .. } => {
                        println!("{name}: FAILED ({cause})")
                    }
                }
            }
            println!(
                "{} labels total, {} duplicates removed, {} without invoice data",
                report.total_labels, report.duplicates_removed, report.unresolved_labels
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("batch failed: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Map directory entries onto the engine's named byte streams.
fn read_input_dir(args: &Args) -> std::io::Result<BatchInput> {
    let mut files = Vec::new();

    for entry in fs::read_dir(&args.input_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let lower = name.to_lowercase();

        // Editor locks and prior outputs are not inputs.
        if name.starts_with('_') || name.starts_with('~') || lower.starts_with("etiquetas_") {
            continue;
        }

        let kind = if lower.ends_with(".zip") {
            InputKind::Archive
        } else if lower.ends_with(".pdf") {
            InputKind::LabelSheet
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            if lower.contains("custo") {
                InputKind::CostSheet
            } else {
                InputKind::Manifest
            }
        } else {
            continue;
        };

        let bytes = fs::read(entry.path())?;
        files.push(InputFile::new(name, kind, bytes));
    }

    Ok(BatchInput::new(files))
}
