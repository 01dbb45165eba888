// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Rotulo.

use thiserror::Error;

/// Top-level error type for all Rotulo operations.
#[derive(Debug, Error)]
pub enum RotuloError {
    // -- Input errors --
    #[error("batch contains no input files")]
    EmptyBatch,

    #[error("archive error in {name}: {detail}")]
    Archive { name: String, detail: String },

    #[error("spreadsheet error in {name}: {detail}")]
    Spreadsheet { name: String, detail: String },

    #[error("manifest {name} is missing required column '{column}'")]
    MissingColumn { name: String, column: String },

    #[error("invoice XML parse failed: {0}")]
    InvoiceXml(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("text extraction failed: {0}")]
    TextExtraction(String),

    // -- Render errors --
    #[error("page composition failed: {0}")]
    Compose(String),

    #[error("barcode encoding failed: {0}")]
    Barcode(String),

    #[error("summary output failed: {0}")]
    Summary(String),

    // -- Batch errors --
    #[error("store render failed for {store}: {cause}")]
    StoreRender { store: String, cause: String },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RotuloError>;
