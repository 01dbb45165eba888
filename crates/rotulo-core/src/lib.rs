// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rotulo-core — Core types and errors for the Rotulo label engine.

pub mod config;
pub mod error;
pub mod sku;
pub mod types;

pub use config::{DisplayMode, EngineConfig, RenderConfig, MM_TO_PT};
pub use error::{Result, RotuloError};
pub use types::{
    InputFile, InputKind, InvoiceRecord, LabelOrigin, LabelRecord, LayoutGeometry, LineItem,
    LogEntry, OrderManifestEntry, Rect, Severity, StoreGroup, StoreId, synthetic_source_id,
};
