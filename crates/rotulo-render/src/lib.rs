// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rotulo-render — Output composition for the Rotulo label engine.
//
// One label per output page: the cropped source region embedded as a Form
// XObject, a Code128 barcode of the access key (or a placeholder box),
// and the product table with continuation-page overflow. Also the CSV
// summaries.

pub mod barcode;
pub mod compose;
pub mod content;
pub mod embed;
pub mod summary;
pub mod table;

pub use compose::{ComposedPdf, PageComposer, SourceSet};
pub use summary::{StoreTotals, batch_summary_csv, sku_breakdown_csv, sku_counts, store_summary_csv};
pub use table::{LabelPlan, plan_label};
