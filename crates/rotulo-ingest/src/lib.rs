// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rotulo-ingest — Structured input indexes for the Rotulo label engine.
//
// Two read-only-after-build lookups feed the extraction pipelines: the
// invoice index (tax-document XML inside ZIP archives, keyed by document
// number) and the order manifest index (spreadsheet rows, keyed by order id
// with a secondary tracking-code path).

pub mod invoice;
pub mod manifest;

pub use invoice::{InvoiceIndex, parse_invoice_xml};
pub use manifest::{ManifestIndex, parse_product_info};
