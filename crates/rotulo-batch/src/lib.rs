// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rotulo-batch — Aggregation and batch orchestration for the Rotulo label
// engine.
//
// The aggregator dedups, groups, and orders label records; the orchestrator
// drives the full pipeline with per-store fault isolation and produces the
// batch report consumed by the presentation layer.

pub mod aggregate;
pub mod directory;
pub mod orchestrator;

pub use aggregate::{DedupOutcome, aggregate, dedupe, group_by_store, sort_group};
pub use directory::StoreDirectory;
pub use orchestrator::{BatchInput, BatchReport, StoreOutcome, render_groups, run_batch};
