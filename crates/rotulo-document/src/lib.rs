// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rotulo-document — Page-level extraction for the Rotulo label engine.
//
// Provides positioned text extraction over `lopdf` content streams, grid
// layout detection, region cropping into label records, sender/store
// heuristics, and the special-format handler registry.

pub mod crop;
pub mod layout;
pub mod patterns;
pub mod pdf;
pub mod sender;
pub mod special;
pub mod text;

#[cfg(any(test, feature = "fixtures"))]
pub mod testpdf;

pub use crop::RegionCropper;
pub use layout::LayoutDetector;
pub use pdf::PdfFile;
pub use special::{ExtractContext, SpecialHandler, SpecialRegistry};
pub use text::{PageText, TextFragment};
