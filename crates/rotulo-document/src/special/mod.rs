// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Special-format handlers — vendor document shapes that bypass the generic
// layout/crop pipeline.
//
// Routing is a registry of (filename matcher, handler) pairs consulted
// before the generic path; a file is handled by exactly one pipeline.

pub mod declaration;
pub mod import;

use rotulo_core::config::EngineConfig;
use rotulo_core::error::Result;
use rotulo_core::types::{InputFile, LabelRecord};
use rotulo_ingest::{InvoiceIndex, ManifestIndex};

pub use declaration::DeclarationHandler;
pub use import::DirectImportHandler;

/// Read-only batch context available to every handler.
pub struct ExtractContext<'a> {
    pub config: &'a EngineConfig,
    pub invoices: &'a InvoiceIndex,
    pub manifest: &'a ManifestIndex,
}

/// One vendor-specific extraction pipeline.
pub trait SpecialHandler {
    fn name(&self) -> &'static str;

    /// Filename matcher deciding whether this handler owns the file.
    fn matches(&self, file_name: &str, config: &EngineConfig) -> bool;

    /// Extract every label record from the file.
    fn extract(&self, file: &InputFile, ctx: &ExtractContext<'_>) -> Result<Vec<LabelRecord>>;
}

/// Ordered handler registry.
pub struct SpecialRegistry {
    handlers: Vec<Box<dyn SpecialHandler>>,
}

impl SpecialRegistry {
    /// The built-in handler set: declaration (CPF) and direct-import.
    pub fn with_defaults() -> Self {
        Self {
            handlers: vec![
                Box::new(DeclarationHandler),
                Box::new(DirectImportHandler),
            ],
        }
    }

    /// First handler whose matcher claims the file, if any.
    pub fn route(&self, file_name: &str, config: &EngineConfig) -> Option<&dyn SpecialHandler> {
        self.handlers
            .iter()
            .find(|handler| handler.matches(file_name, config))
            .map(Box::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_is_exclusive_and_filename_based() {
        let registry = SpecialRegistry::with_defaults();
        let config = EngineConfig::default();

        let declaration = registry.route("lanim 2.pdf", &config).unwrap();
        assert_eq!(declaration.name(), "declaration");

        let import = registry.route("shein crua.pdf", &config).unwrap();
        assert_eq!(import.name(), "direct-import");

        assert!(registry.route("etiquetas.pdf", &config).is_none());
    }
}
