// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Store directory — display names for store identities, collected from the
// invoice index and from sender names recovered off the labels, plus
// collision-free artifact directory naming.

use std::collections::{HashMap, HashSet};

use rotulo_core::sku::sanitize_dir_name;
use rotulo_core::types::{LabelRecord, StoreId};
use rotulo_ingest::InvoiceIndex;

const UNKNOWN_STORE: &str = "Loja_Desconhecida";

/// Maps store identities to display names and unique directory names.
#[derive(Debug, Default)]
pub struct StoreDirectory {
    names: HashMap<StoreId, String>,
    used_dirs: HashSet<String>,
}

impl StoreDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed tax-id names from the invoice index (issuer names, cleaned).
    pub fn absorb_invoices(&mut self, invoices: &InvoiceIndex) {
        for (tax_id, name) in invoices.issuer_names() {
            self.names
                .entry(StoreId::TaxId(tax_id.clone()))
                .or_insert_with(|| name.clone());
        }
    }

    /// Record a sender-name hint from a cropped label. The first hint for a
    /// store wins; invoice-derived names are never overwritten.
    pub fn absorb_record(&mut self, record: &LabelRecord) {
        if let Some(name) = &record.store_name {
            self.names
                .entry(record.store.clone())
                .or_insert_with(|| name.clone());
        }
    }

    /// Human-facing store name.
    pub fn display_name(&self, store: &StoreId) -> String {
        if let Some(name) = self.names.get(store) {
            let sanitized = sanitize_dir_name(name);
            if !sanitized.is_empty() {
                return sanitized;
            }
        }
        match store {
            StoreId::TaxId(id) => id.clone(),
            StoreId::Named(name) => {
                let sanitized = sanitize_dir_name(name);
                if sanitized.is_empty() {
                    UNKNOWN_STORE.into()
                } else {
                    sanitized
                }
            }
            StoreId::Declaration => "CPF".into(),
            StoreId::Unknown => UNKNOWN_STORE.into(),
        }
    }

    /// Directory name for a store's artifacts, unique across the batch even
    /// when two stores share a display name.
    pub fn unique_dir_name(&mut self, store: &StoreId) -> String {
        let base = self.display_name(store);
        let mut candidate = base.clone();
        if self.used_dirs.contains(&candidate) {
            candidate = format!("{base} {}", disambiguator(store));
        }
        let mut counter = 2;
        while self.used_dirs.contains(&candidate) {
            candidate = format!("{base} {counter}");
            counter += 1;
        }
        self.used_dirs.insert(candidate.clone());
        candidate
    }
}

/// Short per-store suffix for colliding display names.
fn disambiguator(store: &StoreId) -> String {
    let id = store.to_string();
    let tail: String = id
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    sanitize_dir_name(&tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotulo_core::types::{LabelOrigin, Rect};

    fn record_with_hint(store: StoreId, hint: &str) -> LabelRecord {
        LabelRecord {
            source_id: "x".into(),
            document_number: None,
            order_id: None,
            access_key: None,
            store,
            store_name: Some(hint.to_string()),
            origin: LabelOrigin::Sheet,
            source_file: "a.pdf".into(),
            page_index: 0,
            region: Rect::new(0.0, 0.0, 1.0, 1.0),
            items: Vec::new(),
        }
    }

    #[test]
    fn sender_hints_name_tax_id_stores() {
        let mut directory = StoreDirectory::new();
        let store = StoreId::TaxId("34847700000101".into());
        directory.absorb_record(&record_with_hint(store.clone(), "Loja Azul"));
        assert_eq!(directory.display_name(&store), "Loja Azul");
    }

    #[test]
    fn declaration_and_unknown_have_fixed_names() {
        let directory = StoreDirectory::new();
        assert_eq!(directory.display_name(&StoreId::Declaration), "CPF");
        assert_eq!(directory.display_name(&StoreId::Unknown), "Loja_Desconhecida");
    }

    #[test]
    fn colliding_display_names_get_unique_dirs() {
        let mut directory = StoreDirectory::new();
        let store_a = StoreId::TaxId("11111111000111".into());
        let store_b = StoreId::TaxId("22222222000122".into());
        directory.absorb_record(&record_with_hint(store_a.clone(), "Mesma Loja"));
        directory.absorb_record(&record_with_hint(store_b.clone(), "Mesma Loja"));

        let dir_a = directory.unique_dir_name(&store_a);
        let dir_b = directory.unique_dir_name(&store_b);
        assert_ne!(dir_a, dir_b);
        assert!(dir_b.starts_with("Mesma Loja"));
    }
}
