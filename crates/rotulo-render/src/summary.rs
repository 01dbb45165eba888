// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tabular summaries: per-store SKU counts and the cross-store rollup.

use std::collections::BTreeMap;

use tracing::instrument;

use rotulo_core::error::{Result, RotuloError};
use rotulo_core::types::LabelRecord;

/// Aggregate counts for one store, feeding the cross-store summary.
#[derive(Debug, Clone)]
pub struct StoreTotals {
    pub store_name: String,
    pub labels: usize,
    pub skus: usize,
    pub units: u32,
}

/// Sum quantities per (SKU, variation) across a store's records.
pub fn sku_counts(records: &[LabelRecord]) -> BTreeMap<(String, String), u32> {
    let mut counts = BTreeMap::new();
    for record in records {
        for item in &record.items {
            if item.sku.is_empty() && item.variation.is_empty() {
                continue;
            }
            *counts
                .entry((item.sku.clone(), item.variation.clone()))
                .or_insert(0) += item.quantity;
        }
    }
    counts
}

/// Per-store summary: one row per (SKU, variation) plus a TOTAL row.
#[instrument(skip_all, fields(records = records.len()))]
pub fn store_summary_csv(records: &[LabelRecord]) -> Result<Vec<u8>> {
    let counts = sku_counts(records);
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(["Cod. SKU", "Variacao", "Soma Quant."])
        .map_err(csv_err)?;
    let mut total = 0u32;
    for ((sku, variation), quantity) in &counts {
        writer
            .write_record([sku.as_str(), variation.as_str(), &quantity.to_string()])
            .map_err(csv_err)?;
        total += quantity;
    }
    writer
        .write_record(["TOTAL", "", &total.to_string()])
        .map_err(csv_err)?;

    writer
        .into_inner()
        .map_err(|err| RotuloError::Summary(err.to_string()))
}

/// Cross-store rollup: one row per store plus a TOTAL row.
pub fn batch_summary_csv(stores: &[StoreTotals]) -> Result<Vec<u8>> {
    let mut rows: Vec<&StoreTotals> = stores.iter().collect();
    rows.sort_by(|a, b| a.store_name.cmp(&b.store_name));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["Loja", "Etiquetas", "SKUs", "Unidades"])
        .map_err(csv_err)?;

    let mut total_labels = 0usize;
    let mut total_skus = 0usize;
    let mut total_units = 0u32;
    for store in rows {
        writer
            .write_record([
                store.store_name.as_str(),
                &store.labels.to_string(),
                &store.skus.to_string(),
                &store.units.to_string(),
            ])
            .map_err(csv_err)?;
        total_labels += store.labels;
        total_skus += store.skus;
        total_units += store.units;
    }
    writer
        .write_record([
            "TOTAL",
            &total_labels.to_string(),
            &total_skus.to_string(),
            &total_units.to_string(),
        ])
        .map_err(csv_err)?;

    writer
        .into_inner()
        .map_err(|err| RotuloError::Summary(err.to_string()))
}

/// Cross-store SKU breakdown: (store, SKU, quantity) rows plus the grand
/// total.
pub fn sku_breakdown_csv(per_store: &[(String, Vec<LabelRecord>)]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["Loja", "Cod. SKU", "Quantidade"])
        .map_err(csv_err)?;

    let mut grand_total = 0u32;
    let mut stores: Vec<&(String, Vec<LabelRecord>)> = per_store.iter().collect();
    stores.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, records) in stores {
        let mut by_sku: BTreeMap<String, u32> = BTreeMap::new();
        for record in records {
            for item in &record.items {
                if item.sku.is_empty() {
                    continue;
                }
                *by_sku.entry(item.sku.clone()).or_insert(0) += item.quantity;
            }
        }
        for (sku, quantity) in by_sku {
            writer
                .write_record([name.as_str(), sku.as_str(), &quantity.to_string()])
                .map_err(csv_err)?;
            grand_total += quantity;
        }
    }
    writer
        .write_record(["TOTAL GERAL", "", &grand_total.to_string()])
        .map_err(csv_err)?;

    writer
        .into_inner()
        .map_err(|err| RotuloError::Summary(err.to_string()))
}

fn csv_err(err: csv::Error) -> RotuloError {
    RotuloError::Summary(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotulo_core::types::{LabelOrigin, LineItem, Rect, StoreId};

    fn record(items: Vec<LineItem>) -> LabelRecord {
        LabelRecord {
            source_id: "1".into(),
            document_number: Some("1".into()),
            order_id: None,
            access_key: None,
            store: StoreId::Unknown,
            store_name: None,
            origin: LabelOrigin::Sheet,
            source_file: "a.pdf".into(),
            page_index: 0,
            region: Rect::new(0.0, 0.0, 1.0, 1.0),
            items,
        }
    }

    #[test]
    fn counts_accumulate_per_sku_and_variation() {
        let records = vec![
            record(vec![LineItem::new("A", "", 2), LineItem::new("B", "", 1)]),
            record(vec![LineItem::new("A", "", 3)]),
        ];
        let counts = sku_counts(&records);
        assert_eq!(counts[&("A".into(), "".into())], 5);
        assert_eq!(counts[&("B".into(), "".into())], 1);
    }

    #[test]
    fn store_summary_has_total_row() {
        let records = vec![record(vec![LineItem::new("A", "", 2)])];
        let csv_bytes = store_summary_csv(&records).unwrap();
        let text = String::from_utf8(csv_bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Cod. SKU,Variacao,Soma Quant.");
        assert_eq!(lines[1], "A,,2");
        assert_eq!(lines[2], "TOTAL,,2");
    }

    #[test]
    fn batch_summary_sorts_by_store_name() {
        let stores = vec![
            StoreTotals {
                store_name: "Zeta".into(),
                labels: 1,
                skus: 1,
                units: 1,
            },
            StoreTotals {
                store_name: "Alfa".into(),
                labels: 2,
                skus: 2,
                units: 4,
            },
        ];
        let text = String::from_utf8(batch_summary_csv(&stores).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with("Alfa,"));
        assert!(lines[2].starts_with("Zeta,"));
        assert_eq!(lines[3], "TOTAL,3,3,5");
    }

    #[test]
    fn breakdown_totals_across_stores() {
        let per_store = vec![
            ("Alfa".to_string(), vec![record(vec![LineItem::new("A", "", 2)])]),
            ("Beta".to_string(), vec![record(vec![LineItem::new("B", "", 3)])]),
        ];
        let text = String::from_utf8(sku_breakdown_csv(&per_store).unwrap()).unwrap();
        assert!(text.lines().last().unwrap().starts_with("TOTAL GERAL,,5"));
    }
}
