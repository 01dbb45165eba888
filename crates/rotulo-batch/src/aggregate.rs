// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label aggregation: dedup by document number, partition by store, and the
// single-unit-first ordering inside each store group.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info};

use rotulo_core::types::{LabelRecord, StoreGroup};

/// Result of deduplication: surviving records plus what was dropped.
#[derive(Debug)]
pub struct DedupOutcome {
    pub records: Vec<LabelRecord>,
    pub removed: Vec<LabelRecord>,
}

/// Drop records repeating an already-seen document number (first-seen wins).
///
/// Records without a document number are synthetic/unresolved and are never
/// considered duplicates of anything, including each other.
pub fn dedupe(records: Vec<LabelRecord>) -> DedupOutcome {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(records.len());
    let mut removed = Vec::new();

    for record in records {
        match &record.document_number {
            Some(number) if !number.is_empty() => {
                if seen.insert(number.clone()) {
                    kept.push(record);
                } else {
                    debug!(number = %number, "duplicate label removed");
                    removed.push(record);
                }
            }
            _ => kept.push(record),
        }
    }

    DedupOutcome {
        records: kept,
        removed,
    }
}

/// Partition records into store groups, in deterministic store order.
pub fn group_by_store(records: Vec<LabelRecord>) -> Vec<StoreGroup> {
    let mut groups: BTreeMap<rotulo_core::types::StoreId, Vec<LabelRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.store.clone()).or_default().push(record);
    }
    groups
        .into_iter()
        .map(|(store, records)| StoreGroup { store, records })
        .collect()
}

/// Order a group for rendering: single-unit labels first, then multi-item /
/// multi-quantity labels, each partition stable-sorted by
/// (principal SKU, document number).
pub fn sort_group(group: &mut StoreGroup) {
    let records = std::mem::take(&mut group.records);
    let (mut single, mut multi): (Vec<LabelRecord>, Vec<LabelRecord>) =
        records.into_iter().partition(LabelRecord::is_single_unit);

    single.sort_by_key(LabelRecord::sort_key);
    multi.sort_by_key(LabelRecord::sort_key);

    single.extend(multi);
    group.records = single;
}

/// The full aggregation pass: dedup, partition, order.
pub fn aggregate(records: Vec<LabelRecord>) -> (Vec<StoreGroup>, Vec<LabelRecord>) {
    let outcome = dedupe(records);
    let mut groups = group_by_store(outcome.records);
    for group in &mut groups {
        sort_group(group);
    }
    info!(
        groups = groups.len(),
        removed = outcome.removed.len(),
        "labels aggregated"
    );
    (groups, outcome.removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotulo_core::types::{LabelOrigin, LineItem, Rect, StoreId};

    fn record(number: Option<&str>, store: &str, sku: &str, quantity: u32) -> LabelRecord {
        LabelRecord {
            source_id: number.map(str::to_string).unwrap_or_else(|| {
                format!("file-p0-q{sku}")
            }),
            document_number: number.map(str::to_string),
            order_id: None,
            access_key: None,
            store: StoreId::TaxId(store.into()),
            store_name: None,
            origin: LabelOrigin::Sheet,
            source_file: "file.pdf".into(),
            page_index: 0,
            region: Rect::new(0.0, 0.0, 10.0, 10.0),
            items: vec![LineItem::new(sku, "produto", quantity)],
        }
    }

    #[test]
    fn first_seen_wins_and_synthetic_records_survive() {
        let records = vec![
            record(Some("100"), "A", "SKU-1", 1),
            record(Some("100"), "A", "SKU-2", 1),
            record(None, "A", "SKU-3", 1),
            record(None, "A", "SKU-3", 1),
        ];
        let outcome = dedupe(records);
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.removed.len(), 1);
        assert_eq!(outcome.records[0].items[0].sku, "SKU-1");
    }

    #[test]
    fn dedupe_is_idempotent() {
        let records = vec![
            record(Some("100"), "A", "SKU-1", 1),
            record(Some("100"), "A", "SKU-2", 1),
            record(None, "A", "SKU-3", 1),
        ];
        let first = dedupe(records);
        let first_ids: Vec<String> = first.records.iter().map(|r| r.source_id.clone()).collect();
        let second = dedupe(first.records);
        let second_ids: Vec<String> =
            second.records.iter().map(|r| r.source_id.clone()).collect();
        assert!(second.removed.is_empty());
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn groups_are_homogeneous_per_store() {
        let records = vec![
            record(Some("1"), "A", "S", 1),
            record(Some("2"), "B", "S", 1),
            record(Some("3"), "A", "S", 1),
        ];
        let groups = group_by_store(records);
        assert_eq!(groups.len(), 2);
        for group in &groups {
            assert!(group.records.iter().all(|r| r.store == group.store));
        }
    }

    #[test]
    fn single_unit_records_come_first_sorted_by_sku() {
        let mut group = StoreGroup {
            store: StoreId::TaxId("A".into()),
            records: vec![
                record(Some("4"), "A", "ZZZ-1", 1),
                record(Some("3"), "A", "AAA-2", 5),
                record(Some("2"), "A", "AAA-1", 1),
                record(Some("1"), "A", "BBB-9", 2),
            ],
        };
        sort_group(&mut group);

        let skus: Vec<&str> = group
            .records
            .iter()
            .map(|r| r.items[0].sku.as_str())
            .collect();
        // Single-unit (AAA-1, ZZZ-1) before multi (AAA-2, BBB-9).
        assert_eq!(skus, vec!["AAA-1", "ZZZ-1", "AAA-2", "BBB-9"]);
    }

    #[test]
    fn zero_item_records_sort_with_the_single_partition() {
        let mut zero = record(None, "A", "X", 1);
        zero.items.clear();
        let mut group = StoreGroup {
            store: StoreId::TaxId("A".into()),
            records: vec![record(Some("9"), "A", "AAA", 7), zero],
        };
        sort_group(&mut group);
        assert!(group.records[0].items.is_empty());
        assert_eq!(group.records[1].items[0].sku, "AAA");
    }

    #[test]
    fn ties_break_by_document_number() {
        let mut group = StoreGroup {
            store: StoreId::TaxId("A".into()),
            records: vec![
                record(Some("20"), "A", "SAME-SKU", 1),
                record(Some("10"), "A", "SAME-SKU", 1),
            ],
        };
        sort_group(&mut group);
        assert_eq!(group.records[0].document_number.as_deref(), Some("10"));
        assert_eq!(group.records[1].document_number.as_deref(), Some("20"));
    }
}
