use std::collections::{BTreeMap, HashSet};

use crate::model::{AttributeRecord, CrosswalkRow, Period, Registry, Snapshot, UnitAssignment};

/// Classify each well of `base` against the canonical registry.
///
/// A well participates iff it is a key of `registry`; the registry assignment
/// is only filled in for participating wells. One record per well, in
/// snapshot order.
pub fn classify(base: &Snapshot, registry: &Registry, period: Period) -> Vec<AttributeRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(base.len());

    for row in base.rows() {
        if !seen.insert(&row.well_id) {
            continue;
        }
        let registry_assignment = registry.get(&row.well_id).map(|e| e.assignment.clone());
        records.push(AttributeRecord {
            well_id: row.well_id.clone(),
            period,
            participates: registry_assignment.is_some(),
            base_assignment: row.assignment.clone(),
            registry_assignment,
        });
    }

    let participating = records.iter().filter(|r| r.participates).count();
    log::info!(
        "participation for {period}: {} wells, {participating} participating, {} not",
        records.len(),
        records.len() - participating
    );

    records
}

/// Count wells per (organizational unit, registry unit) pairing.
///
/// Inner join on well id. Sorted by registry field and unit ascending, then
/// well count descending.
pub fn unit_crosswalk(base: &Snapshot, registry: &Registry) -> Vec<CrosswalkRow> {
    let mut counts: BTreeMap<(UnitAssignment, UnitAssignment), usize> = BTreeMap::new();
    for row in base.rows() {
        if let Some(entry) = registry.get(&row.well_id) {
            *counts
                .entry((row.assignment.clone(), entry.assignment.clone()))
                .or_insert(0) += 1;
        }
    }

    let mut rows: Vec<CrosswalkRow> = counts
        .into_iter()
        .map(|((org, registry), well_count)| CrosswalkRow {
            org,
            registry,
            well_count,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.registry
            .cmp(&b.registry)
            .then(b.well_count.cmp(&a.well_count))
    });
    rows
}
