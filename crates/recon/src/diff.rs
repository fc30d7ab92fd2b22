use std::collections::{BTreeMap, BTreeSet};

use crate::model::{DiffResult, ReassignmentRecord, Snapshot, SnapshotRow, WellId};

/// Compare two period snapshots.
///
/// `cancelled = prior - current`, `added = current - prior`, and every well in
/// both whose field or unit differs becomes a [`ReassignmentRecord`], ordered
/// by well id. Snapshots are already deduplicated (first row wins).
pub fn diff(prior: &Snapshot, current: &Snapshot) -> DiffResult {
    let prior_by_id = index(prior);
    let current_by_id = index(current);

    let prior_ids: BTreeSet<WellId> = prior_by_id.keys().cloned().collect();
    let current_ids: BTreeSet<WellId> = current_by_id.keys().cloned().collect();

    let cancelled: BTreeSet<WellId> = prior_ids.difference(&current_ids).cloned().collect();
    let added: BTreeSet<WellId> = current_ids.difference(&prior_ids).cloned().collect();

    let mut reassigned = Vec::new();
    for well_id in prior_ids.intersection(&current_ids) {
        let before = prior_by_id[well_id];
        let after = current_by_id[well_id];
        if let Some(record) = compare(before, after) {
            reassigned.push(record);
        }
    }

    log::info!(
        "snapshot diff: {} cancelled, {} added, {} reassigned",
        cancelled.len(),
        added.len(),
        reassigned.len()
    );

    DiffResult {
        cancelled,
        added,
        reassigned,
    }
}

fn index(snapshot: &Snapshot) -> BTreeMap<WellId, &SnapshotRow> {
    let mut by_id = BTreeMap::new();
    for row in snapshot.rows() {
        by_id.entry(row.well_id.clone()).or_insert(row);
    }
    by_id
}

fn compare(before: &SnapshotRow, after: &SnapshotRow) -> Option<ReassignmentRecord> {
    let prior = &before.assignment;
    let current = &after.assignment;
    let field_changed = prior.field != current.field;
    let unit_changed = prior.unit != current.unit;
    if !field_changed && !unit_changed {
        return None;
    }

    Some(ReassignmentRecord {
        well_id: after.well_id.clone(),
        prior: prior.clone(),
        current: current.clone(),
        field_changed,
        unit_changed,
        field_change: change_text(field_changed, &prior.field, &current.field),
        unit_change: change_text(unit_changed, &prior.unit, &current.unit),
        start_date: after.attributes.start_date.clone(),
        reservoir_type: after.attributes.reservoir_type.clone(),
    })
}

/// Downstream display convention: `"<prior>-,<current>+"`.
fn change_text(changed: bool, prior: &str, current: &str) -> String {
    if changed {
        format!("{prior}-,{current}+")
    } else {
        String::new()
    }
}
