//! First-pass sorting of newly added wells before manual classification.

use std::collections::HashSet;

use serde::Serialize;

use crate::model::{DiffResult, OverlayClass, OverlayRow, ProductionType, Snapshot, WellId};

/// Added wells split by what the reporting team still has to confirm.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewWellTriage {
    /// Added wells that appear in the expansion/reclassification table.
    pub expansion: Vec<OverlayRow>,
    /// Everything else, pre-tagged as old-area new wells pending confirmation.
    pub old_area: Vec<OverlayRow>,
    /// Starts empty; filled by whoever reviews `old_area`.
    pub non_evaluated: Vec<OverlayRow>,
}

/// Split the `added` wells of `diff` using the well ids listed in `expansion_ids`.
///
/// Rows come from `current` in snapshot order. Their assignment starts out as
/// the organizational one.
pub fn triage_new_wells(
    diff: &DiffResult,
    current: &Snapshot,
    expansion_ids: &HashSet<WellId>,
) -> NewWellTriage {
    let mut triage = NewWellTriage::default();

    for row in current.select(&diff.added) {
        let is_expansion = expansion_ids.contains(&row.well_id);
        let overlay = OverlayRow {
            well_id: row.well_id,
            assignment: row.assignment.clone(),
            org_assignment: row.assignment,
            class: if is_expansion {
                OverlayClass::Unclassified
            } else {
                OverlayClass::OldAreaNewWell
            },
            production_type: ProductionType::default(),
            attributes: row.attributes,
        };
        if is_expansion {
            triage.expansion.push(overlay);
        } else {
            triage.old_area.push(overlay);
        }
    }

    log::info!(
        "new well triage: {} expansion/reclassification, {} old-area pending confirmation",
        triage.expansion.len(),
        triage.old_area.len()
    );

    triage
}
