//! Registry projection: prior registry + reassignments + overlays -> new registry.
//!
//! Three stages, each feeding the next:
//! - A: carry the prior registry forward, moving reassigned wells to their
//!   current organizational assignment (used as the evaluation assignment
//!   when no separate SEC mapping is supplied).
//! - B: insert old-area new wells confirmed as such.
//! - C: insert expansion / PUD reclassification wells. Every row must carry a
//!   complete assignment, otherwise the whole projection fails.
//!
//! Then every entry is stamped with the target period.

use std::collections::BTreeMap;

use crate::error::WellsecError;
use crate::model::{
    OverlayClass, OverlayRow, Period, ReassignmentRecord, Registry, RegistryEntry, SourceType,
    WellId,
};

/// Manually classified well lists merged into the registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overlays<'a> {
    pub old_area: &'a [OverlayRow],
    pub expansion: &'a [OverlayRow],
}

/// Project `prior` into the registry for `period`.
///
/// Returns a new registry; `prior` is left as-is. Fails with
/// [`WellsecError::Validation`] naming every bad expansion row, in which case
/// nothing is produced.
pub fn project(
    prior: &Registry,
    reassignments: &[ReassignmentRecord],
    overlays: &Overlays<'_>,
    period: Period,
) -> Result<Registry, WellsecError> {
    let expansion_sources = validate_expansion(overlays.expansion)?;

    let mut entries = apply_reassignments(prior, reassignments);
    let old_area_added = add_old_area_wells(&mut entries, overlays.old_area);
    add_expansion_wells(&mut entries, overlays.expansion, &expansion_sources);

    for entry in entries.values_mut() {
        entry.period = Some(period);
    }

    log::info!(
        "projected registry for {period}: {} wells ({} carried, {old_area_added} old-area, {} expansion)",
        entries.len(),
        prior.len(),
        overlays.expansion.len()
    );

    Ok(Registry::from_map(Some(period), entries))
}

/// Stage A.
fn apply_reassignments(
    prior: &Registry,
    reassignments: &[ReassignmentRecord],
) -> BTreeMap<WellId, RegistryEntry> {
    let mut entries = prior.entry_map().clone();
    for entry in entries.values_mut() {
        entry.source_type = SourceType::Continuing;
    }

    let mut moved = 0;
    for record in reassignments {
        // Wells outside the registry are left to the overlay stages.
        let Some(entry) = entries.get_mut(&record.well_id) else {
            continue;
        };
        entry.assignment = record.current.clone();
        entry.org_assignment = record.current.clone();
        moved += 1;
    }
    log::debug!("stage A: {moved} of {} reassigned wells moved", reassignments.len());
    entries
}

/// Stage B. Returns how many rows were applied.
fn add_old_area_wells(entries: &mut BTreeMap<WellId, RegistryEntry>, rows: &[OverlayRow]) -> usize {
    let mut applied = 0;
    for row in rows {
        if row.class != OverlayClass::OldAreaNewWell {
            continue;
        }
        entries.insert(row.well_id.clone(), overlay_entry(row, SourceType::OldAreaNewWell));
        applied += 1;
    }
    let skipped = rows.len() - applied;
    if skipped > 0 {
        log::debug!("stage B: {skipped} overlay rows not classified as old-area new wells");
    }
    applied
}

/// Stage C. `sources` comes from [`validate_expansion`] and lines up with `rows`.
fn add_expansion_wells(
    entries: &mut BTreeMap<WellId, RegistryEntry>,
    rows: &[OverlayRow],
    sources: &[SourceType],
) {
    for (row, source) in rows.iter().zip(sources) {
        entries.insert(row.well_id.clone(), overlay_entry(row, *source));
    }
}

/// Check every expansion row up front and resolve its source type.
///
/// An empty tag means `ExpandedBoundary`.
fn validate_expansion(rows: &[OverlayRow]) -> Result<Vec<SourceType>, WellsecError> {
    let mut offenders = Vec::new();
    let mut sources = Vec::with_capacity(rows.len());

    for row in rows {
        let mut problems = Vec::new();
        if row.assignment.field.trim().is_empty() {
            problems.push("empty field".to_string());
        }
        if row.assignment.unit.trim().is_empty() {
            problems.push("empty unit".to_string());
        }
        let source = match &row.class {
            OverlayClass::Unclassified => SourceType::ExpandedBoundary,
            OverlayClass::Expansion(source) => *source,
            other => {
                problems.push(format!("tag '{}' is not an expansion class", other.label()));
                SourceType::ExpandedBoundary
            }
        };
        if problems.is_empty() {
            sources.push(source);
        } else {
            offenders.push(format!("{} ({})", row.well_id, problems.join(", ")));
        }
    }

    if offenders.is_empty() {
        Ok(sources)
    } else {
        log::warn!("expansion overlay rejected: {} invalid rows", offenders.len());
        Err(WellsecError::validation(
            "expansion overlay rows missing assignment field or unit",
            offenders,
        ))
    }
}

fn overlay_entry(row: &OverlayRow, source_type: SourceType) -> RegistryEntry {
    RegistryEntry {
        well_id: row.well_id.clone(),
        assignment: row.assignment.clone(),
        org_assignment: row.org_assignment.clone(),
        participates: true,
        production_type: row.production_type,
        source_type,
        period: None,
        attributes: row.attributes.clone(),
    }
}
