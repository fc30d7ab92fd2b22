//! Evaluation rollup: raw monthly measures -> grouped evaluation records.
//!
//! Three passes append to one running table, in order:
//! 1. historical adjustment of the base table,
//! 2. newly registered wells (expansion rows first, then old-area rows),
//! 3. continuing wells' annual data (conventional only).
//!
//! No pass removes or merges rows from an earlier one, so two rows for the
//! same (unit, period) coming from different passes both stay.

use std::collections::{BTreeMap, HashSet};

use crate::measures::{MeasureIndex, PeriodTotals};
use crate::model::{
    EvaluationRecord, OverlayRow, Period, ProductionType, ReassignmentRecord, Registry,
    RollupMode, WellId,
};

/// Inputs besides the base table, the current registry and the measures.
#[derive(Debug, Clone, Copy)]
pub struct RollupSources<'a> {
    pub reassignments: &'a [ReassignmentRecord],
    pub expansion: &'a [OverlayRow],
    pub old_area: &'a [OverlayRow],
    /// Registry of the previous evaluation period (pass 3).
    pub prior_registry: &'a Registry,
}

/// Run all passes for `mode` and return the finished table.
pub fn rollup(
    base: &[EvaluationRecord],
    sources: &RollupSources<'_>,
    registry: &Registry,
    measures: &MeasureIndex,
    mode: RollupMode,
) -> Vec<EvaluationRecord> {
    let mut table = adjust_historical(base, sources.reassignments, registry, mode);
    let base_rows = table.len();

    let added = add_new_wells(&mut table, sources, registry, measures, mode);
    let updated = match mode {
        RollupMode::Conventional => {
            update_continuing(&mut table, sources.prior_registry, registry, measures)
        }
        RollupMode::Shale => 0,
    };

    log::info!(
        "{mode} rollup: {base_rows} base rows, {added} new-well rows, {updated} continuing rows"
    );
    table
}

/// Pass 1.
///
/// Shale evaluation carries no historical reattribution. For conventional
/// evaluation the reassignments of conventional wells are identified (the
/// production type comes from the current registry; unregistered wells count
/// as conventional) but the base rows are returned unchanged: reattributing
/// already summarized history has no defined algorithm yet.
pub fn adjust_historical(
    base: &[EvaluationRecord],
    reassignments: &[ReassignmentRecord],
    registry: &Registry,
    mode: RollupMode,
) -> Vec<EvaluationRecord> {
    if mode == RollupMode::Shale {
        return base.to_vec();
    }

    let conventional = reassignments
        .iter()
        .filter(|r| {
            registry
                .get(&r.well_id)
                .map(|e| e.production_type)
                .unwrap_or_default()
                == ProductionType::Conventional
        })
        .count();
    if conventional > 0 {
        log::info!(
            "{conventional} conventional wells changed unit; historical rows left as summarized"
        );
    }

    base.to_vec()
}

/// Pass 2. Appends one record per (well, period) for overlay wells of the
/// mode's production type. Returns the number of rows appended.
///
/// A well is keyed by its registry assignment (conventional) or by its own id
/// (shale). Wells missing from the registry or without measures add nothing.
pub fn add_new_wells(
    table: &mut Vec<EvaluationRecord>,
    sources: &RollupSources<'_>,
    registry: &Registry,
    measures: &MeasureIndex,
    mode: RollupMode,
) -> usize {
    let before = table.len();
    let wanted = mode.production_type();

    for rows in [sources.expansion, sources.old_area] {
        let mut seen = HashSet::new();
        for row in rows {
            if row.production_type != wanted || !seen.insert(&row.well_id) {
                continue;
            }
            let Some(entry) = registry.get(&row.well_id) else {
                log::debug!("{}: not in registry, skipped", row.well_id);
                continue;
            };
            let Some(periods) = measures.well(&row.well_id) else {
                log::debug!("{}: no measures, skipped", row.well_id);
                continue;
            };
            let (field, unit) = match mode {
                RollupMode::Conventional => {
                    (entry.assignment.field.as_str(), entry.assignment.unit.as_str())
                }
                RollupMode::Shale => (row.well_id.as_str(), row.well_id.as_str()),
            };
            append_periods(table, field, unit, periods, |_| 1);
        }
    }

    table.len() - before
}

/// Pass 3. Wells that are conventional in both registries report their
/// measures under the current registry's assignment. `activeWellCount` is the
/// number of raw rows behind each period. Returns the number of rows appended.
pub fn update_continuing(
    table: &mut Vec<EvaluationRecord>,
    prior: &Registry,
    current: &Registry,
    measures: &MeasureIndex,
) -> usize {
    let before = table.len();
    let prior_wells = prior.wells_of_type(ProductionType::Conventional);
    let current_wells = current.wells_of_type(ProductionType::Conventional);
    let continuing: Vec<&WellId> = prior_wells.intersection(&current_wells).collect();

    for well_id in &continuing {
        let (Some(entry), Some(periods)) = (current.get(well_id), measures.well(well_id)) else {
            continue;
        };
        append_periods(
            table,
            &entry.assignment.field,
            &entry.assignment.unit,
            periods,
            |totals| totals.row_count,
        );
    }

    log::debug!("{} continuing conventional wells", continuing.len());
    table.len() - before
}

fn append_periods(
    table: &mut Vec<EvaluationRecord>,
    field: &str,
    unit: &str,
    periods: &BTreeMap<Period, PeriodTotals>,
    active_wells: impl Fn(&PeriodTotals) -> u32,
) {
    for (period, totals) in periods {
        table.push(EvaluationRecord {
            evaluation_field: field.to_string(),
            evaluation_unit: unit.to_string(),
            year: period.year(),
            month: period.month(),
            oil: totals.oil,
            liquid: totals.liquid,
            active_well_count: active_wells(totals),
        });
    }
}
