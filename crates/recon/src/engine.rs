use std::collections::HashSet;

use serde::Serialize;

use crate::classify::{classify, unit_crosswalk};
use crate::config::CycleConfig;
use crate::diff::diff;
use crate::error::WellsecError;
use crate::load::{load_evaluation, load_measures, load_overlay, load_registry, load_snapshot, OverlayKind};
use crate::measures::{merge_batches, well_history, MeasureIndex};
use crate::model::{
    AttributeRecord, CrosswalkRow, DiffResult, EvaluationRecord, MeasureRow, Period, Registry,
    RollupMode, SnapshotRow, WellId,
};
use crate::project::{project, Overlays};
use crate::rollup::{rollup, RollupSources};
use crate::store::{StoredTable, TableKey, TableKind, TableStore};
use crate::summary::{compute_summary, CycleSummary};
use crate::tree::{build_tree, TreeIndex};
use crate::triage::{triage_new_wells, NewWellTriage};

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CycleMeta {
    pub name: String,
    pub period: Period,
    pub prior_period: Period,
    pub engine_version: String,
    pub run_at: String,
}

/// Everything one generation cycle produces.
#[derive(Debug, Clone)]
pub struct CycleResult {
    pub meta: CycleMeta,
    pub summary: CycleSummary,
    pub diff: DiffResult,
    pub cancelled_rows: Vec<SnapshotRow>,
    pub added_rows: Vec<SnapshotRow>,
    pub attributes: Vec<AttributeRecord>,
    pub crosswalk: Vec<CrosswalkRow>,
    pub triage: NewWellTriage,
    /// Raw measures of the added wells, by (well, period).
    pub new_well_history: Vec<MeasureRow>,
    /// Registry the cycle started from.
    pub prior_registry: Registry,
    pub registry: Registry,
    pub conventional: Vec<EvaluationRecord>,
    pub shale: Vec<EvaluationRecord>,
    pub tree: TreeIndex,
}

/// Serializable view of a cycle for the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport<'a> {
    pub meta: &'a CycleMeta,
    pub summary: &'a CycleSummary,
    pub reassigned: &'a [crate::model::ReassignmentRecord],
}

impl CycleResult {
    pub fn report(&self) -> CycleReport<'_> {
        CycleReport {
            meta: &self.meta,
            summary: &self.summary,
            reassigned: &self.diff.reassigned,
        }
    }

    pub fn report_json(&self) -> Result<String, WellsecError> {
        serde_json::to_string_pretty(&self.report())
            .map_err(|e| WellsecError::Io(format!("JSON serialization error: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load every table the config names into a fresh store.
///
/// `read` maps a file name from the config to its contents, so this crate
/// stays free of filesystem access.
pub fn build_store(
    config: &CycleConfig,
    mut read: impl FnMut(&str) -> Result<String, WellsecError>,
) -> Result<TableStore, WellsecError> {
    let current = config.current_period()?;
    let prior = config.prior_period()?;
    let cols = &config.columns;
    let tables = &config.tables;
    let mut store = TableStore::new();

    let data = read(&tables.prior_snapshot)?;
    store.insert(
        TableKey::new(TableKind::Snapshot, prior),
        StoredTable::Snapshot(load_snapshot(&tables.prior_snapshot, &data, cols)?),
    );

    let data = read(&tables.current_snapshot)?;
    store.insert(
        TableKey::new(TableKind::Snapshot, current),
        StoredTable::Snapshot(load_snapshot(&tables.current_snapshot, &data, cols)?),
    );

    let data = read(&tables.prior_registry)?;
    store.insert(
        TableKey::new(TableKind::Registry, prior),
        StoredTable::Registry(load_registry(&tables.prior_registry, &data, cols, Some(prior))?),
    );

    let overlays = [
        (&tables.old_area, OverlayKind::OldArea, TableKind::OldAreaOverlay),
        (&tables.expansion, OverlayKind::Expansion, TableKind::ExpansionOverlay),
    ];
    for (file, kind, table_kind) in overlays {
        if let Some(file) = file {
            let data = read(file)?;
            store.insert(
                TableKey::new(table_kind, current),
                StoredTable::Overlay(load_overlay(file, &data, cols, kind)?),
            );
        }
    }

    for file in &tables.measures {
        let data = read(file)?;
        store.push_measures(
            TableKey::new(TableKind::Measures, current),
            load_measures(file, &data, cols)?,
        );
    }

    let bases = [
        (&tables.conventional_base, TableKind::ConventionalEvaluation),
        (&tables.shale_base, TableKind::ShaleEvaluation),
    ];
    for (file, table_kind) in bases {
        if let Some(file) = file {
            let data = read(file)?;
            store.insert(
                TableKey::new(table_kind, prior),
                StoredTable::Evaluation(load_evaluation(file, &data, cols)?),
            );
        }
    }

    log::info!("loaded {} tables for cycle '{}'", store.len(), config.name);
    Ok(store)
}

// ---------------------------------------------------------------------------
// Cycle
// ---------------------------------------------------------------------------

/// Run one generation cycle over tables already in `store`.
///
/// Order: diff, participation, new-well triage, registry projection,
/// conventional rollup, shale rollup, tree index. Any failure aborts the
/// whole cycle.
pub fn run_cycle(config: &CycleConfig, store: &TableStore) -> Result<CycleResult, WellsecError> {
    let current = config.current_period()?;
    let prior = config.prior_period()?;

    let prior_snapshot = store.snapshot(&TableKey::new(TableKind::Snapshot, prior))?;
    let current_snapshot = store.snapshot(&TableKey::new(TableKind::Snapshot, current))?;
    let prior_registry = store.registry(&TableKey::new(TableKind::Registry, prior))?;
    let old_area = store.overlay(&TableKey::new(TableKind::OldAreaOverlay, current))?;
    let expansion = store.overlay(&TableKey::new(TableKind::ExpansionOverlay, current))?;
    let batches = store.measures(&TableKey::new(TableKind::Measures, current))?;
    let conventional_base =
        store.evaluation(&TableKey::new(TableKind::ConventionalEvaluation, prior))?;
    let shale_base = store.evaluation(&TableKey::new(TableKind::ShaleEvaluation, prior))?;

    let diff_result = diff(prior_snapshot, current_snapshot);
    let attributes = classify(prior_snapshot, prior_registry, prior);
    let crosswalk = unit_crosswalk(prior_snapshot, prior_registry);

    let expansion_ids: HashSet<WellId> = expansion.iter().map(|r| r.well_id.clone()).collect();
    let triage = triage_new_wells(&diff_result, current_snapshot, &expansion_ids);

    let registry = project(
        prior_registry,
        &diff_result.reassigned,
        &Overlays {
            old_area,
            expansion,
        },
        current,
    )?;

    let new_well_history = well_history(&merge_batches(batches), &diff_result.added);
    let measures = MeasureIndex::from_batches(batches.iter().map(Vec::as_slice));
    let sources = RollupSources {
        reassignments: &diff_result.reassigned,
        expansion,
        old_area,
        prior_registry,
    };
    let conventional = rollup(
        conventional_base,
        &sources,
        &registry,
        &measures,
        RollupMode::Conventional,
    );
    let shale = rollup(shale_base, &sources, &registry, &measures, RollupMode::Shale);

    let tree = build_tree(&registry);
    let summary = compute_summary(
        &diff_result,
        &attributes,
        &registry,
        &conventional,
        &shale,
        tree.stats(),
    );

    Ok(CycleResult {
        meta: CycleMeta {
            name: config.name.clone(),
            period: current,
            prior_period: prior,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        cancelled_rows: prior_snapshot.select(&diff_result.cancelled),
        added_rows: current_snapshot.select(&diff_result.added),
        diff: diff_result,
        attributes,
        crosswalk,
        triage,
        new_well_history,
        prior_registry: prior_registry.clone(),
        registry,
        conventional,
        shale,
        tree,
    })
}
