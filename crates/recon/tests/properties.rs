// Property-based tests for the diff, participation, projection and rollup laws.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{BTreeMap, BTreeSet, HashSet};

use proptest::prelude::*;
use wellsec_recon::classify::classify;
use wellsec_recon::diff::diff;
use wellsec_recon::measures::MeasureIndex;
use wellsec_recon::model::{
    MeasureRow, OverlayClass, OverlayRow, Period, ProductionType, Registry, RegistryEntry,
    Snapshot, SnapshotRow, SourceType, UnitAssignment, Volume, WellAttributes, WellId,
};
use wellsec_recon::project::{project, Overlays};
use wellsec_recon::rollup::update_continuing;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Small id pool so snapshots overlap.
fn arb_well() -> impl Strategy<Value = String> {
    (0u8..24).prop_map(|n| format!("W{n}"))
}

fn arb_assignment() -> impl Strategy<Value = UnitAssignment> {
    (0u8..3, 0u8..4).prop_map(|(f, u)| UnitAssignment::new(format!("F{f}"), format!("U{u}")))
}

fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
    prop::collection::vec((arb_well(), arb_assignment()), 0..30).prop_map(|rows| {
        Snapshot::from_rows(
            rows.into_iter()
                .map(|(id, assignment)| SnapshotRow {
                    well_id: id.as_str().into(),
                    assignment,
                    period: None,
                    attributes: WellAttributes::default(),
                })
                .collect(),
        )
    })
}

fn entry(id: &str, assignment: UnitAssignment, production_type: ProductionType) -> RegistryEntry {
    RegistryEntry {
        well_id: id.into(),
        org_assignment: assignment.clone(),
        assignment,
        participates: true,
        production_type,
        source_type: SourceType::Continuing,
        period: None,
        attributes: WellAttributes::default(),
    }
}

fn arb_entries() -> impl Strategy<Value = Vec<RegistryEntry>> {
    prop::collection::vec((arb_well(), arb_assignment(), any::<bool>()), 0..30).prop_map(|rows| {
        rows.into_iter()
            .map(|(id, assignment, shale)| {
                let production_type = if shale {
                    ProductionType::Shale
                } else {
                    ProductionType::Conventional
                };
                entry(&id, assignment, production_type)
            })
            .collect()
    })
}

/// Volumes in thousandths, so most rows carry a fractional part.
fn arb_measures() -> impl Strategy<Value = Vec<MeasureRow>> {
    prop::collection::vec((arb_well(), 1u32..=6, 0i64..500_000, 0i64..800_000), 0..60).prop_map(
        |rows| {
            rows.into_iter()
                .map(|(id, month, oil, liquid)| MeasureRow {
                    well_id: id.as_str().into(),
                    period: Period::from_year_month(2025, month).unwrap(),
                    oil: Volume::from_milli(oil),
                    liquid: Volume::from_milli(liquid),
                    water: Volume::ZERO,
                    gas: Volume::ZERO,
                })
                .collect()
        },
    )
}

fn arb_source_type() -> impl Strategy<Value = SourceType> {
    prop_oneof![
        Just(SourceType::ExpandedBoundary),
        Just(SourceType::PudToPdp),
        Just(SourceType::PudToPdnp),
    ]
}

fn period() -> Period {
    Period::new(202509).unwrap()
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    /// cancelled, added and the common wells partition prior ∪ current.
    #[test]
    fn diff_partitions_well_ids(prior in arb_snapshot(), current in arb_snapshot()) {
        let result = diff(&prior, &current);
        let prior_ids = prior.well_ids();
        let current_ids = current.well_ids();
        let common: BTreeSet<WellId> = prior_ids.intersection(&current_ids).cloned().collect();

        prop_assert!(result.cancelled.is_disjoint(&result.added));
        prop_assert!(result.cancelled.is_disjoint(&common));
        prop_assert!(result.added.is_disjoint(&common));

        let prior_again: BTreeSet<WellId> = result.cancelled.union(&common).cloned().collect();
        let current_again: BTreeSet<WellId> = result.added.union(&common).cloned().collect();
        prop_assert_eq!(prior_again, prior_ids);
        prop_assert_eq!(current_again, current_ids);

        for record in &result.reassigned {
            prop_assert!(common.contains(&record.well_id));
            prop_assert!(record.field_changed || record.unit_changed);
            prop_assert_eq!(record.field_changed, record.prior.field != record.current.field);
            prop_assert_eq!(record.unit_changed, record.prior.unit != record.current.unit);
        }
    }

    #[test]
    fn diff_with_itself_is_empty(snapshot in arb_snapshot()) {
        prop_assert!(diff(&snapshot, &snapshot).is_empty());
    }
}

// ---------------------------------------------------------------------------
// Participation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn classification_is_idempotent(base in arb_snapshot(), entries in arb_entries()) {
        let registry = Registry::from_entries(None, entries);
        let first = classify(&base, &registry, period());
        let second = classify(&base, &registry, period());
        prop_assert_eq!(&first, &second);

        let distinct: HashSet<&WellId> = first.iter().map(|r| &r.well_id).collect();
        prop_assert_eq!(distinct.len(), first.len());
        prop_assert_eq!(first.len(), base.len());

        for record in &first {
            prop_assert_eq!(record.participates, registry.contains(&record.well_id));
            prop_assert_eq!(record.registry_assignment.is_some(), record.participates);
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    /// One entry per well; the last row for a well wins.
    #[test]
    fn registry_dedup_last_wins(entries in arb_entries()) {
        let mut expected: BTreeMap<WellId, UnitAssignment> = BTreeMap::new();
        for e in &entries {
            expected.insert(e.well_id.clone(), e.assignment.clone());
        }

        let registry = Registry::from_entries(None, entries);
        prop_assert_eq!(registry.len(), expected.len());
        for (id, assignment) in &expected {
            prop_assert_eq!(&registry.get(id).unwrap().assignment, assignment);
        }
    }

    /// Any expansion row without a field or unit fails the whole projection
    /// and is named in the error.
    #[test]
    fn projection_fails_fast(
        entries in arb_entries(),
        rows in prop::collection::vec((arb_well(), any::<bool>(), any::<bool>()), 1..10),
    ) {
        let prior = Registry::from_entries(None, entries);
        let expansion: Vec<OverlayRow> = rows
            .iter()
            .map(|(id, has_field, has_unit)| OverlayRow {
                well_id: id.as_str().into(),
                assignment: UnitAssignment::new(
                    if *has_field { "SF" } else { "" },
                    if *has_unit { "SU" } else { "" },
                ),
                org_assignment: UnitAssignment::default(),
                class: OverlayClass::Expansion(SourceType::ExpandedBoundary),
                production_type: ProductionType::Conventional,
                attributes: WellAttributes::default(),
            })
            .collect();
        let bad: Vec<&str> = expansion
            .iter()
            .filter(|r| !r.assignment.is_complete())
            .map(|r| r.well_id.as_str())
            .collect();

        let overlays = Overlays { old_area: &[], expansion: &expansion };
        match project(&prior, &[], &overlays, period()) {
            Ok(registry) => {
                prop_assert!(bad.is_empty());
                for row in &expansion {
                    prop_assert!(registry.contains(&row.well_id));
                }
            }
            Err(wellsec_recon::WellsecError::Validation { offenders, .. }) => {
                prop_assert_eq!(offenders.len(), bad.len());
                for (offender, id) in offenders.iter().zip(&bad) {
                    let prefix = format!("{id} (");
                    prop_assert!(offender.starts_with(&prefix));
                }
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    /// A well listed more than once in the expansion table ends up with the
    /// assignment and source tag of its last row.
    #[test]
    fn expansion_repeats_last_row_wins(
        entries in arb_entries(),
        rows in prop::collection::vec((arb_well(), arb_assignment(), arb_source_type()), 1..20),
    ) {
        let prior = Registry::from_entries(None, entries);
        let expansion: Vec<OverlayRow> = rows
            .iter()
            .map(|(id, assignment, source_type)| OverlayRow {
                well_id: id.as_str().into(),
                assignment: assignment.clone(),
                org_assignment: assignment.clone(),
                class: OverlayClass::Expansion(*source_type),
                production_type: ProductionType::Conventional,
                attributes: WellAttributes::default(),
            })
            .collect();
        let mut last: BTreeMap<WellId, (UnitAssignment, SourceType)> = BTreeMap::new();
        for (id, assignment, source_type) in &rows {
            last.insert(id.as_str().into(), (assignment.clone(), *source_type));
        }

        let overlays = Overlays { old_area: &[], expansion: &expansion };
        let registry = project(&prior, &[], &overlays, period()).unwrap();
        for (id, (assignment, source_type)) in &last {
            let entry = registry.get(id).unwrap();
            prop_assert_eq!(&entry.assignment, assignment);
            prop_assert_eq!(entry.source_type, *source_type);
        }
    }
}

// ---------------------------------------------------------------------------
// Rollup
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    /// Splitting the raw rows into batches does not change the index.
    #[test]
    fn measure_batches_fold_like_one_table(rows in arb_measures(), split in 0usize..60) {
        let split = split.min(rows.len());
        let whole = MeasureIndex::from_rows(&rows);
        let batched = MeasureIndex::from_batches([&rows[..split], &rows[split..]]);

        prop_assert_eq!(whole.row_count(), batched.row_count());
        prop_assert_eq!(whole.well_count(), batched.well_count());
        for row in &rows {
            prop_assert_eq!(whole.well(&row.well_id), batched.well(&row.well_id));
        }
    }

    /// Per-(unit, period) oil of the continuing pass equals the sum of the raw
    /// rows of the wells registered under that unit.
    #[test]
    fn continuing_oil_is_additive(entries in arb_entries(), rows in arb_measures()) {
        let registry = Registry::from_entries(None, entries);
        let index = MeasureIndex::from_rows(&rows);

        let mut table = Vec::new();
        update_continuing(&mut table, &registry, &registry, &index);

        let mut expected: BTreeMap<(String, String, u32), (Volume, u32)> = BTreeMap::new();
        for row in &rows {
            let Some(e) = registry.get(&row.well_id) else { continue };
            if e.production_type != ProductionType::Conventional {
                continue;
            }
            let key = (e.assignment.field.clone(), e.assignment.unit.clone(), row.period.month());
            let slot = expected.entry(key).or_insert((Volume::ZERO, 0));
            slot.0 += row.oil;
            slot.1 += 1;
        }

        let mut actual: BTreeMap<(String, String, u32), (Volume, u32)> = BTreeMap::new();
        for r in &table {
            let slot = actual
                .entry((r.evaluation_field.clone(), r.evaluation_unit.clone(), r.month))
                .or_insert((Volume::ZERO, 0));
            slot.0 += r.oil;
            slot.1 += r.active_well_count;
        }

        prop_assert_eq!(actual, expected);
    }
}
