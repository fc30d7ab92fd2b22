use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{AttributeRecord, DiffResult, EvaluationRecord, Registry, Volume};
use crate::tree::TreeStats;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleSummary {
    pub cancelled: usize,
    pub added: usize,
    pub reassigned: usize,
    pub classified_wells: usize,
    pub participating_wells: usize,
    pub registry_wells: usize,
    /// Registry wells per source type.
    pub registry_sources: BTreeMap<String, usize>,
    /// Registry wells per production type.
    pub registry_types: BTreeMap<String, usize>,
    pub conventional_rows: usize,
    pub shale_rows: usize,
    pub conventional_oil: Volume,
    pub shale_oil: Volume,
    pub tree: TreeStats,
}

/// Per-table counts for a finished cycle.
pub fn compute_summary(
    diff: &DiffResult,
    attributes: &[AttributeRecord],
    registry: &Registry,
    conventional: &[EvaluationRecord],
    shale: &[EvaluationRecord],
    tree: TreeStats,
) -> CycleSummary {
    let mut registry_sources = BTreeMap::new();
    let mut registry_types = BTreeMap::new();
    for entry in registry.entries() {
        *registry_sources.entry(entry.source_type.to_string()).or_insert(0) += 1;
        *registry_types.entry(entry.production_type.to_string()).or_insert(0) += 1;
    }

    CycleSummary {
        cancelled: diff.cancelled.len(),
        added: diff.added.len(),
        reassigned: diff.reassigned.len(),
        classified_wells: attributes.len(),
        participating_wells: attributes.iter().filter(|a| a.participates).count(),
        registry_wells: registry.len(),
        registry_sources,
        registry_types,
        conventional_rows: conventional.len(),
        shale_rows: shale.len(),
        conventional_oil: conventional.iter().map(|r| r.oil).sum(),
        shale_oil: shale.iter().map(|r| r.oil).sum(),
        tree,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Period, ProductionType, RegistryEntry, SourceType, UnitAssignment, WellAttributes,
    };

    fn entry(id: &str, source_type: SourceType, production_type: ProductionType) -> RegistryEntry {
        RegistryEntry {
            well_id: id.into(),
            assignment: UnitAssignment::new("F", "U"),
            org_assignment: UnitAssignment::default(),
            participates: true,
            production_type,
            source_type,
            period: None,
            attributes: WellAttributes::default(),
        }
    }

    fn record(unit: &str, month: u32, oil: Volume) -> EvaluationRecord {
        EvaluationRecord {
            evaluation_field: "F".into(),
            evaluation_unit: unit.into(),
            year: 2025,
            month,
            oil,
            liquid: oil,
            active_well_count: 1,
        }
    }

    #[test]
    fn summary_counts() {
        let registry = Registry::from_entries(
            None,
            vec![
                entry("A", SourceType::Continuing, ProductionType::Conventional),
                entry("B", SourceType::Continuing, ProductionType::Shale),
                entry("C", SourceType::PudToPdp, ProductionType::Conventional),
            ],
        );
        let attributes = vec![AttributeRecord {
            well_id: "A".into(),
            period: Period::new(202409).unwrap(),
            participates: true,
            base_assignment: UnitAssignment::default(),
            registry_assignment: None,
        }];
        let tree = TreeStats {
            fields: 1,
            units: 1,
            wells: 3,
        };
        let summary = compute_summary(
            &DiffResult::default(),
            &attributes,
            &registry,
            &[record("U", 1, Volume::from_milli(1_500))],
            &[],
            tree,
        );
        assert_eq!(summary.registry_wells, 3);
        assert_eq!(summary.registry_sources["continuing"], 2);
        assert_eq!(summary.registry_sources["pud_to_pdp"], 1);
        assert_eq!(summary.registry_types["shale"], 1);
        assert_eq!(summary.participating_wells, 1);
        assert_eq!(summary.conventional_rows, 1);
        assert_eq!(summary.conventional_oil.to_string(), "1.5");
        assert_eq!(summary.shale_oil, Volume::ZERO);
        assert_eq!(summary.tree, tree);
    }
}
