use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Registry, WellId};

/// field -> unit -> wells, for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TreeIndex {
    pub fields: BTreeMap<String, BTreeMap<String, Vec<WellId>>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub fields: usize,
    pub units: usize,
    pub wells: usize,
}

impl TreeIndex {
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            fields: self.fields.len(),
            units: self.fields.values().map(BTreeMap::len).sum(),
            wells: self
                .fields
                .values()
                .flat_map(BTreeMap::values)
                .map(Vec::len)
                .sum(),
        }
    }
}

/// Group registry wells under their evaluation (field, unit) path.
pub fn build_tree(registry: &Registry) -> TreeIndex {
    let mut tree = TreeIndex::default();
    for entry in registry.entries() {
        let wells = tree
            .fields
            .entry(entry.assignment.field.clone())
            .or_default()
            .entry(entry.assignment.unit.clone())
            .or_default();
        if !wells.contains(&entry.well_id) {
            wells.push(entry.well_id.clone());
        }
    }

    let stats = tree.stats();
    log::debug!(
        "tree index: {} fields, {} units, {} wells",
        stats.fields,
        stats.units,
        stats.wells
    );
    tree
}
