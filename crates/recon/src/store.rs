//! Keyed store for loaded tables.
//!
//! The engine functions take tables as arguments and never keep them; this
//! store is what a caller holds between steps.

use std::collections::HashMap;
use std::fmt;

use crate::error::WellsecError;
use crate::model::{EvaluationRecord, MeasureRow, OverlayRow, Period, Registry, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    Snapshot,
    Registry,
    OldAreaOverlay,
    ExpansionOverlay,
    Measures,
    ConventionalEvaluation,
    ShaleEvaluation,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot => write!(f, "snapshot"),
            Self::Registry => write!(f, "registry"),
            Self::OldAreaOverlay => write!(f, "old_area_overlay"),
            Self::ExpansionOverlay => write!(f, "expansion_overlay"),
            Self::Measures => write!(f, "measures"),
            Self::ConventionalEvaluation => write!(f, "conventional_evaluation"),
            Self::ShaleEvaluation => write!(f, "shale_evaluation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    pub kind: TableKind,
    pub period: Period,
}

impl TableKey {
    pub fn new(kind: TableKind, period: Period) -> Self {
        Self { kind, period }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.period)
    }
}

#[derive(Debug, Clone)]
pub enum StoredTable {
    Snapshot(Snapshot),
    Registry(Registry),
    Overlay(Vec<OverlayRow>),
    /// Measure batches in load order.
    Measures(Vec<Vec<MeasureRow>>),
    Evaluation(Vec<EvaluationRecord>),
}

impl StoredTable {
    fn label(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot",
            Self::Registry(_) => "registry",
            Self::Overlay(_) => "overlay",
            Self::Measures(_) => "measures",
            Self::Evaluation(_) => "evaluation",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableStore {
    tables: HashMap<TableKey, StoredTable>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a table, returning whatever was under the same key.
    pub fn insert(&mut self, key: TableKey, table: StoredTable) -> Option<StoredTable> {
        log::debug!("store: {key} <- {}", table.label());
        self.tables.insert(key, table)
    }

    /// Append one measure batch under `key`.
    pub fn push_measures(&mut self, key: TableKey, batch: Vec<MeasureRow>) {
        match self.tables.entry(key).or_insert_with(|| StoredTable::Measures(Vec::new())) {
            StoredTable::Measures(batches) => batches.push(batch),
            other => *other = StoredTable::Measures(vec![batch]),
        }
    }

    pub fn contains(&self, key: &TableKey) -> bool {
        self.tables.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn keys(&self) -> Vec<TableKey> {
        let mut keys: Vec<TableKey> = self.tables.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn snapshot(&self, key: &TableKey) -> Result<&Snapshot, WellsecError> {
        match self.get(key)? {
            StoredTable::Snapshot(s) => Ok(s),
            other => Err(wrong_kind(key, other)),
        }
    }

    pub fn registry(&self, key: &TableKey) -> Result<&Registry, WellsecError> {
        match self.get(key)? {
            StoredTable::Registry(r) => Ok(r),
            other => Err(wrong_kind(key, other)),
        }
    }

    /// Overlay rows; an absent overlay is an empty list.
    pub fn overlay(&self, key: &TableKey) -> Result<&[OverlayRow], WellsecError> {
        match self.tables.get(key) {
            None => Ok(&[]),
            Some(StoredTable::Overlay(rows)) => Ok(rows),
            Some(other) => Err(wrong_kind(key, other)),
        }
    }

    pub fn measures(&self, key: &TableKey) -> Result<&[Vec<MeasureRow>], WellsecError> {
        match self.get(key)? {
            StoredTable::Measures(batches) => Ok(batches),
            other => Err(wrong_kind(key, other)),
        }
    }

    /// Evaluation rows; an absent table is empty.
    pub fn evaluation(&self, key: &TableKey) -> Result<&[EvaluationRecord], WellsecError> {
        match self.tables.get(key) {
            None => Ok(&[]),
            Some(StoredTable::Evaluation(rows)) => Ok(rows),
            Some(other) => Err(wrong_kind(key, other)),
        }
    }

    fn get(&self, key: &TableKey) -> Result<&StoredTable, WellsecError> {
        self.tables
            .get(key)
            .ok_or_else(|| WellsecError::ConfigValidation(format!("table {key} not loaded")))
    }
}

fn wrong_kind(key: &TableKey, found: &StoredTable) -> WellsecError {
    WellsecError::ConfigValidation(format!("table {key} holds a {} table", found.label()))
}
