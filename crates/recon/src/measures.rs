use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::{MeasureRow, Period, Volume, WellId};

/// Sums of every raw row one well reported in one period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodTotals {
    pub oil: Volume,
    pub liquid: Volume,
    pub water: Volume,
    pub gas: Volume,
    pub row_count: u32,
}

impl PeriodTotals {
    fn add(&mut self, row: &MeasureRow) {
        self.oil += row.oil;
        self.liquid += row.liquid;
        self.water += row.water;
        self.gas += row.gas;
        self.row_count += 1;
    }
}

/// Raw monthly measures grouped by (well, period).
///
/// Built incrementally: each batch added with [`MeasureIndex::extend`] folds
/// into the same totals, so rows for one (well, period) split across batches
/// are summed.
#[derive(Debug, Clone, Default)]
pub struct MeasureIndex {
    by_well: HashMap<WellId, BTreeMap<Period, PeriodTotals>>,
    rows: usize,
}

impl MeasureIndex {
    pub fn from_rows(rows: &[MeasureRow]) -> Self {
        let mut index = Self::default();
        index.extend(rows);
        index
    }

    pub fn from_batches<'a>(batches: impl IntoIterator<Item = &'a [MeasureRow]>) -> Self {
        let mut index = Self::default();
        for batch in batches {
            index.extend(batch);
        }
        index
    }

    pub fn extend(&mut self, rows: &[MeasureRow]) {
        for row in rows {
            self.by_well
                .entry(row.well_id.clone())
                .or_default()
                .entry(row.period)
                .or_default()
                .add(row);
        }
        self.rows += rows.len();
    }

    /// Per-period totals for one well, periods ascending. `None` when the
    /// well never reported.
    pub fn well(&self, well_id: &WellId) -> Option<&BTreeMap<Period, PeriodTotals>> {
        self.by_well.get(well_id)
    }

    pub fn well_count(&self) -> usize {
        self.by_well.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }
}

/// Concatenate monthly batches, sorted by (period, well).
pub fn merge_batches(batches: &[Vec<MeasureRow>]) -> Vec<MeasureRow> {
    let mut merged: Vec<MeasureRow> = batches.iter().flatten().cloned().collect();
    merged.sort_by(|a, b| a.period.cmp(&b.period).then_with(|| a.well_id.cmp(&b.well_id)));
    log::debug!("merged {} measure batches into {} rows", batches.len(), merged.len());
    merged
}

/// Rows belonging to `wells`, sorted by (well, period). Original order is kept
/// between rows with the same key.
pub fn well_history(rows: &[MeasureRow], wells: &BTreeSet<WellId>) -> Vec<MeasureRow> {
    let mut history: Vec<MeasureRow> = rows
        .iter()
        .filter(|r| wells.contains(&r.well_id))
        .cloned()
        .collect();
    history.sort_by(|a, b| a.well_id.cmp(&b.well_id).then(a.period.cmp(&b.period)));
    log::info!("history for {} wells: {} rows", wells.len(), history.len());
    history
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vol(raw: &str) -> Volume {
        Volume::parse(raw).unwrap()
    }

    fn row(well: &str, period: u32, oil: &str, liquid: &str) -> MeasureRow {
        let (oil, liquid) = (vol(oil), vol(liquid));
        MeasureRow {
            well_id: well.into(),
            period: Period::new(period).unwrap(),
            oil,
            liquid,
            water: Volume::from_milli(liquid.milli() - oil.milli()),
            gas: Volume::ZERO,
        }
    }

    #[test]
    fn sums_rows_per_well_and_period() {
        let rows = vec![
            row("W1", 202501, "10.1", "20"),
            row("W1", 202501, "5.2", "6"),
            row("W1", 202502, "7", "9"),
        ];
        let index = MeasureIndex::from_rows(&rows);
        let w1 = index.well(&"W1".into()).unwrap();
        assert_eq!(w1.len(), 2);

        let jan = w1[&Period::new(202501).unwrap()];
        assert_eq!(jan.oil, vol("15.3"));
        assert_eq!(jan.liquid, vol("26"));
        assert_eq!(jan.water, vol("10.7"));
        assert_eq!(jan.row_count, 2);
        assert_eq!(index.row_count(), 3);
    }

    #[test]
    fn batches_fold_into_same_totals() {
        let a = vec![row("W1", 202501, "0.1", "2")];
        let b = vec![row("W1", 202501, "0.2", "4"), row("W2", 202502, "1", "1")];
        let index = MeasureIndex::from_batches([a.as_slice(), b.as_slice()]);
        assert_eq!(index.well_count(), 2);
        let totals = index.well(&"W1".into()).unwrap()[&Period::new(202501).unwrap()];
        assert_eq!(totals.oil.to_string(), "0.3");
        assert_eq!(totals.row_count, 2);
    }

    #[test]
    fn missing_well_is_none() {
        let index = MeasureIndex::from_rows(&[row("W1", 202501, "1", "1")]);
        assert!(index.well(&"W404".into()).is_none());
    }

    #[test]
    fn merge_orders_by_period_then_well() {
        let merged = merge_batches(&[
            vec![row("W2", 202502, "1", "1"), row("W1", 202502, "1", "1")],
            vec![row("W3", 202501, "1", "1")],
        ]);
        let keys: Vec<(u32, &str)> = merged.iter().map(|r| (r.period.value(), r.well_id.as_str())).collect();
        assert_eq!(keys, vec![(202501, "W3"), (202502, "W1"), (202502, "W2")]);
    }

    #[test]
    fn history_filters_and_sorts() {
        let rows = vec![
            row("W2", 202502, "1", "1"),
            row("W1", 202502, "2", "2"),
            row("W1", 202501, "3", "3"),
            row("W9", 202501, "4", "4"),
        ];
        let wells: BTreeSet<WellId> = ["W1".into(), "W2".into()].into_iter().collect();
        let history = well_history(&rows, &wells);
        let keys: Vec<(&str, u32)> = history.iter().map(|r| (r.well_id.as_str(), r.period.value())).collect();
        assert_eq!(keys, vec![("W1", 202501), ("W1", 202502), ("W2", 202502)]);
    }
}
