//! CSV ingestion. Each loader resolves its required columns once, then parses
//! every row into a typed record. A missing required column is a schema error;
//! a bad cell is a parse error naming the line.

use crate::config::ColumnMapping;
use crate::error::WellsecError;
use crate::model::{
    EvaluationRecord, MeasureRow, OverlayClass, OverlayRow, Period, ProductionType, Registry,
    RegistryEntry, Snapshot, SnapshotRow, SourceType, UnitAssignment, Volume, WellAttributes,
    WellId,
};

/// Which overlay table a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// Old-area new wells, classified by the new-well class column.
    OldArea,
    /// Expansion / PUD reclassification wells; registry columns required.
    Expansion,
}

// ---------------------------------------------------------------------------
// Sheet
// ---------------------------------------------------------------------------

struct Sheet<'a> {
    name: &'a str,
    headers: Vec<String>,
    records: Vec<csv::StringRecord>,
}

impl<'a> Sheet<'a> {
    fn parse(name: &'a str, data: &str) -> Result<Self, WellsecError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            headers,
            records,
        })
    }

    /// Column index by name. Also accepts the header without a trailing
    /// `(unit)` suffix and with `/` written as `_`.
    fn find(&self, column: &str) -> Option<usize> {
        let unitless = column
            .rfind('(')
            .filter(|_| column.ends_with(')'))
            .map(|i| &column[..i]);
        let underscored = column.replace('/', "_");
        let candidates = [Some(column), unitless, Some(underscored.as_str())];

        let found = candidates
            .into_iter()
            .flatten()
            .find_map(|candidate| self.headers.iter().position(|h| h == candidate));
        found
    }

    fn require(&self, column: &str) -> Result<usize, WellsecError> {
        self.find(column).ok_or_else(|| WellsecError::MissingColumn {
            table: self.name.into(),
            column: column.into(),
        })
    }

    fn line(record: &csv::StringRecord) -> u64 {
        record.position().map(|p| p.line()).unwrap_or(0)
    }

    fn value_error(&self, record: &csv::StringRecord, column: &str, value: &str) -> WellsecError {
        WellsecError::ValueParse {
            table: self.name.into(),
            line: Self::line(record),
            column: column.into(),
            value: value.into(),
        }
    }

    /// Well ids of every row, rejecting the table if any is blank.
    fn well_ids(&self, idx: usize) -> Result<Vec<WellId>, WellsecError> {
        let mut ids = Vec::with_capacity(self.records.len());
        let mut blank_lines = Vec::new();
        for record in &self.records {
            let id = WellId::new(cell(record, Some(idx)));
            if id.is_blank() {
                blank_lines.push(format!("line {}", Self::line(record)));
            }
            ids.push(id);
        }
        if blank_lines.is_empty() {
            Ok(ids)
        } else {
            Err(WellsecError::validation(
                format!("table '{}': blank well id", self.name),
                blank_lines,
            ))
        }
    }
}

fn cell(record: &csv::StringRecord, idx: Option<usize>) -> &str {
    idx.and_then(|i| record.get(i)).unwrap_or("").trim()
}

struct AttributeColumns {
    category: Option<usize>,
    well_type: Option<usize>,
    reservoir_type: Option<usize>,
    start_date: Option<usize>,
    current_zone: Option<usize>,
    closed_zone: Option<usize>,
}

impl AttributeColumns {
    fn resolve(sheet: &Sheet<'_>, cols: &ColumnMapping) -> Self {
        Self {
            category: sheet.find(&cols.category),
            well_type: sheet.find(&cols.well_type),
            reservoir_type: sheet.find(&cols.reservoir_type),
            start_date: sheet.find(&cols.start_date),
            current_zone: sheet.find(&cols.current_zone),
            closed_zone: sheet.find(&cols.closed_zone),
        }
    }

    fn read(&self, record: &csv::StringRecord) -> WellAttributes {
        WellAttributes {
            category: cell(record, self.category).into(),
            well_type: cell(record, self.well_type).into(),
            reservoir_type: cell(record, self.reservoir_type).into(),
            start_date: cell(record, self.start_date).into(),
            current_zone: cell(record, self.current_zone).into(),
            closed_zone: cell(record, self.closed_zone).into(),
        }
    }
}

fn parse_period(
    sheet: &Sheet<'_>,
    record: &csv::StringRecord,
    idx: Option<usize>,
    column: &str,
) -> Result<Option<Period>, WellsecError> {
    let raw = cell(record, idx);
    if raw.is_empty() {
        return Ok(None);
    }
    Period::parse(raw)
        .map(Some)
        .ok_or_else(|| sheet.value_error(record, column, raw))
}

fn parse_production_type(
    sheet: &Sheet<'_>,
    record: &csv::StringRecord,
    idx: Option<usize>,
    column: &str,
) -> Result<ProductionType, WellsecError> {
    let raw = cell(record, idx);
    ProductionType::from_tag(raw).ok_or_else(|| sheet.value_error(record, column, raw))
}

/// Empty cells read as zero. The decimal text is kept exact, see [`Volume`].
fn parse_volume(
    sheet: &Sheet<'_>,
    record: &csv::StringRecord,
    idx: Option<usize>,
    column: &str,
) -> Result<Volume, WellsecError> {
    let raw = cell(record, idx);
    if raw.is_empty() {
        return Ok(Volume::ZERO);
    }
    Volume::parse(raw).ok_or_else(|| sheet.value_error(record, column, raw))
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Assignment snapshot. Requires well id, field and unit.
pub fn load_snapshot(table: &str, data: &str, cols: &ColumnMapping) -> Result<Snapshot, WellsecError> {
    let sheet = Sheet::parse(table, data)?;
    let id_idx = sheet.require(&cols.well_id)?;
    let field_idx = sheet.require(&cols.field)?;
    let unit_idx = sheet.require(&cols.unit)?;
    let period_idx = sheet.find(&cols.period);
    let attrs = AttributeColumns::resolve(&sheet, cols);

    let ids = sheet.well_ids(id_idx)?;
    let mut rows = Vec::with_capacity(ids.len());
    for (record, well_id) in sheet.records.iter().zip(ids) {
        rows.push(SnapshotRow {
            well_id,
            assignment: UnitAssignment::new(cell(record, Some(field_idx)), cell(record, Some(unit_idx))),
            period: parse_period(&sheet, record, period_idx, &cols.period)?,
            attributes: attrs.read(record),
        });
    }

    let snapshot = Snapshot::from_rows(rows);
    let dropped = sheet.records.len() - snapshot.len();
    if dropped > 0 {
        log::warn!("{table}: {dropped} duplicate well rows ignored (first row kept)");
    }
    log::debug!("{table}: {} wells", snapshot.len());
    Ok(snapshot)
}

/// Canonical (SEC) registry. Requires well id and the registry field/unit.
///
/// With a period, the year-versioned registry columns for that year
/// (`2025SEC油田`, `2025SEC单元`) take precedence over the plain ones. A
/// missing participation cell means the well participates; a later row for
/// the same well replaces an earlier one.
pub fn load_registry(
    table: &str,
    data: &str,
    cols: &ColumnMapping,
    period: Option<Period>,
) -> Result<Registry, WellsecError> {
    let sheet = Sheet::parse(table, data)?;
    let id_idx = sheet.require(&cols.well_id)?;
    let versioned = period.and_then(|p| {
        let (field, unit) = cols.versioned_registry(p.year());
        Some((sheet.find(&field)?, sheet.find(&unit)?))
    });
    let (reg_field_idx, reg_unit_idx) = match versioned {
        Some(found) => found,
        None => (
            sheet.require(&cols.registry_field)?,
            sheet.require(&cols.registry_unit)?,
        ),
    };
    let field_idx = sheet.find(&cols.field);
    let unit_idx = sheet.find(&cols.unit);
    let participates_idx = sheet.find(&cols.participates);
    let type_idx = sheet.find(&cols.production_type);
    let source_idx = sheet.find(&cols.source_tag);
    let period_idx = sheet.find(&cols.period);
    let attrs = AttributeColumns::resolve(&sheet, cols);

    let ids = sheet.well_ids(id_idx)?;
    let mut entries = Vec::with_capacity(ids.len());
    for (record, well_id) in sheet.records.iter().zip(ids) {
        let participates = match cell(record, participates_idx) {
            "" | "是" | "yes" | "true" | "1" => true,
            "否" | "no" | "false" | "0" => false,
            other => return Err(sheet.value_error(record, &cols.participates, other)),
        };
        let source_type = match OverlayClass::from_tag(cell(record, source_idx)) {
            OverlayClass::Unclassified => SourceType::Continuing,
            OverlayClass::OldAreaNewWell => SourceType::OldAreaNewWell,
            OverlayClass::Expansion(source) => source,
            other => return Err(sheet.value_error(record, &cols.source_tag, other.label())),
        };
        entries.push(RegistryEntry {
            well_id,
            assignment: UnitAssignment::new(
                cell(record, Some(reg_field_idx)),
                cell(record, Some(reg_unit_idx)),
            ),
            org_assignment: UnitAssignment::new(cell(record, field_idx), cell(record, unit_idx)),
            participates,
            production_type: parse_production_type(&sheet, record, type_idx, &cols.production_type)?,
            source_type,
            period: parse_period(&sheet, record, period_idx, &cols.period)?.or(period),
            attributes: attrs.read(record),
        });
    }

    let registry = Registry::from_entries(period, entries);
    log::debug!("{table}: {} registered wells", registry.len());
    Ok(registry)
}

/// Overlay table of manually classified wells.
///
/// Old-area tables take their evaluation assignment from the registry columns
/// when present and from the organizational columns otherwise. Expansion
/// tables must have the registry columns.
pub fn load_overlay(
    table: &str,
    data: &str,
    cols: &ColumnMapping,
    kind: OverlayKind,
) -> Result<Vec<OverlayRow>, WellsecError> {
    let sheet = Sheet::parse(table, data)?;
    let id_idx = sheet.require(&cols.well_id)?;
    let field_idx = sheet.find(&cols.field);
    let unit_idx = sheet.find(&cols.unit);
    let (reg_field_idx, reg_unit_idx, class_idx) = match kind {
        OverlayKind::Expansion => (
            Some(sheet.require(&cols.registry_field)?),
            Some(sheet.require(&cols.registry_unit)?),
            sheet.find(&cols.source_tag),
        ),
        OverlayKind::OldArea => (
            sheet.find(&cols.registry_field),
            sheet.find(&cols.registry_unit),
            sheet.find(&cols.new_well_class),
        ),
    };
    let type_idx = sheet.find(&cols.production_type);
    let attrs = AttributeColumns::resolve(&sheet, cols);

    let ids = sheet.well_ids(id_idx)?;
    let mut rows = Vec::with_capacity(ids.len());
    for (record, well_id) in sheet.records.iter().zip(ids) {
        let org = UnitAssignment::new(cell(record, field_idx), cell(record, unit_idx));
        let assignment = match (reg_field_idx, reg_unit_idx) {
            (Some(f), Some(u)) => UnitAssignment::new(cell(record, Some(f)), cell(record, Some(u))),
            _ => org.clone(),
        };
        rows.push(OverlayRow {
            well_id,
            assignment,
            org_assignment: org,
            class: OverlayClass::from_tag(cell(record, class_idx)),
            production_type: parse_production_type(&sheet, record, type_idx, &cols.production_type)?,
            attributes: attrs.read(record),
        });
    }

    log::debug!("{table}: {} overlay rows", rows.len());
    Ok(rows)
}

/// Raw monthly measures. Requires well id, period, oil and liquid; water and
/// gas read as zero when absent. Volumes must be non-negative.
pub fn load_measures(table: &str, data: &str, cols: &ColumnMapping) -> Result<Vec<MeasureRow>, WellsecError> {
    let sheet = Sheet::parse(table, data)?;
    let id_idx = sheet.require(&cols.well_id)?;
    let period_idx = sheet.require(&cols.period)?;
    let oil_idx = sheet.require(&cols.oil)?;
    let liquid_idx = sheet.require(&cols.liquid)?;
    let water_idx = sheet.find(&cols.water);
    let gas_idx = sheet.find(&cols.gas);

    let ids = sheet.well_ids(id_idx)?;
    let mut rows = Vec::with_capacity(ids.len());
    for (record, well_id) in sheet.records.iter().zip(ids) {
        let period = parse_period(&sheet, record, Some(period_idx), &cols.period)?
            .ok_or_else(|| sheet.value_error(record, &cols.period, ""))?;
        rows.push(MeasureRow {
            well_id,
            period,
            oil: parse_volume(&sheet, record, Some(oil_idx), &cols.oil)?,
            liquid: parse_volume(&sheet, record, Some(liquid_idx), &cols.liquid)?,
            water: parse_volume(&sheet, record, water_idx, &cols.water)?,
            gas: parse_volume(&sheet, record, gas_idx, &cols.gas)?,
        });
    }

    log::debug!("{table}: {} measure rows", rows.len());
    Ok(rows)
}

/// A previously produced evaluation table.
pub fn load_evaluation(
    table: &str,
    data: &str,
    cols: &ColumnMapping,
) -> Result<Vec<EvaluationRecord>, WellsecError> {
    let sheet = Sheet::parse(table, data)?;
    let field_idx = sheet.require(&cols.evaluation_field)?;
    let unit_idx = sheet.require(&cols.evaluation_unit)?;
    let year_idx = sheet.require(&cols.year)?;
    let month_idx = sheet.require(&cols.month)?;
    let oil_idx = sheet.find(&cols.evaluation_oil);
    let liquid_idx = sheet.find(&cols.evaluation_liquid);
    let active_idx = sheet.find(&cols.active_wells);

    let mut rows = Vec::with_capacity(sheet.records.len());
    for record in &sheet.records {
        let year_raw = cell(record, Some(year_idx));
        let year: i32 = year_raw
            .parse()
            .map_err(|_| sheet.value_error(record, &cols.year, year_raw))?;
        let month_raw = cell(record, Some(month_idx));
        let month: u32 = month_raw
            .parse()
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| sheet.value_error(record, &cols.month, month_raw))?;
        let active_raw = cell(record, active_idx);
        let active_well_count = if active_raw.is_empty() {
            0
        } else {
            active_raw
                .parse()
                .map_err(|_| sheet.value_error(record, &cols.active_wells, active_raw))?
        };

        rows.push(EvaluationRecord {
            evaluation_field: cell(record, Some(field_idx)).into(),
            evaluation_unit: cell(record, Some(unit_idx)).into(),
            year,
            month,
            oil: parse_volume(&sheet, record, oil_idx, &cols.evaluation_oil)?,
            liquid: parse_volume(&sheet, record, liquid_idx, &cols.evaluation_liquid)?,
            active_well_count,
        });
    }

    log::debug!("{table}: {} evaluation rows", rows.len());
    Ok(rows)
}
