//! CSV writers for cycle output tables.
//!
//! Headers come from the cycle's column mapping, so a registry or evaluation
//! table written here loads back as next cycle's input.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use wellsec_recon::config::ColumnMapping;
use wellsec_recon::model::{
    AttributeRecord, CrosswalkRow, EvaluationRecord, MeasureRow, OverlayRow, Period,
    ReassignmentRecord, Registry, SnapshotRow, WellAttributes,
};

use crate::exit_codes::EXIT_CYCLE_RUNTIME;
use crate::CliError;

// ── File naming ─────────────────────────────────────────────────────

/// Builds output paths as `<dir>/<prefix>.csv` or, when timestamped,
/// `<dir>/<prefix>_<YYYYMMDD_HHMMSS>.csv`. One stamp per run.
#[derive(Debug, Clone)]
pub struct OutputNamer {
    dir: PathBuf,
    stamp: Option<String>,
}

impl OutputNamer {
    pub fn new(dir: impl Into<PathBuf>, timestamp: bool) -> Self {
        let stamp = timestamp.then(|| chrono::Local::now().format("%Y%m%d_%H%M%S").to_string());
        Self {
            dir: dir.into(),
            stamp,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, prefix: &str) -> PathBuf {
        self.file(prefix, "csv")
    }

    pub fn file(&self, prefix: &str, ext: &str) -> PathBuf {
        match &self.stamp {
            Some(stamp) => self.dir.join(format!("{prefix}_{stamp}.{ext}")),
            None => self.dir.join(format!("{prefix}.{ext}")),
        }
    }

    pub fn create_dir(&self) -> Result<(), CliError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            export_err(format!("cannot create {}: {e}", self.dir.display()))
        })
    }
}

/// First six-digit run in a file name read as `YYYYMM`, e.g. `a2-202409.csv`.
pub fn period_from_file_name(path: &Path) -> Option<Period> {
    static PERIOD_RE: OnceLock<Regex> = OnceLock::new();
    let re = PERIOD_RE.get_or_init(|| Regex::new(r"(\d{6})").expect("static regex"));
    let name = path.file_name()?.to_str()?;
    re.captures_iter(name)
        .filter_map(|c| c.get(1))
        .find_map(|m| Period::parse(m.as_str()))
}

// ── Writers ─────────────────────────────────────────────────────────

fn export_err(msg: impl Into<String>) -> CliError {
    CliError {
        code: EXIT_CYCLE_RUNTIME,
        message: msg.into(),
        hint: None,
    }
}

fn write_table<I>(path: &Path, headers: &[&str], rows: I) -> Result<usize, CliError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let io_err = |e: csv::Error| export_err(format!("cannot write {}: {e}", path.display()));
    let mut writer = csv::Writer::from_path(path).map_err(io_err)?;
    writer.write_record(headers).map_err(io_err)?;
    let mut count = 0;
    for row in rows {
        writer.write_record(&row).map_err(io_err)?;
        count += 1;
    }
    writer
        .flush()
        .map_err(|e| export_err(format!("cannot write {}: {e}", path.display())))?;
    log::debug!("{}: {count} rows", path.display());
    Ok(count)
}

fn attribute_headers(cols: &ColumnMapping) -> [&str; 6] {
    [
        &cols.start_date,
        &cols.reservoir_type,
        &cols.category,
        &cols.well_type,
        &cols.current_zone,
        &cols.closed_zone,
    ]
}

fn attribute_cells(attrs: &WellAttributes) -> [String; 6] {
    [
        attrs.start_date.clone(),
        attrs.reservoir_type.clone(),
        attrs.category.clone(),
        attrs.well_type.clone(),
        attrs.current_zone.clone(),
        attrs.closed_zone.clone(),
    ]
}

fn period_cell(period: Option<Period>) -> String {
    period.map(|p| p.to_string()).unwrap_or_default()
}

fn participation_cell(participates: bool) -> String {
    let cell = if participates { "是" } else { "否" };
    cell.to_string()
}

/// Cancelled or added wells, as they appeared in their snapshot.
pub fn write_snapshot_rows(
    path: &Path,
    rows: &[SnapshotRow],
    cols: &ColumnMapping,
) -> Result<usize, CliError> {
    let mut headers = vec![cols.well_id.as_str(), &cols.field, &cols.unit, &cols.period];
    headers.extend(attribute_headers(cols));
    write_table(
        path,
        &headers,
        rows.iter().map(|r| {
            let mut cells = vec![
                r.well_id.to_string(),
                r.assignment.field.clone(),
                r.assignment.unit.clone(),
                period_cell(r.period),
            ];
            cells.extend(attribute_cells(&r.attributes));
            cells
        }),
    )
}

pub fn write_reassignments(
    path: &Path,
    records: &[ReassignmentRecord],
    cols: &ColumnMapping,
) -> Result<usize, CliError> {
    let prior_field = format!("原{}", cols.field);
    let prior_unit = format!("原{}", cols.unit);
    let field_change = format!("{}变化", cols.field);
    let unit_change = format!("{}变化", cols.unit);
    let headers = [
        cols.well_id.as_str(),
        &prior_field,
        &prior_unit,
        &cols.field,
        &cols.unit,
        &field_change,
        &unit_change,
        "变化描述",
        &cols.start_date,
        &cols.reservoir_type,
    ];
    write_table(
        path,
        &headers,
        records.iter().map(|r| {
            vec![
                r.well_id.to_string(),
                r.prior.field.clone(),
                r.prior.unit.clone(),
                r.current.field.clone(),
                r.current.unit.clone(),
                r.field_change.clone(),
                r.unit_change.clone(),
                r.description(),
                r.start_date.clone(),
                r.reservoir_type.clone(),
            ]
        }),
    )
}

pub fn write_attributes(
    path: &Path,
    records: &[AttributeRecord],
    cols: &ColumnMapping,
) -> Result<usize, CliError> {
    let headers = [
        cols.well_id.as_str(),
        &cols.period,
        &cols.participates,
        &cols.field,
        &cols.unit,
        &cols.registry_field,
        &cols.registry_unit,
    ];
    write_table(
        path,
        &headers,
        records.iter().map(|r| {
            let registry = r.registry_assignment.clone().unwrap_or_default();
            vec![
                r.well_id.to_string(),
                r.period.to_string(),
                participation_cell(r.participates),
                r.base_assignment.field.clone(),
                r.base_assignment.unit.clone(),
                registry.field,
                registry.unit,
            ]
        }),
    )
}

pub fn write_crosswalk(
    path: &Path,
    rows: &[CrosswalkRow],
    cols: &ColumnMapping,
) -> Result<usize, CliError> {
    let headers = [
        cols.field.as_str(),
        &cols.unit,
        &cols.registry_field,
        &cols.registry_unit,
        "井数",
    ];
    write_table(
        path,
        &headers,
        rows.iter().map(|r| {
            vec![
                r.org.field.clone(),
                r.org.unit.clone(),
                r.registry.field.clone(),
                r.registry.unit.clone(),
                r.well_count.to_string(),
            ]
        }),
    )
}

/// New-well triage lists. The class column is what an analyst fills in.
pub fn write_overlay_rows(
    path: &Path,
    rows: &[OverlayRow],
    cols: &ColumnMapping,
) -> Result<usize, CliError> {
    let mut headers = vec![
        cols.well_id.as_str(),
        &cols.field,
        &cols.unit,
        &cols.production_type,
        &cols.new_well_class,
    ];
    headers.extend(attribute_headers(cols));
    write_table(
        path,
        &headers,
        rows.iter().map(|r| {
            let mut cells = vec![
                r.well_id.to_string(),
                r.org_assignment.field.clone(),
                r.org_assignment.unit.clone(),
                r.production_type.label().to_string(),
                r.class.label().to_string(),
            ];
            cells.extend(attribute_cells(&r.attributes));
            cells
        }),
    )
}

/// Projected registry.
///
/// When the registry carries a period, the plain registry columns keep the
/// attribution each well had in `prior` (empty for wells new this cycle)
/// and the current one goes into the year-versioned columns
/// (`2025SEC油田`, `2025SEC单元`), which is what [`load_registry`] reads
/// back for that year.
///
/// [`load_registry`]: wellsec_recon::load::load_registry
pub fn write_registry(
    path: &Path,
    registry: &Registry,
    prior: Option<&Registry>,
    cols: &ColumnMapping,
) -> Result<usize, CliError> {
    let versioned = registry
        .period()
        .map(|p| cols.versioned_registry(p.year()));

    let mut headers: Vec<&str> = vec![
        cols.well_id.as_str(),
        cols.registry_field.as_str(),
        cols.registry_unit.as_str(),
    ];
    if let Some((field, unit)) = &versioned {
        headers.push(field.as_str());
        headers.push(unit.as_str());
    }
    headers.extend([
        cols.field.as_str(),
        cols.unit.as_str(),
        cols.participates.as_str(),
        cols.production_type.as_str(),
        cols.source_tag.as_str(),
        cols.period.as_str(),
    ]);
    headers.extend(attribute_headers(cols));

    write_table(
        path,
        &headers,
        registry.entries().map(|e| {
            let mut cells = vec![e.well_id.to_string()];
            if versioned.is_some() {
                let before = match prior {
                    Some(prior) => prior
                        .get(&e.well_id)
                        .map(|p| p.assignment.clone())
                        .unwrap_or_default(),
                    None => e.assignment.clone(),
                };
                cells.extend([before.field, before.unit]);
            }
            cells.extend([
                e.assignment.field.clone(),
                e.assignment.unit.clone(),
                e.org_assignment.field.clone(),
                e.org_assignment.unit.clone(),
                participation_cell(e.participates),
                e.production_type.label().to_string(),
                e.source_type.label().to_string(),
                period_cell(e.period),
            ]);
            cells.extend(attribute_cells(&e.attributes));
            cells
        }),
    )
}

/// Raw measure rows, same layout as a measures input table.
pub fn write_measures(
    path: &Path,
    rows: &[MeasureRow],
    cols: &ColumnMapping,
) -> Result<usize, CliError> {
    let headers = [
        cols.well_id.as_str(),
        &cols.period,
        &cols.oil,
        &cols.liquid,
        &cols.water,
        &cols.gas,
    ];
    write_table(
        path,
        &headers,
        rows.iter().map(|r| {
            vec![
                r.well_id.to_string(),
                r.period.to_string(),
                r.oil.to_string(),
                r.liquid.to_string(),
                r.water.to_string(),
                r.gas.to_string(),
            ]
        }),
    )
}

pub fn write_evaluation(
    path: &Path,
    records: &[EvaluationRecord],
    cols: &ColumnMapping,
) -> Result<usize, CliError> {
    let headers = [
        cols.evaluation_field.as_str(),
        &cols.evaluation_unit,
        &cols.year,
        &cols.month,
        &cols.evaluation_oil,
        &cols.evaluation_liquid,
        &cols.active_wells,
    ];
    write_table(
        path,
        &headers,
        records.iter().map(|r| {
            vec![
                r.evaluation_field.clone(),
                r.evaluation_unit.clone(),
                r.year.to_string(),
                r.month.to_string(),
                r.oil.to_string(),
                r.liquid.to_string(),
                r.active_well_count.to_string(),
            ]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wellsec_recon::load::{load_evaluation, load_registry};
    use wellsec_recon::model::{ProductionType, RegistryEntry, SourceType, UnitAssignment, Volume};

    fn vol(raw: &str) -> Volume {
        Volume::parse(raw).unwrap()
    }

    fn entry(id: &str, field: &str, unit: &str, period: Option<Period>) -> RegistryEntry {
        RegistryEntry {
            well_id: id.into(),
            assignment: UnitAssignment::new(field, unit),
            org_assignment: UnitAssignment::new(field, unit),
            participates: true,
            production_type: ProductionType::Conventional,
            source_type: SourceType::Continuing,
            period,
            attributes: WellAttributes::default(),
        }
    }

    #[test]
    fn period_in_file_name() {
        assert_eq!(
            period_from_file_name(Path::new("data/a2-202409.csv")),
            Some(Period::new(202409).unwrap())
        );
        assert_eq!(
            period_from_file_name(Path::new("2024年09月-202409_v2.csv")),
            Some(Period::new(202409).unwrap())
        );
        assert_eq!(period_from_file_name(Path::new("registry.csv")), None);
        // 999999 is not a month; no later candidate
        assert_eq!(period_from_file_name(Path::new("x999999.csv")), None);
    }

    #[test]
    fn timestamped_names() {
        let plain = OutputNamer::new("out", false);
        assert_eq!(plain.path("registry"), PathBuf::from("out/registry.csv"));

        let stamped = OutputNamer::new("out", true);
        let name = stamped.path("registry");
        let name = name.file_name().unwrap().to_str().unwrap();
        let re = Regex::new(r"^registry_\d{8}_\d{6}\.csv$").unwrap();
        assert!(re.is_match(name), "{name}");
        assert_eq!(stamped.path("a"), stamped.path("a"));
    }

    #[test]
    fn registry_reloads_as_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.csv");
        let cols = ColumnMapping::default();
        let period = Period::new(202509).unwrap();
        let registry = Registry::from_entries(
            Some(period),
            vec![
                RegistryEntry {
                    well_id: "W1".into(),
                    assignment: UnitAssignment::new("F1", "U1"),
                    org_assignment: UnitAssignment::new("OF", "OU"),
                    participates: false,
                    production_type: ProductionType::Shale,
                    source_type: SourceType::PudToPdnp,
                    period: Some(period),
                    attributes: WellAttributes {
                        start_date: "2025-03-01".into(),
                        ..WellAttributes::default()
                    },
                },
                RegistryEntry {
                    well_id: "W2".into(),
                    assignment: UnitAssignment::new("F1", "U2"),
                    org_assignment: UnitAssignment::new("F1", "U2"),
                    participates: true,
                    production_type: ProductionType::Conventional,
                    source_type: SourceType::Continuing,
                    period: Some(period),
                    attributes: WellAttributes::default(),
                },
            ],
        );

        assert_eq!(write_registry(&path, &registry, None, &cols).unwrap(), 2);
        let data = std::fs::read_to_string(&path).unwrap();
        let reloaded = load_registry("registry.csv", &data, &cols, Some(period)).unwrap();
        assert_eq!(reloaded, registry);
    }

    #[test]
    fn registry_keeps_prior_attribution_beside_current_year() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.csv");
        let cols = ColumnMapping::default();
        let prior_period = Period::new(202409).unwrap();
        let period = Period::new(202509).unwrap();
        let prior = Registry::from_entries(
            Some(prior_period),
            vec![entry("W1", "F0", "U0", Some(prior_period))],
        );
        let registry = Registry::from_entries(
            Some(period),
            vec![
                entry("W1", "F1", "U1", Some(period)),
                entry("W2", "F1", "U2", Some(period)),
            ],
        );

        write_registry(&path, &registry, Some(&prior), &cols).unwrap();
        let data = std::fs::read_to_string(&path).unwrap();
        let mut lines = data.lines();
        assert!(lines
            .next()
            .unwrap()
            .starts_with("井号,SEC油田,SEC单元,2025SEC油田,2025SEC单元,大油田,单元,"));
        assert!(lines.next().unwrap().starts_with("W1,F0,U0,F1,U1,F1,U1,"));
        assert!(lines.next().unwrap().starts_with("W2,,,F1,U2,F1,U2,"));

        // Read back for 2025 it is the current registry; for 2024, the prior one
        let reloaded = load_registry("registry.csv", &data, &cols, Some(period)).unwrap();
        assert_eq!(reloaded, registry);
        let earlier = load_registry("registry.csv", &data, &cols, Some(prior_period)).unwrap();
        assert_eq!(
            earlier.get(&"W1".into()).unwrap().assignment,
            UnitAssignment::new("F0", "U0")
        );
    }

    #[test]
    fn evaluation_reloads_as_base() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.csv");
        let cols = ColumnMapping::default();
        let records = vec![EvaluationRecord {
            evaluation_field: "F1".into(),
            evaluation_unit: "U1".into(),
            year: 2025,
            month: 1,
            oil: vol("0.1") + vol("0.2"),
            liquid: vol("20"),
            active_well_count: 3,
        }];
        write_evaluation(&path, &records, &cols).unwrap();
        let data = std::fs::read_to_string(&path).unwrap();
        let mut lines = data.lines();
        assert_eq!(lines.next().unwrap(), "油气田,评估单元,生产时间年,生产时间月,油,液,油井开井数");
        assert_eq!(lines.next().unwrap(), "F1,U1,2025,1,0.3,20,3");
        assert_eq!(load_evaluation("eval.csv", &data, &cols).unwrap(), records);
    }

    #[test]
    fn reassignment_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reassigned.csv");
        let record = ReassignmentRecord {
            well_id: "A".into(),
            prior: UnitAssignment::new("F1", "U1"),
            current: UnitAssignment::new("F1", "U2"),
            field_changed: false,
            unit_changed: true,
            field_change: String::new(),
            unit_change: "U1-,U2+".into(),
            start_date: String::new(),
            reservoir_type: String::new(),
        };
        write_reassignments(&path, &[record], &ColumnMapping::default()).unwrap();
        let data = std::fs::read_to_string(&path).unwrap();
        let mut lines = data.lines();
        assert_eq!(
            lines.next().unwrap(),
            "井号,原大油田,原单元,大油田,单元,大油田变化,单元变化,变化描述,投产日期,油藏类型"
        );
        assert_eq!(lines.next().unwrap(), r#"A,F1,U1,F1,U2,,"U1-,U2+","U1-,U2+",,"#);
    }
}
