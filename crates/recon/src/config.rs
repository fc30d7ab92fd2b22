use serde::Deserialize;

use crate::error::WellsecError;
use crate::model::Period;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One generation cycle: which tables to load and where results go.
#[derive(Debug, Clone, Deserialize)]
pub struct CycleConfig {
    pub name: String,
    /// Current period, `YYYYMM`.
    pub period: u32,
    /// Period of the prior snapshot and registry. Defaults to the same month
    /// one year earlier.
    #[serde(default)]
    pub prior_period: Option<u32>,
    pub tables: TableFiles,
    #[serde(default)]
    pub columns: ColumnMapping,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Input files, relative to the config file's directory.
#[derive(Debug, Clone, Deserialize)]
pub struct TableFiles {
    pub prior_snapshot: String,
    pub current_snapshot: String,
    pub prior_registry: String,
    #[serde(default)]
    pub old_area: Option<String>,
    #[serde(default)]
    pub expansion: Option<String>,
    /// Monthly measure batches.
    pub measures: Vec<String>,
    #[serde(default)]
    pub conventional_base: Option<String>,
    #[serde(default)]
    pub shale_base: Option<String>,
}

impl TableFiles {
    fn all_paths(&self) -> Vec<(&'static str, &str)> {
        let mut paths = vec![
            ("prior_snapshot", self.prior_snapshot.as_str()),
            ("current_snapshot", self.current_snapshot.as_str()),
            ("prior_registry", self.prior_registry.as_str()),
        ];
        let optional = [
            ("old_area", &self.old_area),
            ("expansion", &self.expansion),
            ("conventional_base", &self.conventional_base),
            ("shale_base", &self.shale_base),
        ];
        for (name, path) in optional {
            if let Some(path) = path {
                paths.push((name, path.as_str()));
            }
        }
        for path in &self.measures {
            paths.push(("measures", path.as_str()));
        }
        paths
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Header names in the input tables. Defaults are the source workbook headers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub well_id: String,
    pub field: String,
    pub unit: String,
    pub registry_field: String,
    pub registry_unit: String,
    pub participates: String,
    pub production_type: String,
    pub source_tag: String,
    pub new_well_class: String,
    pub period: String,
    pub oil: String,
    pub liquid: String,
    pub water: String,
    pub gas: String,
    pub start_date: String,
    pub reservoir_type: String,
    pub category: String,
    pub well_type: String,
    pub current_zone: String,
    pub closed_zone: String,
    pub evaluation_field: String,
    pub evaluation_unit: String,
    pub year: String,
    pub month: String,
    pub evaluation_oil: String,
    pub evaluation_liquid: String,
    pub active_wells: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            well_id: "井号".into(),
            field: "大油田".into(),
            unit: "单元".into(),
            registry_field: "SEC油田".into(),
            registry_unit: "SEC单元".into(),
            participates: "是否参评".into(),
            production_type: "页岩油/常规".into(),
            source_tag: "扩边/PUD转PDP/PDNP".into(),
            new_well_class: "新井类型".into(),
            period: "年月".into(),
            oil: "月产油量(t)".into(),
            liquid: "月产液量(t)".into(),
            water: "月产水量(m3)".into(),
            gas: "月产气量(10^4m3)".into(),
            start_date: "投产日期".into(),
            reservoir_type: "油藏类型".into(),
            category: "井别".into(),
            well_type: "井型".into(),
            current_zone: "当前层位".into(),
            closed_zone: "关闭层位".into(),
            evaluation_field: "油气田".into(),
            evaluation_unit: "评估单元".into(),
            year: "生产时间年".into(),
            month: "生产时间月".into(),
            evaluation_oil: "油".into(),
            evaluation_liquid: "液".into(),
            active_wells: "油井开井数".into(),
        }
    }
}

impl ColumnMapping {
    /// Registry field and unit headers for one evaluation year, e.g.
    /// `2025SEC油田` / `2025SEC单元`.
    pub fn versioned_registry(&self, year: i32) -> (String, String) {
        (
            format!("{year}{}", self.registry_field),
            format!("{year}{}", self.registry_unit),
        )
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    /// Append `_YYYYMMDD_HHMMSS` to every output file name.
    #[serde(default)]
    pub timestamp: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            timestamp: false,
        }
    }
}

fn default_output_dir() -> String {
    "out".into()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl CycleConfig {
    pub fn from_toml(input: &str) -> Result<Self, WellsecError> {
        let config: CycleConfig =
            toml::from_str(input).map_err(|e| WellsecError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn current_period(&self) -> Result<Period, WellsecError> {
        Period::new(self.period)
    }

    pub fn prior_period(&self) -> Result<Period, WellsecError> {
        match self.prior_period {
            Some(p) => Period::new(p),
            None => {
                let current = self.current_period()?;
                Period::from_year_month(current.year() - 1, current.month())
            }
        }
    }

    pub fn validate(&self) -> Result<(), WellsecError> {
        if self.name.trim().is_empty() {
            return Err(WellsecError::ConfigValidation("name must not be empty".into()));
        }

        let current = self.current_period()?;
        let prior = self.prior_period()?;
        if prior >= current {
            return Err(WellsecError::ConfigValidation(format!(
                "prior_period {prior} must be earlier than period {current}"
            )));
        }

        if self.tables.measures.is_empty() {
            return Err(WellsecError::ConfigValidation(
                "at least one measures table is required".into(),
            ));
        }

        for (name, path) in self.tables.all_paths() {
            if path.trim().is_empty() {
                return Err(WellsecError::ConfigValidation(format!(
                    "tables.{name}: file name must not be empty"
                )));
            }
        }

        if self.columns.well_id.trim().is_empty() {
            return Err(WellsecError::ConfigValidation(
                "columns.well_id must not be empty".into(),
            ));
        }

        if self.output.dir.trim().is_empty() {
            return Err(WellsecError::ConfigValidation("output.dir must not be empty".into()));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "2025 annual evaluation"
period = 202509
prior_period = 202409

[tables]
prior_snapshot = "a2-202409.csv"
current_snapshot = "a2-202509.csv"
prior_registry = "sec-202409.csv"
old_area = "old-area.csv"
expansion = "expansion.csv"
measures = ["a2-202410.csv", "a2-202411.csv"]

[columns]
well_id = "well"

[output]
dir = "results"
timestamp = true
"#;

    #[test]
    fn parse_valid() {
        let config = CycleConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "2025 annual evaluation");
        assert_eq!(config.current_period().unwrap().value(), 202509);
        assert_eq!(config.prior_period().unwrap().value(), 202409);
        assert_eq!(config.tables.measures.len(), 2);
        assert_eq!(config.columns.well_id, "well");
        // Unset columns keep their defaults
        assert_eq!(config.columns.field, "大油田");
        assert_eq!(config.output.dir, "results");
        assert!(config.output.timestamp);
    }

    #[test]
    fn prior_period_defaults_to_previous_year() {
        let toml = VALID.replace("prior_period = 202409\n", "");
        let config = CycleConfig::from_toml(&toml).unwrap();
        assert_eq!(config.prior_period().unwrap().value(), 202409);
    }

    #[test]
    fn reject_bad_period() {
        let toml = VALID.replace("period = 202509", "period = 202513");
        let err = CycleConfig::from_toml(&toml).unwrap_err();
        assert!(matches!(err, WellsecError::ConfigValidation(_)));
    }

    #[test]
    fn reject_prior_not_earlier() {
        let toml = VALID.replace("prior_period = 202409", "prior_period = 202509");
        let err = CycleConfig::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("must be earlier"));
    }

    #[test]
    fn reject_no_measures() {
        let toml = VALID.replace(r#"measures = ["a2-202410.csv", "a2-202411.csv"]"#, "measures = []");
        assert!(CycleConfig::from_toml(&toml).is_err());
    }

    #[test]
    fn reject_empty_file_name() {
        let toml = VALID.replace(r#"old_area = "old-area.csv""#, r#"old_area = " ""#);
        let err = CycleConfig::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("tables.old_area"));
    }

    #[test]
    fn reject_missing_tables_section() {
        let err = CycleConfig::from_toml("name = \"x\"\nperiod = 202509\n").unwrap_err();
        assert!(matches!(err, WellsecError::ConfigParse(_)));
    }
}
