//! `wellsec` commands: config-driven registry generation cycle plus the
//! standalone diff / classify / tree steps.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use wellsec_recon::classify::{classify, unit_crosswalk};
use wellsec_recon::config::ColumnMapping;
use wellsec_recon::diff::diff;
use wellsec_recon::load::{load_registry, load_snapshot};
use wellsec_recon::tree::{build_tree, TreeIndex};
use wellsec_recon::{build_store, run_cycle, CycleConfig, CycleResult, Period, WellsecError};

use crate::exit_codes::{exit_code_for, EXIT_CYCLE_RUNTIME, EXIT_USAGE};
use crate::export::{self, period_from_file_name, OutputNamer};
use crate::CliError;

#[derive(Subcommand)]
pub enum CycleCommands {
    /// Run a full generation cycle from a TOML config file
    #[command(after_help = "\
Examples:
  wellsec run cycle.toml
  wellsec run cycle.toml --json
  wellsec run cycle.toml --output report.json
  RUST_LOG=info wellsec run cycle.toml")]
    Run {
        /// Path to the cycle .toml config file
        config: PathBuf,

        /// Output JSON report to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON report to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a cycle config without running
    #[command(after_help = "\
Examples:
  wellsec validate cycle.toml")]
    Validate {
        /// Path to the cycle .toml config file
        config: PathBuf,
    },

    /// Compare two assignment snapshots
    #[command(after_help = "\
Writes cancelled, added and reassigned wells as CSV tables.

Examples:
  wellsec diff a2-202409.csv a2-202509.csv
  wellsec diff a2-202409.csv a2-202509.csv --out-dir diff/ --json")]
    Diff {
        /// Prior period snapshot CSV
        prior: PathBuf,

        /// Current period snapshot CSV
        current: PathBuf,

        /// Output directory
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,

        /// Print the diff as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Mark snapshot wells as participating or not
    #[command(after_help = "\
The period defaults to the first YYYYMM found in the snapshot file name.

Examples:
  wellsec classify a2-202409.csv sec-202409.csv
  wellsec classify snapshot.csv registry.csv --period 202409")]
    Classify {
        /// Assignment snapshot CSV
        snapshot: PathBuf,

        /// Registry CSV
        registry: PathBuf,

        /// Attribute period (YYYYMM)
        #[arg(long)]
        period: Option<u32>,

        /// Output directory
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,
    },

    /// Show registry wells grouped by field and unit
    #[command(after_help = "\
Examples:
  wellsec tree sec-202509.csv
  wellsec tree sec-202509.csv --json")]
    Tree {
        /// Registry CSV
        registry: PathBuf,

        /// Print the tree as JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_cycle(cmd: CycleCommands) -> Result<(), CliError> {
    match cmd {
        CycleCommands::Run {
            config,
            json,
            output,
        } => cmd_run(config, json, output),
        CycleCommands::Validate { config } => cmd_validate(config),
        CycleCommands::Diff {
            prior,
            current,
            out_dir,
            json,
        } => cmd_diff(prior, current, out_dir, json),
        CycleCommands::Classify {
            snapshot,
            registry,
            period,
            out_dir,
        } => cmd_classify(snapshot, registry, period, out_dir),
        CycleCommands::Tree { registry, json } => cmd_tree(registry, json),
    }
}

fn cycle_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError {
        code,
        message: msg.into(),
        hint: None,
    }
}

fn engine_err(err: WellsecError) -> CliError {
    let hint = match &err {
        WellsecError::MissingColumn { .. } => {
            Some("column names can be overridden under [columns] in the cycle config".to_string())
        }
        WellsecError::Validation { .. } => Some("fix the listed rows and rerun".to_string()),
        _ => None,
    };
    CliError {
        code: exit_code_for(&err),
        message: err.to_string(),
        hint,
    }
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| cycle_err(EXIT_CYCLE_RUNTIME, format!("cannot read {}: {e}", path.display())))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

fn load_config(config_path: &Path) -> Result<CycleConfig, CliError> {
    let config_str = read_file(config_path)?;
    CycleConfig::from_toml(&config_str).map_err(engine_err)
}

// ── run ─────────────────────────────────────────────────────────────

fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let store = build_store(&config, |name| {
        let path = base_dir.join(name);
        std::fs::read_to_string(&path)
            .map_err(|e| WellsecError::Io(format!("cannot read {}: {e}", path.display())))
    })
    .map_err(engine_err)?;

    let result = run_cycle(&config, &store).map_err(engine_err)?;

    let namer = OutputNamer::new(base_dir.join(&config.output.dir), config.output.timestamp);
    write_outputs(&namer, &config.columns, &result)?;

    let json_str = result.report_json().map_err(engine_err)?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| cycle_err(EXIT_CYCLE_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "cycle '{}' {} (prior {}): {} cancelled, {} added, {} reassigned",
        result.meta.name,
        result.meta.period,
        result.meta.prior_period,
        s.cancelled,
        s.added,
        s.reassigned,
    );
    eprintln!(
        "participation: {} of {} prior wells participate",
        s.participating_wells, s.classified_wells,
    );
    eprintln!(
        "registry: {} wells, {} fields, {} units",
        s.registry_wells, s.tree.fields, s.tree.units,
    );
    eprintln!(
        "evaluation: {} conventional rows (oil {}), {} shale rows (oil {})",
        s.conventional_rows, s.conventional_oil, s.shale_rows, s.shale_oil,
    );
    if !result.triage.expansion.is_empty() {
        eprintln!(
            "triage: {} new wells match the expansion list",
            result.triage.expansion.len()
        );
    }
    eprintln!("tables written to {}", namer.dir().display());

    Ok(())
}

fn write_outputs(
    namer: &OutputNamer,
    cols: &ColumnMapping,
    result: &CycleResult,
) -> Result<(), CliError> {
    namer.create_dir()?;
    let period = result.meta.period;
    let prior = result.meta.prior_period;

    export::write_snapshot_rows(&namer.path(&format!("cancelled_{period}")), &result.cancelled_rows, cols)?;
    export::write_snapshot_rows(&namer.path(&format!("added_{period}")), &result.added_rows, cols)?;
    export::write_reassignments(
        &namer.path(&format!("reassigned_{period}")),
        &result.diff.reassigned,
        cols,
    )?;
    export::write_attributes(&namer.path(&format!("attributes_{prior}")), &result.attributes, cols)?;
    export::write_crosswalk(&namer.path(&format!("crosswalk_{prior}")), &result.crosswalk, cols)?;
    export::write_overlay_rows(
        &namer.path(&format!("new_wells_expansion_{period}")),
        &result.triage.expansion,
        cols,
    )?;
    export::write_overlay_rows(
        &namer.path(&format!("new_wells_old_area_{period}")),
        &result.triage.old_area,
        cols,
    )?;
    export::write_measures(
        &namer.path(&format!("new_well_history_{period}")),
        &result.new_well_history,
        cols,
    )?;
    export::write_registry(
        &namer.path(&format!("registry_{period}")),
        &result.registry,
        Some(&result.prior_registry),
        cols,
    )?;
    export::write_evaluation(
        &namer.path(&format!("evaluation_conventional_{period}")),
        &result.conventional,
        cols,
    )?;
    export::write_evaluation(
        &namer.path(&format!("evaluation_shale_{period}")),
        &result.shale,
        cols,
    )?;

    let tree_path = namer.file(&format!("tree_{period}"), "json");
    let tree_json = serde_json::to_string_pretty(&result.tree).map_err(|e| {
        cycle_err(EXIT_CYCLE_RUNTIME, format!("JSON serialization error: {e}"))
    })?;
    std::fs::write(&tree_path, tree_json).map_err(|e| {
        cycle_err(EXIT_CYCLE_RUNTIME, format!("cannot write {}: {e}", tree_path.display()))
    })?;
    Ok(())
}

// ── validate ────────────────────────────────────────────────────────

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let prior = config.prior_period().map_err(engine_err)?;
    let tables = &config.tables;
    let overlays = usize::from(tables.old_area.is_some()) + usize::from(tables.expansion.is_some());
    eprintln!(
        "valid: cycle '{}' {} (prior {}) with {} measure table(s), {} overlay(s)",
        config.name,
        config.period,
        prior,
        tables.measures.len(),
        overlays,
    );
    Ok(())
}

// ── diff ────────────────────────────────────────────────────────────

fn cmd_diff(
    prior_path: PathBuf,
    current_path: PathBuf,
    out_dir: PathBuf,
    json_output: bool,
) -> Result<(), CliError> {
    let cols = ColumnMapping::default();
    let prior = load_snapshot(&display_name(&prior_path), &read_file(&prior_path)?, &cols)
        .map_err(engine_err)?;
    let current = load_snapshot(&display_name(&current_path), &read_file(&current_path)?, &cols)
        .map_err(engine_err)?;

    let result = diff(&prior, &current);

    let namer = OutputNamer::new(out_dir, false);
    namer.create_dir()?;
    export::write_snapshot_rows(&namer.path("cancelled"), &prior.select(&result.cancelled), &cols)?;
    export::write_snapshot_rows(&namer.path("added"), &current.select(&result.added), &cols)?;
    export::write_reassignments(&namer.path("reassigned"), &result.reassigned, &cols)?;

    if json_output {
        let json_str = serde_json::to_string_pretty(&result).map_err(|e| {
            cycle_err(EXIT_CYCLE_RUNTIME, format!("JSON serialization error: {e}"))
        })?;
        println!("{json_str}");
    }

    eprintln!(
        "diff: {} cancelled, {} added, {} reassigned ({} -> {} wells)",
        result.cancelled.len(),
        result.added.len(),
        result.reassigned.len(),
        prior.len(),
        current.len(),
    );
    Ok(())
}

// ── classify ────────────────────────────────────────────────────────

fn cmd_classify(
    snapshot_path: PathBuf,
    registry_path: PathBuf,
    period: Option<u32>,
    out_dir: PathBuf,
) -> Result<(), CliError> {
    let period = match period {
        Some(p) => Period::new(p).map_err(engine_err)?,
        None => period_from_file_name(&snapshot_path).ok_or_else(|| {
            cycle_err(EXIT_USAGE, "cannot infer the period from the snapshot file name")
                .with_hint("pass --period YYYYMM")
        })?,
    };

    let cols = ColumnMapping::default();
    let snapshot = load_snapshot(&display_name(&snapshot_path), &read_file(&snapshot_path)?, &cols)
        .map_err(engine_err)?;
    let registry = load_registry(
        &display_name(&registry_path),
        &read_file(&registry_path)?,
        &cols,
        Some(period),
    )
    .map_err(engine_err)?;

    let attributes = classify(&snapshot, &registry, period);
    let crosswalk = unit_crosswalk(&snapshot, &registry);

    let namer = OutputNamer::new(out_dir, false);
    namer.create_dir()?;
    export::write_attributes(&namer.path(&format!("attributes_{period}")), &attributes, &cols)?;
    export::write_crosswalk(&namer.path(&format!("crosswalk_{period}")), &crosswalk, &cols)?;

    let participating = attributes.iter().filter(|a| a.participates).count();
    eprintln!(
        "classify {period}: {participating} of {} wells participate, {} unit pairings",
        attributes.len(),
        crosswalk.len(),
    );
    Ok(())
}

// ── tree ────────────────────────────────────────────────────────────

fn cmd_tree(registry_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let cols = ColumnMapping::default();
    let registry = load_registry(
        &display_name(&registry_path),
        &read_file(&registry_path)?,
        &cols,
        period_from_file_name(&registry_path),
    )
    .map_err(engine_err)?;

    let tree = build_tree(&registry);

    if json_output {
        let json_str = serde_json::to_string_pretty(&tree).map_err(|e| {
            cycle_err(EXIT_CYCLE_RUNTIME, format!("JSON serialization error: {e}"))
        })?;
        println!("{json_str}");
    } else {
        print!("{}", render_tree(&tree));
    }

    let stats = tree.stats();
    eprintln!(
        "tree: {} fields, {} units, {} wells",
        stats.fields, stats.units, stats.wells
    );
    Ok(())
}

fn render_tree(tree: &TreeIndex) -> String {
    let mut out = String::new();
    for (field, units) in &tree.fields {
        let wells: usize = units.values().map(Vec::len).sum();
        out.push_str(&format!("{field} ({} units, {wells} wells)\n", units.len()));
        for (unit, ids) in units {
            let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
            out.push_str(&format!("  {unit}: {}\n", ids.join(", ")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wellsec_recon::model::{ProductionType, RegistryEntry, SourceType, UnitAssignment, WellAttributes};
    use wellsec_recon::Registry;

    #[test]
    fn tree_rendering() {
        let entry = |id: &str, unit: &str| RegistryEntry {
            well_id: id.into(),
            assignment: UnitAssignment::new("F1", unit),
            org_assignment: UnitAssignment::default(),
            participates: true,
            production_type: ProductionType::Conventional,
            source_type: SourceType::Continuing,
            period: None,
            attributes: WellAttributes::default(),
        };
        let registry = Registry::from_entries(None, vec![entry("W2", "U1"), entry("W1", "U1"), entry("W3", "U2")]);
        assert_eq!(
            render_tree(&build_tree(&registry)),
            "F1 (2 units, 3 wells)\n  U1: W1, W2\n  U2: W3\n"
        );
    }

    #[test]
    fn missing_column_hint() {
        let err = engine_err(WellsecError::MissingColumn {
            table: "a.csv".into(),
            column: "井号".into(),
        });
        assert_eq!(err.code, crate::exit_codes::EXIT_CYCLE_SCHEMA);
        assert!(err.hint.unwrap().contains("[columns]"));
    }
}
