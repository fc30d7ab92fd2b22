// wellsec CLI - evaluation-unit registry generation for reserves reporting

mod cycle;
mod exit_codes;
mod export;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cycle::CycleCommands;
use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "wellsec")]
#[command(about = "Well-to-evaluation-unit registry generation (diff, participation, rollup)")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Log verbosity: -v for stage summaries, -vv for per-table detail.
    /// RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<CycleCommands>,
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("WELLSEC_COMMIT"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("WELLSEC_TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("WELLSEC_COMMIT"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("WELLSEC_TARGET"),
        )
    }
}

/// Route engine `log` records and any tracing events to stderr.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: wellsec <command> [options]");
            eprintln!("       wellsec --help for more information");
            Err(CliError {
                code: EXIT_USAGE,
                message: String::new(),
                hint: None,
            })
        }
        Some(command) => cycle::cmd_cycle(command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
