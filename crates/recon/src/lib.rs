//! `wellsec-recon`: well-to-evaluation-unit reconciliation engine.
//!
//! Pure engine crate: receives table contents, returns the cycle's derived
//! tables (diff, participation, projected registry, evaluation rollups, tree).
//! No CLI or filesystem dependencies.

pub mod classify;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod load;
pub mod measures;
pub mod model;
pub mod project;
pub mod rollup;
pub mod store;
pub mod summary;
pub mod tree;
pub mod triage;

pub use config::CycleConfig;
pub use engine::{build_store, run_cycle, CycleResult};
pub use error::WellsecError;
pub use model::{Period, Registry, Snapshot, WellId};
