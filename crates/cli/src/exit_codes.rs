//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                              |
//! |---------|-----------|------------------------------------------|
//! | 0       | Universal | Success                                  |
//! | 1       | Universal | General error (unspecified)              |
//! | 2       | Universal | CLI usage error (bad args, missing file) |
//! | 60-69   | cycle     | Registry generation cycle codes          |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `exit_code_for`

use wellsec_recon::WellsecError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Cycle (60-69)
// =============================================================================

/// Cycle config cannot be parsed or fails validation.
pub const EXIT_CYCLE_INVALID_CONFIG: u8 = 60;

/// An input table lacks a required column.
pub const EXIT_CYCLE_SCHEMA: u8 = 61;

/// Rows failed a structural check (blank well id, bad cell, expansion row
/// without an evaluation unit).
pub const EXIT_CYCLE_VALIDATION: u8 = 62;

/// Runtime failure: unreadable input, unwritable output.
pub const EXIT_CYCLE_RUNTIME: u8 = 63;

/// Map an engine error to its exit code.
pub fn exit_code_for(err: &WellsecError) -> u8 {
    match err {
        WellsecError::ConfigParse(_) | WellsecError::ConfigValidation(_) => {
            EXIT_CYCLE_INVALID_CONFIG
        }
        WellsecError::MissingColumn { .. } => EXIT_CYCLE_SCHEMA,
        WellsecError::Validation { .. } | WellsecError::ValueParse { .. } => {
            EXIT_CYCLE_VALIDATION
        }
        WellsecError::Io(_) => EXIT_CYCLE_RUNTIME,
    }
}
