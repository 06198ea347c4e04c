//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | input/output     | Reading and writing series, payloads     |
//! | 10-19   | engine           | Config, store, merge and geometry codes  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use tracemerge_recon::ReconError;
use tracemerge_store::StoreError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Input / output (3-9)
// =============================================================================

/// A file could not be read or written.
pub const EXIT_IO: u8 = 3;

/// A series, decisions or payload file is not valid JSON for its type.
pub const EXIT_PARSE: u8 = 4;

// =============================================================================
// Engine (10-19)
// =============================================================================

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 10;

/// Store could not be opened, read or written.
pub const EXIT_STORE: u8 = 11;

/// Match batch rejected under `duplicate_policy = "reject"`.
pub const EXIT_DUPLICATE_MATCH: u8 = 12;

/// Curation decisions reference contours that cannot be resolved.
pub const EXIT_UNRESOLVED: u8 = 13;

/// `validate` found contours with unusable geometry.
pub const EXIT_INVALID_GEOMETRY: u8 = 14;

// =============================================================================
// Engine Error Types
// =============================================================================

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::Store(StoreError::DuplicateMatch { .. }) => EXIT_DUPLICATE_MATCH,
        ReconError::Store(_) => EXIT_STORE,
        ReconError::UnresolvedContours(_) | ReconError::MissingContour { .. } => EXIT_UNRESOLVED,
        ReconError::UnknownSeries(_) => EXIT_USAGE,
    }
}
