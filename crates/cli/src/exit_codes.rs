//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Domain    | Description                                      |
//! |------|-----------|--------------------------------------------------|
//! | 0    | Universal | Success                                          |
//! | 1    | Universal | General error (unspecified)                      |
//! | 2    | Universal | CLI usage error (bad args, bad output extension) |
//! | 3    | config    | Run config unreadable, unparseable or invalid    |
//! | 4    | load      | An input file could not be loaded                |
//! | 5    | input     | Malformed input (duplicate column names)         |
//! | 6    | write     | Output could not be written to any destination   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant below
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

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
// Reconciliation run (3-6)
// =============================================================================

/// Config file missing, not TOML, or failing validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Register, reference or a schedule could not be read.
pub const EXIT_LOAD: u8 = 4;

/// An input table has duplicate column names. Nothing is written.
pub const EXIT_MALFORMED_INPUT: u8 = 5;

/// Writing the output failed, including the fallback destination if one was given.
pub const EXIT_WRITE: u8 = 6;
