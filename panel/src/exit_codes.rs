//! Stable exit codes for panel CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid input files, config, or other errors.
pub const INVALID: i32 = 1;
/// `panel reduce` found the latest event blocking a stage.
pub const BLOCKED: i32 = 3;
