//! Stable exit codes for runner CLI commands.

/// Command succeeded. Script failures inside a run still exit with `OK`.
pub const OK: i32 = 0;
/// The requested agent, ecosystem or workspace could not be loaded.
pub const FAILURE: i32 = 1;
