//! Stable exit codes for the `research` CLI.

/// Every session completed and results were exported.
pub const OK: i32 = 0;
/// Invalid input, config or credentials, or another fatal error.
pub const INVALID: i32 = 1;
/// The batch finished but at least one session failed.
pub const PARTIAL: i32 = 2;
