//! Stable exit codes for `perspective` commands.

/// Command succeeded; `check` found no violations.
pub const OK: i32 = 0;
/// Bad config, unreadable input, or session I/O failure.
pub const ERROR: i32 = 1;
/// `perspective check` found invariant violations.
pub const VIOLATIONS: i32 = 2;
