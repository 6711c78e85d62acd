//! Stable exit codes for the CLI.

/// Dispatch completed and results were translated back.
pub const OK: i32 = 0;
/// Invalid arguments, unreadable configuration, or a failed dispatch.
pub const FAILURE: i32 = 1;
