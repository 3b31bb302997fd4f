//! Stable exit codes for mission CLI commands.

/// Mission succeeded, or a dry run / score completed below the freeze threshold.
pub const OK: i32 = 0;
/// Invalid input files, config or plan.
pub const INVALID: i32 = 1;
/// Mission finished with status `FAILED` or `PARTIAL`.
pub const MISSION_FAILED: i32 = 2;
/// Anomaly score crossed the freeze threshold.
pub const FROZEN: i32 = 3;
