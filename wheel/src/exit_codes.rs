//! Stable exit codes for wheel CLI commands.

/// Command succeeded, a sector was selected, or a replay finished without a decision.
pub const OK: i32 = 0;
/// Command failed due to invalid layout/config/state or other errors.
pub const INVALID: i32 = 1;
/// `wheel next` found no sector that qualifies for scanning.
pub const NO_SECTOR: i32 = 2;
/// `wheel replay` ended with an abort decision (the agent is looping).
pub const LOOP_ABORT: i32 = 3;
/// `wheel replay` ended with a block decision (a human should look).
pub const LOOP_BLOCK: i32 = 4;
