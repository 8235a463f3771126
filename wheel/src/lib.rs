//! Decision core for a multi-cycle code-improvement agent.
//!
//! Two engines live here:
//!
//! - **Sector rotation**: partitions a codebase into directory-scoped sectors
//!   and picks the next one to scan, balancing staleness, yield history,
//!   classification confidence and failure rate.
//! - **Spindle**: watches an in-flight editing agent turn by turn and reports
//!   when it is looping, stalling, burning its token budget, or stuck on a
//!   failure it cannot fix.
//!
//! The architecture keeps the same split throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (selection, outcome bookkeeping,
//!   loop detection). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (state files, config, inventory and
//!   transcript loading).
//!
//! Orchestration modules ([`rotation`], [`replay`]) coordinate core logic with
//! I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod replay;
pub mod rotation;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
