//! Mission execution core.
//!
//! Turns a skills manifest and a reasoning protocol into an ordered plan,
//! executes it while keeping the set of completed sub-goals inside a fixed
//! Valid Complex, and records every step in an append-only ledger. The crate
//! keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (planning, ordering, geometry,
//!   anomaly scoring). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config and input files, the skill
//!   execution seam, ledger persistence).
//!
//! [`orchestrator`] coordinates core logic with I/O; [`ledger`] owns the
//! shared execution history.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod ledger;
pub mod logging;
pub mod orchestrator;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
