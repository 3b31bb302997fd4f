//! Diagnostic tracing for the `mission` and `mission-eval` binaries.
//!
//! Spans and events from the orchestrator (step admission, blocked
//! transitions, timeouts, squad hand-offs) go to stderr only. Stdout carries
//! the JSON mission report, and the ledger export is written separately via
//! `--ledger-out`; neither depends on the log level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. The filter comes from `RUST_LOG` and falls
/// back to `warn`, which shows blocked steps and skill failures only.
///
/// ```bash
/// RUST_LOG=mission=debug mission run --dna dna.json --mission mission.json
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
}
