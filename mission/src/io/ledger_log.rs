//! Persist a ledger synthesis as pretty JSON.
//!
//! Product artifact: written regardless of `RUST_LOG`.

use std::path::Path;

use anyhow::{Context, Result};

use crate::io::config::write_atomic;
use crate::ledger::Synthesis;

/// Atomically write `synthesis` to `path` (temp file + rename).
pub fn write_synthesis(path: &Path, synthesis: &Synthesis) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(synthesis).context("serialize ledger synthesis")?;
    buf.push('\n');
    write_atomic(path, &buf, "json.tmp")
}
