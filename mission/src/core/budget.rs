//! Per-step time budget derived from the step timeout and the mission deadline.

use std::time::Duration;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};

/// Budget for the next step: the configured step timeout, capped by whatever
/// remains until `deadline`.
pub fn step_budget(
    step_timeout: Duration,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Duration> {
    let Some(deadline) = deadline else {
        return Ok(step_timeout);
    };
    let remaining = (deadline - now).to_std().unwrap_or(Duration::ZERO);
    if remaining.is_zero() {
        bail!("mission deadline exceeded");
    }
    Ok(remaining.min(step_timeout))
}
