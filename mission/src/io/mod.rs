//! I/O helpers for mission commands.

pub mod config;
pub mod ledger_log;
pub mod manifest;
pub mod skills;
