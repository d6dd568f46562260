//! # tally-cli
//!
//! Command-line front end: `snapshot`, `check` and `diff` over JSON files,
//! configured from `tally.toml`.

pub mod args;
pub mod commands;
pub mod config;
