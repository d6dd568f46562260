//! Command handlers.
//!
//! Each submodule implements one subcommand.

pub mod check;
pub mod diff;
pub mod snapshot;

use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read a JSON document from `path`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Write pretty JSON to `out`, or to stdout when `out` is `None`.
pub fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "output written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
