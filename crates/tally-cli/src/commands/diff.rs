//! `tally diff`: rewards earned between two snapshots.

use std::path::Path;

use tally_types::RewardsState;

use super::{read_json, write_json};

pub fn run(from: &Path, to: &Path, out: Option<&Path>) -> anyhow::Result<()> {
    let earlier: RewardsState = read_json(from)?;
    let later: RewardsState = read_json(to)?;
    let delta = tally_redistribution::diff(&earlier, &later);

    tracing::info!(
        positions = delta.positions.len(),
        vault_positions = delta.vault_positions.len(),
        "diff computed"
    );
    write_json(&delta, out)
}
