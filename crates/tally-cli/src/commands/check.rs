//! `tally check`: conservation checks on a rewards file.

use std::path::Path;

use num_bigint::BigInt;
use serde::Serialize;
use tally_checker::{check_points, check_shards};
use tally_types::{Address, MarketId, RewardsState};

use super::{read_json, write_json};

/// Verdicts for both metrics, without the reduced snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSummary {
    pub shards_consistent: bool,
    pub points_consistent: bool,
    pub offending_markets: Vec<MarketId>,
    pub offending_vaults: Vec<Address>,
}

impl CheckSummary {
    pub fn is_consistent(&self) -> bool {
        self.shards_consistent && self.points_consistent
    }
}

/// Run both checks on `rewards`.
pub fn evaluate(rewards: &RewardsState, tolerance: &BigInt) -> anyhow::Result<CheckSummary> {
    let shards = check_shards(rewards)?;
    let points = check_points(rewards, tolerance)?;

    let mut offending_markets: Vec<MarketId> = shards
        .offending_markets()
        .iter()
        .chain(points.offending_markets())
        .copied()
        .collect();
    offending_markets.sort();
    offending_markets.dedup();
    let mut offending_vaults: Vec<Address> = shards
        .offending_vaults()
        .iter()
        .chain(points.offending_vaults())
        .copied()
        .collect();
    offending_vaults.sort();
    offending_vaults.dedup();

    Ok(CheckSummary {
        shards_consistent: shards.is_consistent(),
        points_consistent: points.is_consistent(),
        offending_markets,
        offending_vaults,
    })
}

/// Check the rewards file at `input` and print the summary.
pub fn run(input: &Path, tolerance: &BigInt) -> anyhow::Result<CheckSummary> {
    let rewards: RewardsState = read_json(input)?;
    let summary = evaluate(&rewards, tolerance)?;
    write_json(&summary, None)?;
    Ok(summary)
}
