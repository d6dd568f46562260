//! Shard and point verdicts.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::Serialize;
use tally_types::{Address, MarketId, RewardsState};

use crate::reduce::reduce;
use crate::{CheckError, Result};

/// Outcome of one consistency check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    pub markets_consistent: bool,
    pub vaults_consistent: bool,
    offending_markets: Vec<MarketId>,
    offending_vaults: Vec<Address>,
    /// The snapshot after subtracting holders from aggregates.
    pub reduced: RewardsState,
}

impl ConsistencyReport {
    fn new<F>(reduced: RewardsState, metric: Metric, within_bounds: F) -> Self
    where
        F: Fn(&[&BigInt]) -> bool,
    {
        let offending_markets: Vec<MarketId> = reduced
            .markets
            .values()
            .filter(|market| {
                let residuals = match metric {
                    Metric::Shards => [
                        &market.total_supply_shards,
                        &market.total_borrow_shards,
                        &market.total_collateral_shards,
                    ],
                    Metric::Points => [
                        &market.total_supply_points,
                        &market.total_borrow_points,
                        &market.total_collateral_points,
                    ],
                };
                !within_bounds(&residuals)
            })
            .map(|market| market.id)
            .collect();
        let offending_vaults: Vec<Address> = reduced
            .vaults
            .values()
            .filter(|vault| {
                let residual = match metric {
                    Metric::Shards => &vault.total_shards,
                    Metric::Points => &vault.total_points,
                };
                !within_bounds(&[residual])
            })
            .map(|vault| vault.id)
            .collect();

        Self {
            markets_consistent: offending_markets.is_empty(),
            vaults_consistent: offending_vaults.is_empty(),
            offending_markets,
            offending_vaults,
            reduced,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.markets_consistent && self.vaults_consistent
    }

    /// Markets with at least one residual out of bounds.
    pub fn offending_markets(&self) -> &[MarketId] {
        &self.offending_markets
    }

    /// Vaults whose residual is out of bounds.
    pub fn offending_vaults(&self) -> &[Address] {
        &self.offending_vaults
    }
}

#[derive(Clone, Copy)]
enum Metric {
    Shards,
    Points,
}

/// Every shard residual must be exactly zero.
///
/// # Errors
///
/// - [`CheckError::MarketNotFound`] / [`CheckError::VaultNotFound`] for a
///   row whose parent is missing
pub fn check_shards(rewards: &RewardsState) -> Result<ConsistencyReport> {
    let all_zero = |residuals: &[&BigInt]| residuals.iter().all(|r| r.is_zero());
    let report = ConsistencyReport::new(reduce(rewards)?, Metric::Shards, all_zero);

    if !report.is_consistent() {
        tracing::warn!(
            markets = report.offending_markets.len(),
            vaults = report.offending_vaults.len(),
            "shards are inconsistent"
        );
    }
    Ok(report)
}

/// Every point residual must lie in `[0, tolerance]`.
///
/// # Errors
///
/// - [`CheckError::NegativeTolerance`] if `tolerance < 0`
/// - [`CheckError::MarketNotFound`] / [`CheckError::VaultNotFound`] for a
///   row whose parent is missing
pub fn check_points(rewards: &RewardsState, tolerance: &BigInt) -> Result<ConsistencyReport> {
    if tolerance.is_negative() {
        return Err(CheckError::NegativeTolerance(tolerance.clone()));
    }
    let within = |residuals: &[&BigInt]| {
        residuals
            .iter()
            .all(|r| !r.is_negative() && *r <= tolerance)
    };
    let report = ConsistencyReport::new(reduce(rewards)?, Metric::Points, within);

    if !report.is_consistent() {
        tracing::warn!(
            markets = report.offending_markets.len(),
            vaults = report.offending_vaults.len(),
            %tolerance,
            "points are inconsistent"
        );
    }
    Ok(report)
}
