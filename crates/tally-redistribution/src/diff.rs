//! Reward deltas between two snapshots.
//!
//! Diffing two redistributed snapshots taken at the start and end of a
//! window gives what every entity earned inside that window.

use std::collections::BTreeMap;

use tally_types::{
    MarketRewards, PositionRewards, RewardsState, VaultPositionRewards, VaultRewards,
};

/// `to - from`, field by field.
///
/// Entities only present in `to` are returned unchanged. Entities only
/// present in `from` are dropped.
pub fn diff(from: &RewardsState, to: &RewardsState) -> RewardsState {
    RewardsState {
        markets: subtract_each(&from.markets, &to.markets, |earlier, later| MarketRewards {
            total_supply_shards: &later.total_supply_shards - &earlier.total_supply_shards,
            total_borrow_shards: &later.total_borrow_shards - &earlier.total_borrow_shards,
            total_collateral_shards: &later.total_collateral_shards
                - &earlier.total_collateral_shards,
            total_supply_points: &later.total_supply_points - &earlier.total_supply_points,
            total_borrow_points: &later.total_borrow_points - &earlier.total_borrow_points,
            total_collateral_points: &later.total_collateral_points
                - &earlier.total_collateral_points,
            ..later.clone()
        }),
        positions: subtract_each(&from.positions, &to.positions, |earlier, later| {
            PositionRewards {
                supply_shards: &later.supply_shards - &earlier.supply_shards,
                borrow_shards: &later.borrow_shards - &earlier.borrow_shards,
                collateral_shards: &later.collateral_shards - &earlier.collateral_shards,
                supply_points: &later.supply_points - &earlier.supply_points,
                borrow_points: &later.borrow_points - &earlier.borrow_points,
                collateral_points: &later.collateral_points - &earlier.collateral_points,
                ..later.clone()
            }
        }),
        vaults: subtract_each(&from.vaults, &to.vaults, |earlier, later| VaultRewards {
            total_shards: &later.total_shards - &earlier.total_shards,
            total_points: &later.total_points - &earlier.total_points,
            ..later.clone()
        }),
        vault_positions: subtract_each(
            &from.vault_positions,
            &to.vault_positions,
            |earlier, later| VaultPositionRewards {
                supply_shards: &later.supply_shards - &earlier.supply_shards,
                supply_points: &later.supply_points - &earlier.supply_points,
                ..later.clone()
            },
        ),
    }
}

fn subtract_each<K, V, F>(from: &BTreeMap<K, V>, to: &BTreeMap<K, V>, subtract: F) -> BTreeMap<K, V>
where
    K: Ord + Copy,
    V: Clone,
    F: Fn(&V, &V) -> V,
{
    to.iter()
        .map(|(key, later)| {
            let value = match from.get(key) {
                Some(earlier) => subtract(earlier, later),
                None => later.clone(),
            };
            (*key, value)
        })
        .collect()
}
