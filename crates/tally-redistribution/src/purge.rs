//! Blacklist removal.

use std::collections::BTreeSet;

use tally_types::{Address, PositionKey, State, VaultPositionKey};

use crate::{RedistributionError, Result};

/// Remove every position and vault position held by one of `addresses`.
///
/// Each removed row's shards and points are subtracted from its market or
/// vault first, so aggregates keep matching their remaining holders.
/// Principal totals are left as they are.
///
/// # Errors
///
/// - [`RedistributionError::MarketNotFound`] / [`RedistributionError::VaultNotFound`]
///   if a purged row's parent is missing
pub fn purge(state: &State, addresses: &[Address]) -> Result<State> {
    let blacklisted: BTreeSet<&Address> = addresses.iter().collect();
    let mut next = state.clone();

    let positions: Vec<PositionKey> = state
        .positions
        .keys()
        .filter(|key| blacklisted.contains(&key.user))
        .copied()
        .collect();
    for key in &positions {
        let Some(position) = next.positions.remove(key) else {
            continue;
        };
        let market = next
            .markets
            .get_mut(&key.market)
            .ok_or(RedistributionError::MarketNotFound(key.market))?;
        market.total_supply_shards -= &position.supply_shards;
        market.total_borrow_shards -= &position.borrow_shards;
        market.total_collateral_shards -= &position.collateral_shards;
        market.total_supply_points -= &position.supply_points;
        market.total_borrow_points -= &position.borrow_points;
        market.total_collateral_points -= &position.collateral_points;
    }

    let vault_positions: Vec<VaultPositionKey> = state
        .vault_positions
        .keys()
        .filter(|key| blacklisted.contains(&key.user))
        .copied()
        .collect();
    for key in &vault_positions {
        let Some(position) = next.vault_positions.remove(key) else {
            continue;
        };
        let vault = next
            .vaults
            .get_mut(&key.vault)
            .ok_or(RedistributionError::VaultNotFound(key.vault))?;
        vault.total_shards -= &position.supply_shards;
        vault.total_points -= &position.supply_points;
    }

    tracing::info!(
        addresses = addresses.len(),
        positions = positions.len(),
        vault_positions = vault_positions.len(),
        "purged blacklisted addresses"
    );

    Ok(next)
}
