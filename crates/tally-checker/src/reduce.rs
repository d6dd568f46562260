//! Aggregate minus holders.

use tally_types::RewardsState;

use crate::{CheckError, Result};

/// Subtract every position from its market and every vault position from
/// its vault. Holder rows are carried over unchanged.
///
/// # Errors
///
/// - [`CheckError::MarketNotFound`] / [`CheckError::VaultNotFound`] for a
///   row whose parent is missing
pub fn reduce(rewards: &RewardsState) -> Result<RewardsState> {
    let mut reduced = rewards.clone();

    for position in rewards.positions.values() {
        let market = reduced
            .markets
            .get_mut(&position.market)
            .ok_or(CheckError::MarketNotFound(position.market))?;
        market.total_supply_shards -= &position.supply_shards;
        market.total_borrow_shards -= &position.borrow_shards;
        market.total_collateral_shards -= &position.collateral_shards;
        market.total_supply_points -= &position.supply_points;
        market.total_borrow_points -= &position.borrow_points;
        market.total_collateral_points -= &position.collateral_points;
    }

    for position in rewards.vault_positions.values() {
        let vault = reduced
            .vaults
            .get_mut(&position.vault)
            .ok_or(CheckError::VaultNotFound(position.vault))?;
        vault.total_shards -= &position.supply_shards;
        vault.total_points -= &position.supply_points;
    }

    Ok(reduced)
}
