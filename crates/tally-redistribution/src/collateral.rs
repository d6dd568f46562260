//! Collateral-donation pass.
//!
//! The protocol placeholder holds a supply position next to a vault in each
//! market the vault supplies into. That position is the vault's backing
//! stake. A vault's token can in turn be posted as collateral in other
//! markets, and this pass donates the stake to the users doing so: it is
//! split across the markets using the vault as collateral token, weighted
//! by each market's collateral shards, then within a market across the
//! positions holding collateral, weighted by their own collateral shards.
//! Each user is credited a vault position in the vault.
//!
//! The donated units leave the stake market's supply lane and join the
//! vault, so aggregates keep matching their holders. Truncation dust stays
//! on the placeholder's position.

use num_bigint::BigInt;
use num_traits::Zero;
use tally_types::{
    Address, EntityRef, MarketId, PositionKey, State, VaultPosition, VaultPositionKey,
};

use crate::units::{debit, Units};
use crate::{RedistributionError, Result};

/// Run the collateral-donation pass for every vault.
///
/// # Errors
///
/// - [`RedistributionError::NegativeRemainder`] if a placeholder position
///   would pay out more than it holds
/// - [`RedistributionError::MarketNotFound`] / [`RedistributionError::VaultNotFound`]
///   if a paying row's parent is missing
pub fn collateral_pass(state: &State, protocol: Address) -> Result<State> {
    let mut next = state.clone();
    for vault in state.vaults.keys() {
        let stake_markets: Vec<MarketId> = state
            .positions_of(vault)
            .map(|position| position.market)
            .collect();
        for stake_market in stake_markets {
            donate(&mut next, *vault, stake_market, protocol)?;
        }
    }
    Ok(next)
}

fn donate(
    state: &mut State,
    vault_id: Address,
    stake_market: MarketId,
    protocol: Address,
) -> Result<()> {
    let reserved_key = PositionKey::new(stake_market, protocol);
    let Some(reserved) = state.positions.get(&reserved_key) else {
        return Ok(());
    };
    let donated = Units::new(reserved.supply_shards.clone(), reserved.supply_points.clone());
    if donated.is_zero() {
        return Ok(());
    }

    let markets: Vec<(MarketId, BigInt)> = state
        .markets
        .values()
        .filter(|market| market.collateral_token == vault_id)
        .filter(|market| !market.total_collateral_shards.is_zero())
        .map(|market| (market.id, market.total_collateral_shards.clone()))
        .collect();
    if markets.is_empty() {
        return Ok(());
    }
    let all_collateral: BigInt = markets.iter().map(|(_, shards)| shards).sum();

    let vault = state
        .vaults
        .get(&vault_id)
        .cloned()
        .ok_or(RedistributionError::VaultNotFound(vault_id))?;

    let mut paid = Units::default();
    let mut credited = 0usize;

    for (market_id, market_collateral) in &markets {
        let allotment = donated.pro_rata(market_collateral, &all_collateral);

        let backers: Vec<(Address, BigInt)> = state
            .positions_in(market_id)
            .filter(|position| !position.collateral_shards.is_zero())
            .map(|position| (position.user, position.collateral_shards.clone()))
            .collect();

        for (user, collateral_shards) in backers {
            let share = allotment.pro_rata(&collateral_shards, market_collateral);
            let holder = state
                .vault_positions
                .entry(VaultPositionKey::new(vault_id, user))
                .or_insert_with(|| VaultPosition::settled_against(&vault, user));
            holder.supply_shards += &share.shards;
            holder.supply_points += &share.points;
            paid += &share;
            credited += 1;
        }
    }

    let reserved = state
        .positions
        .get_mut(&reserved_key)
        .ok_or(RedistributionError::MarketNotFound(stake_market))?;
    debit(
        EntityRef::Position(reserved_key),
        &mut reserved.supply_shards,
        &mut reserved.supply_points,
        &paid,
    )?;

    let market = state
        .markets
        .get_mut(&stake_market)
        .ok_or(RedistributionError::MarketNotFound(stake_market))?;
    market.total_supply_shards -= &paid.shards;
    market.total_supply_points -= &paid.points;

    let vault = state
        .vaults
        .get_mut(&vault_id)
        .ok_or(RedistributionError::VaultNotFound(vault_id))?;
    vault.total_shards += &paid.shards;
    vault.total_points += &paid.points;

    tracing::debug!(
        vault = %vault_id,
        stake_market = %stake_market,
        markets = markets.len(),
        credited,
        shards = %paid.shards,
        points = %paid.points,
        "collateral donation redistributed"
    );

    Ok(())
}
