//! Supply pass.
//!
//! A vault supplying into a market holds an ordinary position there under
//! its own address. This pass splits the supply shards and points of that
//! position among the vault's depositors by `shares / total_shares`, and
//! credits each depositor's own position in the same market. The vault's
//! position keeps the truncation dust.

use num_bigint::BigInt;
use num_traits::Zero;
use tally_types::{Address, EntityRef, MarketId, Position, PositionKey, State, Vault};

use crate::units::{debit, Units};
use crate::{RedistributionError, Result};

/// Run the supply pass for every vault with outstanding shares.
///
/// # Errors
///
/// - [`RedistributionError::MarketNotFound`] if a vault position references a
///   market missing from the snapshot
/// - [`RedistributionError::NegativeRemainder`] if a vault would pay out more
///   than its market position holds
pub fn supply_pass(state: &State) -> Result<State> {
    let mut next = state.clone();

    for vault in state.vaults.values() {
        if vault.total_shares.is_zero() {
            continue;
        }
        let holders: Vec<(Address, BigInt)> = state
            .holders_of(&vault.id)
            .filter(|holder| !holder.shares.is_zero())
            .map(|holder| (holder.user, holder.shares.clone()))
            .collect();
        let markets: Vec<MarketId> = state
            .positions_of(&vault.id)
            .map(|position| position.market)
            .collect();

        for market in markets {
            redistribute_market(&mut next, vault, market, &holders)?;
        }
    }

    Ok(next)
}

fn redistribute_market(
    state: &mut State,
    vault: &Vault,
    market_id: MarketId,
    holders: &[(Address, BigInt)],
) -> Result<()> {
    let payer_key = PositionKey::new(market_id, vault.id);
    let Some(payer) = state.positions.get(&payer_key) else {
        return Ok(());
    };
    let earned = Units::new(payer.supply_shards.clone(), payer.supply_points.clone());
    if earned.is_zero() {
        return Ok(());
    }
    let market = state
        .markets
        .get(&market_id)
        .cloned()
        .ok_or(RedistributionError::MarketNotFound(market_id))?;

    let mut paid = Units::default();
    for (user, shares) in holders {
        let share = earned.pro_rata(shares, &vault.total_shares);
        let position = state
            .positions
            .entry(PositionKey::new(market_id, *user))
            .or_insert_with(|| Position::settled_against(&market, *user));
        position.supply_shards += &share.shards;
        position.supply_points += &share.points;
        paid += &share;
    }

    let payer = state
        .positions
        .get_mut(&payer_key)
        .ok_or(RedistributionError::MarketNotFound(market_id))?;
    debit(
        EntityRef::Position(payer_key),
        &mut payer.supply_shards,
        &mut payer.supply_points,
        &paid,
    )?;

    tracing::debug!(
        vault = %vault.id,
        market = %market_id,
        holders = holders.len(),
        shards = %paid.shards,
        points = %paid.points,
        "vault supply redistributed"
    );

    Ok(())
}
