//! Principal changes from market and vault transactions.
//!
//! A handler settles the aggregate and the affected holder to the
//! transaction timestamp before touching principal, so the elapsed interval
//! is credited to the balance that was actually in effect during it.

use num_bigint::BigInt;
use num_traits::Signed;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use tally_types::{
    Address, EntityRef, MarketId, Position, PositionKey, PositionKind, State, Timestamp, Vault,
    VaultPosition, VaultPositionKey,
};

use crate::engine::AccrualEngine;
use crate::{AccrualError, Result};

/// A signed share movement on one lane of a market position.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTx {
    pub market: MarketId,
    pub user: Address,
    #[serde(rename = "type")]
    pub kind: PositionKind,
    /// Positive on deposit, negative on withdrawal.
    #[serde_as(as = "DisplayFromStr")]
    pub shares: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub timestamp: Timestamp,
}

/// A signed share movement on a vault position.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultTx {
    pub vault: Address,
    pub user: Address,
    #[serde_as(as = "DisplayFromStr")]
    pub shares: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub timestamp: Timestamp,
}

impl AccrualEngine {
    /// Apply a market transaction to a snapshot.
    ///
    /// The position is created zero-valued if the user has none yet.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::MarketNotFound`] if the market is not in the snapshot
    /// - [`AccrualError::FutureLastUpdate`] if the transaction is older than
    ///   the market or position
    /// - [`AccrualError::NegativePrincipal`] if a withdrawal exceeds the balance
    pub fn apply_market_tx(&self, state: &State, tx: &MarketTx) -> Result<State> {
        let market = state
            .markets
            .get(&tx.market)
            .ok_or(AccrualError::MarketNotFound(tx.market))?;
        let key = PositionKey::new(tx.market, tx.user);
        let position = state
            .positions
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Position::new(tx.market, tx.user));

        let mut market = self.accrue_market(market, tx.timestamp)?;
        let mut position = self.settle_position(&market, &position, tx.timestamp)?;

        let (total, held) = match tx.kind {
            PositionKind::Supply => (
                &mut market.total_supply_shares,
                &mut position.supply_shares,
            ),
            PositionKind::Borrow => (
                &mut market.total_borrow_shares,
                &mut position.borrow_shares,
            ),
            PositionKind::Collateral => (&mut market.total_collateral, &mut position.collateral),
        };
        *total += &tx.shares;
        *held += &tx.shares;

        if held.is_negative() {
            return Err(AccrualError::NegativePrincipal {
                entity: EntityRef::Position(key),
                lane: tx.kind.as_str(),
                balance: held.clone(),
            });
        }

        tracing::trace!(
            market = %tx.market,
            user = %tx.user,
            lane = tx.kind.as_str(),
            shares = %tx.shares,
            timestamp = tx.timestamp,
            "applied market tx"
        );

        let mut next = state.clone();
        next.insert_market(market);
        next.insert_position(position);
        Ok(next)
    }

    /// Apply a vault transaction to a snapshot.
    ///
    /// The vault and the vault position are created zero-valued on first sight.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::FutureLastUpdate`] if the transaction is older than
    ///   the vault or vault position
    /// - [`AccrualError::NegativePrincipal`] if a withdrawal exceeds the balance
    pub fn apply_vault_tx(&self, state: &State, tx: &VaultTx) -> Result<State> {
        let vault = state
            .vaults
            .get(&tx.vault)
            .cloned()
            .unwrap_or_else(|| Vault::new(tx.vault, 0));
        let key = VaultPositionKey::new(tx.vault, tx.user);
        let position = state
            .vault_positions
            .get(&key)
            .cloned()
            .unwrap_or_else(|| VaultPosition::new(tx.vault, tx.user));

        let mut vault = self.accrue_vault(&vault, tx.timestamp)?;
        let mut position = self.settle_vault_position(&vault, &position, tx.timestamp)?;

        vault.total_shares += &tx.shares;
        position.shares += &tx.shares;

        if position.shares.is_negative() {
            return Err(AccrualError::NegativePrincipal {
                entity: EntityRef::VaultPosition(key),
                lane: PositionKind::Supply.as_str(),
                balance: position.shares,
            });
        }

        tracing::trace!(
            vault = %tx.vault,
            user = %tx.user,
            shares = %tx.shares,
            timestamp = tx.timestamp,
            "applied vault tx"
        );

        let mut next = state.clone();
        next.insert_vault(vault);
        next.insert_vault_position(position);
        Ok(next)
    }
}
