//! Settling a whole snapshot to one timestamp.

use tally_types::{RewardsState, State, Timestamp};

use crate::engine::AccrualEngine;
use crate::{AccrualError, Result};

impl AccrualEngine {
    /// Settle every market, position, vault and vault position to `timestamp`.
    ///
    /// Aggregates are settled first and holders are settled against the
    /// settled aggregates, so all rows of the result share one timestamp.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::FutureLastUpdate`] if any entity is ahead of `timestamp`
    /// - [`AccrualError::MarketNotFound`] / [`AccrualError::VaultNotFound`] for
    ///   rows whose parent is missing from the snapshot
    pub fn accrue_state(&self, state: &State, timestamp: Timestamp) -> Result<State> {
        let mut next = State::new();

        for market in state.markets.values() {
            next.insert_market(self.accrue_market(market, timestamp)?);
        }
        for position in state.positions.values() {
            let market = next
                .markets
                .get(&position.market)
                .ok_or(AccrualError::MarketNotFound(position.market))?;
            let settled = self.settle_position(market, position, timestamp)?;
            next.insert_position(settled);
        }

        for vault in state.vaults.values() {
            next.insert_vault(self.accrue_vault(vault, timestamp)?);
        }
        for position in state.vault_positions.values() {
            let vault = next
                .vaults
                .get(&position.vault)
                .ok_or(AccrualError::VaultNotFound(position.vault))?;
            let settled = self.settle_vault_position(vault, position, timestamp)?;
            next.insert_vault_position(settled);
        }

        tracing::debug!(
            timestamp,
            markets = next.markets.len(),
            positions = next.positions.len(),
            vaults = next.vaults.len(),
            vault_positions = next.vault_positions.len(),
            "accrued snapshot"
        );

        Ok(next)
    }

    /// Settle to `timestamp` and strip principal balances and indexes.
    pub fn distribute_up_to(&self, state: &State, timestamp: Timestamp) -> Result<RewardsState> {
        Ok(self.accrue_state(state, timestamp)?.rewards())
    }
}
