//! Full protocol snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::{Market, Position, Vault, VaultPosition};
use crate::ids::{Address, MarketId, PositionKey, VaultPositionKey};
use crate::rewards::RewardsState;

/// Principal balances, reward counters and indexes at one point in time.
///
/// Maps are ordered so every pass over a snapshot is deterministic.
/// Transformations take `&State` and return a fresh `State`; nothing in the
/// workspace mutates a caller's snapshot in place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    #[serde(with = "crate::keyed", default)]
    pub markets: BTreeMap<MarketId, Market>,
    #[serde(with = "crate::keyed", default)]
    pub positions: BTreeMap<PositionKey, Position>,
    #[serde(with = "crate::keyed", default)]
    pub vaults: BTreeMap<Address, Vault>,
    #[serde(with = "crate::keyed", default)]
    pub vault_positions: BTreeMap<VaultPositionKey, VaultPosition>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_market(&mut self, market: Market) {
        self.markets.insert(market.id, market);
    }

    pub fn insert_position(&mut self, position: Position) {
        self.positions.insert(position.key(), position);
    }

    pub fn insert_vault(&mut self, vault: Vault) {
        self.vaults.insert(vault.id, vault);
    }

    pub fn insert_vault_position(&mut self, position: VaultPosition) {
        self.vault_positions.insert(position.key(), position);
    }

    /// All positions open in `market`.
    pub fn positions_in<'a>(&'a self, market: &'a MarketId) -> impl Iterator<Item = &'a Position> + 'a {
        self.positions
            .values()
            .filter(move |position| &position.market == market)
    }

    /// All positions held by `user`, across markets.
    pub fn positions_of<'a>(&'a self, user: &'a Address) -> impl Iterator<Item = &'a Position> + 'a {
        self.positions
            .values()
            .filter(move |position| &position.user == user)
    }

    /// All depositors of `vault`.
    pub fn holders_of<'a>(
        &'a self,
        vault: &'a Address,
    ) -> impl Iterator<Item = &'a VaultPosition> + 'a {
        self.vault_positions
            .values()
            .filter(move |position| &position.vault == vault)
    }

    /// Strip principal balances and indexes.
    pub fn rewards(&self) -> RewardsState {
        RewardsState::from(self)
    }
}
