//! Principal-stripped reward snapshot.
//!
//! Only shards, points and identifying fields survive. This is the shape
//! consumers diff over a time window, check for consistency and hand to the
//! reward allocator.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::entities::{Market, Position, Vault, VaultPosition};
use crate::ids::{Address, MarketId, PositionKey, VaultPositionKey};
use crate::state::State;

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRewards {
    pub id: MarketId,
    pub loan_token: Address,
    pub collateral_token: Address,

    #[serde_as(as = "DisplayFromStr")]
    pub total_supply_shards: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub total_borrow_shards: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub total_collateral_shards: BigInt,

    #[serde_as(as = "DisplayFromStr")]
    pub total_supply_points: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub total_borrow_points: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub total_collateral_points: BigInt,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRewards {
    pub market: MarketId,
    pub user: Address,

    #[serde_as(as = "DisplayFromStr")]
    pub supply_shards: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub borrow_shards: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub collateral_shards: BigInt,

    #[serde_as(as = "DisplayFromStr")]
    pub supply_points: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub borrow_points: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub collateral_points: BigInt,
}

impl PositionRewards {
    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.market, self.user)
    }
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRewards {
    pub id: Address,

    #[serde_as(as = "DisplayFromStr")]
    pub total_shards: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub total_points: BigInt,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultPositionRewards {
    pub vault: Address,
    pub user: Address,

    #[serde_as(as = "DisplayFromStr")]
    pub supply_shards: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub supply_points: BigInt,
}

impl VaultPositionRewards {
    pub fn key(&self) -> VaultPositionKey {
        VaultPositionKey::new(self.vault, self.user)
    }
}

/// Shards and points of every entity, without principal or indexes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsState {
    #[serde(with = "crate::keyed", default)]
    pub markets: BTreeMap<MarketId, MarketRewards>,
    #[serde(with = "crate::keyed", default)]
    pub positions: BTreeMap<PositionKey, PositionRewards>,
    #[serde(with = "crate::keyed", default)]
    pub vaults: BTreeMap<Address, VaultRewards>,
    #[serde(with = "crate::keyed", default)]
    pub vault_positions: BTreeMap<VaultPositionKey, VaultPositionRewards>,
}

impl From<&Market> for MarketRewards {
    fn from(market: &Market) -> Self {
        Self {
            id: market.id,
            loan_token: market.loan_token,
            collateral_token: market.collateral_token,
            total_supply_shards: market.total_supply_shards.clone(),
            total_borrow_shards: market.total_borrow_shards.clone(),
            total_collateral_shards: market.total_collateral_shards.clone(),
            total_supply_points: market.total_supply_points.clone(),
            total_borrow_points: market.total_borrow_points.clone(),
            total_collateral_points: market.total_collateral_points.clone(),
        }
    }
}

impl From<&Position> for PositionRewards {
    fn from(position: &Position) -> Self {
        Self {
            market: position.market,
            user: position.user,
            supply_shards: position.supply_shards.clone(),
            borrow_shards: position.borrow_shards.clone(),
            collateral_shards: position.collateral_shards.clone(),
            supply_points: position.supply_points.clone(),
            borrow_points: position.borrow_points.clone(),
            collateral_points: position.collateral_points.clone(),
        }
    }
}

impl From<&Vault> for VaultRewards {
    fn from(vault: &Vault) -> Self {
        Self {
            id: vault.id,
            total_shards: vault.total_shards.clone(),
            total_points: vault.total_points.clone(),
        }
    }
}

impl From<&VaultPosition> for VaultPositionRewards {
    fn from(position: &VaultPosition) -> Self {
        Self {
            vault: position.vault,
            user: position.user,
            supply_shards: position.supply_shards.clone(),
            supply_points: position.supply_points.clone(),
        }
    }
}

impl From<&State> for RewardsState {
    fn from(state: &State) -> Self {
        Self {
            markets: state
                .markets
                .iter()
                .map(|(id, market)| (*id, MarketRewards::from(market)))
                .collect(),
            positions: state
                .positions
                .iter()
                .map(|(key, position)| (*key, PositionRewards::from(position)))
                .collect(),
            vaults: state
                .vaults
                .iter()
                .map(|(id, vault)| (*id, VaultRewards::from(vault)))
                .collect(),
            vault_positions: state
                .vault_positions
                .iter()
                .map(|(key, position)| (*key, VaultPositionRewards::from(position)))
                .collect(),
        }
    }
}
