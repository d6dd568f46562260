//! Market, position, vault and vault-position records.
//!
//! Field names on the wire are the camelCase names used by the indexer
//! (`totalSupplyShares`, `lastSupplyPointsIndex`, ...). All integers are
//! decimal strings.

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::ids::{Address, MarketId, PositionKey, VaultPositionKey};
use crate::Timestamp;

/// The three accounting lanes of a market.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    Supply,
    Borrow,
    Collateral,
}

impl PositionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionKind::Supply => "supply",
            PositionKind::Borrow => "borrow",
            PositionKind::Collateral => "collateral",
        }
    }
}

/// A lending market. Created on first observation, never deleted.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: MarketId,
    pub loan_token: Address,
    /// A vault address here means the market accepts that vault's shares as collateral.
    pub collateral_token: Address,

    #[serde_as(as = "DisplayFromStr")]
    pub total_supply_shares: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub total_borrow_shares: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub total_collateral: BigInt,

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

    /// Cumulative supply points per share, scaled by [`crate::precision`].
    #[serde_as(as = "DisplayFromStr")]
    pub supply_points_index: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub borrow_points_index: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub collateral_points_index: BigInt,

    #[serde_as(as = "DisplayFromStr")]
    pub last_update: Timestamp,
}

impl Market {
    /// A zero-valued market last touched at `last_update`.
    pub fn new(
        id: MarketId,
        loan_token: Address,
        collateral_token: Address,
        last_update: Timestamp,
    ) -> Self {
        Self {
            id,
            loan_token,
            collateral_token,
            total_supply_shares: BigInt::default(),
            total_borrow_shares: BigInt::default(),
            total_collateral: BigInt::default(),
            total_supply_shards: BigInt::default(),
            total_borrow_shards: BigInt::default(),
            total_collateral_shards: BigInt::default(),
            total_supply_points: BigInt::default(),
            total_borrow_points: BigInt::default(),
            total_collateral_points: BigInt::default(),
            supply_points_index: BigInt::default(),
            borrow_points_index: BigInt::default(),
            collateral_points_index: BigInt::default(),
            last_update,
        }
    }
}

/// A user's stake in one market.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub market: MarketId,
    pub user: Address,

    #[serde_as(as = "DisplayFromStr")]
    pub supply_shares: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub borrow_shares: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub collateral: BigInt,

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

    /// Market supply index at this position's last settlement.
    #[serde_as(as = "DisplayFromStr")]
    pub last_supply_points_index: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub last_borrow_points_index: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub last_collateral_points_index: BigInt,

    #[serde_as(as = "DisplayFromStr")]
    pub last_update: Timestamp,
}

impl Position {
    /// A zero-valued position.
    pub fn new(market: MarketId, user: Address) -> Self {
        Self {
            market,
            user,
            supply_shares: BigInt::default(),
            borrow_shares: BigInt::default(),
            collateral: BigInt::default(),
            supply_shards: BigInt::default(),
            borrow_shards: BigInt::default(),
            collateral_shards: BigInt::default(),
            supply_points: BigInt::default(),
            borrow_points: BigInt::default(),
            collateral_points: BigInt::default(),
            last_supply_points_index: BigInt::default(),
            last_borrow_points_index: BigInt::default(),
            last_collateral_points_index: BigInt::default(),
            last_update: 0,
        }
    }

    /// A zero-valued position already settled against `market`.
    ///
    /// Snapshot indexes and `last_update` are copied from the market so the
    /// new row accrues nothing for time that passed before it existed.
    pub fn settled_against(market: &Market, user: Address) -> Self {
        Self {
            last_supply_points_index: market.supply_points_index.clone(),
            last_borrow_points_index: market.borrow_points_index.clone(),
            last_collateral_points_index: market.collateral_points_index.clone(),
            last_update: market.last_update,
            ..Self::new(market.id, user)
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.market, self.user)
    }
}

/// An aggregator vault. It only supplies, so it has a single lane.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: Address,

    #[serde_as(as = "DisplayFromStr")]
    pub total_shares: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub total_shards: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub total_points: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub points_index: BigInt,

    #[serde_as(as = "DisplayFromStr")]
    pub last_update: Timestamp,
}

impl Vault {
    /// A zero-valued vault last touched at `last_update`.
    pub fn new(id: Address, last_update: Timestamp) -> Self {
        Self {
            id,
            total_shares: BigInt::default(),
            total_shards: BigInt::default(),
            total_points: BigInt::default(),
            points_index: BigInt::default(),
            last_update,
        }
    }
}

/// A depositor's stake in a vault.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultPosition {
    pub vault: Address,
    pub user: Address,

    #[serde_as(as = "DisplayFromStr")]
    pub shares: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub supply_shards: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub supply_points: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub last_supply_points_index: BigInt,

    #[serde_as(as = "DisplayFromStr")]
    pub last_update: Timestamp,
}

impl VaultPosition {
    /// A zero-valued vault position.
    pub fn new(vault: Address, user: Address) -> Self {
        Self {
            vault,
            user,
            shares: BigInt::default(),
            supply_shards: BigInt::default(),
            supply_points: BigInt::default(),
            last_supply_points_index: BigInt::default(),
            last_update: 0,
        }
    }

    /// A zero-valued vault position already settled against `vault`.
    pub fn settled_against(vault: &Vault, user: Address) -> Self {
        Self {
            last_supply_points_index: vault.points_index.clone(),
            last_update: vault.last_update,
            ..Self::new(vault.id, user)
        }
    }

    pub fn key(&self) -> VaultPositionKey {
        VaultPositionKey::new(self.vault, self.user)
    }
}
