//! # tally-types
//!
//! Shared domain types used across the tally workspace.
//!
//! A snapshot comes in two shapes:
//!
//! - [`State`]: principal balances, reward counters and indexes for every
//!   market, position, vault and vault position. This is what loaders produce
//!   and what accrual and redistribution transform.
//! - [`RewardsState`]: the principal- and index-stripped projection carrying
//!   only shards and points. This is what consumers diff, check and allocate.
//!
//! Every integer that can grow past 64 bits is a [`num_bigint::BigInt`] and
//! travels as a decimal string.

pub mod entities;
pub mod ids;
pub mod rewards;
pub mod state;

mod keyed;

pub use entities::{Market, Position, PositionKind, Vault, VaultPosition};
pub use ids::{Address, EntityRef, MarketId, PositionKey, VaultPositionKey};
pub use rewards::{MarketRewards, PositionRewards, RewardsState, VaultPositionRewards, VaultRewards};
pub use state::State;

use num_bigint::BigInt;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Fixed-point scale of every points index (10^36).
pub fn precision() -> BigInt {
    BigInt::from(10u8).pow(36)
}

/// Default points emitted per second and per lane (10^18).
pub fn default_points_rate_per_second() -> BigInt {
    BigInt::from(10u8).pow(18)
}

/// Error types for identifier parsing.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// The identifier is not valid hex.
    #[error("invalid hex identifier: {0}")]
    InvalidHex(String),

    /// The identifier has the wrong number of bytes.
    #[error("invalid identifier length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },
}

/// Convenience result type for type-level operations.
pub type Result<T> = std::result::Result<T, TypesError>;
