//! # tally-checker
//!
//! Conservation checks over reward snapshots.
//!
//! A snapshot is reduced by subtracting every position from its market and
//! every vault position from its vault. What is left on the aggregates is
//! the residual:
//!
//! - shards never pass through a division, so every shard residual must be
//!   exactly zero
//! - points are truncated once per settlement, so every point residual must
//!   lie in `[0, tolerance]`. A negative residual means more was paid out
//!   than was ever emitted.
//!
//! The checker is read-only and hands back the reduced snapshot for
//! diagnostics.
//!
//! ## Modules
//!
//! - [`reduce`] — aggregate minus holders
//! - [`report`] — the shard and point verdicts

pub mod reduce;
pub mod report;

pub use reduce::reduce;
pub use report::{check_points, check_shards, ConsistencyReport};

use tally_types::{Address, MarketId};

/// Error types for consistency checks.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// A position references a market missing from the snapshot.
    #[error("market {0} not found")]
    MarketNotFound(MarketId),

    /// A vault position references a vault missing from the snapshot.
    #[error("vault {0} not found")]
    VaultNotFound(Address),

    /// A points tolerance below zero.
    #[error("tolerance must not be negative, got {0}")]
    NegativeTolerance(num_bigint::BigInt),
}

/// Convenience result type for consistency checks.
pub type Result<T> = std::result::Result<T, CheckError>;
