//! # tally-accrual
//!
//! Time-weighted accrual of shards and points.
//!
//! Two accounting modes run side by side on every lane:
//!
//! - **Shards** grow linearly with the entity's own principal and elapsed
//!   time. Settling an aggregate never needs to look at its holders.
//! - **Points** are emitted at a fixed rate into a pool and split pro rata
//!   through a cumulative index. Holders settle lazily against the index the
//!   next time they are touched.
//!
//! ## Modules
//!
//! - [`engine`] — per-entity accrual
//! - [`snapshot`] — settling a whole [`tally_types::State`] to one timestamp
//! - [`handlers`] — principal changes from market and vault transactions

pub mod engine;
pub mod handlers;
pub mod snapshot;

pub use engine::AccrualEngine;
pub use handlers::{MarketTx, VaultTx};

use num_bigint::BigInt;
use tally_types::{Address, EntityRef, MarketId, Timestamp};

/// Error types for accrual operations.
#[derive(Debug, thiserror::Error)]
pub enum AccrualError {
    /// The target timestamp precedes the entity's last accrual.
    #[error("{entity} has a future lastUpdate: {last_update} > {timestamp}")]
    FutureLastUpdate {
        /// The entity that would move backwards in time.
        entity: EntityRef,
        /// Its last accrual timestamp.
        last_update: Timestamp,
        /// The requested target timestamp.
        timestamp: Timestamp,
    },

    /// A market referenced by a position or transaction is not in the snapshot.
    #[error("market {0} not found")]
    MarketNotFound(MarketId),

    /// A vault referenced by a vault position is not in the snapshot.
    #[error("vault {0} not found")]
    VaultNotFound(Address),

    /// A transaction would drive a principal balance below zero.
    #[error("{entity} would hold a negative {lane} principal of {balance}")]
    NegativePrincipal {
        /// The entity whose balance would go negative.
        entity: EntityRef,
        /// The lane name.
        lane: &'static str,
        /// The resulting balance.
        balance: BigInt,
    },
}

/// Convenience result type for accrual operations.
pub type Result<T> = std::result::Result<T, AccrualError>;
