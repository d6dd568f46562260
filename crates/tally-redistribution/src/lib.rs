//! # tally-redistribution
//!
//! Pushes the rewards a vault earns down to real end users, then purges the
//! reserved bookkeeping rows.
//!
//! The waterfall runs in a fixed order because the supply pass reads the
//! balances the collateral pass leaves behind:
//!
//! 1. [`collateral`]: a vault's donated stake is shared among the users
//!    whose collateral in the vault's token backs it
//! 2. [`supply`]: a vault's own market positions are shared among the
//!    vault's depositors
//! 3. [`purge`]: reserved addresses are removed along with their share of
//!    every aggregate
//!
//! Every phase takes a snapshot by reference and returns a new one. A phase
//! that fails leaves nothing behind.
//!
//! ## Modules
//!
//! - [`collateral`] — collateral-donation pass
//! - [`supply`] — supply pass
//! - [`purge`] — blacklist removal
//! - [`pipeline`] — the composed waterfall and pluggable modules
//! - [`diff`] — reward deltas between two snapshots

pub mod collateral;
pub mod diff;
pub mod pipeline;
pub mod purge;
pub mod supply;

mod units;

pub use collateral::collateral_pass;
pub use diff::diff;
pub use pipeline::{redistribute_all, run_modules, Blacklist, Module, RedistributionConfig, Redistributor};
pub use purge::purge;
pub use supply::supply_pass;

use num_bigint::BigInt;
use tally_types::{Address, EntityRef, MarketId};

/// Error types for redistribution.
#[derive(Debug, thiserror::Error)]
pub enum RedistributionError {
    /// A row references a market missing from the snapshot.
    #[error("market {0} not found")]
    MarketNotFound(MarketId),

    /// A row references a vault missing from the snapshot.
    #[error("vault {0} not found")]
    VaultNotFound(Address),

    /// More was paid out than the paying row held.
    ///
    /// Never clamped. It points at a case the waterfall does not model, such
    /// as a vault that is both a loan asset and a collateral asset.
    #[error("{payer} would keep a negative {lane} remainder of {remainder}")]
    NegativeRemainder {
        /// The row that paid.
        payer: EntityRef,
        /// `"shards"` or `"points"`.
        lane: &'static str,
        /// Its balance after the payout.
        remainder: BigInt,
    },
}

/// Convenience result type for redistribution.
pub type Result<T> = std::result::Result<T, RedistributionError>;
