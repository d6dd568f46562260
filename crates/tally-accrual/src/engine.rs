//! Per-entity accrual.
//!
//! ## Formulas
//!
//! For an aggregate lane (market lane or vault) with principal `P` and
//! `dt = t - last_update`:
//!
//! ```text
//! shards += dt * P
//! emitted = dt * rate                       (only when P != 0)
//! points += emitted
//! index  += emitted * PRECISION / P
//! ```
//!
//! For a holder with principal `p` settling against the pool index `I`:
//!
//! ```text
//! shards += dt * p
//! points += (I - last_index) * p / PRECISION
//! last_index = I
//! ```
//!
//! Every function here takes its input by reference and returns an updated
//! copy. Calling twice with the same timestamp is a no-op the second time.

use num_bigint::BigInt;
use num_traits::Zero;
use tally_types::{
    default_points_rate_per_second, precision, EntityRef, Market, Position, Timestamp, Vault,
    VaultPosition,
};

use crate::{AccrualError, Result};

/// Settles shards and points for single entities.
#[derive(Clone, Debug)]
pub struct AccrualEngine {
    /// Points emitted per second into each pool lane.
    points_rate_per_second: BigInt,
    precision: BigInt,
}

impl Default for AccrualEngine {
    fn default() -> Self {
        Self::new(default_points_rate_per_second())
    }
}

impl AccrualEngine {
    /// Create an engine emitting `points_rate_per_second` into every lane.
    pub fn new(points_rate_per_second: BigInt) -> Self {
        Self {
            points_rate_per_second,
            precision: precision(),
        }
    }

    /// Advance a market's three lanes to `timestamp`.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::FutureLastUpdate`] if `timestamp < market.last_update`
    pub fn accrue_market(&self, market: &Market, timestamp: Timestamp) -> Result<Market> {
        let dt = elapsed(EntityRef::Market(market.id), market.last_update, timestamp)?;
        let mut next = market.clone();

        self.accrue_pool(
            &dt,
            &next.total_supply_shares,
            &mut next.total_supply_shards,
            &mut next.total_supply_points,
            &mut next.supply_points_index,
        );
        self.accrue_pool(
            &dt,
            &next.total_borrow_shares,
            &mut next.total_borrow_shards,
            &mut next.total_borrow_points,
            &mut next.borrow_points_index,
        );
        self.accrue_pool(
            &dt,
            &next.total_collateral,
            &mut next.total_collateral_shards,
            &mut next.total_collateral_points,
            &mut next.collateral_points_index,
        );
        next.last_update = timestamp;

        tracing::trace!(
            market = %market.id,
            from = market.last_update,
            to = timestamp,
            "accrued market"
        );

        Ok(next)
    }

    /// Advance a vault to `timestamp`.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::FutureLastUpdate`] if `timestamp < vault.last_update`
    pub fn accrue_vault(&self, vault: &Vault, timestamp: Timestamp) -> Result<Vault> {
        let dt = elapsed(EntityRef::Vault(vault.id), vault.last_update, timestamp)?;
        let mut next = vault.clone();

        self.accrue_pool(
            &dt,
            &next.total_shares,
            &mut next.total_shards,
            &mut next.total_points,
            &mut next.points_index,
        );
        next.last_update = timestamp;

        tracing::trace!(
            vault = %vault.id,
            from = vault.last_update,
            to = timestamp,
            "accrued vault"
        );

        Ok(next)
    }

    /// Advance a market position to `timestamp`.
    ///
    /// The market is settled to `timestamp` internally so the position reads
    /// the index in effect at that time. The caller's market is not touched.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::MarketNotFound`] if `position` belongs to another market
    /// - [`AccrualError::FutureLastUpdate`] if either the market or the position
    ///   was last updated after `timestamp`
    pub fn accrue_position(
        &self,
        market: &Market,
        position: &Position,
        timestamp: Timestamp,
    ) -> Result<Position> {
        if position.market != market.id {
            return Err(AccrualError::MarketNotFound(position.market));
        }
        let market = self.accrue_market(market, timestamp)?;
        self.settle_position(&market, position, timestamp)
    }

    /// Advance a vault position to `timestamp`.
    ///
    /// # Errors
    ///
    /// - [`AccrualError::VaultNotFound`] if `position` belongs to another vault
    /// - [`AccrualError::FutureLastUpdate`] if either the vault or the position
    ///   was last updated after `timestamp`
    pub fn accrue_vault_position(
        &self,
        vault: &Vault,
        position: &VaultPosition,
        timestamp: Timestamp,
    ) -> Result<VaultPosition> {
        if position.vault != vault.id {
            return Err(AccrualError::VaultNotFound(position.vault));
        }
        let vault = self.accrue_vault(vault, timestamp)?;
        self.settle_vault_position(&vault, position, timestamp)
    }

    /// Settle a position against a market already accrued to `timestamp`.
    pub(crate) fn settle_position(
        &self,
        market: &Market,
        position: &Position,
        timestamp: Timestamp,
    ) -> Result<Position> {
        let dt = elapsed(
            EntityRef::Position(position.key()),
            position.last_update,
            timestamp,
        )?;
        let mut next = position.clone();

        self.settle_holder(
            &dt,
            &next.supply_shares,
            &market.supply_points_index,
            &mut next.supply_shards,
            &mut next.supply_points,
            &mut next.last_supply_points_index,
        );
        self.settle_holder(
            &dt,
            &next.borrow_shares,
            &market.borrow_points_index,
            &mut next.borrow_shards,
            &mut next.borrow_points,
            &mut next.last_borrow_points_index,
        );
        self.settle_holder(
            &dt,
            &next.collateral,
            &market.collateral_points_index,
            &mut next.collateral_shards,
            &mut next.collateral_points,
            &mut next.last_collateral_points_index,
        );
        next.last_update = timestamp;

        Ok(next)
    }

    /// Settle a vault position against a vault already accrued to `timestamp`.
    pub(crate) fn settle_vault_position(
        &self,
        vault: &Vault,
        position: &VaultPosition,
        timestamp: Timestamp,
    ) -> Result<VaultPosition> {
        let dt = elapsed(
            EntityRef::VaultPosition(position.key()),
            position.last_update,
            timestamp,
        )?;
        let mut next = position.clone();

        self.settle_holder(
            &dt,
            &next.shares,
            &vault.points_index,
            &mut next.supply_shards,
            &mut next.supply_points,
            &mut next.last_supply_points_index,
        );
        next.last_update = timestamp;

        Ok(next)
    }

    fn accrue_pool(
        &self,
        dt: &BigInt,
        principal: &BigInt,
        shards: &mut BigInt,
        points: &mut BigInt,
        index: &mut BigInt,
    ) {
        if dt.is_zero() || principal.is_zero() {
            return;
        }
        *shards += dt * principal;

        let emitted = dt * &self.points_rate_per_second;
        *index += &emitted * &self.precision / principal;
        *points += emitted;
    }

    fn settle_holder(
        &self,
        dt: &BigInt,
        principal: &BigInt,
        pool_index: &BigInt,
        shards: &mut BigInt,
        points: &mut BigInt,
        last_index: &mut BigInt,
    ) {
        *shards += dt * principal;
        *points += (pool_index - &*last_index) * principal / &self.precision;
        *last_index = pool_index.clone();
    }
}

/// Seconds between `last_update` and `timestamp`, refusing to go backwards.
fn elapsed(entity: EntityRef, last_update: Timestamp, timestamp: Timestamp) -> Result<BigInt> {
    timestamp
        .checked_sub(last_update)
        .map(BigInt::from)
        .ok_or(AccrualError::FutureLastUpdate {
            entity,
            last_update,
            timestamp,
        })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use tally_types::{Address, MarketId};

    use super::*;

    fn market(last_update: Timestamp) -> Market {
        Market::new(
            MarketId::new([1; 32]),
            Address::new([2; 20]),
            Address::new([3; 20]),
            last_update,
        )
    }

    fn vault(total_shares: i64, last_update: Timestamp) -> Vault {
        let mut vault = Vault::new(Address::new([7; 20]), last_update);
        vault.total_shares = BigInt::from(total_shares);
        vault
    }

    #[test]
    fn test_market_shards_accrue_linearly() {
        let mut m = market(100);
        m.total_supply_shares = BigInt::from(1_000);
        let engine = AccrualEngine::default();

        let accrued = engine.accrue_market(&m, 110).expect("accrue");
        assert_eq!(accrued.total_supply_shards, BigInt::from(10_000));
        assert_eq!(accrued.last_update, 110);
        assert_eq!(accrued.total_borrow_shards, BigInt::zero());
    }

    #[test]
    fn test_input_is_not_mutated() {
        let mut m = market(100);
        m.total_supply_shares = BigInt::from(1_000);
        let before = m.clone();
        let _ = AccrualEngine::default()
            .accrue_market(&m, 500)
            .expect("accrue");
        assert_eq!(m, before);
    }

    #[test]
    fn test_vault_index_scenario() {
        let engine = AccrualEngine::new(BigInt::from(5));
        let v = vault(100, 0);

        let accrued = engine.accrue_vault(&v, 10).expect("accrue vault");
        assert_eq!(accrued.total_points, BigInt::from(50));
        assert_eq!(accrued.points_index, BigInt::from(50) * precision() / 100);

        let mut holder = VaultPosition::new(v.id, Address::new([9; 20]));
        holder.shares = BigInt::from(20);
        let settled = engine
            .accrue_vault_position(&v, &holder, 10)
            .expect("accrue holder");
        assert_eq!(settled.supply_points, BigInt::from(10));
        assert_eq!(settled.supply_shards, BigInt::from(200));
        assert_eq!(settled.last_supply_points_index, accrued.points_index);
    }

    #[test]
    fn test_zero_principal_emits_nothing_but_advances() {
        let engine = AccrualEngine::new(BigInt::from(5));
        let v = vault(0, 3);
        let accrued = engine.accrue_vault(&v, 30).expect("accrue");
        assert_eq!(accrued.total_points, BigInt::zero());
        assert_eq!(accrued.points_index, BigInt::zero());
        assert_eq!(accrued.last_update, 30);
    }

    #[test]
    fn test_same_timestamp_is_noop() {
        let engine = AccrualEngine::new(BigInt::from(7));
        let mut m = market(0);
        m.total_borrow_shares = BigInt::from(33);
        let once = engine.accrue_market(&m, 40).expect("first");
        let twice = engine.accrue_market(&once, 40).expect("second");
        assert_eq!(once, twice);

        let mut p = Position::new(m.id, Address::new([9; 20]));
        p.borrow_shares = BigInt::from(33);
        let p_once = engine.accrue_position(&m, &p, 40).expect("first");
        let p_twice = engine.accrue_position(&once, &p_once, 40).expect("second");
        assert_eq!(p_once, p_twice);
    }

    #[test]
    fn test_backward_time_rejected() {
        let engine = AccrualEngine::default();
        let m = market(100);
        let err = engine.accrue_market(&m, 99).expect_err("must reject");
        assert!(matches!(
            err,
            AccrualError::FutureLastUpdate {
                entity: EntityRef::Market(_),
                last_update: 100,
                timestamp: 99,
            }
        ));
    }

    #[test]
    fn test_position_behind_market_rejected_for_market() {
        let engine = AccrualEngine::default();
        let m = market(200);
        let p = Position::new(m.id, Address::new([9; 20]));
        let err = engine.accrue_position(&m, &p, 150).expect_err("must reject");
        assert!(matches!(
            err,
            AccrualError::FutureLastUpdate {
                entity: EntityRef::Market(_),
                ..
            }
        ));
    }

    #[test]
    fn test_position_of_other_market_rejected() {
        let engine = AccrualEngine::default();
        let m = market(0);
        let p = Position::new(MarketId::new([5; 32]), Address::new([9; 20]));
        assert!(matches!(
            engine.accrue_position(&m, &p, 10),
            Err(AccrualError::MarketNotFound(_))
        ));
    }

    #[test]
    fn test_two_holders_split_emission() {
        let engine = AccrualEngine::new(BigInt::from(1_000));
        let mut m = market(0);
        m.total_collateral = BigInt::from(4);

        let mut a = Position::new(m.id, Address::new([0xA; 20]));
        a.collateral = BigInt::from(1);
        let mut b = Position::new(m.id, Address::new([0xB; 20]));
        b.collateral = BigInt::from(3);

        let accrued = engine.accrue_market(&m, 10).expect("market");
        let a = engine.accrue_position(&m, &a, 10).expect("a");
        let b = engine.accrue_position(&m, &b, 10).expect("b");

        assert_eq!(accrued.total_collateral_points, BigInt::from(10_000));
        assert_eq!(a.collateral_points, BigInt::from(2_500));
        assert_eq!(b.collateral_points, BigInt::from(7_500));
        assert_eq!(
            &a.collateral_shards + &b.collateral_shards,
            accrued.total_collateral_shards
        );
    }

    proptest! {
        #[test]
        fn prop_shards_and_totals_are_time_invariant(
            shares in 0u64..1_000_000_000_000,
            start in 0u64..1_000_000,
            d1 in 0u64..1_000_000,
            d2 in 0u64..1_000_000,
        ) {
            let engine = AccrualEngine::default();
            let mut m = market(start);
            m.total_supply_shares = BigInt::from(shares);
            let t1 = start + d1;
            let t2 = t1 + d2;

            let stepped = engine
                .accrue_market(&engine.accrue_market(&m, t1).expect("t1"), t2)
                .expect("t2");
            let direct = engine.accrue_market(&m, t2).expect("direct");

            prop_assert_eq!(&stepped.total_supply_shards, &direct.total_supply_shards);
            prop_assert_eq!(&stepped.total_supply_points, &direct.total_supply_points);
            prop_assert_eq!(stepped.last_update, direct.last_update);
            // Index rounding may differ by at most one unit per extra step.
            let drift = &direct.supply_points_index - &stepped.supply_points_index;
            prop_assert!(drift >= BigInt::zero() && drift <= BigInt::from(1));
        }

        #[test]
        fn prop_holder_shards_are_time_invariant(
            shares in 0u64..1_000_000_000,
            d1 in 0u64..100_000,
            d2 in 0u64..100_000,
        ) {
            let engine = AccrualEngine::default();
            let v = vault(shares as i64, 0);
            let mut holder = VaultPosition::new(v.id, Address::new([9; 20]));
            holder.shares = BigInt::from(shares);

            let v1 = engine.accrue_vault(&v, d1).expect("v1");
            let h1 = engine.accrue_vault_position(&v, &holder, d1).expect("h1");
            let h2 = engine.accrue_vault_position(&v1, &h1, d1 + d2).expect("h2");
            let direct = engine.accrue_vault_position(&v, &holder, d1 + d2).expect("direct");

            prop_assert_eq!(&h2.supply_shards, &direct.supply_shards);
            let drift = (&h2.supply_points - &direct.supply_points).magnitude().clone();
            prop_assert!(drift <= num_bigint::BigUint::from(2u8));
        }

        #[test]
        fn prop_monotonic_in_timestamp(
            shares in 0u64..1_000_000_000_000,
            holder_shares in 0u64..1_000_000,
            t1 in 0u64..1_000_000,
            extra in 0u64..1_000_000,
        ) {
            let engine = AccrualEngine::default();
            let mut m = market(0);
            m.total_borrow_shares = BigInt::from(shares) + BigInt::from(holder_shares);
            let mut p = Position::new(m.id, Address::new([9; 20]));
            p.borrow_shares = BigInt::from(holder_shares);

            let early = engine.accrue_market(&m, t1).expect("early");
            let late = engine.accrue_market(&m, t1 + extra).expect("late");
            prop_assert!(late.total_borrow_shards >= early.total_borrow_shards);
            prop_assert!(late.total_borrow_points >= early.total_borrow_points);

            let p_early = engine.accrue_position(&m, &p, t1).expect("p early");
            let p_late = engine.accrue_position(&m, &p, t1 + extra).expect("p late");
            prop_assert!(p_late.borrow_shards >= p_early.borrow_shards);
            prop_assert!(p_late.borrow_points >= p_early.borrow_points);
        }

        #[test]
        fn prop_backward_time_always_rejected(
            shares in 0u64..u64::MAX,
            last_update in 1u64..u64::MAX,
            back in 1u64..1_000_000,
        ) {
            let engine = AccrualEngine::default();
            let target = last_update.saturating_sub(back);
            prop_assume!(target < last_update);

            let mut v = vault(0, last_update);
            v.total_shares = BigInt::from(shares);
            let is_temporal = matches!(
                engine.accrue_vault(&v, target),
                Err(AccrualError::FutureLastUpdate { .. })
            );
            prop_assert!(is_temporal);
        }
    }
}
