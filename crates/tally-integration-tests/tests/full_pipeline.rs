//! Integration test: transactions through accrual, redistribution and checks.
//!
//! Exercises the whole waterfall on a snapshot built from transactions:
//! 1. A vault with three depositors, one of them the protocol placeholder
//! 2. The vault supplying into a market next to a direct supplier and the
//!    placeholder's own stake
//! 3. Two users posting the vault token as collateral in a second market
//! 4. Accrual of every row to one timestamp
//! 5. Redistribution and purge
//! 6. Shard and point checks before and after
//!
//! Uses tally-accrual, tally-redistribution and tally-checker.

use num_bigint::BigInt;
use num_traits::Zero;
use proptest::prelude::*;
use tally_accrual::{AccrualEngine, MarketTx, VaultTx};
use tally_checker::{check_points, check_shards};
use tally_redistribution::{collateral_pass, redistribute_all, supply_pass, RedistributionConfig};
use tally_types::{
    Address, Market, MarketId, PositionKey, PositionKind, State, Timestamp, VaultPositionKey,
};

const PROTOCOL: Address = Address::new([0xEE; 20]);
const VAULT: Address = Address::new([0x77; 20]);
const LOAN_TOKEN: Address = Address::new([0x11; 20]);
const COLLATERAL_TOKEN: Address = Address::new([0x12; 20]);
const SUPPLY_MARKET: MarketId = MarketId::new([1; 32]);
const VAULT_COLLATERAL_MARKET: MarketId = MarketId::new([2; 32]);

const ALICE: Address = Address::new([0xA1; 20]);
const BOB: Address = Address::new([0xB0; 20]);
const CAROL: Address = Address::new([0xCA; 20]);
const DAVE: Address = Address::new([0xDA; 20]);
const ERIN: Address = Address::new([0xE1; 20]);

fn market_tx(market: MarketId, user: Address, kind: PositionKind, shares: i64, timestamp: Timestamp) -> MarketTx {
    MarketTx {
        market,
        user,
        kind,
        shares: BigInt::from(shares),
        timestamp,
    }
}

fn vault_tx(user: Address, shares: i64, timestamp: Timestamp) -> VaultTx {
    VaultTx {
        vault: VAULT,
        user,
        shares: BigInt::from(shares),
        timestamp,
    }
}

/// The scenario state, accrued to t = 100 at 1000 points per second.
///
/// Erin posts collateral at t = 20, so the collateral shards split 5000 / 2400
/// and the donation does not divide evenly.
fn accrued_scenario() -> State {
    let engine = AccrualEngine::new(BigInt::from(1_000));
    let mut state = State::new();
    state.insert_market(Market::new(SUPPLY_MARKET, LOAN_TOKEN, COLLATERAL_TOKEN, 0));
    state.insert_market(Market::new(VAULT_COLLATERAL_MARKET, LOAN_TOKEN, VAULT, 0));

    for (user, shares) in [(ALICE, 60), (BOB, 30), (PROTOCOL, 10)] {
        state = engine
            .apply_vault_tx(&state, &vault_tx(user, shares, 0))
            .expect("vault deposit");
    }
    let txs = [
        market_tx(SUPPLY_MARKET, VAULT, PositionKind::Supply, 1_000, 0),
        market_tx(SUPPLY_MARKET, DAVE, PositionKind::Supply, 1_000, 0),
        market_tx(SUPPLY_MARKET, PROTOCOL, PositionKind::Supply, 500, 0),
        market_tx(VAULT_COLLATERAL_MARKET, CAROL, PositionKind::Collateral, 50, 0),
        market_tx(VAULT_COLLATERAL_MARKET, ERIN, PositionKind::Collateral, 30, 20),
    ];
    for tx in &txs {
        state = engine.apply_market_tx(&state, tx).expect("market tx");
    }

    engine.accrue_state(&state, 100).expect("accrue")
}

#[test]
fn full_pipeline_pushes_vault_rewards_to_users() {
    let accrued = accrued_scenario();
    let config = RedistributionConfig::new(PROTOCOL);
    let result = redistribute_all(&accrued, &config).expect("redistribute");

    // =========================================================
    // Phase 1: Carol and Erin back the placeholder's market stake
    // =========================================================
    // The stake earned 20000 points and 50000 shards.
    let carol = &result.vault_positions[&VaultPositionKey::new(VAULT, CAROL)];
    assert_eq!(carol.supply_points, BigInt::from(13_513));
    assert_eq!(carol.supply_shards, BigInt::from(33_783));
    let erin = &result.vault_positions[&VaultPositionKey::new(VAULT, ERIN)];
    assert_eq!(erin.supply_points, BigInt::from(6_486));
    assert_eq!(erin.supply_shards, BigInt::from(16_216));
    assert!(carol.shares.is_zero(), "donations move no principal");

    // =========================================================
    // Phase 2: the vault's market earnings reach its depositors
    // =========================================================
    let alice = &result.positions[&PositionKey::new(SUPPLY_MARKET, ALICE)];
    let bob = &result.positions[&PositionKey::new(SUPPLY_MARKET, BOB)];
    assert_eq!(alice.supply_points, BigInt::from(24_000));
    assert_eq!(bob.supply_points, BigInt::from(12_000));
    assert_eq!(alice.supply_shards, BigInt::from(60_000));
    assert!(alice.supply_shares.is_zero(), "redistribution moves no principal");

    let vault_position = &result.positions[&PositionKey::new(SUPPLY_MARKET, VAULT)];
    assert!(vault_position.supply_points.is_zero());

    let dave = &result.positions[&PositionKey::new(SUPPLY_MARKET, DAVE)];
    assert_eq!(dave.supply_points, BigInt::from(40_000));

    // =========================================================
    // Phase 3: placeholder rows are gone and aggregates shrink
    // =========================================================
    assert!(result.positions.values().all(|p| p.user != PROTOCOL));
    assert!(result.vault_positions.values().all(|p| p.user != PROTOCOL));
    let market = &result.markets[&SUPPLY_MARKET];
    assert_eq!(market.total_supply_points, BigInt::from(76_000));
    assert_eq!(market.total_supply_shards, BigInt::from(190_000));
    assert_eq!(market.total_supply_shares, BigInt::from(2_500));

    let vault = &result.vaults[&VAULT];
    assert_eq!(vault.total_points, BigInt::from(109_999));
    assert_eq!(vault.total_shards, BigInt::from(58_999));

    // =========================================================
    // Checks hold on both sides of the waterfall
    // =========================================================
    for state in [&accrued, &result] {
        let rewards = state.rewards();
        assert!(check_shards(&rewards).expect("shards").is_consistent());
        assert!(check_points(&rewards, &BigInt::zero())
            .expect("points")
            .is_consistent());
    }
}

#[test]
fn donation_dust_stays_on_placeholder_stake() {
    let accrued = accrued_scenario();
    let donated = collateral_pass(&accrued, PROTOCOL).expect("collateral");

    let stake = &donated.positions[&PositionKey::new(SUPPLY_MARKET, PROTOCOL)];
    assert_eq!(stake.supply_points, BigInt::from(1));
    assert_eq!(stake.supply_shards, BigInt::from(1));

    // The paid units left the market and joined the vault.
    let market = &donated.markets[&SUPPLY_MARKET];
    assert_eq!(market.total_supply_points, BigInt::from(80_001));
    assert_eq!(market.total_supply_shards, BigInt::from(200_001));
    let vault = &donated.vaults[&VAULT];
    assert_eq!(vault.total_points, BigInt::from(119_999));
    assert_eq!(vault.total_shards, BigInt::from(59_999));

    let rewards = donated.rewards();
    assert!(check_shards(&rewards).expect("shards").is_consistent());
    assert!(check_points(&rewards, &BigInt::zero())
        .expect("points")
        .is_consistent());
}

#[test]
fn waterfall_phase_order_changes_payouts() {
    let accrued = accrued_scenario();
    let ordered = supply_pass(&collateral_pass(&accrued, PROTOCOL).expect("collateral"))
        .expect("supply");
    let reversed = collateral_pass(&supply_pass(&accrued).expect("supply"), PROTOCOL)
        .expect("collateral");

    // Reversed, the stake already holds the placeholder's 4000 point cut of
    // the vault supply, and Carol receives part of it.
    let carol = VaultPositionKey::new(VAULT, CAROL);
    assert_eq!(ordered.vault_positions[&carol].supply_points, BigInt::from(13_513));
    assert_eq!(reversed.vault_positions[&carol].supply_points, BigInt::from(16_216));

    let stake = PositionKey::new(SUPPLY_MARKET, PROTOCOL);
    assert_eq!(ordered.positions[&stake].supply_points, BigInt::from(4_001));
    assert_ne!(ordered, reversed);
}

#[test]
fn redistribution_does_not_touch_input() {
    let accrued = accrued_scenario();
    let before = accrued.clone();
    let _ = redistribute_all(&accrued, &RedistributionConfig::new(PROTOCOL)).expect("run");
    assert_eq!(accrued, before);
}

#[test]
fn redistribution_is_deterministic() {
    let accrued = accrued_scenario();
    let config = RedistributionConfig::new(PROTOCOL);
    let first = redistribute_all(&accrued, &config).expect("first");
    let second = redistribute_all(&accrued, &config).expect("second");
    assert_eq!(first, second);
}

/// Sum of one reward field over every position and vault position.
fn holder_total(state: &State, points: bool) -> BigInt {
    let positions = state.positions.values().map(|p| {
        if points {
            &p.supply_points + &p.borrow_points + &p.collateral_points
        } else {
            &p.supply_shards + &p.borrow_shards + &p.collateral_shards
        }
    });
    let vault_positions = state.vault_positions.values().map(|p| {
        if points {
            p.supply_points.clone()
        } else {
            p.supply_shards.clone()
        }
    });
    positions.chain(vault_positions).sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn waterfall_conserves_and_stays_consistent(
        vault_deposits in prop::collection::vec((0u8..4, 1i64..1_000_000, 0u64..50), 1..8),
        supplies in prop::collection::vec((0u8..4, 1i64..1_000_000_000, 0u64..50), 0..8),
        vault_supply in 1i64..1_000_000_000,
        protocol_supply in 0i64..1_000_000_000,
        collateral in prop::collection::vec((0u8..4, 1i64..1_000_000, 0u64..50), 0..4),
        horizon in 50u64..100_000,
    ) {
        let engine = AccrualEngine::default();
        let mut state = State::new();
        state.insert_market(Market::new(SUPPLY_MARKET, LOAN_TOKEN, COLLATERAL_TOKEN, 0));
        state.insert_market(Market::new(VAULT_COLLATERAL_MARKET, LOAN_TOKEN, VAULT, 0));

        let mut vault_txs: Vec<VaultTx> = vault_deposits
            .iter()
            .map(|(user, shares, t)| vault_tx(Address::new([0x40 + user; 20]), *shares, *t))
            .collect();
        vault_txs.push(vault_tx(PROTOCOL, 1_000, 0));
        vault_txs.sort_by_key(|tx| tx.timestamp);

        let mut market_txs: Vec<MarketTx> = supplies
            .iter()
            .map(|(user, shares, t)| {
                market_tx(SUPPLY_MARKET, Address::new([0x50 + user; 20]), PositionKind::Supply, *shares, *t)
            })
            .chain(collateral.iter().map(|(user, shares, t)| {
                market_tx(VAULT_COLLATERAL_MARKET, Address::new([0x60 + user; 20]), PositionKind::Collateral, *shares, *t)
            }))
            .collect();
        market_txs.push(market_tx(SUPPLY_MARKET, VAULT, PositionKind::Supply, vault_supply, 0));
        if protocol_supply > 0 {
            market_txs.push(market_tx(SUPPLY_MARKET, PROTOCOL, PositionKind::Supply, protocol_supply, 0));
        }
        market_txs.sort_by_key(|tx| tx.timestamp);

        for tx in &vault_txs {
            state = engine.apply_vault_tx(&state, tx).expect("vault tx");
        }
        for tx in &market_txs {
            state = engine.apply_market_tx(&state, tx).expect("market tx");
        }
        let accrued = engine.accrue_state(&state, horizon).expect("accrue");

        // Phases 1 and 2 only move units between holders.
        let moved = supply_pass(&collateral_pass(&accrued, PROTOCOL).expect("collateral"))
            .expect("supply");
        prop_assert_eq!(holder_total(&moved, true), holder_total(&accrued, true));
        prop_assert_eq!(holder_total(&moved, false), holder_total(&accrued, false));

        let result = redistribute_all(&accrued, &RedistributionConfig::new(PROTOCOL))
            .expect("redistribute");
        let rewards = result.rewards();
        prop_assert!(check_shards(&rewards).expect("shards").is_consistent());

        // One unit of truncation per holder settlement.
        let settlements = vault_txs.len() + market_txs.len() + result.positions.len()
            + result.vault_positions.len();
        let tolerance = BigInt::from(settlements as u64);
        prop_assert!(check_points(&rewards, &tolerance).expect("points").is_consistent());
    }
}
