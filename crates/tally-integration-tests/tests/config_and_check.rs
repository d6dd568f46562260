//! Integration test: config files and the check command.

use std::path::PathBuf;

use num_bigint::BigInt;
use tally_cli::commands::{check, read_json, write_json};
use tally_cli::config::TallyConfig;
use tally_types::{Address, MarketId, RewardsState};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tally-cli-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

#[test]
fn config_file_round_trip() {
    let dir = scratch("config");
    let path = dir.join("tally.toml");
    std::fs::write(
        &path,
        r#"
        [loader]
        sources = ["/srv/indexer-a", "/srv/indexer-b"]
        max_retries = 5

        [accrual]
        points_rate_per_second = "1000"

        [redistribution]
        protocol_address = "0xEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEE"

        [advanced]
        log_level = "debug"
        "#,
    )
    .expect("write config");

    let config = TallyConfig::from_file(&path).expect("load config");
    assert_eq!(config.loader.sources.len(), 2);
    assert_eq!(config.loader_config().max_retries, 5);
    assert_eq!(config.loader_config().effective_quorum(2), 2);
    assert_eq!(config.accrual.points_rate_per_second, BigInt::from(1_000));
    assert_eq!(
        config.redistribution_config().purge,
        vec![Address::new([0xEE; 20])]
    );
    assert_eq!(config.checker.tolerance, BigInt::from(1_000));
    assert_eq!(config.advanced.log_level, "debug");

    std::fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn missing_config_file_is_an_error() {
    let path = std::env::temp_dir().join("tally-definitely-missing.toml");
    let err = TallyConfig::from_file(&path).expect_err("no such file");
    assert!(format!("{err:#}").contains("tally-definitely-missing.toml"));
}

#[test]
fn check_command_flags_drift_in_rewards_file() {
    let dir = scratch("check");
    let market = MarketId::new([3; 32]);
    let user = Address::new([0xA1; 20]);

    // Aggregate and holder agree on points within one unit but not on shards.
    let json = serde_json::json!({
        "markets": [{
            "id": market.to_string(),
            "loanToken": "0x1111111111111111111111111111111111111111",
            "collateralToken": "0x1212121212121212121212121212121212121212",
            "totalSupplyShards": "500",
            "totalBorrowShards": "0",
            "totalCollateralShards": "0",
            "totalSupplyPoints": "101",
            "totalBorrowPoints": "0",
            "totalCollateralPoints": "0"
        }],
        "positions": [{
            "market": market.to_string(),
            "user": user.to_string(),
            "supplyShards": "499",
            "borrowShards": "0",
            "collateralShards": "0",
            "supplyPoints": "100",
            "borrowPoints": "0",
            "collateralPoints": "0"
        }]
    });
    let path = dir.join("rewards.json");
    std::fs::write(&path, serde_json::to_vec(&json).expect("serialize")).expect("write");

    let rewards: RewardsState = read_json(&path).expect("read rewards");
    let summary = check::evaluate(&rewards, &BigInt::from(1)).expect("evaluate");
    assert!(!summary.shards_consistent);
    assert!(summary.points_consistent);
    assert_eq!(summary.offending_markets, vec![market]);
    assert!(summary.offending_vaults.is_empty());

    let strict = check::evaluate(&rewards, &BigInt::from(0)).expect("evaluate");
    assert!(!strict.points_consistent);

    // A file written by the CLI reads back unchanged.
    let copy = dir.join("copy.json");
    write_json(&rewards, Some(&copy)).expect("write copy");
    let reread: RewardsState = read_json(&copy).expect("read copy");
    assert_eq!(reread, rewards);

    std::fs::remove_dir_all(&dir).expect("cleanup");
}
