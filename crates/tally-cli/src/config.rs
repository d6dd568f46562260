//! Configuration file management.

use std::path::{Path, PathBuf};

use anyhow::Context;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use tally_loader::LoaderConfig;
use tally_redistribution::RedistributionConfig;
use tally_types::Address;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TALLY_CONFIG";

/// Config file read from the working directory when no override is set.
pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Snapshot sources.
    #[serde(default)]
    pub loader: LoaderSection,
    /// Emission settings.
    #[serde(default)]
    pub accrual: AccrualSection,
    /// Waterfall addresses.
    #[serde(default)]
    pub redistribution: RedistributionSection,
    /// Consistency check settings.
    #[serde(default)]
    pub checker: CheckerSection,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedSection,
}

/// Loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSection {
    /// Directories holding `<block>.json` snapshots, one per source.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Sources that must agree. Absent = all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quorum: Option<usize>,
    /// Attempts per source.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Accrual configuration.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualSection {
    /// Points emitted per second into every lane.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "tally_types::default_points_rate_per_second")]
    pub points_rate_per_second: BigInt,
}

/// Redistribution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedistributionSection {
    /// Placeholder holding vault stakes.
    #[serde(default = "default_protocol_address")]
    pub protocol_address: Address,
    /// Purged at the end of the waterfall. Absent = the placeholder only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purge: Option<Vec<Address>>,
}

/// Checker configuration.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerSection {
    /// Largest accepted point residual per aggregate.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_tolerance")]
    pub tolerance: BigInt,
}

/// Advanced configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedSection {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_max_retries() -> u32 {
    3
}

fn default_protocol_address() -> Address {
    Address::new([
        0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0x9c, 0xc5, 0xe9, 0x0e, 0x3b, 0x3a, 0xf6, 0x4b, 0xda, 0xf6,
        0x2c, 0x37, 0xee, 0xff, 0xcb,
    ])
}

fn default_tolerance() -> BigInt {
    BigInt::from(1_000)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoaderSection {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            quorum: None,
            max_retries: default_max_retries(),
        }
    }
}

impl Default for AccrualSection {
    fn default() -> Self {
        Self {
            points_rate_per_second: tally_types::default_points_rate_per_second(),
        }
    }
}

impl Default for RedistributionSection {
    fn default() -> Self {
        Self {
            protocol_address: default_protocol_address(),
            purge: None,
        }
    }
}

impl Default for CheckerSection {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
        }
    }
}

impl Default for AdvancedSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl TallyConfig {
    /// Load configuration from `$TALLY_CONFIG` or `./tally.toml`.
    ///
    /// Falls back to defaults if no file exists. An explicit `$TALLY_CONFIG`
    /// that does not exist is an error.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(&PathBuf::from(path));
        }
        let path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            quorum: self.loader.quorum,
            max_retries: self.loader.max_retries,
        }
    }

    pub fn redistribution_config(&self) -> RedistributionConfig {
        let config = RedistributionConfig::new(self.redistribution.protocol_address);
        match &self.redistribution.purge {
            Some(purge) => config.with_purge(purge.clone()),
            None => config,
        }
    }
}
