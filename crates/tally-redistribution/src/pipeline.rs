//! The composed waterfall and pluggable snapshot modules.

use tally_types::{Address, State};

use crate::{collateral_pass, purge, supply_pass, Result};

/// Addresses the waterfall needs to know about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedistributionConfig {
    /// Placeholder holding a vault's reserved stake.
    pub protocol: Address,
    /// Addresses removed by the final purge.
    pub purge: Vec<Address>,
}

impl RedistributionConfig {
    /// Purges only the placeholder itself.
    pub fn new(protocol: Address) -> Self {
        Self {
            protocol,
            purge: vec![protocol],
        }
    }

    pub fn with_purge(mut self, purge: Vec<Address>) -> Self {
        self.purge = purge;
        self
    }
}

/// Collateral pass, then supply pass, then purge.
///
/// The input must be settled to a single timestamp.
///
/// # Errors
///
/// Any error from the three phases. Nothing is returned on failure.
pub fn redistribute_all(state: &State, config: &RedistributionConfig) -> Result<State> {
    let donated = collateral_pass(state, config.protocol)?;
    let supplied = supply_pass(&donated)?;
    let purged = purge(&supplied, &config.purge)?;

    tracing::info!(
        positions = purged.positions.len(),
        vault_positions = purged.vault_positions.len(),
        "redistribution complete"
    );

    Ok(purged)
}

/// A snapshot transformation that can be chained with others.
pub trait Module {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Transform a snapshot.
    fn handle(&self, state: State) -> Result<State>;
}

/// The full waterfall as a module.
#[derive(Clone, Debug)]
pub struct Redistributor {
    config: RedistributionConfig,
}

impl Redistributor {
    pub fn new(config: RedistributionConfig) -> Self {
        Self { config }
    }
}

impl Module for Redistributor {
    fn name(&self) -> &str {
        "redistributor"
    }

    fn handle(&self, state: State) -> Result<State> {
        redistribute_all(&state, &self.config)
    }
}

/// Purge of a fixed address set as a module.
#[derive(Clone, Debug)]
pub struct Blacklist {
    addresses: Vec<Address>,
}

impl Blacklist {
    pub fn new(addresses: Vec<Address>) -> Self {
        Self { addresses }
    }
}

impl Module for Blacklist {
    fn name(&self) -> &str {
        "blacklist"
    }

    fn handle(&self, state: State) -> Result<State> {
        purge(&state, &self.addresses)
    }
}

/// Fold a snapshot through `modules` in order.
///
/// # Errors
///
/// The first module error. Later modules do not run.
pub fn run_modules(state: State, modules: &[&dyn Module]) -> Result<State> {
    modules.iter().try_fold(state, |state, module| {
        tracing::debug!(module = module.name(), "running module");
        module.handle(state)
    })
}
