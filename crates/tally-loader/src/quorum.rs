//! Concurrent fetch, retries and agreement.
//!
//! Every source is queried at the same block in parallel. A source that
//! errors is retried up to [`LoaderConfig::max_retries`] attempts in total;
//! a source that never succeeds fails the whole load. The returned states
//! are grouped by equality and the largest group wins if it reaches the
//! quorum.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tally_types::State;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::source::StateSource;
use crate::{LoaderError, Result};

/// Configuration for a quorum load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Sources that must agree. Defaults to all of them.
    pub quorum: Option<usize>,
    /// Attempts per source before giving up.
    pub max_retries: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            quorum: None,
            max_retries: 3,
        }
    }
}

impl LoaderConfig {
    /// The quorum to apply with `sources` sources.
    pub fn effective_quorum(&self, sources: usize) -> usize {
        self.quorum.unwrap_or(sources)
    }

    /// Validate the configuration against the number of sources.
    pub fn validate(&self, sources: usize) -> Result<()> {
        if sources == 0 {
            return Err(LoaderError::InvalidConfig(
                "no sources configured".to_string(),
            ));
        }

        if self.max_retries == 0 {
            return Err(LoaderError::InvalidConfig(
                "max_retries must be at least 1".to_string(),
            ));
        }

        let quorum = self.effective_quorum(sources);
        if quorum == 0 {
            return Err(LoaderError::InvalidConfig(
                "quorum must be at least 1".to_string(),
            ));
        }
        if quorum > sources {
            return Err(LoaderError::InvalidConfig(format!(
                "quorum ({quorum}) exceeds total sources ({sources})"
            )));
        }

        Ok(())
    }
}

/// Load the state at `block`, trusting it only if enough sources agree.
///
/// # Errors
///
/// - [`LoaderError::InvalidConfig`] if `config` does not fit `sources`
/// - [`LoaderError::UpstreamTransport`] if a source fails every attempt
/// - [`LoaderError::QuorumNotMet`] if the largest agreeing group is too small
pub async fn load<S>(sources: &[Arc<S>], block: u64, config: &LoaderConfig) -> Result<State>
where
    S: StateSource + Send + Sync + 'static,
{
    config.validate(sources.len())?;
    let required = config.effective_quorum(sources.len());

    info!(sources = sources.len(), block, required, "loading state");

    let mut tasks = JoinSet::new();
    for source in sources {
        let source = Arc::clone(source);
        let max_retries = config.max_retries;
        tasks.spawn(async move { fetch_with_retries(source.as_ref(), block, max_retries).await });
    }

    let mut fetched = Vec::with_capacity(sources.len());
    while let Some(joined) = tasks.join_next().await {
        let state = joined.map_err(|e| LoaderError::UpstreamTransport {
            source_name: "fetch task".to_string(),
            attempts: 0,
            reason: e.to_string(),
        })??;
        fetched.push(state);
    }

    let mut groups: Vec<(State, usize)> = Vec::new();
    for state in fetched {
        match groups.iter_mut().find(|(candidate, _)| candidate == &state) {
            Some((_, count)) => *count += 1,
            None => groups.push((state, 1)),
        }
    }

    let Some((state, agreeing)) = groups.into_iter().max_by_key(|(_, count)| *count) else {
        return Err(LoaderError::QuorumNotMet {
            required,
            agreeing: 0,
            sources: sources.len(),
        });
    };

    if agreeing < required {
        warn!(agreeing, required, "sources disagree");
        return Err(LoaderError::QuorumNotMet {
            required,
            agreeing,
            sources: sources.len(),
        });
    }

    info!(agreeing, required, "quorum reached");
    Ok(state)
}

async fn fetch_with_retries<S: StateSource>(source: &S, block: u64, max_retries: u32) -> Result<State> {
    let mut last_error = String::new();

    for attempt in 0..max_retries {
        debug!(source = source.name(), block, attempt = attempt + 1, "fetching state");

        match source.fetch(block).await {
            Ok(state) => return Ok(state),
            Err(e) => {
                warn!(
                    source = source.name(),
                    attempt = attempt + 1,
                    error = %e,
                    "state fetch failed"
                );
                last_error = e.to_string();
            }
        }
    }

    Err(LoaderError::UpstreamTransport {
        source_name: source.name().to_string(),
        attempts: max_retries,
        reason: last_error,
    })
}
