//! `tally snapshot`: load, accrue, redistribute and strip.

use std::sync::Arc;

use anyhow::{bail, Context};
use tally_accrual::AccrualEngine;
use tally_loader::{load, FileSource, StateSource};
use tally_redistribution::redistribute_all;
use tally_types::RewardsState;

use super::write_json;
use crate::args::{Point, SnapshotArgs};
use crate::config::TallyConfig;

/// Run the pipeline against the configured file sources and write the result.
pub async fn run(args: &SnapshotArgs, config: &TallyConfig) -> anyhow::Result<()> {
    if config.loader.sources.is_empty() {
        bail!("no sources configured under [loader]");
    }
    let sources: Vec<Arc<FileSource>> = config
        .loader
        .sources
        .iter()
        .map(|dir| Arc::new(FileSource::new(dir)))
        .collect();

    let rewards = build(&sources, args, config).await?;
    write_json(&rewards, args.out.as_deref())
}

/// The cumulative rewards at `args.to`, or the rewards earned inside the
/// window when `args.from` is set.
pub async fn build<S>(
    sources: &[Arc<S>],
    args: &SnapshotArgs,
    config: &TallyConfig,
) -> anyhow::Result<RewardsState>
where
    S: StateSource + Send + Sync + 'static,
{
    let later = rewards_at(sources, args.to, config).await?;
    let Some(from) = args.from else {
        return Ok(later);
    };
    let earlier = rewards_at(sources, from, config).await?;
    Ok(tally_redistribution::diff(&earlier, &later))
}

async fn rewards_at<S>(
    sources: &[Arc<S>],
    point: Point,
    config: &TallyConfig,
) -> anyhow::Result<RewardsState>
where
    S: StateSource + Send + Sync + 'static,
{
    let state = load(sources, point.block, &config.loader_config())
        .await
        .with_context(|| format!("loading block {}", point.block))?;

    let engine = AccrualEngine::new(config.accrual.points_rate_per_second.clone());
    let accrued = engine
        .accrue_state(&state, point.timestamp)
        .with_context(|| format!("accruing to {}", point.timestamp))?;
    let redistributed = redistribute_all(&accrued, &config.redistribution_config())
        .context("redistributing")?;

    tracing::info!(
        block = point.block,
        timestamp = point.timestamp,
        markets = redistributed.markets.len(),
        positions = redistributed.positions.len(),
        "snapshot built"
    );

    Ok(redistributed.rewards())
}
