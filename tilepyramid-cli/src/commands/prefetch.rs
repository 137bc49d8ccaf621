//! Bulk download of a region.

use std::time::Duration;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tilepyramid::config::ConfigFile;

use super::common::{build_layer, find_layer, runtime, start_coordinator, RegionArgs};
use crate::error::CliError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Arguments for `tilepyramid prefetch`.
#[derive(Debug, Args)]
pub struct PrefetchArgs {
    /// Layer name from config.ini
    #[arg(long)]
    pub layer: String,

    #[command(flatten)]
    pub region: RegionArgs,

    /// Requested tile size in degrees; selects the level
    #[arg(long)]
    pub resolution: f64,
}

pub fn run(config: &ConfigFile, args: PrefetchArgs) -> Result<(), CliError> {
    let layer_config = find_layer(config, &args.layer)?;
    let region = args.region.region()?;

    runtime()?.block_on(async {
        let coordinator = start_coordinator(config)?;
        let layer = build_layer(layer_config, coordinator.clone())?;

        let (level, tiles) = layer.tiles_for_view(&region, args.resolution);
        let total = tiles.len() as u64;
        println!(
            "Prefetching {} tiles of {} at level {}",
            total,
            layer.name(),
            level.number()
        );

        let progress = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:50} {pos:>6}/{len:6} {per_sec} eta {eta}")
        {
            progress.set_style(style);
        }

        // Poll while queueing so the bar moves during large submissions.
        let submit = layer.prefetch(&region, args.resolution);
        tokio::pin!(submit);
        let summary = loop {
            tokio::select! {
                summary = &mut submit => break summary,
                _ = tokio::time::sleep(POLL_INTERVAL) => {
                    let stats = coordinator.stats();
                    progress.set_position(stats.succeeded + stats.failed + stats.absent);
                }
            }
        };
        let cached = summary.cached as u64;

        while coordinator.pending() > 0 {
            let remaining = coordinator.pending() as u64;
            progress.set_position(total.saturating_sub(remaining));
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        layer.wait_idle().await;
        progress.finish();

        let stats = coordinator.stats();
        coordinator.shutdown().await;

        println!(
            "Done: {} in memory, {} on disk, {} downloaded, {} absent, {} failed",
            cached, stats.disk_hits, stats.network_fetches, stats.absent, stats.failed
        );
        Ok::<(), CliError>(())
    })
}
