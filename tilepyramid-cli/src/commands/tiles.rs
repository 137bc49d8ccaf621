//! Tile enumeration command.

use clap::Args;
use tilepyramid::config::ConfigFile;
use tilepyramid::level::Level;

use super::common::{find_layer, RegionArgs};
use crate::error::CliError;

/// Arguments for `tilepyramid tiles`.
#[derive(Debug, Args)]
pub struct TilesArgs {
    /// Layer name from config.ini
    #[arg(long)]
    pub layer: String,

    #[command(flatten)]
    pub region: RegionArgs,

    /// Requested tile size in degrees; selects the level
    #[arg(long, conflicts_with = "level")]
    pub resolution: Option<f64>,

    /// Explicit level number
    #[arg(long)]
    pub level: Option<u32>,

    /// Print the bounds of every tile
    #[arg(long)]
    pub bounds: bool,
}

pub fn run(config: &ConfigFile, args: TilesArgs) -> Result<(), CliError> {
    let layer = find_layer(config, &args.layer)?;
    let levels = layer.build_levels()?;
    let region = args.region.region()?;

    let level: &Level = match (args.level, args.resolution) {
        (Some(number), _) => levels.level(number).ok_or_else(|| {
            CliError::InvalidArgs(format!(
                "layer '{}' has levels 0..{}",
                layer.name,
                levels.num_levels()
            ))
        })?,
        (None, Some(resolution)) => levels.level_for_resolution(resolution),
        (None, None) => levels.first_level(),
    };

    let tiles = levels.tiles_intersecting(&region, level);
    println!(
        "Level {} of {}: {} tiles{}",
        level.number(),
        layer.name,
        tiles.len(),
        if level.is_empty() { " (empty level)" } else { "" }
    );

    for key in tiles {
        if args.bounds {
            if let Some(r) = levels.tile_region(&key) {
                println!(
                    "{}\tlat {:.4}..{:.4}\tlon {:.4}..{:.4}",
                    key, r.min_lat, r.max_lat, r.min_lon, r.max_lon
                );
                continue;
            }
        }
        println!("{}", key);
    }
    Ok(())
}
