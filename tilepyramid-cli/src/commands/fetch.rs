//! Single tile fetch command.

use std::path::PathBuf;

use clap::Args;
use tilepyramid::config::{format_size, ConfigFile};
use tilepyramid::layer::{FetchMode, TileStatus};
use tilepyramid::tile::{TileAddress, TileKey};

use super::common::{build_layer, find_layer, runtime, start_coordinator};
use crate::error::CliError;

/// Arguments for `tilepyramid fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Layer name from config.ini
    #[arg(long)]
    pub layer: String,

    #[arg(long)]
    pub level: u32,

    #[arg(long)]
    pub row: i32,

    #[arg(long)]
    pub col: i32,

    /// Also copy the tile to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(config: &ConfigFile, args: FetchArgs) -> Result<(), CliError> {
    let layer_config = find_layer(config, &args.layer)?;

    runtime()?.block_on(async {
        let coordinator = start_coordinator(config)?;
        let layer = build_layer(layer_config, coordinator.clone())?;

        let level = layer.levels().level(args.level).ok_or_else(|| {
            CliError::InvalidArgs(format!(
                "layer '{}' has levels 0..{}",
                layer.name(),
                layer.levels().num_levels()
            ))
        })?;
        let key = TileKey::for_level(level, args.row, args.col);
        let path = coordinator
            .cache()
            .disk()
            .tile_path(&TileAddress::Rect(key.clone()), level);

        let status = layer.resolve(&key, FetchMode::Synchronous).await;
        coordinator.shutdown().await;

        match status? {
            TileStatus::Ready(entry) => {
                println!("Tile {}", key);
                println!("  Size:  {}", format_size(entry.size_bytes() as u64));
                println!("  Cache: {}", path.display());
                if let Some(output) = args.output {
                    std::fs::write(&output, entry.payload()).map_err(|error| {
                        CliError::FileWrite {
                            path: output.clone(),
                            error,
                        }
                    })?;
                    println!("  Saved: {}", output.display());
                }
            }
            TileStatus::Absent => println!("Tile {} has no data at the origin", key),
            TileStatus::Pending => println!("Tile {} is still pending", key),
        }
        Ok::<(), CliError>(())
    })
}
