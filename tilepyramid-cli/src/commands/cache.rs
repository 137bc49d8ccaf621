//! Cache management CLI commands.

use clap::Subcommand;
use tilepyramid::cache::{DiskStats, DiskTier};
use tilepyramid::config::{format_size, ConfigFile};

use super::common::find_layer;
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show disk cache statistics
    Stats {
        /// Only count tiles of this layer
        #[arg(long)]
        layer: Option<String>,
    },
    /// Remove cached tiles and absent markers of one layer, or of every
    /// configured layer
    Clear {
        #[arg(long)]
        layer: Option<String>,
    },
}

/// Run a cache subcommand.
pub fn run(config: &ConfigFile, action: CacheAction) -> Result<(), CliError> {
    let disk = DiskTier::new(&config.cache.directory);

    match action {
        CacheAction::Stats { layer } => {
            let stats = match layer {
                Some(name) => {
                    let namespace = namespace_of(config, &name)?;
                    println!("Disk cache: {} ({})", disk.root().display(), namespace);
                    disk.namespace_stats(&namespace)?
                }
                None => {
                    println!("Disk cache: {}", disk.root().display());
                    disk.stats()?
                }
            };
            print_stats(&stats);
            Ok(())
        }
        CacheAction::Clear { layer } => {
            let namespaces = match layer {
                Some(name) => vec![namespace_of(config, &name)?],
                None => config
                    .layers
                    .iter()
                    .map(|l| l.levels.cache_namespace.clone())
                    .collect(),
            };

            let mut total = DiskStats::default();
            for namespace in namespaces {
                println!("Clearing {}", namespace);
                let removed = disk.clear_namespace(&namespace)?;
                total.files += removed.files;
                total.bytes += removed.bytes;
                total.absent_markers += removed.absent_markers;
            }
            println!(
                "Deleted {} tiles and {} absent markers, freed {}",
                total.files,
                total.absent_markers,
                format_size(total.bytes)
            );
            Ok(())
        }
    }
}

fn namespace_of(config: &ConfigFile, layer: &str) -> Result<String, CliError> {
    Ok(find_layer(config, layer)?.levels.cache_namespace.clone())
}

fn print_stats(stats: &DiskStats) {
    println!("  Tiles:          {}", stats.files);
    println!("  Size:           {}", format_size(stats.bytes));
    println!("  Absent markers: {}", stats.absent_markers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> ConfigFile {
        let text = format!(
            "[cache]\ndirectory = {}\n\n[layer.bmng]\ndataset = bmng\n\
             cache_namespace = earth/bmng\nservice = https://t.example.com\n",
            dir.path().display()
        );
        ConfigFile::parse(&text).unwrap()
    }

    #[test]
    fn test_clear_removes_layer_tiles() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let tile = dir.path().join("earth/bmng/2/8/8_18.jpg");
        std::fs::create_dir_all(tile.parent().unwrap()).unwrap();
        std::fs::write(&tile, b"jpeg").unwrap();

        run(&config, CacheAction::Clear { layer: None }).unwrap();

        assert!(!tile.exists());
    }

    #[test]
    fn test_stats_unknown_layer() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        assert!(matches!(
            run(&config, CacheAction::Stats { layer: Some("ned".into()) }),
            Err(CliError::UnknownLayer { .. })
        ));
    }
}
