//! Cache configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default memory tier budget (512 MB).
pub const DEFAULT_MEMORY_SIZE: u64 = 512 * 1024 * 1024;

/// Default time an origin-absent tile is remembered before it is retried.
pub const DEFAULT_ABSENT_RECHECK: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration for a [`super::CacheStore`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root of the disk tier.
    pub directory: PathBuf,
    /// Memory tier budget in bytes.
    pub memory_size: u64,
    /// How long an absent marker suppresses fetches. Zero disables the
    /// absent list.
    pub absent_recheck: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            memory_size: DEFAULT_MEMORY_SIZE,
            absent_recheck: DEFAULT_ABSENT_RECHECK,
        }
    }
}

impl CacheConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }

    pub fn with_memory_size(mut self, bytes: u64) -> Self {
        self.memory_size = bytes;
        self
    }

    pub fn with_absent_recheck(mut self, recheck: Duration) -> Self {
        self.absent_recheck = recheck;
        self
    }
}

/// `~/.cache/tilepyramid`, or `./tilepyramid-cache` when the platform has no
/// cache directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("tilepyramid"))
        .unwrap_or_else(|| PathBuf::from("tilepyramid-cache"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = CacheConfig::new("/tmp/tiles")
            .with_memory_size(1024)
            .with_absent_recheck(Duration::from_secs(5));
        assert_eq!(config.directory, PathBuf::from("/tmp/tiles"));
        assert_eq!(config.memory_size, 1024);
        assert_eq!(config.absent_recheck, Duration::from_secs(5));
    }
}
