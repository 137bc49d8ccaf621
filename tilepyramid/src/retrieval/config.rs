//! Retrieval pool configuration.

use std::time::Duration;

use crate::provider::DEFAULT_TIMEOUT;

/// Default number of worker tasks.
pub const DEFAULT_WORKERS: usize = 8;

/// Default number of queued requests before back-pressure.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// How long a terminal state stays observable.
const DEFAULT_OUTCOME_TTL: Duration = Duration::from_secs(60);

/// Configuration for a [`super::RetrievalCoordinator`].
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Worker tasks; caps concurrent outbound requests.
    pub workers: usize,
    /// Bounded queue length.
    pub queue_capacity: usize,
    /// Per-request timeout applied on top of the HTTP client's own.
    pub timeout: Duration,
    /// How long `Succeeded`/`Failed` remain visible through `state()`.
    pub outcome_ttl: Duration,
    /// Locator prefix rewrite as `(from, to)`.
    pub proxy: Option<(String, String)>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            timeout: DEFAULT_TIMEOUT,
            outcome_ttl: DEFAULT_OUTCOME_TTL,
            proxy: None,
        }
    }
}

impl RetrievalConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_outcome_ttl(mut self, ttl: Duration) -> Self {
        self.outcome_ttl = ttl;
        self
    }

    pub fn with_proxy(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.proxy = Some((from.into(), to.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_workers_clamped() {
        let config = RetrievalConfig::default().with_workers(0).with_queue_capacity(0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_capacity, 1);
    }
}
