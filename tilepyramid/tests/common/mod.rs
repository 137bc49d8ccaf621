//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tilepyramid::cache::{CacheConfig, CacheStore};
use tilepyramid::provider::{AsyncHttpClient, BoxFuture, FetchError, HttpResponse};
use tilepyramid::retrieval::{RetrievalConfig, RetrievalCoordinator};

/// HTTP client that serves a fixed body and counts requests per locator.
pub struct CountingClient {
    delay: Duration,
    calls: AtomicUsize,
    per_url: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
}

impl CountingClient {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
            per_url: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Requests for locators ending in `suffix` fail with 503.
    pub fn fail(&self, suffix: &str) {
        self.failing.lock().unwrap().insert(suffix.to_string());
    }

    pub fn recover(&self, suffix: &str) {
        self.failing.lock().unwrap().remove(suffix);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.per_url.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn max_calls_per_url(&self) -> usize {
        self.per_url
            .lock()
            .unwrap()
            .values()
            .copied()
            .max()
            .unwrap_or(0)
    }
}

impl AsyncHttpClient for CountingClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<HttpResponse, FetchError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self
                .per_url
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default() += 1;

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let failing = self
                .failing
                .lock()
                .unwrap()
                .iter()
                .any(|suffix| url.ends_with(suffix.as_str()));
            if failing {
                return Ok(HttpResponse::status(503));
            }
            Ok(HttpResponse::ok(format!("tile:{}", url).into_bytes()))
        })
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub client: Arc<CountingClient>,
    pub coordinator: Arc<RetrievalCoordinator>,
}

/// Starts a coordinator over a fresh temporary cache.
pub fn harness(client: CountingClient, config: RetrievalConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(CacheStore::new(&CacheConfig::new(dir.path())));
    let client = Arc::new(client);
    let coordinator = Arc::new(
        RetrievalCoordinator::start(
            cache,
            Arc::clone(&client) as Arc<dyn AsyncHttpClient>,
            config,
        )
        .unwrap(),
    );
    Harness {
        dir,
        client,
        coordinator,
    }
}
