//! Retrieval coordinator and worker pool.

use std::sync::Arc;

use bytes::Bytes;
use moka::sync::Cache as MokaCache;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::RetrievalConfig;
use super::error::RetrievalError;
use super::postprocess::{PassThrough, PostProcessor};
use super::state::{Claim, ClaimGuard, InFlightTable, Outcome, RequestState};
use super::stats::{RetrievalStats, StatsSnapshot};
use crate::cache::{CacheEntry, CacheError, CacheStore, NamespaceLocks};
use crate::level::Level;
use crate::provider::{AsyncHttpClient, FetchError, ProxiedUrlBuilder, UrlBuilder};
use crate::tile::TileAddress;

/// Upper bound on remembered terminal states.
const MAX_OUTCOMES: u64 = 100_000;

/// Where and how a dataset's tiles are fetched.
#[derive(Clone)]
pub struct TileSource {
    pub url_builder: Arc<dyn UrlBuilder>,
    pub post_processor: Arc<dyn PostProcessor>,
    /// Replaces the level's format suffix in built locators.
    pub format_override: Option<String>,
}

impl TileSource {
    /// A source that stores response bodies unchanged.
    pub fn new(url_builder: Arc<dyn UrlBuilder>) -> Self {
        Self {
            url_builder,
            post_processor: Arc::new(PassThrough),
            format_override: None,
        }
    }

    pub fn with_post_processor(mut self, post_processor: Arc<dyn PostProcessor>) -> Self {
        self.post_processor = post_processor;
        self
    }

    pub fn with_format_override(mut self, format: impl Into<String>) -> Self {
        self.format_override = Some(format.into());
        self
    }
}

/// What `request_async` did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// A new fetch was queued.
    Queued,
    /// A fetch for this address is already queued or in flight.
    AlreadyPending,
    /// The tile is already in the memory tier.
    Cached,
    /// The queue is full; request again on a later frame.
    QueueFull,
    /// Empty levels are never fetched.
    EmptyLevel,
    /// The coordinator is shutting down.
    Closed,
}

struct Job {
    address: TileAddress,
    level: Level,
    source: TileSource,
}

struct Inner {
    cache: Arc<CacheStore>,
    client: Arc<dyn AsyncHttpClient>,
    locks: NamespaceLocks,
    in_flight: InFlightTable,
    outcomes: MokaCache<TileAddress, RequestState>,
    stats: RetrievalStats,
    config: RetrievalConfig,
}

/// Deduplicating fetch coordinator with a bounded worker pool.
///
/// Must be started inside a tokio runtime. Workers stop when
/// [`shutdown`](Self::shutdown) is called or the coordinator is dropped.
pub struct RetrievalCoordinator {
    inner: Arc<Inner>,
    queue: mpsc::Sender<Job>,
    shutdown: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
    handle: Handle,
}

impl RetrievalCoordinator {
    /// Starts `config.workers` worker tasks on the current runtime.
    pub fn start(
        cache: Arc<CacheStore>,
        client: Arc<dyn AsyncHttpClient>,
        config: RetrievalConfig,
    ) -> Result<Self, RetrievalError> {
        let handle = Handle::try_current().map_err(|_| RetrievalError::NoRuntime)?;
        let (queue, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let shutdown = CancellationToken::new();
        let workers = config.workers.max(1);

        let mut outcomes = MokaCache::builder().max_capacity(MAX_OUTCOMES);
        if !config.outcome_ttl.is_zero() {
            outcomes = outcomes.time_to_live(config.outcome_ttl);
        }

        let inner = Arc::new(Inner {
            cache,
            client,
            locks: NamespaceLocks::new(),
            in_flight: InFlightTable::new(),
            outcomes: outcomes.build(),
            stats: RetrievalStats::new(),
            config,
        });

        let handles = (0..workers)
            .map(|id| {
                let inner = Arc::clone(&inner);
                let receiver = Arc::clone(&receiver);
                let shutdown = shutdown.clone();
                handle.spawn(worker_loop(id, inner, receiver, shutdown))
            })
            .collect();

        info!(
            workers,
            queue_capacity = inner.config.queue_capacity,
            "Retrieval pool started"
        );

        Ok(Self {
            inner,
            queue,
            shutdown,
            workers: Mutex::new(handles),
            handle,
        })
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.inner.cache
    }

    /// Wraps `builder` with the configured proxy rewrite, if any.
    pub fn proxied(&self, builder: Arc<dyn UrlBuilder>) -> Arc<dyn UrlBuilder> {
        match &self.inner.config.proxy {
            Some((from, to)) => Arc::new(ProxiedUrlBuilder::new(builder, from, to)),
            None => builder,
        }
    }

    /// Queues a fetch of `address` unless one is already pending.
    ///
    /// Never blocks and never reports errors; a failed fetch leaves the
    /// address requestable again.
    pub fn request_async(
        &self,
        address: &TileAddress,
        level: &Level,
        source: &TileSource,
    ) -> Submission {
        let inner = &self.inner;
        inner.stats.record_request();

        if level.is_empty() {
            debug!(tile = %address, "Skipping empty level");
            return Submission::EmptyLevel;
        }
        if self.shutdown.is_cancelled() {
            return Submission::Closed;
        }
        if inner.cache.get(address).is_some() {
            inner.stats.record_memory_hit();
            return Submission::Cached;
        }

        match inner.in_flight.claim(address, RequestState::Queued) {
            Claim::Pending(_) => {
                inner.stats.record_dedup();
                debug!(tile = %address, "Request already pending");
                Submission::AlreadyPending
            }
            Claim::Owner => {
                inner.outcomes.invalidate(address);
                let job = Job {
                    address: address.clone(),
                    level: level.clone(),
                    source: source.clone(),
                };
                match self.queue.try_send(job) {
                    Ok(()) => {
                        debug!(tile = %address, "Queued tile request");
                        Submission::Queued
                    }
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        inner.in_flight.release(address);
                        inner.stats.record_rejected();
                        debug!(tile = %address, "Retrieval queue full");
                        Submission::QueueFull
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        inner.in_flight.release(address);
                        Submission::Closed
                    }
                }
            }
        }
    }

    /// Fetches `address` on the calling task, bypassing the queue.
    ///
    /// If a fetch for the same address is already queued or in flight, this
    /// waits for its outcome instead of starting a second one.
    pub async fn request_sync(
        &self,
        address: &TileAddress,
        level: &Level,
        source: &TileSource,
    ) -> Result<Arc<CacheEntry>, RetrievalError> {
        let inner = &self.inner;
        inner.stats.record_request();

        if level.is_empty() {
            return Err(empty_level(address));
        }
        if let Some(entry) = inner.cache.get(address) {
            inner.stats.record_memory_hit();
            return Ok(entry);
        }

        loop {
            match inner.in_flight.claim(address, RequestState::InFlight) {
                Claim::Owner => {
                    inner.outcomes.invalidate(address);
                    let guard = ClaimGuard::new(&inner.in_flight, address);
                    let outcome = inner.fetch(address, level, source).await;
                    inner.record_outcome(address, &outcome);
                    guard.complete(outcome.clone());
                    return outcome;
                }
                Claim::Pending(mut receiver) => {
                    inner.stats.record_dedup();
                    debug!(tile = %address, "Joining pending fetch");
                    match receiver.recv().await {
                        Ok(outcome) => return outcome,
                        // Released without an outcome; claim it ourselves.
                        Err(_) => continue,
                    }
                }
            }
        }
    }

    /// Blocking form of [`request_sync`](Self::request_sync) for callers
    /// outside the runtime.
    ///
    /// Must not be called from a runtime worker thread.
    pub fn request_blocking(
        &self,
        address: &TileAddress,
        level: &Level,
        source: &TileSource,
    ) -> Result<Arc<CacheEntry>, RetrievalError> {
        self.handle.block_on(self.request_sync(address, level, source))
    }

    /// Current lifecycle state of `address`.
    pub fn state(&self, address: &TileAddress) -> RequestState {
        self.inner
            .in_flight
            .state(address)
            .or_else(|| self.inner.outcomes.get(address))
            .unwrap_or(RequestState::NotRequested)
    }

    /// Number of addresses queued or in flight.
    pub fn pending(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Waits until every queued and in-flight request has finished.
    pub async fn wait_idle(&self) {
        self.inner.in_flight.wait_idle().await;
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Stops the workers and drops queued requests.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handles: Vec<_> = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            let _ = handle.await;
        }
        self.inner.in_flight.clear();
        info!("Retrieval pool stopped");
    }
}

impl Drop for RetrievalCoordinator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn worker_loop(
    id: usize,
    inner: Arc<Inner>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    shutdown: CancellationToken,
) {
    debug!(worker = id, "Retrieval worker started");
    loop {
        let job = tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            job = async { receiver.lock().await.recv().await } => job,
        };
        let Some(job) = job else {
            break;
        };

        let Job {
            address,
            level,
            source,
        } = job;
        let guard = ClaimGuard::new(&inner.in_flight, &address);
        inner.in_flight.mark_in_flight(&address);

        let outcome = tokio::select! {
            biased;

            _ = shutdown.cancelled() => Err(RetrievalError::ShuttingDown),

            outcome = inner.fetch(&address, &level, &source) => outcome,
        };
        inner.record_outcome(&address, &outcome);
        guard.complete(outcome);
    }
    debug!(worker = id, "Retrieval worker stopped");
}

fn empty_level(address: &TileAddress) -> RetrievalError {
    RetrievalError::EmptyLevel {
        namespace: address.cache_namespace().to_string(),
        level: address.level(),
    }
}

impl Inner {
    /// Check cache, fetch, post-process, promote.
    async fn fetch(&self, address: &TileAddress, level: &Level, source: &TileSource) -> Outcome {
        if level.is_empty() {
            return Err(empty_level(address));
        }
        if let Some(entry) = self.cache.get(address) {
            self.stats.record_memory_hit();
            return Ok(entry);
        }

        let lock = self.locks.lock_for(address.cache_namespace());
        {
            let _guard = lock.lock().await;
            if let Some(entry) = self.cache.lookup_on_disk(address, level).await {
                self.stats.record_disk_hit();
                return Ok(entry);
            }
            if self.cache.is_known_absent(address, level).await {
                return Err(RetrievalError::Absent(address.to_string()));
            }
        }

        let url = source
            .url_builder
            .build(address, level, source.format_override.as_deref())?;

        self.stats.record_network_fetch();
        debug!(tile = %address, url = %url, "Fetching tile");
        let response = tokio::time::timeout(self.config.timeout, self.client.get(&url))
            .await
            .map_err(|_| FetchError::Timeout(url.clone()))??;

        if response.is_absent() {
            let _guard = lock.lock().await;
            self.cache.mark_absent(address, level).await;
            return Err(RetrievalError::Absent(address.to_string()));
        }
        if !response.is_success() {
            return Err(FetchError::Status {
                status: response.status,
                url,
            }
            .into());
        }

        let payload = self
            .post_process(source, response.body, response.content_type, level)
            .await?;

        let _guard = lock.lock().await;
        let entry = self
            .cache
            .promote(address, level, payload, response.last_modified)
            .await?;
        Ok(entry)
    }

    async fn post_process(
        &self,
        source: &TileSource,
        body: Bytes,
        content_type: Option<String>,
        level: &Level,
    ) -> Result<Bytes, RetrievalError> {
        let processor = Arc::clone(&source.post_processor);
        let level = level.clone();
        let processed = tokio::task::spawn_blocking(move || {
            processor.process(body, content_type.as_deref(), &level)
        })
        .await
        .map_err(|e| CacheError::Task(e.to_string()))??;
        Ok(processed)
    }

    fn record_outcome(&self, address: &TileAddress, outcome: &Outcome) {
        match outcome {
            Ok(_) => {
                self.stats.record_success();
                self.outcomes.insert(address.clone(), RequestState::Succeeded);
            }
            Err(RetrievalError::Absent(_)) => {
                self.stats.record_absent();
                debug!(tile = %address, "Tile absent at origin");
                self.outcomes.insert(address.clone(), RequestState::Failed);
            }
            Err(e) => {
                self.stats.record_failure();
                warn!(
                    namespace = address.cache_namespace(),
                    level = address.level(),
                    row = address.row(),
                    col = address.col(),
                    error = %e,
                    "Tile retrieval failed"
                );
                self.outcomes.insert(address.clone(), RequestState::Failed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::png_bytes;
    use crate::cache::CacheConfig;
    use crate::level::{LevelSet, LevelSetConfig};
    use crate::provider::{HttpResponse, MockHttpClient, TemplateUrlBuilder};
    use crate::tile::TileKey;
    use std::time::Duration;
    use tempfile::TempDir;

    fn levels() -> LevelSet {
        LevelSetConfig::new("bmng", "earth/bmng", "https://tiles.example.com")
            .with_format_suffix("png")
            .with_tile_size(4, 4)
            .with_num_empty_levels(1)
            .build()
            .unwrap()
    }

    fn source() -> TileSource {
        TileSource::new(Arc::new(TemplateUrlBuilder::default()))
    }

    fn coordinator(
        dir: &TempDir,
        client: Arc<MockHttpClient>,
        config: RetrievalConfig,
    ) -> RetrievalCoordinator {
        let cache = Arc::new(CacheStore::new(&CacheConfig::new(dir.path())));
        RetrievalCoordinator::start(cache, client, config).unwrap()
    }

    #[tokio::test]
    async fn test_async_request_populates_cache() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::new(Ok(HttpResponse::ok(png_bytes(4, 4)))));
        let coordinator = coordinator(&dir, Arc::clone(&client), RetrievalConfig::default());
        let levels = levels();
        let level = levels.level(2).unwrap();
        let address: TileAddress = TileKey::for_level(level, 8, 18).into();

        assert_eq!(
            coordinator.request_async(&address, level, &source()),
            Submission::Queued
        );
        coordinator.wait_idle().await;

        assert!(coordinator.cache().get(&address).is_some());
        assert_eq!(coordinator.state(&address), RequestState::Succeeded);
        assert_eq!(client.urls(), vec!["https://tiles.example.com/bmng/2/8/8_18.png"]);
        assert_eq!(
            coordinator.request_async(&address, level, &source()),
            Submission::Cached
        );
    }

    #[tokio::test]
    async fn test_empty_level_never_requested() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::new(Ok(HttpResponse::ok(png_bytes(4, 4)))));
        let coordinator = coordinator(&dir, Arc::clone(&client), RetrievalConfig::default());
        let levels = levels();
        let level = levels.level(0).unwrap();
        let address: TileAddress = TileKey::for_level(level, 0, 0).into();

        assert_eq!(
            coordinator.request_async(&address, level, &source()),
            Submission::EmptyLevel
        );
        assert!(matches!(
            coordinator.request_sync(&address, level, &source()).await,
            Err(RetrievalError::EmptyLevel { level: 0, .. })
        ));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_writes_nothing_and_allows_retry() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::new(Ok(HttpResponse::status(503))));
        let coordinator = coordinator(&dir, Arc::clone(&client), RetrievalConfig::default());
        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 1, 1).into();

        let result = coordinator.request_sync(&address, level, &source()).await;
        assert!(matches!(
            result,
            Err(RetrievalError::Fetch(FetchError::Status { status: 503, .. }))
        ));
        assert_eq!(coordinator.state(&address), RequestState::Failed);
        assert!(coordinator.cache().get(&address).is_none());
        assert_eq!(coordinator.cache().disk().stats().unwrap().files, 0);

        client.set_response(Ok(HttpResponse::ok(png_bytes(4, 4))));
        assert!(coordinator
            .request_sync(&address, level, &source())
            .await
            .is_ok());
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_validation_failure_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::new(Ok(
            HttpResponse::ok(b"<html>oops</html>".to_vec()).with_content_type("text/html")
        )));
        let coordinator = coordinator(&dir, Arc::clone(&client), RetrievalConfig::default());
        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 0, 0).into();

        let result = coordinator.request_sync(&address, level, &source()).await;
        assert!(matches!(result, Err(RetrievalError::Validation(_))));
        assert!(coordinator.cache().get(&address).is_none());
    }

    #[tokio::test]
    async fn test_not_found_marks_absent() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::new(Ok(HttpResponse::status(404))));
        let coordinator = coordinator(&dir, Arc::clone(&client), RetrievalConfig::default());
        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 0, 0).into();

        let first = coordinator.request_sync(&address, level, &source()).await;
        assert!(matches!(first, Err(RetrievalError::Absent(_))));
        let second = coordinator.request_sync(&address, level, &source()).await;
        assert!(matches!(second, Err(RetrievalError::Absent(_))));
        assert_eq!(client.calls(), 1);
        assert_eq!(coordinator.stats().absent, 2);
    }

    #[tokio::test]
    async fn test_disk_hit_skips_network() {
        let dir = TempDir::new().unwrap();
        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 0, 1).into();
        crate::cache::DiskTier::new(dir.path())
            .write(&address, level, &png_bytes(4, 4))
            .unwrap();

        let client = Arc::new(MockHttpClient::new(Ok(HttpResponse::status(500))));
        let coordinator = coordinator(&dir, Arc::clone(&client), RetrievalConfig::default());
        assert!(coordinator
            .request_sync(&address, level, &source())
            .await
            .is_ok());
        assert_eq!(client.calls(), 0);
        assert_eq!(coordinator.stats().disk_hits, 1);
    }

    #[tokio::test]
    async fn test_queue_full_reverts_to_not_requested() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(
            MockHttpClient::new(Ok(HttpResponse::ok(png_bytes(4, 4))))
                .with_delay(Duration::from_millis(200)),
        );
        let coordinator = coordinator(
            &dir,
            Arc::clone(&client),
            RetrievalConfig::default()
                .with_workers(1)
                .with_queue_capacity(1),
        );
        let levels = levels();
        let level = levels.level(3).unwrap();

        let submissions: Vec<_> = (0..4)
            .map(|col| {
                let address: TileAddress = TileKey::for_level(level, 0, col).into();
                coordinator.request_async(&address, level, &source())
            })
            .collect();

        assert_eq!(submissions[0], Submission::Queued);
        assert!(submissions.contains(&Submission::QueueFull));
        let rejected = TileKey::for_level(level, 0, 3).into();
        assert_eq!(coordinator.state(&rejected), RequestState::NotRequested);
        assert!(coordinator.stats().rejected >= 1);
        coordinator.wait_idle().await;
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_requests() {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::new(Ok(HttpResponse::ok(png_bytes(4, 4)))));
        let coordinator = coordinator(&dir, client, RetrievalConfig::default());
        coordinator.shutdown().await;

        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 0, 0).into();
        assert_eq!(
            coordinator.request_async(&address, level, &source()),
            Submission::Closed
        );
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(CacheStore::new(&CacheConfig::new(dir.path())));
        let client = Arc::new(MockHttpClient::new(Ok(HttpResponse::status(200))));
        assert!(matches!(
            RetrievalCoordinator::start(cache, client, RetrievalConfig::default()),
            Err(RetrievalError::NoRuntime)
        ));
    }

    #[test]
    fn test_request_blocking_from_plain_thread() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let dir = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::new(Ok(HttpResponse::ok(png_bytes(4, 4)))));
        let coordinator = {
            let _enter = runtime.enter();
            coordinator(&dir, client, RetrievalConfig::default())
        };
        let levels = levels();
        let level = levels.level(1).unwrap();
        let address: TileAddress = TileKey::for_level(level, 1, 0).into();

        let entry = coordinator
            .request_blocking(&address, level, &source())
            .unwrap();
        assert_eq!(entry.address(), &address);
    }
}
