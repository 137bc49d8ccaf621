//! A layer driven the way a renderer drives it: select tiles for a view,
//! resolve them, and come back to a warm disk cache after a restart.

mod common;

use std::sync::Arc;

use common::{harness, CountingClient};
use tilepyramid::cache::{CacheConfig, CacheStore};
use tilepyramid::coord::Region;
use tilepyramid::layer::{FetchMode, TileLayer, TileStatus};
use tilepyramid::level::{LevelSet, LevelSetConfig};
use tilepyramid::provider::{AsyncHttpClient, TemplateUrlBuilder};
use tilepyramid::retrieval::{RetrievalConfig, RetrievalCoordinator, TileSource};

fn bmng() -> LevelSet {
    LevelSetConfig::new("bmng", "earth/bmng", "https://tiles.example.com")
        .with_num_levels(3)
        .build()
        .unwrap()
}

fn source() -> TileSource {
    TileSource::new(Arc::new(TemplateUrlBuilder::default()))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn view_is_prefetched_then_served_from_memory() {
    let h = harness(CountingClient::new(), RetrievalConfig::default());
    let layer = TileLayer::new("bmng", bmng(), source(), Arc::clone(&h.coordinator));
    let view = Region::from_degrees(-10.0, 10.0, -10.0, 10.0);

    let (level, tiles) = layer.tiles_for_view(&view, 9.0);
    assert_eq!(level.number(), 2);
    let keys: Vec<_> = tiles.collect();
    assert_eq!(keys.len(), 16);
    assert!(keys.iter().all(|k| (8..=11).contains(&k.row())));
    assert!(keys.iter().all(|k| (18..=21).contains(&k.col())));

    let summary = layer.prefetch(&view, 9.0).await;
    assert_eq!(summary.queued, 16);
    layer.wait_idle().await;
    assert_eq!(h.client.calls(), 16);

    for key in &keys {
        let status = layer.resolve(key, FetchMode::Async).await.unwrap();
        assert!(status.is_ready(), "{} not ready", key);
    }
    assert_eq!(h.client.calls(), 16);

    let again = layer.prefetch(&view, 9.0).await;
    assert_eq!(again.cached, 16);
    assert_eq!(again.queued, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_resolve_is_pending_until_fetched() {
    let h = harness(CountingClient::new(), RetrievalConfig::default());
    let levels = bmng();
    let key = levels
        .tile_for_location(0.5, 0.5, levels.level(2).unwrap())
        .unwrap();
    let layer = TileLayer::new("bmng", levels, source(), Arc::clone(&h.coordinator));

    let first = layer.resolve(&key, FetchMode::Async).await.unwrap();
    assert!(matches!(first, TileStatus::Pending | TileStatus::Ready(_)));

    layer.wait_idle().await;
    let second = layer.resolve(&key, FetchMode::Async).await.unwrap();
    let entry = second.entry().unwrap();
    assert_eq!(
        entry.payload().as_ref(),
        b"tile:https://tiles.example.com/bmng/2/10/10_20.jpg"
    );
}

#[tokio::test]
async fn restart_reloads_from_disk_without_network() {
    let h = harness(CountingClient::new(), RetrievalConfig::default());
    let view = Region::from_degrees(-10.0, 10.0, -10.0, 10.0);
    {
        let layer = TileLayer::new("bmng", bmng(), source(), Arc::clone(&h.coordinator));
        layer.prefetch(&view, 9.0).await;
        layer.wait_idle().await;
    }
    h.coordinator.shutdown().await;
    assert_eq!(h.client.calls(), 16);

    // Fresh memory tier over the same directory.
    let client = Arc::new(CountingClient::new());
    let cache = Arc::new(CacheStore::new(&CacheConfig::new(h.dir.path())));
    let coordinator = Arc::new(
        RetrievalCoordinator::start(
            cache,
            Arc::clone(&client) as Arc<dyn AsyncHttpClient>,
            RetrievalConfig::default(),
        )
        .unwrap(),
    );
    let layer = TileLayer::new("bmng", bmng(), source(), Arc::clone(&coordinator));

    let (_, tiles) = layer.tiles_for_view(&view, 9.0);
    for key in tiles {
        let status = layer.resolve(&key, FetchMode::Synchronous).await.unwrap();
        assert!(status.is_ready());
    }

    assert_eq!(client.calls(), 0);
    assert_eq!(coordinator.stats().disk_hits, 16);
}

#[tokio::test]
async fn empty_levels_are_never_fetched() {
    let h = harness(CountingClient::new(), RetrievalConfig::default());
    let levels = LevelSetConfig::new("ned", "earth/ned", "https://tiles.example.com")
        .with_num_levels(4)
        .with_num_empty_levels(2)
        .build()
        .unwrap();
    let layer = TileLayer::new("ned", levels, source(), Arc::clone(&h.coordinator));
    let view = Region::from_degrees(-10.0, 10.0, -10.0, 10.0);

    // 36 degrees would select level 0, which is empty.
    let (level, _) = layer.tiles_for_view(&view, 36.0);
    assert_eq!(level.number(), 2);

    let key = layer
        .levels()
        .tile_for_location(0.0, 0.0, layer.levels().level(0).unwrap())
        .unwrap();
    let status = layer.resolve(&key, FetchMode::Synchronous).await.unwrap();
    assert!(matches!(status, TileStatus::Absent));
    assert_eq!(h.client.calls(), 0);
}
