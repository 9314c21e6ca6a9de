use super::cache::{TileCache, TileImage};
use super::source::TileSource;
use super::transport::HttpTransport;
use crate::core::constants::{DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_MAX_CONCURRENT_FETCHES};
use crate::core::geo::TileCoord;
use crate::prelude::HashMap;
use crate::TileError;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;

type TileResult = std::result::Result<TileImage, TileError>;
type SharedFetch = Shared<BoxFuture<'static, TileResult>>;

/// Configuration for the tile loader
#[derive(Debug, Clone, PartialEq)]
pub struct TileLoaderConfig {
    /// Maximum concurrent tile downloads
    pub max_concurrent: usize,
    /// Upper bound on a single download, surfaced as [`TileError::Timeout`]
    pub fetch_timeout: Duration,
}

impl Default for TileLoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT_FETCHES,
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
        }
    }
}

impl TileLoaderConfig {
    pub fn for_testing() -> Self {
        Self {
            max_concurrent: 4,
            fetch_timeout: Duration::from_millis(500),
        }
    }
}

/// Resolves tile coordinates to decoded images.
///
/// Cache hits return immediately. Misses start one download task per key;
/// concurrent resolves of a key that is still downloading await the same
/// task instead of issuing another request. Downloads run on the tokio
/// runtime, so a fetch outlives the draw pass that started it and still
/// lands in the cache. Cloning the loader is cheap and shares all state.
#[derive(Clone)]
pub struct TileLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    source: Arc<dyn TileSource>,
    transport: Arc<dyn HttpTransport>,
    cache: TileCache,
    in_flight: Mutex<HashMap<TileCoord, SharedFetch>>,
    permits: Arc<Semaphore>,
    config: TileLoaderConfig,
}

impl TileLoader {
    pub fn new(
        source: Arc<dyn TileSource>,
        transport: Arc<dyn HttpTransport>,
        cache: TileCache,
        config: TileLoaderConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            inner: Arc::new(LoaderInner {
                source,
                transport,
                cache,
                in_flight: Mutex::new(HashMap::default()),
                permits,
                config,
            }),
        }
    }

    pub fn cache(&self) -> &TileCache {
        &self.inner.cache
    }

    pub fn config(&self) -> &TileLoaderConfig {
        &self.inner.config
    }

    /// Number of downloads currently running or queued for a permit.
    pub fn pending_count(&self) -> usize {
        self.inner.lock_in_flight().len()
    }

    pub fn is_pending(&self, coord: &TileCoord) -> bool {
        self.inner.lock_in_flight().contains_key(coord)
    }

    /// Resolve a tile, from cache or network.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn resolve(&self, coord: TileCoord) -> TileResult {
        if !coord.is_valid() {
            return Err(TileError::OutOfRange(coord));
        }
        if let Some(image) = self.inner.cache.get(&coord) {
            log::debug!("cache hit for tile {}", coord);
            return Ok(image);
        }
        self.join_or_start(coord).await
    }

    fn join_or_start(&self, coord: TileCoord) -> SharedFetch {
        let mut in_flight = self.inner.lock_in_flight();

        // A download may have finished between the cache miss and taking the lock.
        if let Some(image) = self.inner.cache.peek(&coord) {
            return futures::future::ready(Ok(image)).boxed().shared();
        }
        if let Some(fetch) = in_flight.get(&coord) {
            log::debug!("joining in-flight download for tile {}", coord);
            return fetch.clone();
        }

        log::debug!("cache miss for tile {}, starting download", coord);
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.fetch(coord).await });
        let fetch = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(TileError::Task(e.to_string())),
            }
        }
        .boxed()
        .shared();

        in_flight.insert(coord, fetch.clone());
        fetch
    }
}

impl std::fmt::Debug for TileLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLoader")
            .field("cache", &self.inner.cache)
            .field("pending", &self.pending_count())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl LoaderInner {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<TileCoord, SharedFetch>> {
        // The map holds no invariants a panicking holder could break.
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(&self, coord: TileCoord) -> TileResult {
        // Declared first so it drops last: after the cache insert, and also
        // when the download panics.
        let _entry = InFlightEntry { loader: self, coord };
        let result = self.download(coord).await;
        match &result {
            Ok(image) => self.cache.insert(coord, Arc::clone(image)),
            Err(e) => log::warn!("tile {} unavailable: {}", coord, e),
        }
        result
    }

    async fn download(&self, coord: TileCoord) -> TileResult {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| TileError::Task(e.to_string()))?;

        let url = self.source.url(coord);
        let timeout = self.config.fetch_timeout;
        let bytes = tokio::time::timeout(timeout, self.transport.get(&url))
            .await
            .map_err(|_| TileError::Timeout(timeout))??;
        log::debug!("downloaded tile {} ({} bytes)", coord, bytes.len());

        let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| TileError::Task(e.to_string()))?
            .map_err(|e| TileError::Decode(e.to_string()))?;
        Ok(Arc::new(image.to_rgba8()))
    }
}

/// Clears a key's in-flight entry when its download task ends, however it ends.
///
/// A resolve that misses the entry is then guaranteed to find the image in
/// the cache, or to start a fresh download.
struct InFlightEntry<'a> {
    loader: &'a LoaderInner,
    coord: TileCoord,
}

impl Drop for InFlightEntry<'_> {
    fn drop(&mut self) {
        self.loader.lock_in_flight().remove(&self.coord);
    }
}
