use crate::core::geo::TileCoord;
use image::RgbaImage;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::constants::DEFAULT_CACHE_CAPACITY;

/// A decoded tile bitmap, shared read-only between the cache and draw passes.
pub type TileImage = Arc<RgbaImage>;

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

/// In-memory tile cache using LRU eviction.
///
/// Entries are never mutated once stored; a later insert for the same key
/// replaces the whole image. Clones share the same storage.
#[derive(Debug, Clone)]
pub struct TileCache {
    cache: Arc<Mutex<LruCache<TileCoord, TileImage>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl TileCache {
    /// Create a new tile cache with the given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a new tile cache with default capacity (1024 tiles)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }

    /// Get a tile from the cache, marking it recently used
    pub fn get(&self, coord: &TileCoord) -> Option<TileImage> {
        let found = self.cache.lock().ok()?.get(coord).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Look a tile up without touching recency or statistics
    pub fn peek(&self, coord: &TileCoord) -> Option<TileImage> {
        self.cache.lock().ok()?.peek(coord).cloned()
    }

    /// Insert a tile into the cache
    pub fn insert(&self, coord: TileCoord, image: TileImage) {
        if let Ok(mut cache) = self.cache.lock() {
            if let Some((evicted, _)) = cache.push(coord, image) {
                if evicted != coord {
                    log::trace!("evicted tile {}", evicted);
                }
            }
        }
    }

    /// Check if a tile is in the cache
    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.cache
            .lock()
            .ok()
            .map(|cache| cache.contains(coord))
            .unwrap_or(false)
    }

    /// Remove a tile from the cache
    pub fn remove(&self, coord: &TileCoord) -> Option<TileImage> {
        self.cache.lock().ok()?.pop(coord)
    }

    /// Clear all tiles from the cache
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Get the current number of cached tiles
    pub fn len(&self) -> usize {
        self.cache.lock().ok().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.cache
            .lock()
            .ok()
            .map(|cache| cache.cap().get())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(value: u8) -> TileImage {
        Arc::new(RgbaImage::from_pixel(1, 1, image::Rgba([value, value, value, 255])))
    }

    #[test]
    fn test_tile_cache_basic_operations() {
        let cache = TileCache::new(2);
        let coord1 = TileCoord { x: 1, y: 2, z: 3 };
        let coord2 = TileCoord { x: 4, y: 5, z: 6 };

        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);

        let image1 = tile(1);
        cache.insert(coord1, image1.clone());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&coord1));

        let retrieved = cache.get(&coord1).unwrap();
        assert!(Arc::ptr_eq(&retrieved, &image1));

        cache.insert(coord2, tile(2));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_tile_cache_lru_eviction() {
        let cache = TileCache::new(2);
        let coord1 = TileCoord { x: 1, y: 1, z: 1 };
        let coord2 = TileCoord { x: 2, y: 2, z: 2 };
        let coord3 = TileCoord { x: 3, y: 3, z: 3 };

        cache.insert(coord1, tile(1));
        cache.insert(coord2, tile(2));
        // Touch coord1 so coord2 becomes the eviction candidate
        assert!(cache.get(&coord1).is_some());

        cache.insert(coord3, tile(3));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&coord1));
        assert!(!cache.contains(&coord2)); // Evicted
        assert!(cache.contains(&coord3));
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let cache = TileCache::new(4);
        let coord = TileCoord::new(0, 0, 0);
        assert!(cache.get(&coord).is_none());
        cache.insert(coord, tile(9));
        assert!(cache.get(&coord).is_some());
        assert!(cache.peek(&coord).is_some());

        let stats = cache.stats();
        assert_eq!(stats, CacheStats { hits: 1, misses: 1, size: 1 });
        assert_eq!(cache.capacity(), 4);
    }

    #[test]
    fn test_zero_capacity_still_holds_one_tile() {
        let cache = TileCache::new(0);
        cache.insert(TileCoord::new(0, 0, 0), tile(1));
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.len(), 1);
    }
}
