use crate::features::gps::GeoCoordinate;
use crate::features::location::ResolvedLocation;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Coordinates formatted to 3 decimals, a cell of roughly 110 m.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(coordinate: GeoCoordinate) -> Self {
        Self(format!(
            "{:.3},{:.3}",
            coordinate.latitude(),
            coordinate.longitude()
        ))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// In-memory cache of resolved locations, shared by handle.
///
/// Entries live as long as the cache; there is no eviction.
#[derive(Debug, Clone, Default)]
pub struct GeocodeCache {
    entries: Arc<Mutex<HashMap<CacheKey, ResolvedLocation>>>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<ResolvedLocation> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn insert(&self, key: CacheKey, location: ResolvedLocation) {
        self.entries.lock().await.insert(key, location);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
