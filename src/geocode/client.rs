use crate::features::gps::GeoCoordinate;
use crate::features::location::ResolvedLocation;
use crate::geocode::{CacheKey, GeocodeCache, ReverseGeocode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";

/// Settings for reverse geocoding.
///
/// ```rust
/// # use media_geotagger::GeocodingConfig;
/// # use std::time::Duration;
/// let config = GeocodingConfig::builder()
///     .language("en")
///     .call_delay(Duration::from_millis(1500))
///     .build();
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, bon::Builder)]
pub struct GeocodingConfig {
    /// When `false`, every lookup answers "no location" without touching cache or network.
    #[builder(default = true)]
    pub enabled: bool,
    #[builder(default = NOMINATIM_ENDPOINT.to_string(), into)]
    pub endpoint: String,
    #[builder(default = concat!("media_geotagger/", env!("CARGO_PKG_VERSION")).to_string(), into)]
    pub user_agent: String,
    /// Value of the `accept-language` parameter.
    #[builder(default = "fr,en".to_string(), into)]
    pub language: String,
    /// Nominatim detail level; 10 is city.
    #[builder(default = 10)]
    pub zoom: u8,
    #[builder(default = Duration::from_secs(5))]
    pub timeout: Duration,
    /// Pause after each call to a rate-limited backend.
    #[builder(default = Duration::from_secs(1))]
    pub call_delay: Duration,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Counts lookups against the number of files queued for geocoding.
#[derive(Debug, Default)]
pub struct GeocodeProgress {
    processed: AtomicUsize,
    total: AtomicUsize,
}

impl GeocodeProgress {
    pub fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);
    }

    fn advance(&self) -> (usize, usize) {
        let current = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        (current, self.total.load(Ordering::Relaxed))
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }
}

/// Resolves coordinates through a cache and a backend.
///
/// Backend calls are serialized through a gate that stays held for the call delay, so
/// concurrent callers never exceed one call per delay interval. Cache hits skip the gate.
pub struct GeocodingClient<B> {
    backend: B,
    cache: GeocodeCache,
    gate: Mutex<()>,
    enabled: bool,
    call_delay: Duration,
    progress: GeocodeProgress,
}

impl<B: ReverseGeocode> GeocodingClient<B> {
    pub fn new(backend: B, cache: GeocodeCache, config: &GeocodingConfig) -> Self {
        Self {
            backend,
            cache,
            gate: Mutex::new(()),
            enabled: config.enabled,
            call_delay: config.call_delay,
            progress: GeocodeProgress::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    pub fn progress(&self) -> &GeocodeProgress {
        &self.progress
    }

    /// Returns the place at `coordinate`, or `None` when geocoding is disabled or the
    /// lookup failed. Failures are logged, never returned.
    pub async fn resolve(&self, coordinate: GeoCoordinate) -> Option<ResolvedLocation> {
        if !self.enabled {
            return None;
        }
        let (current, total) = self.progress.advance();
        let key = CacheKey::new(coordinate);

        if let Some(hit) = self.cache.get(&key).await {
            debug!("Geocode cache hit for {key}");
            return Some(hit.at(coordinate));
        }

        let _gate = self.gate.lock().await;
        // Another caller may have filled the cell while we waited.
        if let Some(hit) = self.cache.get(&key).await {
            debug!("Geocode cache hit for {key} after waiting");
            return Some(hit.at(coordinate));
        }

        info!("Geocoding {coordinate} ({current}/{total})");
        let result = self.backend.reverse(coordinate).await;
        let location = match result {
            Ok(location) => {
                self.cache.insert(key, location.clone()).await;
                Some(location)
            }
            Err(err) => {
                warn!("Reverse geocoding {coordinate} failed: {err}");
                None
            }
        };

        if self.backend.is_rate_limited() {
            tokio::time::sleep(self.call_delay).await;
        }
        location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::location::LocationSource;
    use crate::geocode::GeocodeError;
    use std::sync::Arc;
    use tokio::time::Instant;

    struct CountingBackend {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CountingBackend {
        fn new(fail: bool) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: calls.clone(),
                    fail,
                },
                calls,
            )
        }
    }

    impl ReverseGeocode for CountingBackend {
        async fn reverse(
            &self,
            coordinate: GeoCoordinate,
        ) -> Result<ResolvedLocation, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GeocodeError::NoAddress);
            }
            Ok(ResolvedLocation {
                city: Some("Paris".to_string()),
                region: Some("Île-de-France".to_string()),
                country: Some("France".to_string()),
                country_code: Some("FR".to_string()),
                full_address: Some("Paris, Île-de-France, France".to_string()),
                coordinates: coordinate,
                source: LocationSource::GeocodedNow,
            })
        }
    }

    fn coordinate(latitude: f64, longitude: f64) -> GeoCoordinate {
        GeoCoordinate::new(latitude, longitude).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_cell_hits_network_once() {
        let (backend, calls) = CountingBackend::new(false);
        let client =
            GeocodingClient::new(backend, GeocodeCache::new(), &GeocodingConfig::default());

        let start = Instant::now();
        let first = client.resolve(coordinate(48.85661, 2.35222)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(first.city.as_deref(), Some("Paris"));

        let start = Instant::now();
        let second = client.resolve(coordinate(48.85659, 2.35221)).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(second.city, first.city);
        assert_eq!(second.coordinates.latitude(), 48.85659);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_never_calls_backend() {
        let (backend, calls) = CountingBackend::new(false);
        let config = GeocodingConfig::builder().enabled(false).build();
        let cache = GeocodeCache::new();
        let client = GeocodingClient::new(backend, cache.clone(), &config);

        let start = Instant::now();
        assert!(client.resolve(coordinate(48.8566, 2.3522)).await.is_none());
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_not_cached() {
        let (backend, calls) = CountingBackend::new(true);
        let client =
            GeocodingClient::new(backend, GeocodeCache::new(), &GeocodingConfig::default());

        assert!(client.resolve(coordinate(45.764, 4.8357)).await.is_none());
        assert!(client.resolve(coordinate(45.764, 4.8357)).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(client.cache().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_are_spaced() {
        let (backend, calls) = CountingBackend::new(false);
        let client = Arc::new(GeocodingClient::new(
            backend,
            GeocodeCache::new(),
            &GeocodingConfig::default(),
        ));

        let start = Instant::now();
        let handles: Vec<_> = [(48.8566, 2.3522), (45.764, 4.8357), (43.2965, 5.3698)]
            .into_iter()
            .map(|(lat, lon)| {
                let client = client.clone();
                tokio::spawn(async move { client.resolve(coordinate(lat, lon)).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_on_one_cell_share_a_single_call() {
        let (backend, calls) = CountingBackend::new(false);
        let client = Arc::new(GeocodingClient::new(
            backend,
            GeocodeCache::new(),
            &GeocodingConfig::default(),
        ));

        let start = Instant::now();
        let handles: Vec<_> = [
            (48.85661, 2.35222),
            (48.85659, 2.35221),
            (48.8566, 2.3522),
            (48.85655, 2.35215),
        ]
        .into_iter()
        .map(|(lat, lon)| {
            let client = client.clone();
            tokio::spawn(async move { client.resolve(coordinate(lat, lon)).await })
        })
        .collect();
        for handle in handles {
            let location = handle.await.unwrap().expect("resolved from the shared cell");
            assert_eq!(location.city.as_deref(), Some("Paris"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.cache().len().await, 1);
        // Only the one real call is followed by the delay.
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_progress_counts_lookups() {
        let (backend, _) = CountingBackend::new(false);
        let config = GeocodingConfig::builder().call_delay(Duration::ZERO).build();
        let client = GeocodingClient::new(backend, GeocodeCache::new(), &config);
        client.progress().set_total(2);

        client.resolve(coordinate(48.8566, 2.3522)).await;
        client.resolve(coordinate(48.8566, 2.3522)).await;
        assert_eq!(client.progress().processed(), 2);
        assert_eq!(client.progress().total(), 2);
    }
}
