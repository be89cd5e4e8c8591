//! Address → coordinate resolution.
//!
//! ```text
//! geocode_records ──▶ unique addresses ──buffer_unordered(ceiling)──▶ resolve
//!                                                                      │
//!                  cache.lookup ──Hit/KnownAbsent──▶ done              │
//!                        │ Miss                                         │
//!                        ▼                                              │
//!        fallback::candidates (free provider) or [literal] (paid)       │
//!                        │   each attempt: limiter.acquire + timeout    │
//!                        ▼                                              │
//!                  cache.store(outcome, including None) ◀───────────────┘
//! ```
//!
//! Provider failures (transport, timeout, bad status, malformed body) are
//! logged and treated as "no coordinate" for that attempt. They never abort a
//! bulk run.

pub mod cache;
pub mod fallback;
pub mod google;
pub mod limiter;
pub mod nominatim;

pub use cache::{cache_key, CacheEntry, CacheLookup, GeocodeCache, MemoryCache, SqliteCache};
pub use limiter::RateLimiter;

use crate::config::{CacheBackend, GeocodeConfig, ProviderKind};
use crate::error::{GeocodeError, YutaiError};
use crate::output::{Coordinate, GeocodeStats, StoreRecord};
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Capability class of a provider; drives the limiter defaults and whether
/// progressive fallback is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    FreeUnauthenticated,
    PaidAuthenticated,
}

impl Capability {
    pub fn of(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Nominatim => Capability::FreeUnauthenticated,
            ProviderKind::Google => Capability::PaidAuthenticated,
        }
    }

    pub fn default_concurrency(&self) -> usize {
        match self {
            Capability::FreeUnauthenticated => 3,
            Capability::PaidAuthenticated => 10,
        }
    }

    /// Aggregate spacing between request starts.
    pub fn default_min_interval(&self) -> Duration {
        match self {
            Capability::FreeUnauthenticated => Duration::from_millis(1100),
            Capability::PaidAuthenticated => Duration::from_millis(100),
        }
    }

    /// The free provider is weak on detailed addresses, so failed lookups
    /// are retried with coarser forms of the same address.
    pub fn uses_progressive_fallback(&self) -> bool {
        matches!(self, Capability::FreeUnauthenticated)
    }
}

/// An external geocoding service.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// Stable name, also part of the cache key.
    fn name(&self) -> &str;

    fn capability(&self) -> Capability;

    /// Best single match for `query`, `Ok(None)` when the service has none.
    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError>;
}

/// How a single address was answered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub coordinate: Option<Coordinate>,
    /// `true` when the cache answered (positively or negatively).
    pub from_cache: bool,
}

/// Cache + limiter + provider, constructed once per run and shared by all
/// workers.
pub struct Geocoder {
    provider: Arc<dyn GeocodeProvider>,
    cache: Arc<dyn GeocodeCache>,
    limiter: RateLimiter,
    request_timeout: Duration,
    progress: Option<ProgressCallback>,
}

impl Geocoder {
    /// Assemble a geocoder from explicit parts.
    pub fn new(
        provider: Arc<dyn GeocodeProvider>,
        cache: Arc<dyn GeocodeCache>,
        limiter: RateLimiter,
        request_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            limiter,
            request_timeout,
            progress: None,
        }
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    /// Build the provider, cache backend and limiter described by `config`.
    pub async fn from_config(config: &GeocodeConfig) -> Result<Self, YutaiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| YutaiError::Internal(format!("building HTTP client: {e}")))?;

        let base_url = config.base_url.as_deref();
        let provider: Arc<dyn GeocodeProvider> = match config.provider {
            ProviderKind::Nominatim => Arc::new(nominatim::NominatimProvider::new(
                client,
                base_url,
                &config.user_agent,
            )),
            ProviderKind::Google => {
                let key = config.api_key.as_deref().ok_or_else(|| {
                    YutaiError::ProviderNotConfigured {
                        provider: "google".into(),
                        hint: "Set GOOGLE_MAPS_API_KEY or pass --api-key.".into(),
                    }
                })?;
                Arc::new(google::GoogleProvider::new(client, base_url, key))
            }
        };

        let cache: Arc<dyn GeocodeCache> = match &config.cache {
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
            CacheBackend::Sqlite(path) => Arc::new(SqliteCache::open(path).await?),
        };

        let limiter = RateLimiter::new(
            config.effective_concurrency(),
            config.effective_min_interval(),
        );
        info!(
            "Geocoding with {} (ceiling {}, spacing {:?})",
            provider.name(),
            limiter.ceiling(),
            limiter.min_interval()
        );

        let mut geocoder = Self::new(provider, cache, limiter, config.request_timeout());
        geocoder.progress = config.progress_callback.clone();
        Ok(geocoder)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// One provider request under the limiter and the per-request timeout.
    async fn attempt(&self, query: &str) -> Option<Coordinate> {
        let _permit = match self.limiter.acquire().await {
            Ok(p) => p,
            Err(e) => {
                warn!("geocode '{}': {}", query, e);
                return None;
            }
        };
        let outcome = match tokio::time::timeout(self.request_timeout, self.provider.geocode(query))
            .await
        {
            Ok(r) => r,
            Err(_) => Err(GeocodeError::Timeout {
                secs: self.request_timeout.as_secs(),
            }),
        };
        match outcome {
            Ok(coord) => coord,
            Err(e) => {
                warn!("geocode '{}' via {}: {}", query, self.provider.name(), e);
                None
            }
        }
    }

    /// Query the provider, walking the fallback chain for free providers.
    async fn fetch(&self, address: &str) -> Option<Coordinate> {
        let queries = if self.provider.capability().uses_progressive_fallback() {
            fallback::candidates(address)
        } else {
            vec![address.trim().to_string()]
        };
        for (step, query) in queries.iter().enumerate() {
            if let Some(coord) = self.attempt(query).await {
                if step > 0 {
                    debug!("'{}' resolved at fallback step {} as '{}'", address, step, query);
                }
                return Some(coord);
            }
        }
        None
    }

    /// Cache namespace for free-text place queries. Kept apart from the
    /// address namespace, whose entries hold fallback-chain outcomes.
    fn place_namespace(&self) -> String {
        format!("{}:place", self.provider.name())
    }

    async fn cached(&self, namespace: &str, address: &str) -> Option<Option<Coordinate>> {
        match self.cache.lookup(namespace, address).await {
            Ok(CacheLookup::Hit(c)) => Some(Some(c)),
            Ok(CacheLookup::KnownAbsent) => Some(None),
            Ok(CacheLookup::Miss) => None,
            Err(e) => {
                warn!("cache lookup failed for '{}': {}", address, e);
                None
            }
        }
    }

    async fn remember(&self, namespace: &str, address: &str, coord: Option<Coordinate>) {
        if let Err(e) = self.cache.store(namespace, address, coord).await {
            warn!("cache store failed for '{}': {}", address, e);
        }
    }

    /// Resolve one address through the cache and, on a miss, the provider.
    ///
    /// The final outcome of the whole chain is cached under the original
    /// address, negative results included.
    pub async fn resolve_detailed(&self, address: &str) -> Resolution {
        if let Some(coordinate) = self.cached(self.provider.name(), address).await {
            return Resolution {
                coordinate,
                from_cache: true,
            };
        }
        let coordinate = self.fetch(address).await;
        self.remember(self.provider.name(), address, coordinate).await;
        Resolution {
            coordinate,
            from_cache: false,
        }
    }

    /// Coordinate for `address`, or `None` when nothing matched.
    pub async fn resolve(&self, address: &str) -> Option<Coordinate> {
        self.resolve_detailed(address).await.coordinate
    }

    /// Resolve a free-text place ("渋谷", "新宿駅", an address) for a
    /// current-location query: the literal text, then with a station
    /// suffix, then with a country suffix.
    pub async fn resolve_place(&self, place: &str) -> Option<Coordinate> {
        let place = place.trim();
        if place.is_empty() {
            return None;
        }
        let mut queries = vec![place.to_string()];
        if !place.ends_with('駅') {
            queries.push(format!("{place}駅"));
        }
        queries.push(format!("{place} 日本"));

        let namespace = self.place_namespace();
        for query in &queries {
            if let Some(coord) = self.cached(&namespace, query).await {
                match coord {
                    Some(c) => return Some(c),
                    None => continue,
                }
            }
            let coord = self.attempt(query).await;
            self.remember(&namespace, query, coord).await;
            if coord.is_some() {
                return coord;
            }
        }
        None
    }

    /// Attach coordinates to every record.
    ///
    /// Each distinct address is resolved once, at most `ceiling` at a time;
    /// results are assigned back by address identity once all have finished.
    pub async fn geocode_records(&self, records: &mut [StoreRecord]) -> GeocodeStats {
        let unique: Vec<String> = {
            let mut seen = HashSet::new();
            records
                .iter()
                .filter(|r| seen.insert(r.address.as_str()))
                .map(|r| r.address.clone())
                .collect()
        };

        if let Some(cb) = &self.progress {
            cb.on_geocode_start(unique.len());
        }
        info!(
            "Geocoding {} unique addresses for {} records",
            unique.len(),
            records.len()
        );

        let results: Vec<(String, Resolution)> = stream::iter(unique)
            .map(|address| async move {
                let resolution = self.resolve_detailed(&address).await;
                if let Some(cb) = &self.progress {
                    cb.on_address_resolved(&address, resolution.coordinate.is_some());
                }
                (address, resolution)
            })
            .buffer_unordered(self.limiter.ceiling())
            .collect()
            .await;

        let mut stats = GeocodeStats {
            unique_addresses: results.len(),
            ..Default::default()
        };
        let mut by_address: HashMap<String, Option<Coordinate>> =
            HashMap::with_capacity(results.len());
        for (address, resolution) in results {
            if resolution.from_cache {
                stats.cache_hits += 1;
            } else {
                stats.fetched += 1;
            }
            if resolution.coordinate.is_some() {
                stats.resolved += 1;
            } else {
                stats.unresolved += 1;
            }
            by_address.insert(address, resolution.coordinate);
        }

        for record in records.iter_mut() {
            let coord = by_address.get(&record.address).copied().flatten();
            if coord.is_some() {
                stats.records_located += 1;
            }
            record.set_coordinate(coord);
        }

        if let Some(cb) = &self.progress {
            cb.on_geocode_complete(stats.resolved, stats.unresolved);
        }
        info!(
            "Geocoding done: {} resolved, {} unresolved, {} from cache",
            stats.resolved, stats.unresolved, stats.cache_hits
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Answers only the queries it was given, recording every call.
    struct ScriptedProvider {
        answers: HashMap<String, Coordinate>,
        calls: Mutex<Vec<String>>,
        capability: Capability,
    }

    impl ScriptedProvider {
        fn new(capability: Capability, answers: &[(&str, Coordinate)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(q, c)| (q.to_string(), *c))
                    .collect(),
                calls: Mutex::new(Vec::new()),
                capability,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl GeocodeProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn capability(&self) -> Capability {
            self.capability
        }

        async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
            self.calls.lock().expect("lock").push(query.to_string());
            Ok(self.answers.get(query).copied())
        }
    }

    fn geocoder(provider: Arc<ScriptedProvider>) -> Geocoder {
        Geocoder::new(
            provider,
            Arc::new(MemoryCache::new()),
            RateLimiter::new(3, Duration::ZERO),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn capability_defaults() {
        assert_eq!(Capability::FreeUnauthenticated.default_concurrency(), 3);
        assert_eq!(Capability::PaidAuthenticated.default_concurrency(), 10);
        assert!(Capability::FreeUnauthenticated.uses_progressive_fallback());
        assert!(!Capability::PaidAuthenticated.uses_progressive_fallback());
    }

    #[tokio::test]
    async fn paid_provider_does_not_shorten() {
        let ward = Coordinate::new(35.66, 139.70);
        let provider = Arc::new(ScriptedProvider::new(
            Capability::PaidAuthenticated,
            &[("東京都渋谷区", ward)],
        ));
        let g = geocoder(provider.clone());
        assert_eq!(g.resolve("東京都渋谷区渋谷2-1-1 ABCビル3F").await, None);
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn place_tries_station_then_country_suffix() {
        let station = Coordinate::new(35.69, 139.70);
        let provider = Arc::new(ScriptedProvider::new(
            Capability::FreeUnauthenticated,
            &[("新宿駅", station)],
        ));
        let g = geocoder(provider.clone());
        assert_eq!(g.resolve_place(" 新宿 ").await, Some(station));
        assert_eq!(provider.calls(), vec!["新宿", "新宿駅"]);
        assert_eq!(g.resolve_place("").await, None);
    }

    #[tokio::test]
    async fn place_with_station_suffix_skips_station_step() {
        let provider = Arc::new(ScriptedProvider::new(Capability::FreeUnauthenticated, &[]));
        let g = geocoder(provider.clone());
        assert_eq!(g.resolve_place("渋谷駅").await, None);
        assert_eq!(provider.calls(), vec!["渋谷駅", "渋谷駅 日本"]);
    }

    #[tokio::test]
    async fn place_lookup_does_not_shadow_address_fallback() {
        let ward = Coordinate::new(35.66, 139.70);
        let provider = Arc::new(ScriptedProvider::new(
            Capability::FreeUnauthenticated,
            &[("東京都渋谷区", ward)],
        ));
        let g = geocoder(provider.clone());
        let address = "東京都渋谷区渋谷2-1-1 ABCビル3F";

        assert_eq!(g.resolve_place(address).await, None);
        assert_eq!(g.resolve(address).await, Some(ward));
        // The address namespace now answers; the place entry stays negative.
        assert!(g.resolve_detailed(address).await.from_cache);
        assert_eq!(g.resolve_place(address).await, None);
        assert_eq!(provider.calls().len(), 3 + 4);
    }

    #[tokio::test]
    async fn shared_addresses_resolve_once() {
        let c = Coordinate::new(35.0, 139.0);
        let provider = Arc::new(ScriptedProvider::new(
            Capability::PaidAuthenticated,
            &[("東京都新宿区西新宿1-1-1", c)],
        ));
        let g = geocoder(provider.clone());
        let mut records = vec![
            StoreRecord::new("A", "新宿店", "東京都新宿区西新宿1-1-1"),
            StoreRecord::new("B", "新宿西口店", "東京都新宿区西新宿1-1-1"),
            StoreRecord::new("A", "謎店", "不明町1"),
        ];
        let stats = g.geocode_records(&mut records).await;
        assert_eq!(stats.unique_addresses, 2);
        assert_eq!(stats.records_located, 2);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(records[1].coordinate(), Some(c));
        assert_eq!(records[2].coordinate(), None);
        assert_eq!(provider.calls().len(), 2);
    }
}
