//! Geocode result cache.
//!
//! Entries are keyed by a SHA-256 digest of `(provider, address)` and are
//! write-once: the first stored outcome for a key wins. Negative results
//! (`None`) are stored too, so an address the provider cannot resolve is
//! not retried on every run.
//!
//! Two backends:
//! * [`MemoryCache`] — process lifetime, with JSON `save`/`load` for hosts
//!   that recycle processes between sessions.
//! * [`SqliteCache`] — one durable table, created if absent.

use crate::error::YutaiError;
use crate::output::Coordinate;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Outcome of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheLookup {
    /// A coordinate was stored for this key.
    Hit(Coordinate),
    /// The key was queried before and the provider had no answer.
    KnownAbsent,
    /// Never queried.
    Miss,
}

/// One persisted cache row. `lat`/`lng` are `None` for negative results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub timestamp: i64,
}

impl CacheEntry {
    fn lookup(&self) -> CacheLookup {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => CacheLookup::Hit(Coordinate { lat, lng }),
            _ => CacheLookup::KnownAbsent,
        }
    }
}

/// Deterministic key for a `(provider, address)` pair: hex SHA-256 over the
/// provider name, a unit separator and the raw address.
pub fn cache_key(provider: &str, address: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider.as_bytes());
    hasher.update([0x1f]);
    hasher.update(address.as_bytes());
    hex::encode(hasher.finalize())
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Shared geocode cache. Implementations synchronise internally so one
/// instance can be handed to every worker.
#[async_trait]
pub trait GeocodeCache: Send + Sync {
    async fn lookup(&self, provider: &str, address: &str) -> Result<CacheLookup, YutaiError>;

    /// Record the outcome for `(provider, address)`. A second store for the
    /// same key is ignored.
    async fn store(
        &self,
        provider: &str,
        address: &str,
        coord: Option<Coordinate>,
    ) -> Result<(), YutaiError>;
}

// ── In-memory backend ────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries, sorted by key.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self
            .entries
            .lock()
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Merge entries into the cache; existing keys are kept.
    pub fn restore(&self, entries: Vec<CacheEntry>) -> Result<(), YutaiError> {
        let mut map = self
            .entries
            .lock()
            .map_err(|_| YutaiError::Cache("memory cache lock poisoned".into()))?;
        for e in entries {
            map.entry(e.key.clone()).or_insert(e);
        }
        Ok(())
    }

    /// Write a JSON snapshot atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), YutaiError> {
        let json = serde_json::to_vec_pretty(&self.snapshot())
            .map_err(|e| YutaiError::Internal(format!("serialising cache: {e}")))?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let write_err = |source| YutaiError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&json).map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    /// Load a snapshot written by [`MemoryCache::save`].
    pub fn load(path: &Path) -> Result<Self, YutaiError> {
        let bytes = std::fs::read(path).map_err(|e| YutaiError::Cache(format!(
            "reading cache snapshot {}: {e}",
            path.display()
        )))?;
        let entries: Vec<CacheEntry> = serde_json::from_slice(&bytes)
            .map_err(|e| YutaiError::Cache(format!("parsing cache snapshot: {e}")))?;
        let cache = Self::new();
        cache.restore(entries)?;
        Ok(cache)
    }
}

#[async_trait]
impl GeocodeCache for MemoryCache {
    async fn lookup(&self, provider: &str, address: &str) -> Result<CacheLookup, YutaiError> {
        let key = cache_key(provider, address);
        let map = self
            .entries
            .lock()
            .map_err(|_| YutaiError::Cache("memory cache lock poisoned".into()))?;
        Ok(map.get(&key).map_or(CacheLookup::Miss, CacheEntry::lookup))
    }

    async fn store(
        &self,
        provider: &str,
        address: &str,
        coord: Option<Coordinate>,
    ) -> Result<(), YutaiError> {
        let key = cache_key(provider, address);
        let mut map = self
            .entries
            .lock()
            .map_err(|_| YutaiError::Cache("memory cache lock poisoned".into()))?;
        map.entry(key.clone()).or_insert(CacheEntry {
            key,
            lat: coord.map(|c| c.lat),
            lng: coord.map(|c| c.lng),
            timestamp: now_unix(),
        });
        Ok(())
    }
}

// ── SQLite backend ───────────────────────────────────────────────────────

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS geocode_cache (
    key TEXT PRIMARY KEY,
    lat REAL,
    lng REAL,
    ts  INTEGER NOT NULL
)";

pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Open (or create) the cache database at `path`.
    pub async fn open(path: &Path) -> Result<Self, YutaiError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, creating the table if needed.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, YutaiError> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        debug!("geocode cache table ready");
        Ok(Self { pool })
    }

    pub async fn entry_count(&self) -> Result<i64, YutaiError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM geocode_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

#[async_trait]
impl GeocodeCache for SqliteCache {
    async fn lookup(&self, provider: &str, address: &str) -> Result<CacheLookup, YutaiError> {
        let key = cache_key(provider, address);
        let row: Option<(Option<f64>, Option<f64>)> =
            sqlx::query_as("SELECT lat, lng FROM geocode_cache WHERE key = ?")
                .bind(&key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(match row {
            None => CacheLookup::Miss,
            Some((Some(lat), Some(lng))) => CacheLookup::Hit(Coordinate { lat, lng }),
            Some(_) => CacheLookup::KnownAbsent,
        })
    }

    async fn store(
        &self,
        provider: &str,
        address: &str,
        coord: Option<Coordinate>,
    ) -> Result<(), YutaiError> {
        sqlx::query("INSERT OR IGNORE INTO geocode_cache (key, lat, lng, ts) VALUES (?, ?, ?, ?)")
            .bind(cache_key(provider, address))
            .bind(coord.map(|c| c.lat))
            .bind(coord.map(|c| c.lng))
            .bind(now_unix())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_deterministic_and_provider_scoped() {
        let a = cache_key("nominatim", "東京都渋谷区渋谷2-1-1");
        assert_eq!(a, cache_key("nominatim", "東京都渋谷区渋谷2-1-1"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, cache_key("google", "東京都渋谷区渋谷2-1-1"));
        assert_ne!(a, cache_key("nominatim", "東京都渋谷区渋谷2-1-1 "));
        // The separator keeps ("ab","c") and ("a","bc") apart.
        assert_ne!(cache_key("ab", "c"), cache_key("a", "bc"));
    }

    #[tokio::test]
    async fn memory_hit_absent_miss() {
        let cache = MemoryCache::new();
        let c = Coordinate::new(35.658, 139.701);
        cache.store("nominatim", "渋谷", Some(c)).await.expect("store");
        cache.store("nominatim", "不明", None).await.expect("store");

        assert_eq!(cache.lookup("nominatim", "渋谷").await.expect("lookup"), CacheLookup::Hit(c));
        assert_eq!(
            cache.lookup("nominatim", "不明").await.expect("lookup"),
            CacheLookup::KnownAbsent
        );
        assert_eq!(cache.lookup("nominatim", "新宿").await.expect("lookup"), CacheLookup::Miss);
        assert_eq!(cache.lookup("google", "渋谷").await.expect("lookup"), CacheLookup::Miss);
    }

    #[tokio::test]
    async fn entries_are_write_once() {
        let cache = MemoryCache::new();
        cache.store("p", "a", None).await.expect("store");
        cache
            .store("p", "a", Some(Coordinate::new(1.0, 2.0)))
            .await
            .expect("store");
        assert_eq!(cache.lookup("p", "a").await.expect("lookup"), CacheLookup::KnownAbsent);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn memory_snapshot_round_trips_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");
        let cache = MemoryCache::new();
        cache
            .store("nominatim", "渋谷", Some(Coordinate::new(35.6, 139.7)))
            .await
            .expect("store");
        cache.store("nominatim", "不明", None).await.expect("store");
        cache.save(&path).expect("save");

        let restored = MemoryCache::load(&path).expect("load");
        assert_eq!(restored.snapshot(), cache.snapshot());
        assert_eq!(
            restored.lookup("nominatim", "不明").await.expect("lookup"),
            CacheLookup::KnownAbsent
        );
    }

    #[tokio::test]
    async fn sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("geocode.db");
        let c = Coordinate::new(34.702, 135.495);
        {
            let cache = SqliteCache::open(&path).await.expect("open");
            cache.store("nominatim", "梅田", Some(c)).await.expect("store");
            cache.store("nominatim", "不明", None).await.expect("store");
            cache.store("nominatim", "不明", Some(c)).await.expect("store");
            assert_eq!(cache.entry_count().await.expect("count"), 2);
        }
        let reopened = SqliteCache::open(&path).await.expect("reopen");
        assert_eq!(reopened.lookup("nominatim", "梅田").await.expect("lookup"), CacheLookup::Hit(c));
        assert_eq!(
            reopened.lookup("nominatim", "不明").await.expect("lookup"),
            CacheLookup::KnownAbsent
        );
        assert_eq!(reopened.lookup("nominatim", "新宿").await.expect("lookup"), CacheLookup::Miss);
    }
}
