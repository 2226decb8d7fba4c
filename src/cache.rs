use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::Keyspace;
use rand::RngExt;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tokio::task;

use crate::clock::{Clock, service_date};
use crate::source::DataClass;

/// Raw key/value store underneath the TTL cache.
///
/// Stores are allowed to evict lazily or never; expiry is enforced by
/// [`TtlCache`] on read.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Persistent store on a fjall keyspace
pub struct FjallStore {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> anyhow::Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl FjallStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let items = db.keyspace("cache", fjall::KeyspaceCreateOptions::default)?;
        Ok(FjallStore { store: items })
    }
}

#[async_trait]
impl CacheStore for FjallStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || get_from_store(store, key)).await?
    }

    // fjall has no native expiry; stale entries are removed when read
    async fn put(&self, key: &str, value: Vec<u8>, _ttl: Duration) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || store.insert(key, value)).await??;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }
}

/// In-process store. Never evicts on its own.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>, _ttl: Duration) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// `{provider}_{data_class}_{location}_{bucket}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub provider: String,
    pub class: DataClass,
    /// Catalog id, or rounded coordinates when the location has no id
    pub location: String,
    /// Service-local date of the fetch, `YYYYMMDD`
    pub bucket: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(provider: &str, class: DataClass, location: &str, now: DateTime<Utc>) -> Self {
        Self {
            provider: provider.to_string(),
            class,
            location: location.to_string(),
            bucket: service_date(now).format("%Y%m%d").to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.provider,
            self.class.as_str(),
            self.location,
            self.bucket
        )
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: i64, // Unix timestamp (seconds)
}

/// TTL cache over a [`CacheStore`].
///
/// Expiry is checked against the injected clock on every read, so an entry
/// the store still holds is a miss once its TTL has passed. Store failures
/// are logged and treated as misses.
#[derive(Clone)]
pub struct TtlCache {
    store: Option<Arc<dyn CacheStore>>,
    clock: Arc<dyn Clock>,
    jitter: f64,
}

impl TtlCache {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, jitter: f64) -> Self {
        Self {
            store: Some(store),
            clock,
            jitter: jitter.clamp(0.0, 0.5),
        }
    }

    /// Cache that always misses
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: None,
            clock,
            jitter: 0.0,
        }
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for misses, expired entries and store failures.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self), fields(key = %key))]
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let store = self.store.as_ref()?;
        let key = key.to_string();

        let bytes = match store.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!("Key not found");
                return None;
            }
            Err(err) => {
                tracing::warn!("Cache store unavailable, treating as miss: {err:#}");
                return None;
            }
        };

        let entry: StoredEntry<T> = match postcard::from_bytes(&bytes) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("Undecodable cache entry, treating as miss: {err}");
                return None;
            }
        };

        if self.clock.now().timestamp() < entry.expires_at {
            tracing::debug!("Key found and still fresh");
            Some(entry.value)
        } else {
            tracing::debug!("Key found but expired");
            if let Err(err) = store.remove(&key).await {
                tracing::warn!("Failed to remove expired cache entry: {err:#}");
            }
            None
        }
    }

    /// Stores a serializable value with a time-to-live (TTL).
    /// Failures are logged and swallowed.
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value), fields(key = %key))]
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        let ttl = self.jittered(ttl);
        let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = self.clock.now().timestamp().saturating_add(ttl_seconds);
        let entry = StoredEntry { value, expires_at };

        let bytes = match postcard::to_stdvec(&entry) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!("Failed to encode cache entry: {err}");
                return;
            }
        };

        if let Err(err) = store.put(&key.to_string(), bytes, ttl).await {
            tracing::warn!("Cache store rejected write: {err:#}");
        }
    }

    fn jittered(&self, ttl: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return ttl;
        }
        let factor: f64 = rand::rng().random_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        ttl.mul_f64(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(anyhow::anyhow!("connection refused"))
        }
        async fn put(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
            Err(anyhow::anyhow!("connection refused"))
        }
        async fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap()
    }

    fn key(now: DateTime<Utc>) -> CacheKey {
        CacheKey::new("openmeteo", DataClass::Hourly, "3550308", now)
    }

    #[test]
    fn test_key_format() {
        assert_eq!(key(start()).to_string(), "openmeteo_hourly_3550308_20240601");
        let late = Utc.with_ymd_and_hms(2024, 6, 2, 2, 0, 0).unwrap();
        // still June 1st in Brasilia
        assert_eq!(key(late).bucket, "20240601");
    }

    #[tokio::test]
    async fn test_logical_expiry_beats_store_retention() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = Arc::new(MemoryStore::new());
        let cache = TtlCache::new(store.clone(), clock.clone(), 0.0);
        let k = key(start());

        cache.put(&k, &vec![1u8, 2, 3], Duration::from_secs(3600)).await;
        clock.advance(chrono::Duration::minutes(59));
        assert_eq!(cache.get::<Vec<u8>>(&k).await, Some(vec![1, 2, 3]));

        clock.advance(chrono::Duration::minutes(2));
        assert!(store.contains(&k.to_string()).await);
        assert_eq!(cache.get::<Vec<u8>>(&k).await, None);
    }

    #[tokio::test]
    async fn test_broken_store_fails_open() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = TtlCache::new(Arc::new(BrokenStore), clock, 0.0);
        let k = key(start());
        cache.put(&k, &"value".to_string(), Duration::from_secs(60)).await;
        assert_eq!(cache.get::<String>(&k).await, None);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = Arc::new(MemoryStore::new());
        let k = key(start());
        store
            .put(&k.to_string(), vec![0xff, 0xff, 0xff], Duration::from_secs(60))
            .await
            .unwrap();
        let cache = TtlCache::new(store, clock, 0.0);
        assert_eq!(cache.get::<Vec<String>>(&k).await, None);
    }

    #[tokio::test]
    async fn test_jitter_keeps_expiry_within_bounds() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = Arc::new(MemoryStore::new());
        let cache = TtlCache::new(store.clone(), clock, 0.2);
        let ttl = Duration::from_secs(3600);

        let mut offsets = Vec::new();
        for n in 0u32..200 {
            let k = CacheKey::new("openmeteo", DataClass::Hourly, &n.to_string(), start());
            cache.put(&k, &n, ttl).await;
            let bytes = store.get(&k.to_string()).await.unwrap().unwrap();
            let entry: StoredEntry<u32> = postcard::from_bytes(&bytes).unwrap();
            offsets.push(entry.expires_at - start().timestamp());
        }

        // whole seconds, so the lower bound may truncate by one
        assert!(offsets.iter().all(|s| (2879..=4320).contains(s)), "{offsets:?}");
        let min = offsets.iter().min().unwrap();
        let max = offsets.iter().max().unwrap();
        assert!(max - min > 60);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = TtlCache::disabled(clock);
        let k = key(start());
        cache.put(&k, &1u32, Duration::from_secs(60)).await;
        assert_eq!(cache.get::<u32>(&k).await, None);
    }

    #[tokio::test]
    async fn test_fjall_store_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();
        store
            .put("k", b"payload".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"payload".to_vec()));
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
