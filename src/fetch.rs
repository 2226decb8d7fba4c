//! Cache-then-fetch with bounded retries
//!
//! A fetch checks the TTL cache first. On a miss the upstream call runs
//! under a limiter permit and is retried with exponential backoff while it
//! fails transiently; the permit is released during backoff sleeps. A
//! successful result is written back by a detached task that the request
//! awaits through [`PendingWrites::flush`] before returning.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use futures::future::join_all;
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{RetryDecision, RetryPolicy};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{CacheKey, TtlCache};
use crate::models::LocationRecord;
use crate::source::{DataClass, ForecastSource, RawDaily, RawHourly, SourceError};
use crate::{ForecastError, Result};

/// Retry bounds for upstream calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetrySettings {
    #[must_use]
    pub fn policy(&self) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .retry_bounds(self.min_backoff, self.max_backoff.max(self.min_backoff))
            .build_with_max_retries(self.max_retries)
    }
}

/// Cache writes spawned during one request
#[derive(Debug, Default)]
pub struct PendingWrites {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl PendingWrites {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(write);
        if let Ok(mut handles) = self.handles.lock() {
            handles.push(handle);
        }
    }

    /// Wait for every write spawned so far
    pub async fn flush(&self) {
        let handles = match self.handles.lock() {
            Ok(mut handles) => std::mem::take(&mut *handles),
            Err(_) => return,
        };
        if handles.is_empty() {
            return;
        }
        let count = handles.len();
        for result in join_all(handles).await {
            if let Err(err) = result {
                warn!("Cache write task failed: {err}");
            }
        }
        debug!("Flushed {} cache writes", count);
    }

    /// [`flush`](Self::flush), giving up after `limit`. Writes still
    /// running keep going in the background.
    pub async fn flush_within(&self, limit: Duration) {
        if tokio::time::timeout(limit, self.flush()).await.is_err() {
            warn!("Cache writes did not finish within {:?}, detaching them", limit);
        }
    }
}

/// Shared pieces a fetch needs
pub struct Fetcher<'a> {
    pub cache: &'a TtlCache,
    pub limiter: &'a Semaphore,
    pub retry: RetrySettings,
    pub hourly_ttl: Duration,
    pub daily_ttl: Duration,
    pub pending: &'a PendingWrites,
}

impl Fetcher<'_> {
    pub async fn hourly(&self, source: &dyn ForecastSource, location: &LocationRecord) -> Result<RawHourly> {
        self.cached(source.name(), DataClass::Hourly, location, || {
            source.fetch_hourly(location.coordinate)
        })
        .await
    }

    pub async fn daily(&self, source: &dyn ForecastSource, location: &LocationRecord) -> Result<RawDaily> {
        self.cached(source.name(), DataClass::Daily, location, || {
            source.fetch_daily(location.coordinate)
        })
        .await
    }

    async fn cached<T, F, Fut>(
        &self,
        provider: &str,
        class: DataClass,
        location: &LocationRecord,
        call: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, SourceError>>,
    {
        let key = CacheKey::new(provider, class, &location_key(location), self.cache.now());
        if let Some(hit) = self.cache.get::<T>(&key).await {
            debug!("Cache hit for {}", key);
            return Ok(hit);
        }

        let value = with_retry(&self.retry.policy(), self.limiter, provider, call).await?;

        let ttl = match class {
            DataClass::Hourly => self.hourly_ttl,
            DataClass::Daily => self.daily_ttl,
        };
        let cache = self.cache.clone();
        let stored = value.clone();
        self.pending.spawn(async move {
            cache.put(&key, &stored, ttl).await;
        });

        Ok(value)
    }
}

/// Catalog id, or rounded coordinates for locations without one
#[must_use]
pub fn location_key(location: &LocationRecord) -> String {
    if location.id.is_empty() {
        location.coordinate.cache_key_part()
    } else {
        location.id.clone()
    }
}

/// Run `call` until it succeeds, fails permanently or the policy gives up.
///
/// A limiter permit is held only for the duration of each attempt.
pub async fn with_retry<T, F, Fut>(
    policy: &ExponentialBackoff,
    limiter: &Semaphore,
    provider: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, SourceError>>,
{
    let started = SystemTime::now();
    let mut attempts: u32 = 0;

    loop {
        let outcome = {
            let _permit = limiter
                .acquire()
                .await
                .map_err(|_| ForecastError::upstream_permanent(provider, "request limiter closed"))?;
            call().await
        };
        attempts += 1;

        match outcome {
            Ok(value) => return Ok(value),
            Err(SourceError::Permanent { message }) => {
                warn!("{} failed permanently: {}", provider, message);
                return Err(ForecastError::upstream_permanent(provider, message));
            }
            Err(err @ SourceError::Transient { .. }) => {
                match policy.should_retry(started, attempts - 1) {
                    RetryDecision::Retry { execute_after } => {
                        let wait = execute_after
                            .duration_since(SystemTime::now())
                            .unwrap_or_default();
                        warn!(
                            "{} attempt {} failed ({}), retrying in {:?}",
                            provider, attempts, err, wait
                        );
                        tokio::time::sleep(wait).await;
                    }
                    RetryDecision::DoNotRetry => {
                        warn!("{} gave up after {} attempts: {}", provider, attempts, err);
                        return Err(ForecastError::upstream_transient(
                            provider,
                            attempts,
                            err.to_string(),
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> ExponentialBackoff {
        RetrySettings {
            max_retries: 3,
            min_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        }
        .policy()
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let calls = AtomicU32::new(0);
        let limiter = Semaphore::new(1);
        let result = with_retry(&fast(), &limiter, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(SourceError::from_status(429, "slow down"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_permanent_is_not_retried() {
        let calls = AtomicU32::new(0);
        let limiter = Semaphore::new(1);
        let result: Result<()> = with_retry(&fast(), &limiter, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::from_status(400, "bad request")) }
        })
        .await;
        assert!(matches!(result, Err(ForecastError::UpstreamPermanent { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts() {
        let calls = AtomicU32::new(0);
        let limiter = Semaphore::new(1);
        let result: Result<()> = with_retry(&fast(), &limiter, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::from_status(503, "unavailable")) }
        })
        .await;
        match result {
            Err(ForecastError::UpstreamTransient { attempts, .. }) => assert_eq!(attempts, 4),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_pending_writes_flush() {
        let pending = PendingWrites::new();
        let done = std::sync::Arc::new(AtomicU32::new(0));
        for _ in 0..3 {
            let done = done.clone();
            pending.spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        pending.flush().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_flush_within_bounds_a_hung_write() {
        let pending = PendingWrites::new();
        pending.spawn(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let started = tokio::time::Instant::now();
        pending.flush_within(Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
