//! Orchestration layer
//!
//! [`ForecastContext`] holds the long-lived collaborators and is built once;
//! [`ForecastService`] answers current, detailed and regional requests on
//! top of it. Per location the hourly and daily series are fetched
//! concurrently and joined before derivation. Regional requests fan out
//! over all ids, drop failed locations, and return whatever completed
//! before the deadline in caller order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use crate::alerts::AlertEngine;
use crate::cache::TtlCache;
use crate::clock::{Clock, service_date, to_service_time};
use crate::config::MeteoConfig;
use crate::derivation::{
    current_conditions, enrich, merge_daily, normalize_daily, normalize_hourly, select_closest,
};
use crate::fetch::{Fetcher, PendingWrites, RetrySettings};
use crate::geo::GeoCatalog;
use crate::input::{validate_batch, validate_location_id};
use crate::models::{ForecastAggregate, LocationRecord};
use crate::source::{ForecastSource, RawDaily, RawHourly};
use crate::{ForecastError, Result};

/// Tunables of the orchestration layer
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub hourly_ttl: Duration,
    pub daily_ttl: Duration,
    pub retry: RetrySettings,
    pub max_in_flight: usize,
    /// Regional requests return what completed within this time
    pub deadline: Duration,
    /// Longest a request waits for its cache writes before returning
    pub write_timeout: Duration,
    /// Hourly points returned by current and regional views
    pub current_window: chrono::Duration,
    /// Hourly points returned by the detailed view
    pub detailed_window: chrono::Duration,
    /// How far outside the hourly series a target may fall
    pub current_tolerance: chrono::Duration,
    pub batch_limit: usize,
    pub daily_points: usize,
    pub detailed_daily_points: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&MeteoConfig::default())
    }
}

impl From<&MeteoConfig> for ServiceSettings {
    fn from(config: &MeteoConfig) -> Self {
        let orchestration = &config.orchestration;
        Self {
            hourly_ttl: config.cache.hourly_ttl(),
            daily_ttl: config.cache.daily_ttl(),
            retry: RetrySettings {
                max_retries: orchestration.max_retries,
                min_backoff: Duration::from_millis(orchestration.min_backoff_ms),
                max_backoff: Duration::from_millis(orchestration.max_backoff_ms),
            },
            max_in_flight: orchestration.max_in_flight as usize,
            deadline: Duration::from_secs(u64::from(orchestration.request_deadline_seconds)),
            write_timeout: Duration::from_secs(u64::from(orchestration.write_timeout_seconds)),
            current_window: chrono::Duration::hours(i64::from(orchestration.current_window_hours)),
            detailed_window: chrono::Duration::hours(i64::from(orchestration.detailed_window_hours)),
            current_tolerance: chrono::Duration::hours(1),
            batch_limit: orchestration.batch_limit,
            daily_points: 7,
            detailed_daily_points: config.sources.extended_forecast_days as usize,
        }
    }
}

/// Long-lived collaborators shared by every request
pub struct ForecastContext {
    catalog: Arc<dyn GeoCatalog>,
    primary: Arc<dyn ForecastSource>,
    extended: Option<Arc<dyn ForecastSource>>,
    cache: TtlCache,
    clock: Arc<dyn Clock>,
    limiter: Semaphore,
    settings: ServiceSettings,
    engine: AlertEngine,
}

impl ForecastContext {
    pub fn new(
        catalog: Arc<dyn GeoCatalog>,
        primary: Arc<dyn ForecastSource>,
        cache: TtlCache,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            catalog,
            primary,
            extended: None,
            cache,
            clock,
            limiter: Semaphore::new(settings.max_in_flight.max(1)),
            settings,
            engine: AlertEngine::default(),
        }
    }

    /// Longer-horizon, richer source used by detailed requests
    #[must_use]
    pub fn with_extended(mut self, source: Arc<dyn ForecastSource>) -> Self {
        self.extended = Some(source);
        self
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    fn fetcher<'a>(&'a self, pending: &'a PendingWrites) -> Fetcher<'a> {
        Fetcher {
            cache: &self.cache,
            limiter: &self.limiter,
            retry: self.settings.retry,
            hourly_ttl: self.settings.hourly_ttl,
            daily_ttl: self.settings.daily_ttl,
            pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Current,
    Detailed,
}

#[derive(Clone)]
pub struct ForecastService {
    ctx: Arc<ForecastContext>,
}

impl ForecastService {
    #[must_use]
    pub fn new(ctx: Arc<ForecastContext>) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub fn context(&self) -> &ForecastContext {
        &self.ctx
    }

    /// Current conditions, a 24h hourly window and 7 days for one location
    #[instrument(name = "get_current", skip(self))]
    pub async fn get_current(&self, location_id: &str, target: DateTime<Utc>) -> Result<ForecastAggregate> {
        validate_location_id(location_id)?;
        let pending = PendingWrites::new();
        let result = self.forecast(location_id, target, View::Current, &pending).await;
        pending.flush_within(self.ctx.settings.write_timeout).await;
        result
    }

    /// Everything the primary and extended sources know about one location
    #[instrument(name = "get_detailed", skip(self))]
    pub async fn get_detailed(&self, location_id: &str, target: DateTime<Utc>) -> Result<ForecastAggregate> {
        validate_location_id(location_id)?;
        let pending = PendingWrites::new();
        let result = self.forecast(location_id, target, View::Detailed, &pending).await;
        pending.flush_within(self.ctx.settings.write_timeout).await;
        result
    }

    /// Current view for many locations. Failed or unfinished locations are
    /// left out; the rest keep the order of `location_ids`. A repeated id is
    /// fetched once and returned at each of its positions.
    #[instrument(name = "get_regional", skip(self, location_ids), fields(count = location_ids.len()))]
    pub async fn get_regional(
        &self,
        location_ids: &[String],
        target: DateTime<Utc>,
    ) -> Result<Vec<ForecastAggregate>> {
        validate_batch(location_ids, self.ctx.settings.batch_limit)?;

        // slots[i] is the index into `unique` for caller position i
        let mut unique: Vec<&str> = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let slots: Vec<usize> = location_ids
            .iter()
            .map(|id| {
                *seen.entry(id.as_str()).or_insert_with(|| {
                    unique.push(id.as_str());
                    unique.len() - 1
                })
            })
            .collect();

        let pending = PendingWrites::new();
        let deadline = tokio::time::Instant::now() + self.ctx.settings.deadline;

        let mut tasks: FuturesUnordered<_> = unique
            .iter()
            .enumerate()
            .map(|(slot, &id)| {
                let pending = &pending;
                async move {
                    let result = match validate_location_id(id) {
                        Ok(id) => self.forecast(id, target, View::Current, pending).await,
                        Err(err) => Err(err),
                    };
                    (slot, id, result)
                }
            })
            .collect();

        let mut completed: HashMap<usize, ForecastAggregate> = HashMap::with_capacity(unique.len());
        let finished = tokio::time::timeout_at(deadline, async {
            while let Some((slot, id, result)) = tasks.next().await {
                match result {
                    Ok(aggregate) => {
                        completed.insert(slot, aggregate);
                    }
                    Err(err) => warn!("Skipping location {}: {}", id, err),
                }
            }
        })
        .await;

        if finished.is_err() {
            warn!(
                "Regional deadline reached, {} of {} locations complete",
                completed.len(),
                unique.len()
            );
        }
        drop(tasks);
        pending.flush_within(self.ctx.settings.write_timeout).await;

        let aggregates: Vec<ForecastAggregate> = slots
            .iter()
            .filter_map(|slot| completed.get(slot).cloned())
            .collect();
        info!(
            "Regional forecast for {} of {} locations",
            aggregates.len(),
            location_ids.len()
        );
        Ok(aggregates)
    }

    async fn forecast(
        &self,
        location_id: &str,
        target: DateTime<Utc>,
        view: View,
        pending: &PendingWrites,
    ) -> Result<ForecastAggregate> {
        let record = self
            .ctx
            .catalog
            .lookup(location_id)
            .ok_or_else(|| ForecastError::not_found("location", location_id))?;

        let fetcher = self.ctx.fetcher(pending);
        let primary = self.ctx.primary.as_ref();
        let required = async {
            futures::try_join!(fetcher.hourly(primary, &record), fetcher.daily(primary, &record))
        };

        let extended_source = match view {
            View::Detailed => self.ctx.extended.as_deref(),
            View::Current => None,
        };

        let (hourly, daily, extended) = match extended_source {
            Some(source) => {
                let optional = async {
                    futures::try_join!(fetcher.hourly(source, &record), fetcher.daily(source, &record))
                };
                let (required, optional) = futures::join!(required, optional);
                let (hourly, daily) = required?;
                let extended = match optional {
                    Ok(series) => Some(series),
                    Err(err) => {
                        warn!("Extended source unavailable for {}: {}", location_id, err);
                        None
                    }
                };
                (hourly, daily, extended)
            }
            None => {
                let (hourly, daily) = required.await?;
                (hourly, daily, None)
            }
        };

        self.assemble(&record, &hourly, &daily, extended, target, view)
    }

    fn assemble(
        &self,
        record: &LocationRecord,
        hourly: &RawHourly,
        daily: &RawDaily,
        extended: Option<(RawHourly, RawDaily)>,
        target: DateTime<Utc>,
        view: View,
    ) -> Result<ForecastAggregate> {
        let settings = &self.ctx.settings;
        let hourly = normalize_hourly(hourly);
        let mut daily = normalize_daily(daily, record.coordinate);

        let mut current = current_conditions(&hourly, target, settings.current_tolerance)
            .ok_or_else(|| {
                ForecastError::not_found("forecast data", to_service_time(target).to_rfc3339())
            })?;

        let extended_available = extended.is_some();
        if let Some((extended_hourly, extended_daily)) = extended {
            let extended_hourly = normalize_hourly(&extended_hourly);
            if let Some(richer) = select_closest(&extended_hourly, target, settings.current_tolerance) {
                enrich(&mut current, richer);
            }
            let extended_daily = normalize_daily(&extended_daily, record.coordinate);
            daily = merge_daily(daily, &extended_daily, usize::MAX);
        }

        let alerts = self.ctx.engine.evaluate(&hourly, &daily, target);

        let (window, max_days) = match view {
            View::Current => (settings.current_window, settings.daily_points),
            View::Detailed => (settings.detailed_window, settings.detailed_daily_points),
        };
        let today = service_date(target);
        let daily = daily
            .into_iter()
            .filter(|day| day.date >= today)
            .take(max_days)
            .collect();
        let start = target - chrono::Duration::hours(1);
        let end = target + window;
        let hourly = hourly
            .into_iter()
            .filter(|point| point.timestamp > start && point.timestamp < end)
            .collect();

        Ok(ForecastAggregate {
            location_id: record.id.clone(),
            location_name: record.display_name(),
            current,
            daily,
            hourly,
            alerts,
            extended_available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let mut config = MeteoConfig::default();
        config.orchestration.max_backoff_ms = 2_000;
        config.cache.daily_ttl_minutes = 90;

        let settings = ServiceSettings::from(&config);
        assert_eq!(settings.retry.max_backoff, Duration::from_secs(2));
        assert_eq!(settings.daily_ttl, Duration::from_secs(90 * 60));
        assert_eq!(settings.current_window, chrono::Duration::hours(24));
        assert_eq!(settings.detailed_daily_points, 16);
        assert_eq!(settings.deadline, Duration::from_secs(25));
        assert_eq!(settings.write_timeout, Duration::from_secs(5));
    }
}
