//! Time source and service-local time helpers
//!
//! Every timestamp leaving the crate is rendered in the civil offset of
//! America/Sao_Paulo, rounded down to whole seconds.

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Time zone rendered in every output timestamp
pub const SERVICE_TZ: Tz = chrono_tz::America::Sao_Paulo;

/// Source of "now". Injected so cache expiry and alert horizons are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// Convert an instant to the service offset, dropping sub-second precision
#[must_use]
pub fn to_service_time(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    let truncated = instant.with_nanosecond(0).unwrap_or(instant);
    truncated.with_timezone(&SERVICE_TZ).fixed_offset()
}

/// Service-local instant for a unix timestamp in seconds
#[must_use]
pub fn from_unix(seconds: i64) -> Option<DateTime<FixedOffset>> {
    DateTime::<Utc>::from_timestamp(seconds, 0).map(to_service_time)
}

/// Calendar date of an instant in the service time zone
#[must_use]
pub fn service_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&SERVICE_TZ).date_naive()
}

/// First instant of a service-local calendar date
#[must_use]
pub fn local_midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    let naive = date.and_time(NaiveTime::MIN);
    match SERVICE_TZ.from_local_datetime(&naive).earliest() {
        Some(local) => local.fixed_offset(),
        // historic DST transitions in Brazil skipped local midnight
        None => SERVICE_TZ
            .from_utc_datetime(&(naive + Duration::hours(3)))
            .fixed_offset(),
    }
}
