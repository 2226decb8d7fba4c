//! Forecast source adapters
//!
//! A source turns a coordinate into raw, provider-neutral hourly and daily
//! series. Raw series are what the cache stores; normalization into
//! [`HourlyPoint`](crate::models::HourlyPoint)s happens afterwards in the
//! derivation layer so cached payloads stay provider-shaped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Coordinate;

pub mod open_meteo;

pub use open_meteo::{OpenMeteoProfile, OpenMeteoSource};

/// Column of optional numeric values, indexed like the series' `time` column
pub type Column = Option<Vec<Option<f64>>>;

/// Read one value from a column, treating gaps and non-finite values as missing
#[must_use]
pub fn value_at(column: &Column, index: usize) -> Option<f64> {
    column
        .as_ref()
        .and_then(|values| values.get(index).copied().flatten())
        .filter(|v| v.is_finite())
}

/// Hourly series as delivered by a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHourly {
    /// Unix timestamps (seconds) of each hour
    pub time: Vec<i64>,
    pub temperature: Column,
    pub apparent_temperature: Column,
    pub humidity: Column,
    /// mm in the hour
    pub precipitation: Column,
    pub precipitation_probability: Column,
    /// km/h
    pub wind_speed: Column,
    pub wind_direction: Column,
    pub wind_gusts: Column,
    pub cloud_cover: Column,
    /// hPa
    pub pressure: Column,
    /// meters
    pub visibility: Column,
    pub uv_index: Column,
    /// 1 for daylight, 0 for night
    pub is_day: Column,
    /// WMO weather interpretation code
    pub weather_code: Column,
}

/// Daily series as delivered by a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDaily {
    /// Unix timestamps (seconds) of local midnight of each day
    pub time: Vec<i64>,
    pub temperature_max: Column,
    pub temperature_min: Column,
    pub precipitation_sum: Column,
    pub precipitation_hours: Column,
    pub precipitation_probability_max: Column,
    pub wind_speed_max: Column,
    pub wind_gusts_max: Column,
    pub uv_index_max: Column,
    /// Unix timestamps (seconds)
    pub sunrise: Option<Vec<Option<i64>>>,
    pub sunset: Option<Vec<Option<i64>>>,
    pub weather_code: Column,
}

/// Failure of a single upstream call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Rate limited or unavailable; worth retrying after a backoff
    #[error("transient upstream failure{}: {message}", status_suffix(.status))]
    Transient {
        status: Option<u16>,
        message: String,
    },

    /// Malformed response or rejected request; retrying will not help
    #[error("permanent upstream failure: {message}")]
    Permanent { message: String },
}

impl SourceError {
    pub fn transient<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        Self::Transient {
            status,
            message: message.into(),
        }
    }

    pub fn permanent<S: Into<String>>(message: S) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    /// Classify an HTTP status. Only 429 and 503 are retryable.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let snippet: String = body.chars().take(200).collect();
        match status {
            429 | 503 => Self::transient(Some(status), snippet),
            _ => Self::permanent(format!("HTTP {status}: {snippet}")),
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Data class of a fetch; selects the cache TTL and key segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataClass {
    Hourly,
    Daily,
}

impl DataClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DataClass::Hourly => "hourly",
            DataClass::Daily => "daily",
        }
    }
}

/// Uniform interface over upstream forecast providers
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Provider name, used in cache keys and error messages
    fn name(&self) -> &str;

    async fn fetch_hourly(&self, coordinate: Coordinate) -> Result<RawHourly, SourceError>;

    async fn fetch_daily(&self, coordinate: Coordinate) -> Result<RawDaily, SourceError>;
}
