//! `OpenMeteo` forecast adapter

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{Column, ForecastSource, RawDaily, RawHourly, SourceError};
use crate::models::Coordinate;

const LEAN_HOURLY: &str = "temperature_2m,relative_humidity_2m,precipitation,precipitation_probability,wind_speed_10m,wind_direction_10m,wind_gusts_10m,cloud_cover,visibility,uv_index,is_day,weather_code";
const RICH_HOURLY: &str = ",apparent_temperature,surface_pressure";
const LEAN_DAILY: &str = "weather_code,temperature_2m_max,temperature_2m_min,precipitation_sum,precipitation_probability_max,wind_speed_10m_max,wind_gusts_10m_max,uv_index_max,sunrise,sunset";
const RICH_DAILY: &str = ",precipitation_hours";

/// How one `OpenMeteo` deployment is queried
#[derive(Debug, Clone)]
pub struct OpenMeteoProfile {
    /// Provider name used in cache keys, e.g. "openmeteo"
    pub name: String,
    pub base_url: String,
    /// Forecast horizon in days (1-16)
    pub forecast_days: u32,
    /// Request apparent temperature, pressure and precipitation hours too
    pub rich_variables: bool,
    pub timeout: Duration,
}

impl OpenMeteoProfile {
    fn hourly_variables(&self) -> String {
        if self.rich_variables {
            format!("{LEAN_HOURLY}{RICH_HOURLY}")
        } else {
            LEAN_HOURLY.to_string()
        }
    }

    fn daily_variables(&self) -> String {
        if self.rich_variables {
            format!("{LEAN_DAILY}{RICH_DAILY}")
        } else {
            LEAN_DAILY.to_string()
        }
    }

    fn url(&self, coordinate: Coordinate, block: &str, variables: &str) -> String {
        format!(
            "{}/forecast?latitude={}&longitude={}&{block}={variables}&timezone=America%2FSao_Paulo&timeformat=unixtime&forecast_days={}",
            self.base_url.trim_end_matches('/'),
            coordinate.latitude,
            coordinate.longitude,
            self.forecast_days
        )
    }
}

pub struct OpenMeteoSource {
    client: Client,
    profile: OpenMeteoProfile,
}

impl OpenMeteoSource {
    pub fn new(profile: OpenMeteoProfile) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(profile.timeout)
            .user_agent(concat!("meteobr/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, profile })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, SourceError> {
        debug!("OpenMeteo request URL: {}", url);
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                SourceError::transient(None, e.to_string())
            } else {
                SourceError::permanent(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::from_status(status.as_u16(), &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::permanent(format!("Failed to parse OpenMeteo response: {e}")))
    }
}

#[async_trait]
impl ForecastSource for OpenMeteoSource {
    fn name(&self) -> &str {
        &self.profile.name
    }

    #[instrument(name = "fetch_hourly", skip(self), fields(provider = %self.profile.name))]
    async fn fetch_hourly(&self, coordinate: Coordinate) -> Result<RawHourly, SourceError> {
        let url = self
            .profile
            .url(coordinate, "hourly", &self.profile.hourly_variables());
        let response: HourlyResponse = self.get_json(url).await?;
        response
            .hourly
            .map(RawHourly::from)
            .ok_or_else(|| SourceError::permanent("OpenMeteo response has no hourly block"))
    }

    #[instrument(name = "fetch_daily", skip(self), fields(provider = %self.profile.name))]
    async fn fetch_daily(&self, coordinate: Coordinate) -> Result<RawDaily, SourceError> {
        let url = self
            .profile
            .url(coordinate, "daily", &self.profile.daily_variables());
        let response: DailyResponse = self.get_json(url).await?;
        response
            .daily
            .map(RawDaily::from)
            .ok_or_else(|| SourceError::permanent("OpenMeteo response has no daily block"))
    }
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    hourly: Option<HourlyData>,
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: Option<DailyData>,
}

/// Hourly weather data from `OpenMeteo`
#[derive(Debug, Deserialize)]
struct HourlyData {
    time: Vec<i64>,
    #[serde(rename = "temperature_2m")]
    temperature: Column,
    #[serde(default)]
    apparent_temperature: Column,
    #[serde(rename = "relative_humidity_2m", default)]
    humidity: Column,
    #[serde(default)]
    precipitation: Column,
    #[serde(default)]
    precipitation_probability: Column,
    #[serde(rename = "wind_speed_10m", default)]
    wind_speed: Column,
    #[serde(rename = "wind_direction_10m", default)]
    wind_direction: Column,
    #[serde(rename = "wind_gusts_10m", default)]
    wind_gusts: Column,
    #[serde(default)]
    cloud_cover: Column,
    #[serde(rename = "surface_pressure", default)]
    pressure: Column,
    #[serde(default)]
    visibility: Column,
    #[serde(default)]
    uv_index: Column,
    #[serde(default)]
    is_day: Column,
    #[serde(default)]
    weather_code: Column,
}

/// Daily weather data from `OpenMeteo`
#[derive(Debug, Deserialize)]
struct DailyData {
    time: Vec<i64>,
    #[serde(rename = "temperature_2m_max")]
    temperature_max: Column,
    #[serde(rename = "temperature_2m_min")]
    temperature_min: Column,
    #[serde(default)]
    precipitation_sum: Column,
    #[serde(default)]
    precipitation_hours: Column,
    #[serde(default)]
    precipitation_probability_max: Column,
    #[serde(rename = "wind_speed_10m_max", default)]
    wind_speed_max: Column,
    #[serde(rename = "wind_gusts_10m_max", default)]
    wind_gusts_max: Column,
    #[serde(default)]
    uv_index_max: Column,
    #[serde(default)]
    sunrise: Option<Vec<Option<i64>>>,
    #[serde(default)]
    sunset: Option<Vec<Option<i64>>>,
    #[serde(default)]
    weather_code: Column,
}

impl From<HourlyData> for RawHourly {
    fn from(data: HourlyData) -> Self {
        Self {
            time: data.time,
            temperature: data.temperature,
            apparent_temperature: data.apparent_temperature,
            humidity: data.humidity,
            precipitation: data.precipitation,
            precipitation_probability: data.precipitation_probability,
            wind_speed: data.wind_speed,
            wind_direction: data.wind_direction,
            wind_gusts: data.wind_gusts,
            cloud_cover: data.cloud_cover,
            pressure: data.pressure,
            visibility: data.visibility,
            uv_index: data.uv_index,
            is_day: data.is_day,
            weather_code: data.weather_code,
        }
    }
}

impl From<DailyData> for RawDaily {
    fn from(data: DailyData) -> Self {
        Self {
            time: data.time,
            temperature_max: data.temperature_max,
            temperature_min: data.temperature_min,
            precipitation_sum: data.precipitation_sum,
            precipitation_hours: data.precipitation_hours,
            precipitation_probability_max: data.precipitation_probability_max,
            wind_speed_max: data.wind_speed_max,
            wind_gusts_max: data.wind_gusts_max,
            uv_index_max: data.uv_index_max,
            sunrise: data.sunrise,
            sunset: data.sunset,
            weather_code: data.weather_code,
        }
    }
}
