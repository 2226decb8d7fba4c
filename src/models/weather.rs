//! Normalized weather points produced by the derivation layer

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Proprietary condition code space, ordered by the band it represents.
///
/// The numeric codes are part of the output contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionCode {
    Clear,
    PartlyCloudy,
    Cloudy,
    Overcast,
    Drizzle,
    Rain,
    Storm,
    Fog,
    Haze,
    Snow,
}

impl ConditionCode {
    /// Stable numeric code
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            ConditionCode::Clear => 0,
            ConditionCode::PartlyCloudy => 1,
            ConditionCode::Cloudy => 2,
            ConditionCode::Overcast => 3,
            ConditionCode::Drizzle => 10,
            ConditionCode::Rain => 20,
            ConditionCode::Storm => 30,
            ConditionCode::Fog => 40,
            ConditionCode::Haze => 45,
            ConditionCode::Snow => 50,
        }
    }

    /// Portuguese label shown to end users
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ConditionCode::Clear => "Céu limpo",
            ConditionCode::PartlyCloudy => "Parcialmente nublado",
            ConditionCode::Cloudy => "Nublado",
            ConditionCode::Overcast => "Encoberto",
            ConditionCode::Drizzle => "Garoa",
            ConditionCode::Rain => "Chuva",
            ConditionCode::Storm => "Tempestade",
            ConditionCode::Fog => "Nevoeiro",
            ConditionCode::Haze => "Névoa seca",
            ConditionCode::Snow => "Neve",
        }
    }

    /// Rain, drizzle or storm
    #[must_use]
    pub fn is_precipitation(self) -> bool {
        matches!(
            self,
            ConditionCode::Drizzle | ConditionCode::Rain | ConditionCode::Storm
        )
    }
}

/// One hour of forecast
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HourlyPoint {
    pub timestamp: DateTime<FixedOffset>,
    /// Temperature in Celsius
    pub temperature: f64,
    /// Feels-like temperature in Celsius (provider value when supplied, derived otherwise)
    pub feels_like: f64,
    /// Apparent temperature exactly as supplied by the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apparent_temperature: Option<f64>,
    /// Precipitation volume in mm for this hour
    pub precipitation: f64,
    /// Precipitation probability (0-100)
    pub precipitation_probability: u8,
    /// Relative humidity (0-100)
    pub humidity: u8,
    /// Wind speed in km/h
    pub wind_speed: f64,
    /// Wind direction in degrees (0-360, where 0/360 is North)
    pub wind_direction: u16,
    /// Wind gust speed in km/h
    pub wind_gusts: Option<f64>,
    /// Cloud cover percentage (0-100)
    pub cloud_cover: u8,
    /// Surface pressure in hPa
    pub pressure: Option<f64>,
    /// Visibility in meters
    pub visibility: Option<f64>,
    pub uv_index: Option<f64>,
    pub is_day: Option<bool>,
    /// Composite rain score (0-100)
    pub rain_intensity: u8,
    pub condition: ConditionCode,
}

impl HourlyPoint {
    #[must_use]
    pub fn wind_cardinal(&self) -> &'static str {
        wind_direction_to_cardinal(self.wind_direction)
    }
}

/// One day of forecast
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub temperature_min: f64,
    pub temperature_max: f64,
    /// Total precipitation in mm
    pub precipitation_sum: f64,
    /// Hours with precipitation, when the provider reports it
    pub precipitation_hours: Option<f64>,
    pub precipitation_probability_max: u8,
    /// Maximum wind speed in km/h
    pub wind_speed_max: f64,
    pub wind_gusts_max: Option<f64>,
    pub uv_index_max: Option<f64>,
    pub sunrise: Option<DateTime<FixedOffset>>,
    pub sunset: Option<DateTime<FixedOffset>>,
    pub rain_intensity: u8,
    pub condition: ConditionCode,
}

/// Conditions at the requested instant
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentConditions {
    /// Timestamp of the hourly point the conditions were taken from
    pub timestamp: DateTime<FixedOffset>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub precipitation: f64,
    pub precipitation_probability: u8,
    pub wind_speed: f64,
    pub wind_direction: u16,
    pub wind_gusts: Option<f64>,
    pub cloud_cover: u8,
    pub pressure: Option<f64>,
    pub visibility: Option<f64>,
    pub uv_index: Option<f64>,
    pub is_day: Option<bool>,
    pub rain_intensity: u8,
    pub condition: ConditionCode,
    pub description: String,
    /// Whether `feels_like` came from a provider rather than the local formula
    pub feels_like_provided: bool,
}

impl From<&HourlyPoint> for CurrentConditions {
    fn from(point: &HourlyPoint) -> Self {
        Self {
            timestamp: point.timestamp,
            temperature: point.temperature,
            feels_like: point.feels_like,
            humidity: point.humidity,
            precipitation: point.precipitation,
            precipitation_probability: point.precipitation_probability,
            wind_speed: point.wind_speed,
            wind_direction: point.wind_direction,
            wind_gusts: point.wind_gusts,
            cloud_cover: point.cloud_cover,
            pressure: point.pressure,
            visibility: point.visibility,
            uv_index: point.uv_index,
            is_day: point.is_day,
            rain_intensity: point.rain_intensity,
            condition: point.condition,
            description: point.condition.label().to_string(),
            feels_like_provided: point.apparent_temperature.is_some(),
        }
    }
}

/// Convert wind direction from degrees to cardinal direction
#[must_use]
pub fn wind_direction_to_cardinal(degrees: u16) -> &'static str {
    match degrees {
        0..=11 | 349..=360 => "N",
        12..=33 => "NNE",
        34..=56 => "NE",
        57..=78 => "ENE",
        79..=101 => "E",
        102..=123 => "ESE",
        124..=146 => "SE",
        147..=168 => "SSE",
        169..=191 => "S",
        192..=213 => "SSW",
        214..=236 => "SW",
        237..=258 => "WSW",
        259..=281 => "W",
        282..=303 => "WNW",
        304..=326 => "NW",
        327..=348 => "NNW",
        _ => "Unknown",
    }
}
