//! Raw provider series → normalized points

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use sunrise::{Coordinates, SolarDay, SolarEvent};
use tracing::debug;

use super::condition::{ConditionInputs, classify, from_wmo, resolve};
use super::formulas::{daily_rain_intensity, feels_like, rain_intensity};
use crate::clock::{from_unix, to_service_time};
use crate::models::{ConditionCode, Coordinate, DailyPoint, HourlyPoint};
use crate::source::{Column, RawDaily, RawHourly, value_at};

/// Normalize an hourly series.
///
/// Points without a timestamp or temperature are dropped; the result is
/// sorted by timestamp with duplicates removed.
#[must_use]
pub fn normalize_hourly(raw: &RawHourly) -> Vec<HourlyPoint> {
    let mut points: BTreeMap<i64, HourlyPoint> = BTreeMap::new();

    for (idx, &seconds) in raw.time.iter().enumerate() {
        let (Some(timestamp), Some(temperature)) =
            (from_unix(seconds), value_at(&raw.temperature, idx))
        else {
            continue;
        };

        let humidity = percent(value_at(&raw.humidity, idx));
        let precipitation = non_negative(value_at(&raw.precipitation, idx));
        let precipitation_probability = percent(value_at(&raw.precipitation_probability, idx));
        let wind_speed = non_negative(value_at(&raw.wind_speed, idx));
        let cloud_cover = percent(value_at(&raw.cloud_cover, idx));
        let visibility = value_at(&raw.visibility, idx);
        let apparent_temperature = value_at(&raw.apparent_temperature, idx);

        let intensity = rain_intensity(precipitation, f64::from(precipitation_probability));
        let derived = classify(&ConditionInputs {
            rain_intensity: intensity,
            wind_speed,
            visibility,
            temperature,
            precipitation,
            cloud_cover,
        });
        let provided = wmo_at(&raw.weather_code, idx);

        points.entry(seconds).or_insert(HourlyPoint {
            timestamp,
            temperature,
            feels_like: apparent_temperature
                .unwrap_or_else(|| feels_like(temperature, f64::from(humidity), wind_speed)),
            apparent_temperature,
            precipitation,
            precipitation_probability,
            humidity,
            wind_speed,
            wind_direction: direction(value_at(&raw.wind_direction, idx)),
            wind_gusts: value_at(&raw.wind_gusts, idx),
            cloud_cover,
            pressure: value_at(&raw.pressure, idx),
            visibility,
            uv_index: value_at(&raw.uv_index, idx),
            is_day: value_at(&raw.is_day, idx).map(|v| v >= 0.5),
            rain_intensity: intensity,
            condition: resolve(provided, derived),
        });
    }

    let dropped = raw.time.len().saturating_sub(points.len());
    if dropped > 0 {
        debug!("Dropped {} unusable hourly rows", dropped);
    }
    points.into_values().collect()
}

/// Normalize a daily series; missing sunrise/sunset are computed for `coordinate`
#[must_use]
pub fn normalize_daily(raw: &RawDaily, coordinate: Coordinate) -> Vec<DailyPoint> {
    let mut days: BTreeMap<NaiveDate, DailyPoint> = BTreeMap::new();

    for (idx, &seconds) in raw.time.iter().enumerate() {
        let Some(date) = from_unix(seconds).map(|ts| ts.date_naive()) else {
            continue;
        };
        let (Some(temperature_min), Some(temperature_max)) = (
            value_at(&raw.temperature_min, idx),
            value_at(&raw.temperature_max, idx),
        ) else {
            continue;
        };

        let precipitation_sum = non_negative(value_at(&raw.precipitation_sum, idx));
        let precipitation_hours = value_at(&raw.precipitation_hours, idx);
        let precipitation_probability_max =
            percent(value_at(&raw.precipitation_probability_max, idx));
        let wind_speed_max = non_negative(value_at(&raw.wind_speed_max, idx));

        let intensity = daily_rain_intensity(
            precipitation_sum,
            precipitation_hours,
            f64::from(precipitation_probability_max),
        );
        // days carry no cloud or visibility data; the provider code fills that in
        let derived = classify(&ConditionInputs {
            rain_intensity: intensity,
            wind_speed: wind_speed_max,
            visibility: None,
            temperature: (temperature_min + temperature_max) / 2.0,
            precipitation: precipitation_sum,
            cloud_cover: 0,
        });

        let (solar_rise, solar_set) = solar_times(coordinate, date);

        days.entry(date).or_insert(DailyPoint {
            date,
            temperature_min,
            temperature_max,
            precipitation_sum,
            precipitation_hours,
            precipitation_probability_max,
            wind_speed_max,
            wind_gusts_max: value_at(&raw.wind_gusts_max, idx),
            uv_index_max: value_at(&raw.uv_index_max, idx),
            sunrise: instant_at(raw.sunrise.as_ref(), idx).or(solar_rise),
            sunset: instant_at(raw.sunset.as_ref(), idx).or(solar_set),
            rain_intensity: intensity,
            condition: resolve(wmo_at(&raw.weather_code, idx), derived),
        });
    }

    days.into_values().collect()
}

/// Extend `primary` with the days only `extended` covers, up to `max_days`
#[must_use]
pub fn merge_daily(primary: Vec<DailyPoint>, extended: &[DailyPoint], max_days: usize) -> Vec<DailyPoint> {
    let mut merged: BTreeMap<NaiveDate, DailyPoint> =
        primary.into_iter().map(|day| (day.date, day)).collect();
    for day in extended {
        merged.entry(day.date).or_insert_with(|| day.clone());
    }
    merged.into_values().take(max_days).collect()
}

/// Sunrise and sunset for a date, if the sun rises at all there
fn solar_times(
    coordinate: Coordinate,
    date: NaiveDate,
) -> (Option<DateTime<FixedOffset>>, Option<DateTime<FixedOffset>>) {
    let Some(coordinates) = Coordinates::new(coordinate.latitude, coordinate.longitude) else {
        return (None, None);
    };
    let solar_day = SolarDay::new(coordinates, date);
    (
        solar_day.event_time(SolarEvent::Sunrise).map(to_service_time),
        solar_day.event_time(SolarEvent::Sunset).map(to_service_time),
    )
}

fn instant_at(column: Option<&Vec<Option<i64>>>, idx: usize) -> Option<DateTime<FixedOffset>> {
    column
        .and_then(|values| values.get(idx).copied().flatten())
        .and_then(from_unix)
}

fn wmo_at(column: &Column, idx: usize) -> Option<ConditionCode> {
    value_at(column, idx)
        .filter(|v| (0.0..=f64::from(u16::MAX)).contains(v))
        .and_then(|v| from_wmo(v as u16))
}

fn percent(value: Option<f64>) -> u8 {
    value.map_or(0, |v| v.clamp(0.0, 100.0).round() as u8)
}

fn non_negative(value: Option<f64>) -> f64 {
    value.map_or(0.0, |v| v.max(0.0))
}

fn direction(value: Option<f64>) -> u16 {
    value.map_or(0, |v| v.round().rem_euclid(360.0) as u16)
}
