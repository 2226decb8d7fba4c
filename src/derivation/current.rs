//! Current conditions at a requested instant

use chrono::{DateTime, Duration, Utc};

use crate::models::{CurrentConditions, HourlyPoint};

/// Closest point to `target` by absolute time delta, ties resolving to the
/// earlier point.
///
/// Returns `None` for an empty series or when `target` lies more than
/// `tolerance` before the first or after the last point.
#[must_use]
pub fn select_closest(
    points: &[HourlyPoint],
    target: DateTime<Utc>,
    tolerance: Duration,
) -> Option<&HourlyPoint> {
    let first = points.iter().map(|p| p.timestamp).min()?;
    let last = points.iter().map(|p| p.timestamp).max()?;
    if target < first - tolerance || target > last + tolerance {
        return None;
    }

    let mut best: Option<&HourlyPoint> = None;
    for point in points {
        let delta = (point.timestamp.with_timezone(&Utc) - target).abs();
        let better = match best {
            None => true,
            Some(current) => {
                let best_delta = (current.timestamp.with_timezone(&Utc) - target).abs();
                delta < best_delta || (delta == best_delta && point.timestamp < current.timestamp)
            }
        };
        if better {
            best = Some(point);
        }
    }
    best
}

/// Fill gaps in `current` from a point of a richer series.
///
/// Present values are kept; a derived feels-like is replaced only by a
/// provider-supplied apparent temperature.
pub fn enrich(current: &mut CurrentConditions, richer: &HourlyPoint) {
    current.pressure = current.pressure.or(richer.pressure);
    current.visibility = current.visibility.or(richer.visibility);
    current.uv_index = current.uv_index.or(richer.uv_index);
    current.is_day = current.is_day.or(richer.is_day);
    current.wind_gusts = current.wind_gusts.or(richer.wind_gusts);

    if !current.feels_like_provided {
        if let Some(apparent) = richer.apparent_temperature {
            current.feels_like = apparent;
            current.feels_like_provided = true;
        }
    }
}

#[must_use]
pub fn current_conditions(
    points: &[HourlyPoint],
    target: DateTime<Utc>,
    tolerance: Duration,
) -> Option<CurrentConditions> {
    select_closest(points, target, tolerance).map(CurrentConditions::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SERVICE_TZ;
    use crate::models::ConditionCode;
    use chrono::{FixedOffset, TimeZone, Timelike};

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        SERVICE_TZ
            .with_ymd_and_hms(2024, 3, 5, hour, minute, 0)
            .unwrap()
            .fixed_offset()
    }

    fn point(hour: u32) -> HourlyPoint {
        HourlyPoint {
            timestamp: at(hour, 0),
            temperature: 20.0 + f64::from(hour),
            feels_like: 20.0 + f64::from(hour),
            apparent_temperature: None,
            precipitation: 0.0,
            precipitation_probability: 0,
            humidity: 50,
            wind_speed: 10.0,
            wind_direction: 90,
            wind_gusts: None,
            cloud_cover: 0,
            pressure: None,
            visibility: None,
            uv_index: None,
            is_day: None,
            rain_intensity: 0,
            condition: ConditionCode::Clear,
        }
    }

    fn utc(hour: u32, minute: u32) -> DateTime<Utc> {
        at(hour, minute).with_timezone(&Utc)
    }

    #[test]
    fn test_closest_point_wins() {
        let points = vec![point(12), point(15), point(18)];
        let selected = select_closest(&points, utc(14, 30), Duration::hours(1)).unwrap();
        assert_eq!(selected.timestamp.hour(), 15);
    }

    #[test]
    fn test_tie_resolves_to_earlier() {
        let points = vec![point(12), point(15), point(18)];
        let selected = select_closest(&points, utc(13, 30), Duration::hours(1)).unwrap();
        assert_eq!(selected.timestamp.hour(), 12);
    }

    #[test]
    fn test_outside_span_is_none() {
        let points = vec![point(12), point(15)];
        assert!(select_closest(&points, utc(16, 30), Duration::hours(1)).is_none());
        assert!(select_closest(&points, utc(10, 59), Duration::hours(1)).is_none());
        assert!(select_closest(&points, utc(16, 0), Duration::hours(1)).is_some());
        assert!(select_closest(&[], utc(12, 0), Duration::hours(1)).is_none());
    }

    #[test]
    fn test_enrich_fills_only_gaps() {
        let mut base = point(12);
        base.pressure = Some(1012.0);
        let mut current = CurrentConditions::from(&base);

        let mut rich = point(12);
        rich.pressure = Some(990.0);
        rich.visibility = Some(8_000.0);
        rich.uv_index = Some(7.5);
        rich.apparent_temperature = Some(35.0);

        enrich(&mut current, &rich);
        assert_eq!(current.pressure, Some(1012.0));
        assert_eq!(current.visibility, Some(8_000.0));
        assert_eq!(current.uv_index, Some(7.5));
        assert_eq!(current.feels_like, 35.0);
        assert!(current.feels_like_provided);
    }

    #[test]
    fn test_enrich_keeps_provided_feels_like() {
        let mut base = point(12);
        base.apparent_temperature = Some(31.0);
        base.feels_like = 31.0;
        let mut current = CurrentConditions::from(&base);

        let mut rich = point(12);
        rich.apparent_temperature = Some(35.0);
        enrich(&mut current, &rich);
        assert_eq!(current.feels_like, 31.0);
    }
}
