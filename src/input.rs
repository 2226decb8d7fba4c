//! Request input validation, applied before any I/O

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::clock::SERVICE_TZ;
use crate::{ForecastError, Result};

/// Regional requests accept at most this many ids
pub const MAX_BATCH: usize = 100;
pub const MAX_RADIUS_KM: f64 = 200.0;
const MAX_PAST_DAYS: i64 = 1;
const MAX_FUTURE_DAYS: i64 = 16;

/// IBGE municipality codes are exactly seven digits
pub fn validate_location_id(id: &str) -> Result<&str> {
    if id.len() == 7 && id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(id)
    } else {
        Err(ForecastError::invalid_input(
            "location_id",
            id,
            "a 7-digit IBGE municipality code",
        ))
    }
}

/// Check the size of a regional batch: 1..=`limit` ids.
///
/// Individual ids are validated per location so one bad id only drops itself.
pub fn validate_batch<S: AsRef<str>>(ids: &[S], limit: usize) -> Result<()> {
    if ids.is_empty() || ids.len() > limit {
        return Err(ForecastError::invalid_input(
            "location_ids",
            format!("{} ids", ids.len()),
            format!("between 1 and {limit} ids"),
        ));
    }
    Ok(())
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ForecastError::invalid_input("date", value, "YYYY-MM-DD"))
}

pub fn parse_time(value: &str) -> Result<NaiveTime> {
    // %H:%M alone would accept "9:5"
    if value.len() != 5 {
        return Err(ForecastError::invalid_input("time", value, "HH:MM between 00:00 and 23:59"));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| ForecastError::invalid_input("time", value, "HH:MM between 00:00 and 23:59"))
}

pub fn validate_radius(radius_km: f64) -> Result<f64> {
    if radius_km.is_finite() && radius_km > 0.0 && radius_km <= MAX_RADIUS_KM {
        Ok(radius_km)
    } else {
        Err(ForecastError::invalid_input(
            "radius",
            radius_km.to_string(),
            format!("a value in (0, {MAX_RADIUS_KM}] km"),
        ))
    }
}

/// Build the request instant from optional service-local date and time.
///
/// Missing date means today, missing time means the current time of day.
/// The result must fall within one day back and sixteen days ahead of `now`.
pub fn resolve_target(date: Option<&str>, time: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if date.is_none() && time.is_none() {
        return Ok(now);
    }

    let local_now = now.with_timezone(&SERVICE_TZ);
    let date = date.map(parse_date).transpose()?.unwrap_or(local_now.date_naive());
    let time = time.map(parse_time).transpose()?.unwrap_or(local_now.time());
    let naive = date.and_time(time);

    let target = SERVICE_TZ
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| {
            ForecastError::invalid_input("time", naive.to_string(), "an existing local time")
        })?
        .with_timezone(&Utc);

    let earliest = now - Duration::days(MAX_PAST_DAYS);
    let latest = now + Duration::days(MAX_FUTURE_DAYS);
    if target < earliest || target > latest {
        return Err(ForecastError::invalid_input(
            "date",
            naive.to_string(),
            format!("an instant between {} and {}", earliest.to_rfc3339(), latest.to_rfc3339()),
        ));
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 15, 0, 0).unwrap()
    }

    #[rstest]
    #[case("3550308", true)]
    #[case("355030", false)]
    #[case("35503080", false)]
    #[case("35a0308", false)]
    #[case("", false)]
    fn test_location_ids(#[case] id: &str, #[case] valid: bool) {
        assert_eq!(validate_location_id(id).is_ok(), valid);
    }

    #[rstest]
    #[case("00:00", true)]
    #[case("23:59", true)]
    #[case("24:00", false)]
    #[case("12:60", false)]
    #[case("9:05", false)]
    #[case("noon", false)]
    fn test_times(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(parse_time(value).is_ok(), valid);
    }

    #[rstest]
    #[case(0.0, false)]
    #[case(0.5, true)]
    #[case(200.0, true)]
    #[case(200.1, false)]
    #[case(-5.0, false)]
    #[case(f64::NAN, false)]
    fn test_radius(#[case] radius: f64, #[case] valid: bool) {
        assert_eq!(validate_radius(radius).is_ok(), valid);
    }

    #[test]
    fn test_dates() {
        assert!(parse_date("2024-02-29").is_ok());
        assert!(parse_date("2023-02-29").is_err());
        let err = parse_date("10/06/2024").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_resolve_target_in_service_time() {
        let target = resolve_target(Some("2024-06-11"), Some("09:30"), now()).unwrap();
        assert_eq!(target, Utc.with_ymd_and_hms(2024, 6, 11, 12, 30, 0).unwrap());
        assert_eq!(resolve_target(None, None, now()).unwrap(), now());
    }

    #[test]
    fn test_resolve_target_bounds() {
        assert!(resolve_target(Some("2024-06-08"), Some("12:00"), now()).is_err());
        assert!(resolve_target(Some("2024-06-26"), Some("12:00"), now()).is_ok());
        assert!(resolve_target(Some("2024-06-27"), Some("12:00"), now()).is_err());
    }

    #[test]
    fn test_batch_limits() {
        assert!(validate_batch::<&str>(&[], MAX_BATCH).is_err());
        let ids = vec!["3550308"; MAX_BATCH + 1];
        assert!(validate_batch(&ids, MAX_BATCH).is_err());
        assert!(validate_batch(&ids[..MAX_BATCH], MAX_BATCH).is_ok());
        assert!(validate_batch(&["3550308", "12"], MAX_BATCH).is_ok());
    }
}
