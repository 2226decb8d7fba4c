//! Alert engine
//!
//! Consumes normalized hourly and daily points and emits at most one alert
//! per [`AlertCode`]. Each category module scans the merged window once and
//! offers candidates to an [`AlertSet`], which keeps the occurrence closest
//! to the request instant.
//!
//! The hourly window is `(now - 1h, now + 48h]`. The daily window is the 7
//! service-local dates starting at today; a date with at least 20 hourly
//! points in the hourly window is covered by those points and contributes
//! no daily candidates.

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

use crate::clock::{local_midnight, service_date, to_service_time};
use crate::models::{Alert, AlertCode, DailyPoint, HourlyPoint};

pub mod rain;
pub mod temperature;
pub mod uv;
pub mod visibility;
pub mod wind;

const HOURLY_LOOKBACK_HOURS: i64 = 1;
const HOURLY_HORIZON_HOURS: i64 = 48;
const DAILY_HORIZON_DAYS: u64 = 7;
const COVERED_DAY_MIN_HOURS: usize = 20;

/// Points an alert scan runs over
#[derive(Debug, Clone)]
pub struct AlertWindow<'a> {
    pub now: DateTime<FixedOffset>,
    /// Hourly points inside the hourly window, in time order
    pub hourly: Vec<&'a HourlyPoint>,
    /// Daily points of dates not covered by hourly data
    pub daily: Vec<&'a DailyPoint>,
    /// Every daily point of the daily window, covered or not
    pub days: Vec<&'a DailyPoint>,
}

impl<'a> AlertWindow<'a> {
    #[must_use]
    pub fn build(hourly: &'a [HourlyPoint], daily: &'a [DailyPoint], now: DateTime<Utc>) -> Self {
        let start = now - Duration::hours(HOURLY_LOOKBACK_HOURS);
        let end = now + Duration::hours(HOURLY_HORIZON_HOURS);
        let mut hourly: Vec<&HourlyPoint> = hourly
            .iter()
            .filter(|p| p.timestamp > start && p.timestamp <= end)
            .collect();
        hourly.sort_by_key(|p| p.timestamp);

        let mut per_date: HashMap<NaiveDate, usize> = HashMap::new();
        for point in &hourly {
            *per_date.entry(point.timestamp.date_naive()).or_default() += 1;
        }

        let today = service_date(now);
        let last = today
            .checked_add_days(chrono::Days::new(DAILY_HORIZON_DAYS - 1))
            .unwrap_or(today);
        let mut days: Vec<&DailyPoint> = daily
            .iter()
            .filter(|d| d.date >= today && d.date <= last)
            .collect();
        days.sort_by_key(|d| d.date);

        let daily = days
            .iter()
            .copied()
            .filter(|d| per_date.get(&d.date).copied().unwrap_or(0) < COVERED_DAY_MIN_HOURS)
            .collect();

        Self {
            now: to_service_time(now),
            hourly,
            daily,
            days,
        }
    }
}

/// Timestamp daily alerts carry
#[must_use]
pub fn day_timestamp(day: &DailyPoint) -> DateTime<FixedOffset> {
    local_midnight(day.date)
}

/// One alert per code, the occurrence closest to `now` winning
#[derive(Debug, Clone)]
pub struct AlertSet {
    now: DateTime<FixedOffset>,
    alerts: HashMap<AlertCode, Alert>,
}

impl AlertSet {
    #[must_use]
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now,
            alerts: HashMap::new(),
        }
    }

    pub fn offer(&mut self, alert: Alert) {
        let now = self.now;
        match self.alerts.get(&alert.code) {
            Some(existing) if !closer(&alert, existing, now) => {}
            _ => {
                self.alerts.insert(alert.code, alert);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Severity descending, then timestamp ascending
    #[must_use]
    pub fn into_sorted(self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.alerts.into_values().collect();
        alerts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.timestamp.cmp(&b.timestamp))
                .then(a.code.cmp(&b.code))
        });
        alerts
    }
}

fn closer(candidate: &Alert, existing: &Alert, now: DateTime<FixedOffset>) -> bool {
    let candidate_delta = (candidate.timestamp - now).abs();
    let existing_delta = (existing.timestamp - now).abs();
    candidate_delta < existing_delta
        || (candidate_delta == existing_delta && candidate.timestamp < existing.timestamp)
}

type Phase = fn(&AlertWindow<'_>, &mut AlertSet);

/// Runs the category phases in a fixed order
#[derive(Debug, Clone)]
pub struct AlertEngine {
    phases: Vec<Phase>,
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self {
            phases: vec![
                rain::scan as Phase,
                wind::scan,
                visibility::scan,
                temperature::scan,
                uv::scan,
            ],
        }
    }
}

impl AlertEngine {
    #[must_use]
    pub fn evaluate(&self, hourly: &[HourlyPoint], daily: &[DailyPoint], now: DateTime<Utc>) -> Vec<Alert> {
        let window = AlertWindow::build(hourly, daily, now);
        let mut set = AlertSet::new(window.now);
        for phase in &self.phases {
            phase(&window, &mut set);
        }
        tracing::debug!(
            "Generated {} alerts from {} hourly and {} daily points",
            set.len(),
            window.hourly.len(),
            window.daily.len()
        );
        set.into_sorted()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::models::Severity;

    #[test]
    fn test_hourly_window_bounds() {
        let points = vec![hour(10, 8), hour(10, 9), hour(12, 9), hour(12, 10)];
        let window = AlertWindow::build(&points, &[], now());
        let hours: Vec<_> = window.hourly.iter().map(|p| p.timestamp).collect();
        // 08:00 is exactly an hour back and falls outside
        assert_eq!(hours, vec![local(10, 9), local(12, 9)]);
    }

    #[test]
    fn test_hourly_coverage_suppresses_daily() {
        // 11th fully covered, 12th only partially
        let mut points = hours(11, 0, 24);
        points.extend(hours(12, 0, 10));
        let days: Vec<_> = (9..=18).map(day).collect();
        let window = AlertWindow::build(&points, &days, now());

        let daily_dates: Vec<u32> = window.daily.iter().map(|d| chrono::Datelike::day(&d.date)).collect();
        assert_eq!(daily_dates, vec![10, 12, 13, 14, 15, 16]);
        assert_eq!(window.days.len(), 7);
    }

    #[test]
    fn test_dedup_keeps_closest_to_now() {
        let mut set = AlertSet::new(local(10, 9));
        for h in [20, 11, 14] {
            set.offer(Alert::new(AlertCode::StrongWind, Severity::Warning, "w", local(10, h)));
        }
        set.offer(Alert::new(AlertCode::StrongWind, Severity::Warning, "w", local(10, 7)));
        let alerts = set.into_sorted();
        assert_eq!(alerts.len(), 1);
        // 07:00 and 11:00 are equally close, the earlier wins
        assert_eq!(alerts[0].timestamp, local(10, 7));
    }

    #[test]
    fn test_output_order() {
        let mut set = AlertSet::new(local(10, 9));
        set.offer(Alert::new(AlertCode::Cold, Severity::Info, "c", local(10, 10)));
        set.offer(Alert::new(AlertCode::HighUv, Severity::Warning, "u", local(11, 12)));
        set.offer(Alert::new(AlertCode::StrongWind, Severity::Warning, "w", local(10, 15)));
        set.offer(Alert::new(AlertCode::Storm, Severity::Danger, "s", local(12, 3)));
        let codes: Vec<_> = set.into_sorted().into_iter().map(|a| a.code).collect();
        assert_eq!(
            codes,
            vec![AlertCode::Storm, AlertCode::StrongWind, AlertCode::HighUv, AlertCode::Cold]
        );
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(AlertEngine::default().evaluate(&[], &[], now()).is_empty());
    }

    #[test]
    fn test_dedup_across_hourly_and_daily() {
        let mut windy = hour(10, 15);
        windy.wind_speed = 45.0;
        let mut windy_day = day(14);
        windy_day.wind_speed_max = 50.0;

        let alerts = AlertEngine::default().evaluate(&[windy], &[windy_day], now());
        let wind: Vec<_> = alerts.iter().filter(|a| a.code == AlertCode::StrongWind).collect();
        assert_eq!(wind.len(), 1);
        assert_eq!(wind[0].timestamp, local(10, 15));
    }
}
