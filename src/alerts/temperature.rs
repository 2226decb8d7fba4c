//! Heat, cold and multi-day temperature trend alerts

use chrono::{DateTime, FixedOffset};

use super::{AlertSet, AlertWindow, day_timestamp};
use crate::derivation::formulas::round1;
use crate::models::{Alert, AlertCode, DailyPoint, Severity};

const HEAT_BANDS: &[(f64, AlertCode, Severity, &str)] = &[
    (40.0, AlertCode::ExtremeHeat, Severity::Danger, "Calor extremo"),
    (35.0, AlertCode::Heat, Severity::Warning, "Temperaturas elevadas"),
];

const COLD_BANDS: &[(f64, AlertCode, Severity, &str)] = &[
    (2.0, AlertCode::Frost, Severity::Alert, "Risco de geada"),
    (8.0, AlertCode::Cold, Severity::Info, "Temperaturas baixas"),
];

/// Swings above this (°C) between two days raise a trend alert
const TREND_MIN_DELTA: f64 = 8.0;
const TREND_ALERT_DELTA: f64 = 15.0;

pub fn scan(window: &AlertWindow<'_>, alerts: &mut AlertSet) {
    for point in &window.hourly {
        offer_heat(alerts, point.temperature, point.timestamp);
        offer_cold(alerts, point.temperature, point.timestamp);
    }
    for day in &window.daily {
        let timestamp = day_timestamp(day);
        offer_heat(alerts, day.temperature_max, timestamp);
        offer_cold(alerts, day.temperature_min, timestamp);
    }
    if let Some(alert) = largest_swing(&window.days) {
        alerts.offer(alert);
    }
}

fn offer_heat(alerts: &mut AlertSet, temperature: f64, timestamp: DateTime<FixedOffset>) {
    if let Some(&(_, code, severity, description)) =
        HEAT_BANDS.iter().find(|(min, ..)| temperature >= *min)
    {
        alerts.offer(
            Alert::new(code, severity, description, timestamp)
                .with_detail("temperature", round1(temperature)),
        );
    }
}

fn offer_cold(alerts: &mut AlertSet, temperature: f64, timestamp: DateTime<FixedOffset>) {
    if let Some(&(_, code, severity, description)) =
        COLD_BANDS.iter().find(|(max, ..)| temperature <= *max)
    {
        alerts.offer(
            Alert::new(code, severity, description, timestamp)
                .with_detail("temperature", round1(temperature)),
        );
    }
}

/// Compares the maxima of every pair of days; only the single largest
/// swing above the threshold is reported, ties keeping the earliest pair.
fn largest_swing(days: &[&DailyPoint]) -> Option<Alert> {
    let mut best: Option<(f64, &DailyPoint, &DailyPoint)> = None;
    for (i, from) in days.iter().enumerate() {
        for to in &days[i + 1..] {
            let delta = to.temperature_max - from.temperature_max;
            if delta.abs() <= TREND_MIN_DELTA {
                continue;
            }
            if best.is_none_or(|(b, _, _)| delta.abs() > b.abs()) {
                best = Some((delta, *from, *to));
            }
        }
    }

    let (delta, from, to) = best?;
    let (code, description) = if delta < 0.0 {
        (AlertCode::TempDrop, "Queda acentuada de temperatura")
    } else {
        (AlertCode::TempRise, "Elevação acentuada de temperatura")
    };
    let severity = if delta.abs() >= TREND_ALERT_DELTA {
        Severity::Alert
    } else {
        Severity::Warning
    };

    Some(
        Alert::new(code, severity, description, day_timestamp(to))
            .with_detail("variation", round1(delta))
            .with_detail("from_date", from.date.to_string())
            .with_detail("to_date", to.date.to_string())
            .with_detail("days_between", (to.date - from.date).num_days() as f64),
    )
}
