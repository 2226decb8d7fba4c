//! Rain and storm alerts

use chrono::{DateTime, Duration, FixedOffset};

use super::{AlertSet, AlertWindow, day_timestamp};
use crate::derivation::formulas::round1;
use crate::models::{Alert, AlertCode, ConditionCode, HourlyPoint, Severity};

/// Probability gate for volume-based rain codes
const MIN_PROBABILITY: u8 = 80;
/// Hours below this volume (mm) are dry
const DRY_HOUR_MM: f64 = 0.1;

/// (min mm/h, code, severity, gated by probability), most severe first
const HOURLY_BANDS: &[(f64, AlertCode, Severity, bool)] = &[
    (50.0, AlertCode::ExtremeRain, Severity::Danger, false),
    (10.0, AlertCode::HeavyRain, Severity::Alert, true),
    (5.0, AlertCode::ModerateRain, Severity::Warning, true),
    (0.5, AlertCode::RainExpected, Severity::Info, true),
];

const DAILY_BANDS: &[(f64, AlertCode, Severity)] = &[
    (50.0, AlertCode::RainAccumulation, Severity::Alert),
    (10.0, AlertCode::RainExpected, Severity::Info),
];

pub fn scan(window: &AlertWindow<'_>, alerts: &mut AlertSet) {
    let rain_ends = dry_span_after(&window.hourly);

    for (point, ends_at) in window.hourly.iter().zip(rain_ends) {
        if point.condition == ConditionCode::Storm {
            let alert = Alert::new(
                AlertCode::Storm,
                Severity::Danger,
                "Tempestade com chuva forte e ventos intensos",
                point.timestamp,
            )
            .with_detail("precipitation", round1(point.precipitation))
            .with_detail("wind_speed", round1(point.wind_speed));
            alerts.offer(with_rain_end(alert, ends_at));
        }

        let band = HOURLY_BANDS.iter().find(|(min, _, _, gated)| {
            point.precipitation >= *min
                && (!gated || point.precipitation_probability >= MIN_PROBABILITY)
        });
        if let Some(&(_, code, severity, _)) = band {
            let alert = Alert::new(code, severity, hourly_description(code), point.timestamp)
                .with_detail("precipitation", round1(point.precipitation))
                .with_detail("probability", f64::from(point.precipitation_probability));
            alerts.offer(with_rain_end(alert, ends_at));
        }
    }

    for day in &window.daily {
        let timestamp = day_timestamp(day);
        if day.condition == ConditionCode::Storm {
            alerts.offer(
                Alert::new(
                    AlertCode::Storm,
                    Severity::Danger,
                    "Possibilidade de tempestades ao longo do dia",
                    timestamp,
                )
                .with_detail("precipitation_sum", round1(day.precipitation_sum)),
            );
        }

        if day.precipitation_probability_max < MIN_PROBABILITY {
            continue;
        }
        let band = DAILY_BANDS
            .iter()
            .find(|(min, _, _)| day.precipitation_sum >= *min);
        if let Some(&(_, code, severity)) = band {
            let description = match code {
                AlertCode::RainAccumulation => "Acumulado de chuva elevado previsto para o dia",
                _ => "Chuva prevista para o dia",
            };
            alerts.offer(
                Alert::new(code, severity, description, timestamp)
                    .with_detail("precipitation_sum", round1(day.precipitation_sum))
                    .with_detail("probability", f64::from(day.precipitation_probability_max)),
            );
        }
    }
}

fn hourly_description(code: AlertCode) -> &'static str {
    match code {
        AlertCode::ExtremeRain => "Chuva extrema, risco de alagamentos",
        AlertCode::HeavyRain => "Chuva forte prevista",
        AlertCode::ModerateRain => "Chuva moderada prevista",
        _ => "Chuva prevista",
    }
}

fn with_rain_end(alert: Alert, ends_at: Option<DateTime<FixedOffset>>) -> Alert {
    match ends_at {
        Some(ts) if alert.code.is_active_rain() => alert.with_detail("rain_ends_at", ts.to_rfc3339()),
        _ => alert,
    }
}

fn is_dry(point: &HourlyPoint) -> bool {
    point.precipitation < DRY_HOUR_MM
}

/// For each point, the start of the first two-hour dry span beginning after it.
///
/// A span is two consecutive dry points exactly one hour apart. Computed in a
/// single reverse pass.
fn dry_span_after(points: &[&HourlyPoint]) -> Vec<Option<DateTime<FixedOffset>>> {
    let mut result = vec![None; points.len()];
    let mut next_span: Option<DateTime<FixedOffset>> = None;

    for idx in (0..points.len()).rev() {
        result[idx] = next_span;
        if let Some(following) = points.get(idx + 1) {
            let current = points[idx];
            if is_dry(current)
                && is_dry(following)
                && following.timestamp - current.timestamp == Duration::hours(1)
            {
                next_span = Some(current.timestamp);
            }
        }
    }
    result
}
