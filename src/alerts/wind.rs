//! Wind alerts

use super::{AlertSet, AlertWindow, day_timestamp};
use crate::derivation::formulas::round1;
use crate::models::{Alert, AlertCode, Severity};

const SPEED_BANDS: &[(f64, AlertCode, Severity, &str)] = &[
    (90.0, AlertCode::StormWind, Severity::Danger, "Ventos com força de tempestade"),
    (60.0, AlertCode::VeryStrongWind, Severity::Alert, "Ventos muito fortes"),
    (40.0, AlertCode::StrongWind, Severity::Warning, "Ventos fortes"),
];

const GUST_THRESHOLD: f64 = 70.0;

fn speed_band(speed: f64) -> Option<&'static (f64, AlertCode, Severity, &'static str)> {
    SPEED_BANDS.iter().find(|(min, ..)| speed >= *min)
}

pub fn scan(window: &AlertWindow<'_>, alerts: &mut AlertSet) {
    for point in &window.hourly {
        if let Some(&(_, code, severity, description)) = speed_band(point.wind_speed) {
            alerts.offer(
                Alert::new(code, severity, description, point.timestamp)
                    .with_detail("wind_speed", round1(point.wind_speed))
                    .with_detail("direction", point.wind_cardinal()),
            );
        }
        if let Some(gusts) = point.wind_gusts.filter(|g| *g >= GUST_THRESHOLD) {
            alerts.offer(
                Alert::new(
                    AlertCode::StrongGusts,
                    Severity::Alert,
                    "Rajadas de vento fortes",
                    point.timestamp,
                )
                .with_detail("wind_gusts", round1(gusts))
                .with_detail("direction", point.wind_cardinal()),
            );
        }
    }

    for day in &window.daily {
        let timestamp = day_timestamp(day);
        if let Some(&(_, code, severity, description)) = speed_band(day.wind_speed_max) {
            alerts.offer(
                Alert::new(code, severity, description, timestamp)
                    .with_detail("wind_speed", round1(day.wind_speed_max)),
            );
        }
        if let Some(gusts) = day.wind_gusts_max.filter(|g| *g >= GUST_THRESHOLD) {
            alerts.offer(
                Alert::new(
                    AlertCode::StrongGusts,
                    Severity::Alert,
                    "Rajadas de vento fortes",
                    timestamp,
                )
                .with_detail("wind_gusts", round1(gusts)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::alerts::AlertEngine;
    use crate::models::{AlertCode, DetailValue, Severity};
    use rstest::rstest;

    #[rstest]
    #[case(39.9, None)]
    #[case(40.0, Some(AlertCode::StrongWind))]
    #[case(60.0, Some(AlertCode::VeryStrongWind))]
    #[case(95.0, Some(AlertCode::StormWind))]
    fn test_speed_bands(#[case] speed: f64, #[case] expected: Option<AlertCode>) {
        let mut point = hour(10, 12);
        point.wind_speed = speed;
        let alerts = AlertEngine::default().evaluate(&[point], &[], now());
        assert_eq!(alerts.first().map(|a| a.code), expected);
        assert!(alerts.len() <= 1);
    }

    #[test]
    fn test_gusts_are_independent() {
        let mut point = hour(10, 12);
        point.wind_speed = 45.0;
        point.wind_gusts = Some(80.0);
        point.wind_direction = 90;
        let alerts = AlertEngine::default().evaluate(&[point], &[], now());
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].code, AlertCode::StrongGusts);
        assert_eq!(alerts[0].severity, Severity::Alert);
        assert_eq!(alerts[1].detail("direction"), Some(&DetailValue::Text("E".into())));
    }

    #[test]
    fn test_daily_wind() {
        let mut windy = day(15);
        windy.wind_speed_max = 65.0;
        let alerts = AlertEngine::default().evaluate(&[], &[windy], now());
        assert_eq!(alerts[0].code, AlertCode::VeryStrongWind);
        assert_eq!(alerts[0].timestamp, local(15, 0));
    }
}
