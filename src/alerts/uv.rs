//! UV index alerts

use super::{AlertSet, AlertWindow, day_timestamp};
use crate::derivation::formulas::round1;
use crate::models::{Alert, AlertCode, Severity};

const BANDS: &[(f64, AlertCode, Severity, &str)] = &[
    (11.0, AlertCode::ExtremeUv, Severity::Danger, "Índice UV extremo"),
    (8.0, AlertCode::VeryHighUv, Severity::Alert, "Índice UV muito alto"),
    (6.0, AlertCode::HighUv, Severity::Warning, "Índice UV alto"),
];

fn offer(alerts: &mut AlertSet, uv: f64, timestamp: chrono::DateTime<chrono::FixedOffset>) {
    if let Some(&(_, code, severity, description)) = BANDS.iter().find(|(min, ..)| uv >= *min) {
        alerts.offer(Alert::new(code, severity, description, timestamp).with_detail("uv_index", round1(uv)));
    }
}

pub fn scan(window: &AlertWindow<'_>, alerts: &mut AlertSet) {
    for point in &window.hourly {
        if let Some(uv) = point.uv_index {
            offer(alerts, uv, point.timestamp);
        }
    }
    for day in &window.daily {
        if let Some(uv) = day.uv_index_max {
            offer(alerts, uv, day_timestamp(day));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::alerts::AlertEngine;
    use crate::models::{AlertCode, Severity};
    use rstest::rstest;

    #[rstest]
    #[case(5.9, None)]
    #[case(6.0, Some(AlertCode::HighUv))]
    #[case(9.2, Some(AlertCode::VeryHighUv))]
    #[case(12.0, Some(AlertCode::ExtremeUv))]
    fn test_uv_bands(#[case] uv: f64, #[case] expected: Option<AlertCode>) {
        let mut sunny = day(12);
        sunny.uv_index_max = Some(uv);
        let alerts = AlertEngine::default().evaluate(&[], &[sunny], now());
        assert_eq!(alerts.first().map(|a| a.code), expected);
    }

    #[test]
    fn test_hourly_uv_beats_distant_daily() {
        let mut noon = hour(10, 12);
        noon.uv_index = Some(8.5);
        let mut later = day(14);
        later.uv_index_max = Some(9.0);
        let alerts = AlertEngine::default().evaluate(&[noon], &[later], now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Alert);
        assert_eq!(alerts[0].timestamp, local(10, 12));
    }
}
