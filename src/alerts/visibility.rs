//! Fog alerts. Hourly only; days carry no visibility.

use super::{AlertSet, AlertWindow};
use crate::models::{Alert, AlertCode, Severity};

pub fn scan(window: &AlertWindow<'_>, alerts: &mut AlertSet) {
    for point in &window.hourly {
        let Some(visibility) = point.visibility else {
            continue;
        };
        let band = if visibility < 200.0 {
            Some((AlertCode::DenseFog, Severity::Alert, "Nevoeiro denso, visibilidade muito baixa"))
        } else if visibility < 1000.0 {
            Some((AlertCode::Fog, Severity::Warning, "Nevoeiro, visibilidade reduzida"))
        } else {
            None
        };
        if let Some((code, severity, description)) = band {
            alerts.offer(
                Alert::new(code, severity, description, point.timestamp)
                    .with_detail("visibility", visibility.round()),
            );
        }
    }
}
