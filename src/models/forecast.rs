//! Response aggregate assembled by the orchestration layer

use serde::{Deserialize, Serialize};

use super::{Alert, CurrentConditions, DailyPoint, HourlyPoint};

/// Everything the caller gets back for one location
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ForecastAggregate {
    pub location_id: String,
    pub location_name: String,
    pub current: CurrentConditions,
    pub daily: Vec<DailyPoint>,
    /// Hourly points inside the response window, ordered by timestamp
    pub hourly: Vec<HourlyPoint>,
    /// Deduplicated alerts, most severe first
    pub alerts: Vec<Alert>,
    /// Whether the longer-horizon source contributed to this aggregate
    pub extended_available: bool,
}

impl ForecastAggregate {
    /// Most severe alert, if any
    #[must_use]
    pub fn top_alert(&self) -> Option<&Alert> {
        self.alerts.iter().max_by_key(|a| a.severity)
    }
}
