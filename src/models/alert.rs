//! Alert model

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Alert severity, totally ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Alert,
    Danger,
}

/// Alert codes. At most one alert per code appears in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertCode {
    RainExpected,
    ModerateRain,
    HeavyRain,
    ExtremeRain,
    RainAccumulation,
    Storm,
    StrongWind,
    VeryStrongWind,
    StormWind,
    StrongGusts,
    Fog,
    DenseFog,
    Heat,
    ExtremeHeat,
    Cold,
    Frost,
    TempDrop,
    TempRise,
    HighUv,
    VeryHighUv,
    ExtremeUv,
}

impl AlertCode {
    /// Codes describing precipitation that is actively falling
    #[must_use]
    pub fn is_active_rain(self) -> bool {
        matches!(
            self,
            AlertCode::RainExpected
                | AlertCode::ModerateRain
                | AlertCode::HeavyRain
                | AlertCode::ExtremeRain
                | AlertCode::Storm
        )
    }
}

/// Value in an alert's details map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Number(f64),
    Text(String),
}

impl From<f64> for DetailValue {
    fn from(value: f64) -> Self {
        DetailValue::Number(value)
    }
}

impl From<String> for DetailValue {
    fn from(value: String) -> Self {
        DetailValue::Text(value)
    }
}

impl From<&str> for DetailValue {
    fn from(value: &str) -> Self {
        DetailValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub code: AlertCode,
    pub severity: Severity,
    pub description: String,
    pub timestamp: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, DetailValue>,
}

impl Alert {
    #[must_use]
    pub fn new(
        code: AlertCode,
        severity: Severity,
        description: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            code,
            severity,
            description: description.into(),
            timestamp,
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<DetailValue>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&DetailValue> {
        self.details.get(key)
    }
}

/// Keep only alerts at or above `min`
#[must_use]
pub fn filter_by_severity(alerts: Vec<Alert>, min: Severity) -> Vec<Alert> {
    alerts.into_iter().filter(|a| a.severity >= min).collect()
}
