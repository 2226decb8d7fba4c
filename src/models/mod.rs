//! Data models for the forecast engine
//!
//! This module contains the core domain models organized by concern:
//! - Location: coordinates and catalog records
//! - Weather: normalized hourly/daily points and current conditions
//! - Alert: typed, severity-ranked warnings
//! - Forecast: the per-location response aggregate

pub mod alert;
pub mod forecast;
pub mod location;
pub mod weather;

// Re-export all public types for convenient access
pub use alert::{Alert, AlertCode, DetailValue, Severity, filter_by_severity};
pub use forecast::ForecastAggregate;
pub use location::{Coordinate, LocationRecord};
pub use weather::{ConditionCode, CurrentConditions, DailyPoint, HourlyPoint};
