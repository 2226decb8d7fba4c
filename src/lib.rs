//! `meteobr` - Forecast engine for Brazilian municipalities
//!
//! This library turns raw provider forecasts into normalized hourly and
//! daily series, derives conditions and alerts, and orchestrates cached,
//! retried fetches from several sources concurrently.

pub mod alerts;
pub mod cache;
pub mod clock;
pub mod config;
pub mod derivation;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod input;
pub mod models;
pub mod service;
pub mod source;
pub mod telemetry;

// Re-export core types for public API
pub use alerts::AlertEngine;
pub use cache::{CacheStore, FjallStore, MemoryStore, TtlCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MeteoConfig;
pub use error::{ErrorKind, ForecastError};
pub use geo::{GeoCatalog, StaticCatalog};
pub use models::{Alert, AlertCode, ForecastAggregate, LocationRecord, Severity};
pub use service::{ForecastContext, ForecastService, ServiceSettings};
pub use source::{ForecastSource, OpenMeteoProfile, OpenMeteoSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, ForecastError>;
