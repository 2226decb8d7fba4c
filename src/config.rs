//! Configuration management for meteobr
//!
//! Handles loading configuration from a TOML file and `METEOBR_*`
//! environment variables, and validates every setting.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ForecastError;

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeteoConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Upstream forecast providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Base URL for the `OpenMeteo` API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_primary_days")]
    pub primary_forecast_days: u32,
    /// Whether detailed requests also query the 16-day rich profile
    #[serde(default = "default_true")]
    pub extended_enabled: bool,
    #[serde(default = "default_extended_days")]
    pub extended_forecast_days: u32,
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disable to always go upstream
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cache directory location
    #[serde(default = "default_cache_path")]
    pub path: String,
    #[serde(default = "default_hourly_ttl")]
    pub hourly_ttl_minutes: u32,
    #[serde(default = "default_daily_ttl")]
    pub daily_ttl_minutes: u32,
    /// TTLs are scaled by a random factor in [1 - jitter, 1 + jitter]
    #[serde(default)]
    pub ttl_jitter: f64,
}

/// Fan-out, retry and window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Upstream calls allowed in flight at once
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_min_backoff")]
    pub min_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
    /// Regional requests return what completed within this many seconds
    #[serde(default = "default_deadline")]
    pub request_deadline_seconds: u32,
    /// Longest a request waits for its cache writes
    #[serde(default = "default_write_timeout")]
    pub write_timeout_seconds: u32,
    #[serde(default = "default_current_window")]
    pub current_window_hours: u32,
    #[serde(default = "default_detailed_window")]
    pub detailed_window_hours: u32,
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON export of municipality records
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

// Default value functions
fn default_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_timeout() -> u32 {
    10
}

fn default_primary_days() -> u32 {
    7
}

fn default_extended_days() -> u32 {
    16
}

fn default_true() -> bool {
    true
}

fn default_cache_path() -> String {
    "./.cache/meteobr".to_string()
}

fn default_hourly_ttl() -> u32 {
    60
}

fn default_daily_ttl() -> u32 {
    180
}

fn default_max_in_flight() -> u32 {
    50
}

fn default_max_retries() -> u32 {
    3
}

fn default_min_backoff() -> u64 {
    200
}

fn default_max_backoff() -> u64 {
    5_000
}

fn default_deadline() -> u32 {
    25
}

fn default_write_timeout() -> u32 {
    5
}

fn default_current_window() -> u32 {
    24
}

fn default_detailed_window() -> u32 {
    168
}

fn default_batch_limit() -> usize {
    crate::input::MAX_BATCH
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_catalog_path() -> String {
    "data/municipios.json".to_string()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            primary_forecast_days: default_primary_days(),
            extended_enabled: true,
            extended_forecast_days: default_extended_days(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_cache_path(),
            hourly_ttl_minutes: default_hourly_ttl(),
            daily_ttl_minutes: default_daily_ttl(),
            ttl_jitter: 0.0,
        }
    }
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            max_retries: default_max_retries(),
            min_backoff_ms: default_min_backoff(),
            max_backoff_ms: default_max_backoff(),
            request_deadline_seconds: default_deadline(),
            write_timeout_seconds: default_write_timeout(),
            current_window_hours: default_current_window(),
            detailed_window_hours: default_detailed_window(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn hourly_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.hourly_ttl_minutes) * 60)
    }

    #[must_use]
    pub fn daily_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.daily_ttl_minutes) * 60)
    }
}

impl MeteoConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from the given path, `METEOBR_CONFIG`, or `config.toml`
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path
            .or_else(|| std::env::var_os("METEOBR_CONFIG").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("config.toml"));

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // METEOBR_CACHE__HOURLY_TTL_MINUTES=30 overrides cache.hourly_ttl_minutes
        builder = builder.add_source(
            Environment::with_prefix("METEOBR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: MeteoConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to deserialize configuration from {}", config_file.display()))?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Replace empty or zero values with their defaults
    pub fn apply_defaults(&mut self) {
        if self.sources.base_url.is_empty() {
            self.sources.base_url = default_base_url();
        }
        if self.sources.timeout_seconds == 0 {
            self.sources.timeout_seconds = default_timeout();
        }
        if self.sources.primary_forecast_days == 0 {
            self.sources.primary_forecast_days = default_primary_days();
        }
        if self.sources.extended_forecast_days == 0 {
            self.sources.extended_forecast_days = default_extended_days();
        }
        if self.cache.path.is_empty() {
            self.cache.path = default_cache_path();
        }
        if self.cache.hourly_ttl_minutes == 0 {
            self.cache.hourly_ttl_minutes = default_hourly_ttl();
        }
        if self.cache.daily_ttl_minutes == 0 {
            self.cache.daily_ttl_minutes = default_daily_ttl();
        }
        if self.orchestration.max_in_flight == 0 {
            self.orchestration.max_in_flight = default_max_in_flight();
        }
        if self.orchestration.request_deadline_seconds == 0 {
            self.orchestration.request_deadline_seconds = default_deadline();
        }
        if self.orchestration.write_timeout_seconds == 0 {
            self.orchestration.write_timeout_seconds = default_write_timeout();
        }
        if self.orchestration.current_window_hours == 0 {
            self.orchestration.current_window_hours = default_current_window();
        }
        if self.orchestration.detailed_window_hours == 0 {
            self.orchestration.detailed_window_hours = default_detailed_window();
        }
        if self.orchestration.batch_limit == 0 {
            self.orchestration.batch_limit = default_batch_limit();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.catalog.path.is_empty() {
            self.catalog.path = default_catalog_path();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        let sources = &self.sources;
        let orchestration = &self.orchestration;
        let cache = &self.cache;

        if sources.timeout_seconds > 120 {
            return Err(ForecastError::config("Source timeout cannot exceed 120 seconds").into());
        }
        for (name, days) in [
            ("primary", sources.primary_forecast_days),
            ("extended", sources.extended_forecast_days),
        ] {
            if !(1..=16).contains(&days) {
                return Err(ForecastError::config(format!(
                    "The {name} forecast horizon must be between 1 and 16 days, got {days}"
                ))
                .into());
            }
        }
        if orchestration.max_retries > 10 {
            return Err(ForecastError::config("Max retries cannot exceed 10").into());
        }
        if !(1..=500).contains(&orchestration.max_in_flight) {
            return Err(ForecastError::config("Max in-flight requests must be between 1 and 500").into());
        }
        if orchestration.write_timeout_seconds > 120 {
            return Err(ForecastError::config("Cache write timeout cannot exceed 120 seconds").into());
        }
        if orchestration.min_backoff_ms > orchestration.max_backoff_ms {
            return Err(ForecastError::config("Minimum backoff cannot exceed maximum backoff").into());
        }
        for (name, hours) in [
            ("current", orchestration.current_window_hours),
            ("detailed", orchestration.detailed_window_hours),
        ] {
            if !(1..=168).contains(&hours) {
                return Err(ForecastError::config(format!(
                    "The {name} hourly window must be between 1 and 168 hours, got {hours}"
                ))
                .into());
            }
        }
        if orchestration.batch_limit > crate::input::MAX_BATCH {
            return Err(ForecastError::config(format!(
                "Batch limit cannot exceed {}",
                crate::input::MAX_BATCH
            ))
            .into());
        }
        for (name, minutes) in [
            ("hourly", cache.hourly_ttl_minutes),
            ("daily", cache.daily_ttl_minutes),
        ] {
            if !(1..=1440).contains(&minutes) {
                return Err(ForecastError::config(format!(
                    "The {name} cache TTL must be between 1 and 1440 minutes, got {minutes}"
                ))
                .into());
            }
        }
        if !(0.0..=0.5).contains(&cache.ttl_jitter) {
            return Err(ForecastError::config("Cache TTL jitter must be within [0, 0.5]").into());
        }
        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(ForecastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(ForecastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.sources.base_url.starts_with("http://")
            && !self.sources.base_url.starts_with("https://")
        {
            return Err(
                ForecastError::config("Source base URL must be a valid HTTP or HTTPS URL").into(),
            );
        }

        Ok(())
    }
}
