//! Derivation layer
//!
//! Pure functions turning raw provider series into normalized points:
//! feels-like temperature, composite rain intensity and condition codes.
//! Nothing here performs I/O or fails; unusable input rows are skipped.

pub mod condition;
pub mod current;
pub mod formulas;
pub mod normalize;

pub use condition::{ConditionInputs, classify, from_wmo, resolve};
pub use current::{current_conditions, enrich, select_closest};
pub use formulas::{daily_rain_intensity, feels_like, rain_intensity};
pub use normalize::{merge_daily, normalize_daily, normalize_hourly};
