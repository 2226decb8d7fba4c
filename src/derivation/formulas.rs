//! Derived metrics no provider exposes directly

/// Precipitation volume (mm/h) that maps to full intensity at certain probability
const FULL_SCALE_MM_PER_HOUR: f64 = 30.0;
const SIGMOID_MIDPOINT: f64 = 70.0;
const SIGMOID_STEEPNESS: f64 = 0.2;

const HEAT_INDEX_THRESHOLD_C: f64 = 27.0;
const WIND_CHILL_THRESHOLD_C: f64 = 10.0;

/// Logistic weight of a precipitation probability (0-100)
#[must_use]
pub fn sigmoid(probability: f64) -> f64 {
    1.0 / (1.0 + (-SIGMOID_STEEPNESS * (probability - SIGMOID_MIDPOINT)).exp())
}

/// Composite rain score (0-100) from hourly volume and probability.
///
/// Negative or non-finite inputs count as zero, so the score is total.
#[must_use]
pub fn rain_intensity(volume_mm_per_hour: f64, probability: f64) -> u8 {
    let volume = sanitize(volume_mm_per_hour);
    let probability = sanitize(probability).min(100.0);
    if volume == 0.0 {
        return 0;
    }
    let score = (volume / FULL_SCALE_MM_PER_HOUR) * sigmoid(probability) * 100.0;
    score.clamp(0.0, 100.0).round() as u8
}

/// Daily score: the day's sum spread over its wet hours, or over 24h when
/// the provider does not report precipitation hours
#[must_use]
pub fn daily_rain_intensity(
    precipitation_sum: f64,
    precipitation_hours: Option<f64>,
    probability_max: f64,
) -> u8 {
    let hours = precipitation_hours
        .filter(|h| h.is_finite() && *h > 0.0)
        .unwrap_or(24.0);
    rain_intensity(sanitize(precipitation_sum) / hours, probability_max)
}

/// Feels-like temperature in Celsius
#[must_use]
pub fn feels_like(temperature: f64, humidity: f64, wind_speed_kmh: f64) -> f64 {
    let value = if temperature > HEAT_INDEX_THRESHOLD_C {
        heat_index(temperature, humidity)
    } else if temperature < WIND_CHILL_THRESHOLD_C && wind_speed_kmh > 0.0 {
        wind_chill(temperature, wind_speed_kmh)
    } else {
        temperature
    };
    round1(value)
}

/// NWS heat index (Rothfusz regression with Steadman fallback)
#[must_use]
pub fn heat_index(temperature: f64, humidity: f64) -> f64 {
    let t = celsius_to_fahrenheit(temperature);
    let rh = humidity.clamp(0.0, 100.0);

    let simple = 0.5 * (t + 61.0 + (t - 68.0) * 1.2 + rh * 0.094);
    if (simple + t) / 2.0 < 80.0 {
        return fahrenheit_to_celsius(simple);
    }

    let mut hi = -42.379 + 2.049_015_23 * t + 10.143_331_27 * rh
        - 0.224_755_41 * t * rh
        - 0.006_837_83 * t * t
        - 0.054_817_17 * rh * rh
        + 0.001_228_74 * t * t * rh
        + 0.000_852_82 * t * rh * rh
        - 0.000_001_99 * t * t * rh * rh;

    if rh < 13.0 && (80.0..=112.0).contains(&t) {
        hi -= ((13.0 - rh) / 4.0) * ((17.0 - (t - 95.0).abs()) / 17.0).sqrt();
    } else if rh > 85.0 && (80.0..=87.0).contains(&t) {
        hi += ((rh - 85.0) / 10.0) * ((87.0 - t) / 5.0);
    }

    fahrenheit_to_celsius(hi)
}

/// NWS wind chill, never warmer than the air temperature
#[must_use]
pub fn wind_chill(temperature: f64, wind_speed_kmh: f64) -> f64 {
    let t = celsius_to_fahrenheit(temperature);
    let v = (wind_speed_kmh / 1.609_344).powf(0.16);
    let wc = 35.74 + 0.6215 * t - 35.75 * v + 0.4275 * t * v;
    fahrenheit_to_celsius(wc).min(temperature)
}

fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0)]
    #[case(50.0)]
    #[case(100.0)]
    fn test_no_volume_no_intensity(#[case] probability: f64) {
        assert_eq!(rain_intensity(0.0, probability), 0);
    }

    #[test]
    fn test_intensity_monotonic_in_volume() {
        let mut last = 0;
        for tenths in 0..=600 {
            let value = rain_intensity(f64::from(tenths) / 10.0, 85.0);
            assert!(value >= last);
            last = value;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn test_intensity_monotonic_in_probability() {
        let mut last = 0;
        for p in 0..=100 {
            let value = rain_intensity(12.0, f64::from(p));
            assert!(value >= last);
            last = value;
        }
    }

    #[rstest]
    #[case(1_000.0, 100.0)]
    #[case(f64::INFINITY, 100.0)]
    #[case(45.0, 250.0)]
    fn test_intensity_is_capped(#[case] volume: f64, #[case] probability: f64) {
        assert!(rain_intensity(volume, probability) <= 100);
    }

    #[test]
    fn test_intensity_ignores_garbage() {
        assert_eq!(rain_intensity(-3.0, 90.0), 0);
        assert_eq!(rain_intensity(f64::NAN, 90.0), 0);
        assert_eq!(rain_intensity(6.0, f64::NAN), rain_intensity(6.0, 0.0));
    }

    #[test]
    fn test_sigmoid_midpoint() {
        assert!((sigmoid(70.0) - 0.5).abs() < 1e-12);
        // 15 mm/h at the midpoint is a quarter of the scale
        assert_eq!(rain_intensity(15.0, 70.0), 25);
    }

    #[test]
    fn test_daily_intensity_prefers_wet_hours() {
        let spread = daily_rain_intensity(24.0, None, 90.0);
        let focused = daily_rain_intensity(24.0, Some(2.0), 90.0);
        assert_eq!(spread, rain_intensity(1.0, 90.0));
        assert_eq!(focused, rain_intensity(12.0, 90.0));
        assert_eq!(daily_rain_intensity(24.0, Some(0.0), 90.0), spread);
    }

    #[rstest]
    #[case(22.0, 60.0, 15.0, 22.0)]
    #[case(10.0, 80.0, 30.0, 10.0)]
    #[case(5.0, 80.0, 0.0, 5.0)]
    fn test_feels_like_neutral_band(
        #[case] temperature: f64,
        #[case] humidity: f64,
        #[case] wind: f64,
        #[case] expected: f64,
    ) {
        assert_eq!(feels_like(temperature, humidity, wind), expected);
    }

    #[test]
    fn test_heat_index_humid_day_feels_hotter() {
        let value = feels_like(32.0, 70.0, 5.0);
        // NWS table: 90°F at 70% RH is about 106°F
        assert!((40.0..42.5).contains(&value), "got {value}");
    }

    #[test]
    fn test_wind_chill_never_warmer_than_air() {
        let value = feels_like(5.0, 50.0, 20.0);
        assert!(value < 5.0);
        assert!(wind_chill(9.5, 2.0) <= 9.5);
    }
}
