//! Condition classification into the proprietary code space

use crate::models::ConditionCode;

/// Measurements a condition is classified from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionInputs {
    pub rain_intensity: u8,
    /// km/h
    pub wind_speed: f64,
    /// meters; `None` never matches a visibility rule
    pub visibility: Option<f64>,
    pub temperature: f64,
    /// mm
    pub precipitation: f64,
    pub cloud_cover: u8,
}

type Rule = (fn(&ConditionInputs) -> bool, ConditionCode);

/// Evaluated top-down, first match wins
const RULES: &[Rule] = &[
    (
        |i| i.rain_intensity >= 60 && i.wind_speed >= 40.0,
        ConditionCode::Storm,
    ),
    (|i| i.rain_intensity >= 25, ConditionCode::Rain),
    (|i| i.rain_intensity >= 5, ConditionCode::Drizzle),
    (|i| i.visibility.is_some_and(|v| v < 3000.0), ConditionCode::Fog),
    (
        |i| i.temperature < 2.0 && i.precipitation > 0.0,
        ConditionCode::Snow,
    ),
    (
        |i| i.visibility.is_some_and(|v| v < 5000.0) && i.precipitation == 0.0,
        ConditionCode::Haze,
    ),
];

#[must_use]
pub fn classify(inputs: &ConditionInputs) -> ConditionCode {
    RULES
        .iter()
        .find(|(matches, _)| matches(inputs))
        .map_or_else(|| cloud_band(inputs.cloud_cover), |(_, code)| *code)
}

fn cloud_band(cloud_cover: u8) -> ConditionCode {
    match cloud_cover {
        0..20 => ConditionCode::Clear,
        20..50 => ConditionCode::PartlyCloudy,
        50..85 => ConditionCode::Cloudy,
        _ => ConditionCode::Overcast,
    }
}

/// Map a WMO weather interpretation code
#[must_use]
pub fn from_wmo(code: u16) -> Option<ConditionCode> {
    let mapped = match code {
        0 | 1 => ConditionCode::Clear,
        2 => ConditionCode::PartlyCloudy,
        3 => ConditionCode::Overcast,
        45 | 48 => ConditionCode::Fog,
        51..=57 => ConditionCode::Drizzle,
        61..=67 | 80..=82 => ConditionCode::Rain,
        71..=77 | 85 | 86 => ConditionCode::Snow,
        95..=99 => ConditionCode::Storm,
        _ => return None,
    };
    Some(mapped)
}

/// Combine a provider code with the locally classified one.
///
/// The provider code wins unless the derived code is a heavier
/// precipitation band; a provider "clear" never hides derived rain.
#[must_use]
pub fn resolve(provided: Option<ConditionCode>, derived: ConditionCode) -> ConditionCode {
    match provided {
        None => derived,
        Some(provided) if derived.is_precipitation() => {
            if provided.is_precipitation() {
                provided.max(derived)
            } else {
                derived
            }
        }
        Some(provided) => provided,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::formulas::rain_intensity;
    use rstest::rstest;

    fn inputs() -> ConditionInputs {
        ConditionInputs {
            rain_intensity: 0,
            wind_speed: 5.0,
            visibility: Some(20_000.0),
            temperature: 24.0,
            precipitation: 0.0,
            cloud_cover: 10,
        }
    }

    #[rstest]
    #[case(0, ConditionCode::Clear)]
    #[case(19, ConditionCode::Clear)]
    #[case(20, ConditionCode::PartlyCloudy)]
    #[case(49, ConditionCode::PartlyCloudy)]
    #[case(50, ConditionCode::Cloudy)]
    #[case(84, ConditionCode::Cloudy)]
    #[case(85, ConditionCode::Overcast)]
    #[case(100, ConditionCode::Overcast)]
    fn test_cloud_bands(#[case] cloud_cover: u8, #[case] expected: ConditionCode) {
        let i = ConditionInputs { cloud_cover, ..inputs() };
        assert_eq!(classify(&i), expected);
    }

    #[rstest]
    #[case(70, 50.0, ConditionCode::Storm)]
    #[case(70, 20.0, ConditionCode::Rain)]
    #[case(25, 80.0, ConditionCode::Rain)]
    #[case(24, 80.0, ConditionCode::Drizzle)]
    #[case(5, 0.0, ConditionCode::Drizzle)]
    #[case(4, 0.0, ConditionCode::Clear)]
    fn test_precipitation_bands(
        #[case] rain_intensity: u8,
        #[case] wind_speed: f64,
        #[case] expected: ConditionCode,
    ) {
        let i = ConditionInputs {
            rain_intensity,
            wind_speed,
            precipitation: 1.0,
            ..inputs()
        };
        assert_eq!(classify(&i), expected);
    }

    #[test]
    fn test_rain_outranks_fog() {
        let i = ConditionInputs {
            rain_intensity: 30,
            visibility: Some(500.0),
            ..inputs()
        };
        assert_eq!(classify(&i), ConditionCode::Rain);
    }

    #[test]
    fn test_visibility_rules() {
        let foggy = ConditionInputs { visibility: Some(2_000.0), ..inputs() };
        assert_eq!(classify(&foggy), ConditionCode::Fog);

        let hazy = ConditionInputs { visibility: Some(4_000.0), ..inputs() };
        assert_eq!(classify(&hazy), ConditionCode::Haze);

        let wet_haze = ConditionInputs {
            visibility: Some(4_000.0),
            precipitation: 0.2,
            ..inputs()
        };
        assert_eq!(classify(&wet_haze), ConditionCode::Clear);

        let unknown = ConditionInputs { visibility: None, ..inputs() };
        assert_eq!(classify(&unknown), ConditionCode::Clear);
    }

    #[test]
    fn test_snow_needs_cold_and_precipitation() {
        let i = ConditionInputs {
            temperature: 0.5,
            precipitation: 0.3,
            rain_intensity: rain_intensity(0.3, 40.0),
            ..inputs()
        };
        assert_eq!(classify(&i), ConditionCode::Snow);
    }

    #[test]
    fn test_storm_inputs_never_below_rain() {
        for intensity in 60..=100u8 {
            for wind in [40.0, 55.0, 120.0] {
                let i = ConditionInputs {
                    rain_intensity: intensity,
                    wind_speed: wind,
                    visibility: Some(100.0),
                    ..inputs()
                };
                assert!(classify(&i) >= ConditionCode::Rain);
            }
        }
    }

    #[rstest]
    #[case(0, Some(ConditionCode::Clear))]
    #[case(3, Some(ConditionCode::Overcast))]
    #[case(48, Some(ConditionCode::Fog))]
    #[case(55, Some(ConditionCode::Drizzle))]
    #[case(81, Some(ConditionCode::Rain))]
    #[case(86, Some(ConditionCode::Snow))]
    #[case(96, Some(ConditionCode::Storm))]
    #[case(13, None)]
    fn test_wmo_mapping(#[case] code: u16, #[case] expected: Option<ConditionCode>) {
        assert_eq!(from_wmo(code), expected);
    }

    #[test]
    fn test_resolve_keeps_heavier_precipitation() {
        use ConditionCode::*;
        assert_eq!(resolve(Some(Clear), Rain), Rain);
        assert_eq!(resolve(Some(Storm), Rain), Storm);
        assert_eq!(resolve(Some(Drizzle), Storm), Storm);
        assert_eq!(resolve(Some(Fog), Cloudy), Fog);
        assert_eq!(resolve(Some(Overcast), Clear), Overcast);
        assert_eq!(resolve(None, Haze), Haze);
    }
}
