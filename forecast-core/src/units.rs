use serde::{Deserialize, Serialize};

const KELVIN_OFFSET: f64 = 273.15;
const MPS_TO_MPH: f64 = 2.236_936;

/// Measurement system used for display. The API is always queried in
/// standard units (Kelvin, m/s) and converted locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Metric, Units::Imperial]
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "C",
            Units::Imperial => "F",
        }
    }

    pub fn convert_kelvin(&self, kelvin: f64) -> f64 {
        let celsius = kelvin - KELVIN_OFFSET;
        match self {
            Units::Metric => celsius,
            Units::Imperial => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    /// Whole degrees, e.g. `22°C`, or `22°` without the unit letter.
    pub fn format_temperature(&self, kelvin: f64, show_unit: bool) -> String {
        let value = self.convert_kelvin(kelvin).round();
        // Avoid printing "-0°".
        let value = if value == 0.0 { 0.0 } else { value };
        let unit = if show_unit { self.temperature_symbol() } else { "" };
        format!("{value:.0}°{unit}")
    }

    pub fn format_wind(&self, mps: f64) -> String {
        match self {
            Units::Metric => format!("{mps:.1} m/s"),
            Units::Imperial => format!("{:.1} mph", mps * MPS_TO_MPH),
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" | "c" | "celsius" => Ok(Units::Metric),
            "imperial" | "f" | "fahrenheit" | "us" => Ok(Units::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown units '{value}'. Supported units: metric, imperial."
            )),
        }
    }
}

impl std::str::FromStr for Units {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Units::try_from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_as_str_roundtrip() {
        for units in Units::all() {
            let parsed = Units::try_from(units.as_str()).expect("roundtrip should succeed");
            assert_eq!(*units, parsed);
        }
    }

    #[test]
    fn unknown_units_error() {
        let err = Units::try_from("kelvin").unwrap_err();
        assert!(err.to_string().contains("Unknown units"));
    }

    #[test]
    fn converts_kelvin() {
        assert!((Units::Metric.convert_kelvin(273.15)).abs() < 1e-9);
        assert!((Units::Imperial.convert_kelvin(373.15) - 212.0).abs() < 1e-9);
    }

    #[test]
    fn formats_temperature_with_and_without_unit() {
        assert_eq!(Units::Metric.format_temperature(295.5, true), "22°C");
        assert_eq!(Units::Metric.format_temperature(295.5, false), "22°");
        assert_eq!(Units::Imperial.format_temperature(295.5, true), "72°F");
    }

    #[test]
    fn never_prints_negative_zero() {
        assert_eq!(Units::Metric.format_temperature(273.0, true), "0°C");
    }

    #[test]
    fn formats_wind() {
        assert_eq!(Units::Metric.format_wind(3.44), "3.4 m/s");
        assert_eq!(Units::Imperial.format_wind(3.4), "7.6 mph");
    }
}
