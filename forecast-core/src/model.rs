use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Icon shown when an entry carries no condition.
pub const DEFAULT_ICON: &str = "01d";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoord {
    pub lat: f64,
    pub lon: f64,
}

impl GpsCoord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for GpsCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// One result of the geocoding endpoints. Also persisted as the last chosen city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub local_names: HashMap<String, String>,
    pub lat: f64,
    pub lon: f64,
    /// ISO 3166 two-letter code.
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Location {
    pub fn new(lat: f64, lon: f64, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_names: HashMap::new(),
            lat,
            lon,
            country: String::new(),
            state: None,
        }
    }

    pub fn coords(&self) -> GpsCoord {
        GpsCoord::new(self.lat, self.lon)
    }

    /// "Atlanta, Georgia, US", skipping the parts the API left out.
    pub fn display_name(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        if let Some(state) = self.state.as_deref().filter(|s| !s.is_empty()) {
            parts.push(state);
        }
        if !self.country.is_empty() {
            parts.push(&self.country);
        }
        parts.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub coord: GpsCoord,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub population: i64,
    /// Shift from UTC in seconds.
    #[serde(default)]
    pub timezone: i32,
    pub sunrise: i64,
    pub sunset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// The `main` block of a forecast entry. Temperatures are Kelvin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i64,
    pub sea_level: Option<i64>,
    pub grnd_level: Option<i64>,
    pub humidity: u8,
    pub temp_kf: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Clouds {
    pub all: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Metres per second.
    pub speed: f64,
    pub deg: i32,
    pub gust: Option<f64>,
}

/// Rain or snow volume for the last three hours, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Precipitation {
    #[serde(rename = "3h")]
    pub three_hour: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartOfDay {
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "n")]
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySys {
    pub pod: PartOfDay,
}

/// One timestamped prediction from the forecast list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub dt: i64,
    pub main: Measurements,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub clouds: Clouds,
    pub wind: Wind,
    pub visibility: Option<u32>,
    /// Probability of precipitation, 0.0 ..= 1.0.
    #[serde(default)]
    pub pop: f64,
    pub rain: Option<Precipitation>,
    pub snow: Option<Precipitation>,
    pub sys: Option<EntrySys>,
    #[serde(default)]
    pub dt_txt: String,
}

impl ForecastEntry {
    pub fn time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.dt, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    pub fn icon(&self) -> &str {
        self.condition()
            .map(|c| c.icon.as_str())
            .unwrap_or(DEFAULT_ICON)
    }

    pub fn description(&self) -> &str {
        self.condition()
            .map(|c| c.description.as_str())
            .unwrap_or("unknown")
    }
}

/// Body of `/data/2.5/forecast`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub cod: Option<String>,
    pub message: Option<i64>,
    pub cnt: Option<u32>,
    #[serde(default)]
    pub list: Vec<ForecastEntry>,
    pub city: Option<City>,
}
