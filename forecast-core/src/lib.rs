//! Core library for the `forecast` weather client.
//!
//! This crate defines:
//! - The OpenWeather HTTP client (geocoding, forecast, icons)
//! - Decoded API models and per-day grouping of forecast entries
//! - The location policy: searched city, device location, remembered city
//! - Configuration and display units
//!
//! It is used by `forecast-cli`, but can also be reused by other front ends.

pub mod client;
pub mod config;
pub mod error;
pub mod forecast;
pub mod location;
pub mod model;
pub mod units;

pub use client::{Endpoints, Icon, OpenWeatherClient, WeatherApi};
pub use config::Config;
pub use error::ApiError;
pub use forecast::{DailyForecast, group_by_day};
pub use location::{
    Authorization, ConfigStore, DeviceLocator, LocationSource, LocationStore, SearchOutcome,
    Startup, WeatherReport, WeatherSession,
};
pub use model::{ForecastEntry, ForecastResponse, GpsCoord, Location};
pub use units::Units;
