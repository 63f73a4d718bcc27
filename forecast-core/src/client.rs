use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    error::ApiError,
    model::{ForecastResponse, GpsCoord, Location},
};

pub const DEFAULT_API_BASE: &str = "https://api.openweathermap.org";
pub const DEFAULT_ICON_BASE: &str = "https://openweathermap.org";

/// How many geocoding matches a search asks for.
const SEARCH_LIMIT: &str = "5";

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Base URLs of the two OpenWeather hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub api: String,
    pub icons: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api: DEFAULT_API_BASE.to_string(),
            icons: DEFAULT_ICON_BASE.to_string(),
        }
    }
}

impl Endpoints {
    /// Both hosts served from one base, as a mock server does.
    pub fn single(base: &str) -> Self {
        Self {
            api: base.to_string(),
            icons: base.to_string(),
        }
    }
}

/// A downloaded condition icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub code: String,
    pub size: u8,
    pub png: Vec<u8>,
}

#[async_trait]
pub trait WeatherApi: Send + Sync + std::fmt::Debug {
    async fn search_locations(&self, query: &str) -> Result<Vec<Location>, ApiError>;

    async fn reverse_geocode(&self, coords: GpsCoord) -> Result<Vec<Location>, ApiError>;

    async fn fetch_forecast(&self, coords: GpsCoord) -> Result<ForecastResponse, ApiError>;

    async fn fetch_icon(&self, icon: &str, size: u8) -> Result<Icon, ApiError>;
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    endpoints: Endpoints,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoints(api_key, Endpoints::default())
    }

    pub fn with_endpoints(api_key: String, endpoints: Endpoints) -> Self {
        Self {
            api_key,
            endpoints,
            http: Client::new(),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Path of an icon image; sizes above 1 use the `@Nx` variant.
    pub fn icon_path(icon: &str, size: u8) -> Result<String, ApiError> {
        if icon.is_empty() || !icon.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ApiError::InvalidIcon(icon.to_string()));
        }

        let suffix = if size > 1 {
            format!("@{size}x")
        } else {
            String::new()
        };
        Ok(format!("/img/wn/{icon}{suffix}.png"))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.endpoints.api.trim_end_matches('/'), path);
        debug!(endpoint, %url, "sending OpenWeather request");

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| ApiError::Network {
                endpoint,
                source: source.without_url(),
            })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| ApiError::Network {
                endpoint,
                source: source.without_url(),
            })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint,
                status,
                message: error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| ApiError::Decoding { endpoint, source })
    }
}

#[async_trait]
impl WeatherApi for OpenWeatherClient {
    async fn search_locations(&self, query: &str) -> Result<Vec<Location>, ApiError> {
        self.get_json(
            "geocoding",
            "/geo/1.0/direct",
            &[("q", query), ("limit", SEARCH_LIMIT)],
        )
        .await
    }

    async fn reverse_geocode(&self, coords: GpsCoord) -> Result<Vec<Location>, ApiError> {
        let lat = coords.lat.to_string();
        let lon = coords.lon.to_string();
        self.get_json(
            "reverse geocoding",
            "/geo/1.0/reverse",
            &[("lat", lat.as_str()), ("lon", lon.as_str()), ("limit", "1")],
        )
        .await
    }

    async fn fetch_forecast(&self, coords: GpsCoord) -> Result<ForecastResponse, ApiError> {
        let lat = coords.lat.to_string();
        let lon = coords.lon.to_string();
        let forecast: ForecastResponse = self
            .get_json(
                "forecast",
                "/data/2.5/forecast",
                &[("lat", lat.as_str()), ("lon", lon.as_str())],
            )
            .await?;

        debug!(entries = forecast.list.len(), "forecast decoded");
        Ok(forecast)
    }

    async fn fetch_icon(&self, icon: &str, size: u8) -> Result<Icon, ApiError> {
        const ENDPOINT: &str = "icon";

        let path = Self::icon_path(icon, size)?;
        let url = format!("{}{}", self.endpoints.icons.trim_end_matches('/'), path);
        debug!(%url, "fetching icon");

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Network {
                endpoint: ENDPOINT,
                source: source.without_url(),
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                endpoint: ENDPOINT,
                status,
                message: error_message(&body),
            });
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|source| ApiError::Network {
                endpoint: ENDPOINT,
                source: source.without_url(),
            })?;

        if !bytes.starts_with(PNG_MAGIC) {
            return Err(ApiError::NotAnImage(icon.to_string()));
        }

        Ok(Icon {
            code: icon.to_string(),
            size,
            png: bytes.to_vec(),
        })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// The API's own `message` when the body carries one, else the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => err.message,
        Err(_) => truncate_body(body),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icon_path_plain_and_scaled() {
        assert_eq!(OpenWeatherClient::icon_path("10d", 1).unwrap(), "/img/wn/10d.png");
        assert_eq!(OpenWeatherClient::icon_path("10d", 0).unwrap(), "/img/wn/10d.png");
        assert_eq!(OpenWeatherClient::icon_path("01n", 2).unwrap(), "/img/wn/01n@2x.png");
        assert_eq!(OpenWeatherClient::icon_path("01n", 4).unwrap(), "/img/wn/01n@4x.png");
    }

    #[test]
    fn icon_path_rejects_unsafe_codes() {
        for bad in ["", "../etc", "10d?x=1", "a b"] {
            let err = OpenWeatherClient::icon_path(bad, 1).unwrap_err();
            assert!(matches!(err, ApiError::InvalidIcon(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn error_message_prefers_api_message() {
        let body = r#"{"cod":401, "message": "Invalid API key. Please see https://openweathermap.org/faq#error401 for more info."}"#;
        assert!(error_message(body).starts_with("Invalid API key"));
    }

    #[test]
    fn error_message_truncates_plain_bodies() {
        let body = "x".repeat(500);
        let msg = error_message(&body);
        assert_eq!(msg.len(), 203);
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(150);
        let msg = truncate_body(&body);
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn default_endpoints_point_at_openweather() {
        let client = OpenWeatherClient::new("KEY".into());
        assert_eq!(client.endpoints().api, DEFAULT_API_BASE);
        assert_eq!(client.endpoints().icons, DEFAULT_ICON_BASE);
    }
}
