//! Where the forecast is for: a searched city, the device position, or the
//! city remembered from the last run.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::{
    client::WeatherApi,
    config::Config,
    error::ApiError,
    forecast::DailyForecast,
    model::{ForecastResponse, GpsCoord, Location},
};

/// City name shown when none could be determined.
pub const UNKNOWN_CITY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationSource {
    Searched(Location),
    Device(GpsCoord),
    Stored(Location),
}

impl LocationSource {
    pub fn coords(&self) -> GpsCoord {
        match self {
            LocationSource::Searched(loc) | LocationSource::Stored(loc) => loc.coords(),
            LocationSource::Device(coords) => *coords,
        }
    }
}

/// The three ways a search can end.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The user picked a result.
    New(Location),
    /// The user left without choosing.
    Back,
    /// The user asked for the device location instead.
    UseLocation,
}

/// Permission to read the device location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    NotDetermined,
    Denied,
    Authorized,
}

pub trait DeviceLocator: Send + Sync {
    fn authorization(&self) -> Authorization;

    /// Last known fix, if any.
    fn current_location(&self) -> Option<GpsCoord>;
}

/// Persistence for the last chosen city.
pub trait LocationStore: Send {
    fn load(&self) -> Result<Option<Location>>;

    fn save(&mut self, location: &Location) -> Result<()>;
}

/// Keeps the last city in the `last_location` table of the config file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl LocationStore for ConfigStore {
    fn load(&self) -> Result<Option<Location>> {
        Ok(Config::load_from(&self.path)?.last_location)
    }

    fn save(&mut self, location: &Location) -> Result<()> {
        let mut cfg = Config::load_from(&self.path)?;
        cfg.last_location = Some(location.clone());
        cfg.save_to(&self.path)
    }
}

/// Run a geocoding search. Blank queries return nothing without a request.
pub async fn search<A>(api: &A, query: &str) -> Result<Vec<Location>, ApiError>
where
    A: WeatherApi + ?Sized,
{
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let found = api.search_locations(trimmed).await?;
    debug!(query = trimmed, results = found.len(), "location search finished");
    Ok(found)
}

/// A fetched forecast together with where it is for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub city: String,
    pub coords: GpsCoord,
    pub source: LocationSource,
    /// The named place behind `coords`: the chosen city, or the
    /// reverse-geocoded place of a device fix.
    pub place: Option<Location>,
    pub forecast: ForecastResponse,
    pub days: Vec<DailyForecast>,
}

/// Result of [`WeatherSession::start`].
#[derive(Debug, Clone, PartialEq)]
pub enum Startup {
    Ready(WeatherReport),
    /// Location is authorized but no fix has arrived yet.
    AwaitingLocation,
    /// Permission has not been decided and no city is stored.
    AwaitingPermission,
    /// Permission denied and no city is stored; the user has to search.
    NeedsSearch,
}

/// Decides which location the forecast is fetched for and fetches it.
#[derive(Debug)]
pub struct WeatherSession<A, L, S> {
    api: A,
    locator: L,
    store: S,

    device_coords: Option<GpsCoord>,
    device_place: Option<Location>,

    stored: Option<Location>,
    stored_from_search: bool,

    use_location: bool,
    needs_refresh: bool,
}

impl<A, L, S> WeatherSession<A, L, S>
where
    A: WeatherApi,
    L: DeviceLocator,
    S: LocationStore,
{
    pub fn new(api: A, locator: L, store: S) -> Self {
        Self {
            api,
            locator,
            store,
            device_coords: None,
            device_place: None,
            stored: None,
            stored_from_search: false,
            use_location: false,
            needs_refresh: false,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn use_location(&self) -> bool {
        self.use_location
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    pub fn location_available(&self) -> bool {
        self.locator.authorization() == Authorization::Authorized
    }

    pub fn coords(&self) -> Option<GpsCoord> {
        if self.use_location {
            self.device_coords
        } else {
            self.stored.as_ref().map(Location::coords)
        }
    }

    pub fn city(&self) -> &str {
        let name = if self.use_location {
            self.device_place.as_ref().map(|l| l.name.as_str())
        } else {
            self.stored.as_ref().map(|l| l.name.as_str())
        };
        name.unwrap_or(UNKNOWN_CITY)
    }

    pub fn source(&self) -> Option<LocationSource> {
        if self.use_location {
            return self.device_coords.map(LocationSource::Device);
        }

        self.stored.clone().map(|loc| {
            if self.stored_from_search {
                LocationSource::Searched(loc)
            } else {
                LocationSource::Stored(loc)
            }
        })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Location>, ApiError> {
        search(&self.api, query).await
    }

    /// Apply the way a search ended. `Back` leaves everything as it was.
    pub async fn handle_search(&mut self, outcome: SearchOutcome) -> Result<Option<WeatherReport>> {
        match outcome {
            SearchOutcome::New(location) => {
                info!(city = %location.name, "switching to searched city");
                self.use_location = false;
                if let Err(err) = self.store.save(&location) {
                    warn!(error = %err, "failed to remember chosen city");
                }
                self.stored = Some(location);
                self.stored_from_search = true;
                self.refresh().await
            }
            SearchOutcome::UseLocation => {
                info!("switching to device location");
                self.use_location = true;
                if self.device_coords.is_none() {
                    self.device_coords = self.locator.current_location();
                }
                self.refresh().await
            }
            SearchOutcome::Back => Ok(None),
        }
    }

    /// Adopt the remembered city and fetch its forecast. `None` when
    /// nothing usable is stored.
    pub async fn load_last_city(&mut self) -> Result<Option<WeatherReport>> {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "failed to read remembered city");
                None
            }
        };

        let Some(location) = stored else {
            debug!("no remembered city");
            return Ok(None);
        };

        info!(city = %location.name, "using remembered city");
        self.stored = Some(location);
        self.stored_from_search = false;
        self.refresh().await
    }

    /// Pick a location source from the current authorization state.
    pub async fn start(&mut self) -> Result<Startup> {
        match self.locator.authorization() {
            Authorization::Authorized => {
                self.use_location = true;
                self.needs_refresh = true;

                match self.locator.current_location() {
                    Some(coords) => self.location_updated(coords).await.map(|report| {
                        report.map_or(Startup::AwaitingLocation, Startup::Ready)
                    }),
                    None => Ok(Startup::AwaitingLocation),
                }
            }
            Authorization::NotDetermined => {
                self.use_location = false;
                Ok(self
                    .load_last_city()
                    .await?
                    .map_or(Startup::AwaitingPermission, Startup::Ready))
            }
            Authorization::Denied => {
                self.use_location = false;
                Ok(self
                    .load_last_city()
                    .await?
                    .map_or(Startup::NeedsSearch, Startup::Ready))
            }
        }
    }

    /// A new device fix arrived. Refreshes if a refresh was pending.
    pub async fn location_updated(&mut self, coords: GpsCoord) -> Result<Option<WeatherReport>> {
        debug!(%coords, "device location updated");
        self.device_coords = Some(coords);

        if self.needs_refresh {
            self.refresh().await
        } else {
            Ok(None)
        }
    }

    /// Fetch the forecast for the active source. `None` when there are no
    /// coordinates to fetch for.
    pub async fn refresh(&mut self) -> Result<Option<WeatherReport>> {
        let Some(source) = self.source() else {
            debug!("nothing to refresh, no coordinates");
            return Ok(None);
        };
        let coords = source.coords();

        self.needs_refresh = false;

        let forecast = self
            .api
            .fetch_forecast(coords)
            .await
            .with_context(|| format!("Failed to fetch forecast for {coords}"))?;

        if self.use_location {
            self.device_place = match self.api.reverse_geocode(coords).await {
                Ok(found) => found.into_iter().next(),
                Err(err) => {
                    warn!(error = %err, "reverse geocoding failed");
                    None
                }
            };
        }

        let days = forecast.days();
        let place = match &source {
            LocationSource::Searched(loc) | LocationSource::Stored(loc) => Some(loc.clone()),
            LocationSource::Device(_) => self.device_place.clone(),
        };

        Ok(Some(WeatherReport {
            city: self.city().to_string(),
            coords,
            source,
            place,
            forecast,
            days,
        }))
    }
}
