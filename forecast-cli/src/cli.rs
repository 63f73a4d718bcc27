use std::{
    fmt,
    io::IsTerminal,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use forecast_core::{
    Authorization, Config, ConfigStore, DeviceLocator, GpsCoord, Location, OpenWeatherClient,
    SearchOutcome, Startup, Units, WeatherApi, WeatherReport, WeatherSession,
};
use inquire::{InquireError, Password, PasswordDisplayMode, Select};
use tracing::{debug, info};

use crate::render::{self, RenderOptions};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Current weather and multi-day forecast")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// OpenWeather API key; overrides the configured one.
    #[arg(long, global = true, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Display units: metric or imperial.
    #[arg(long, global = true)]
    pub units: Option<Units>,

    /// Config file to use instead of the platform default.
    #[arg(long, global = true, env = "FORECAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v, -vv).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key and display units interactively.
    Configure,

    /// Show the forecast for the device position, a city, or the remembered city.
    Show {
        /// Search for a city and use the best match.
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        city: Option<String>,

        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Search for a city, pick one, and show its forecast.
    Search {
        /// City name, optionally with state and country code ("Paris,FR").
        query: String,

        /// Choose the N-th result (1-based) without prompting.
        #[arg(long)]
        pick: Option<usize>,

        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Download a condition icon as PNG.
    Icon {
        /// Icon code, e.g. "10d".
        code: String,

        /// Scale factor; 2 and 4 are available besides 1.
        #[arg(long, default_value_t = 2)]
        size: u8,

        /// Destination file; defaults to the icon's own file name.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Coordinates standing in for the device location.
#[derive(Debug, Clone, Copy, Args)]
pub struct DeviceArgs {
    /// Latitude of the current position.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the current position.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

impl DeviceArgs {
    pub fn coords(&self) -> Option<GpsCoord> {
        Some(GpsCoord::new(self.lat?, self.lon?))
    }
}

#[derive(Debug, Clone, Copy, Args)]
pub struct OutputArgs {
    /// Number of days to print.
    #[arg(long, default_value_t = 5)]
    pub days: usize,

    /// Also print every 3-hour entry.
    #[arg(long)]
    pub hourly: bool,

    /// Print the report as JSON.
    #[arg(long, conflicts_with = "hourly")]
    pub json: bool,
}

/// Device location taken from the command line. Passing coordinates is
/// what granting location access amounts to here.
#[derive(Debug, Clone, Copy)]
pub struct CliLocator {
    coords: Option<GpsCoord>,
}

impl CliLocator {
    pub fn new(coords: Option<GpsCoord>) -> Self {
        Self { coords }
    }
}

impl DeviceLocator for CliLocator {
    fn authorization(&self) -> Authorization {
        if self.coords.is_some() {
            Authorization::Authorized
        } else {
            Authorization::Denied
        }
    }

    fn current_location(&self) -> Option<GpsCoord> {
        self.coords
    }
}

type CliSession = WeatherSession<OpenWeatherClient, CliLocator, ConfigStore>;

/// One line of the interactive city picker.
enum Choice {
    City(Location),
    UseLocation,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::City(loc) => f.write_str(&loc.display_name()),
            Choice::UseLocation => f.write_str("Use current location"),
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };
        let config = Config::load_from(&config_path)?;
        let units = self.units.unwrap_or(config.units);
        debug!(path = %config_path.display(), %units, "configuration loaded");

        match self.command {
            Command::Configure => configure(&config_path, config),
            Command::Show {
                city,
                device,
                output,
            } => {
                let mut session = session(&config, self.api_key.as_deref(), &config_path, device)?;
                let report = show(&mut session, city.as_deref()).await?;
                print_report(&report, output, units)
            }
            Command::Search {
                query,
                pick,
                device,
                output,
            } => {
                let mut session = session(&config, self.api_key.as_deref(), &config_path, device)?;
                if let Some(report) = search(&mut session, &query, pick).await? {
                    print_report(&report, output, units)?;
                }
                Ok(())
            }
            Command::Icon { code, size, output } => {
                let client = OpenWeatherClient::with_endpoints(
                    config.api_key(self.api_key.as_deref())?,
                    config.endpoints(),
                );
                let icon = client
                    .fetch_icon(&code, size)
                    .await
                    .with_context(|| format!("Failed to download icon '{code}'"))?;

                let path = output.unwrap_or_else(|| PathBuf::from(default_icon_file(&code, size)));
                std::fs::write(&path, &icon.png)
                    .with_context(|| format!("Failed to write icon to {}", path.display()))?;
                println!("Saved {} ({} bytes)", path.display(), icon.png.len());
                Ok(())
            }
        }
    }
}

fn session(
    config: &Config,
    api_key: Option<&str>,
    config_path: &Path,
    device: DeviceArgs,
) -> anyhow::Result<CliSession> {
    let client = OpenWeatherClient::with_endpoints(config.api_key(api_key)?, config.endpoints());
    Ok(WeatherSession::new(
        client,
        CliLocator::new(device.coords()),
        ConfigStore::new(config_path.to_path_buf()),
    ))
}

async fn show(session: &mut CliSession, city: Option<&str>) -> anyhow::Result<WeatherReport> {
    if let Some(query) = city {
        let found = session
            .search(query)
            .await
            .with_context(|| format!("Failed to search for '{query}'"))?;
        let best = found
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No city matches '{}'.", query.trim()))?;

        info!(city = %best.display_name(), "using best search match");
        return session
            .handle_search(SearchOutcome::New(best))
            .await?
            .ok_or_else(|| anyhow!("Could not load a forecast for '{query}'."));
    }

    match session.start().await? {
        Startup::Ready(report) => Ok(report),
        Startup::AwaitingLocation | Startup::AwaitingPermission | Startup::NeedsSearch => bail!(
            "No city selected yet.\n\
             Hint: run `forecast search <city>`, or pass --lat/--lon for your position."
        ),
    }
}

async fn search(
    session: &mut CliSession,
    query: &str,
    pick: Option<usize>,
) -> anyhow::Result<Option<WeatherReport>> {
    let found = session
        .search(query)
        .await
        .with_context(|| format!("Failed to search for '{query}'"))?;

    if found.is_empty() {
        println!("No matches for '{}'.", query.trim());
        return Ok(None);
    }

    let outcome = match pick {
        Some(n) => SearchOutcome::New(pick_result(found, n)?),
        None if !std::io::stdin().is_terminal() => {
            print!("{}", render::locations(&found));
            println!("Re-run with --pick <N> to choose one.");
            return Ok(None);
        }
        None => prompt_choice(found, session.location_available())?,
    };

    session.handle_search(outcome).await
}

fn pick_result(found: Vec<Location>, n: usize) -> anyhow::Result<Location> {
    let count = found.len();
    n.checked_sub(1)
        .and_then(|i| found.into_iter().nth(i))
        .ok_or_else(|| anyhow!("--pick {n} is out of range; there are {count} result(s)."))
}

fn prompt_choice(found: Vec<Location>, location_available: bool) -> anyhow::Result<SearchOutcome> {
    let mut options: Vec<Choice> = found.into_iter().map(Choice::City).collect();
    if location_available {
        options.push(Choice::UseLocation);
    }

    match Select::new("Choose a city:", options).prompt() {
        Ok(Choice::City(loc)) => Ok(SearchOutcome::New(loc)),
        Ok(Choice::UseLocation) => Ok(SearchOutcome::UseLocation),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            Ok(SearchOutcome::Back)
        }
        Err(err) => Err(err).context("City selection failed"),
    }
}

fn configure(path: &Path, mut config: Config) -> anyhow::Result<()> {
    let mut prompt = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked);
    if config.api_key.is_some() {
        prompt = prompt.with_help_message("leave empty to keep the current key");
    }

    let key = prompt.prompt().context("Reading API key failed")?;
    let key = key.trim();
    if !key.is_empty() {
        config.set_api_key(key.to_string());
    } else if config.api_key.is_none() {
        bail!("An API key is required. Get one at https://home.openweathermap.org/api_keys");
    }

    let current = Units::all()
        .iter()
        .position(|u| *u == config.units)
        .unwrap_or(0);
    config.units = Select::new("Units:", Units::all().to_vec())
        .with_starting_cursor(current)
        .prompt()
        .context("Reading units failed")?;

    config.save_to(path)?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn print_report(report: &WeatherReport, output: OutputArgs, units: Units) -> anyhow::Result<()> {
    if output.json {
        let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        let opts = RenderOptions {
            units,
            days: output.days,
            hourly: output.hourly,
        };
        print!("{}", render::report(report, opts));
    }
    Ok(())
}

fn default_icon_file(code: &str, size: u8) -> String {
    if size > 1 {
        format!("{code}@{size}x.png")
    } else {
        format!("{code}.png")
    }
}
