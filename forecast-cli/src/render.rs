use chrono::FixedOffset;
use forecast_core::{DailyForecast, Location, LocationSource, Units, WeatherReport};

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub units: Units,
    /// Maximum number of days to print.
    pub days: usize,
    pub hourly: bool,
}

/// Full text view of a report: header, current conditions, then one block per day.
pub fn report(report: &WeatherReport, opts: RenderOptions) -> String {
    let units = opts.units;
    let mut lines = vec![heading(report)];

    let Some(now) = report.forecast.current() else {
        lines.push("  No forecast data available.".to_string());
        return join_lines(lines);
    };

    lines.push(format!(
        "  {}  {}",
        units.format_temperature(now.main.temp, true),
        capitalize_words(now.description()),
    ));
    lines.push(format!(
        "  {} / {} Feels like {}",
        units.format_temperature(now.main.temp_max, false),
        units.format_temperature(now.main.temp_min, false),
        units.format_temperature(now.main.feels_like, false),
    ));
    lines.push(format!(
        "  Humidity {}%  Wind {}",
        now.main.humidity,
        units.format_wind(now.wind.speed),
    ));

    let offset = report.forecast.utc_offset();
    for day in report.days.iter().take(opts.days) {
        lines.push(String::new());
        lines.push(day_line(day, offset, units));

        if opts.hourly {
            lines.extend(day.entries.iter().map(|entry| {
                let local = entry.time().with_timezone(&offset);
                format!(
                    "    {:>4}  {:>5}  {}",
                    local.format("%-I%p").to_string(),
                    units.format_temperature(entry.main.temp, false),
                    entry.description(),
                )
            }));
        }
    }

    join_lines(lines)
}

fn join_lines(lines: Vec<String>) -> String {
    lines.into_iter().map(|line| line + "\n").collect()
}

fn heading(report: &WeatherReport) -> String {
    match &report.source {
        LocationSource::Searched(loc) | LocationSource::Stored(loc) => loc.display_name(),
        LocationSource::Device(coords) => {
            let name = report
                .place
                .as_ref()
                .map(Location::display_name)
                .unwrap_or_else(|| report.city.clone());
            format!("{name} ({coords})")
        }
    }
}

fn day_line(day: &DailyForecast, offset: FixedOffset, units: Units) -> String {
    let range = match (day.low(), day.high()) {
        (Some(low), Some(high)) => format!(
            "{} / {}",
            units.format_temperature(low, false),
            units.format_temperature(high, false)
        ),
        _ => "-".to_string(),
    };

    let summary = day
        .representative(offset)
        .map(|e| capitalize_words(e.description()))
        .unwrap_or_default();

    let mut line = format!("{}  {range:<11} {summary}", day.date.format("%a, %b %-d, %Y"));

    let pop = (day.max_pop() * 100.0).round();
    if pop > 0.0 {
        line.push_str(&format!("  ({pop:.0}% precip)"));
    }
    line
}

/// Numbered list of geocoding results, 1-based.
pub fn locations(found: &[Location]) -> String {
    found
        .iter()
        .enumerate()
        .map(|(i, loc)| {
            format!("{:>2}. {}  ({:.4}, {:.4})\n", i + 1, loc.display_name(), loc.lat, loc.lon)
        })
        .collect()
}

/// "scattered clouds" -> "Scattered Clouds".
pub fn capitalize_words(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::{ForecastResponse, GpsCoord, model::City};

    fn forecast() -> ForecastResponse {
        serde_json::from_value(serde_json::json!({
            "list": [
                {
                    "dt": 1724176800,
                    "main": {"temp": 300.15, "feels_like": 302.15, "temp_min": 299.15, "temp_max": 301.15,
                             "pressure": 1015, "humidity": 60},
                    "weather": [{"id": 802, "main": "Clouds", "description": "scattered clouds", "icon": "03d"}],
                    "wind": {"speed": 2.5, "deg": 200},
                    "pop": 0.2
                },
                {
                    "dt": 1724263200,
                    "main": {"temp": 295.15, "feels_like": 295.15, "temp_min": 294.15, "temp_max": 296.15,
                             "pressure": 1015, "humidity": 70},
                    "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
                    "wind": {"speed": 1.0, "deg": 100}
                }
            ]
        }))
        .unwrap()
    }

    fn report_for(source: LocationSource, city: &str) -> WeatherReport {
        report_at(source, city, None)
    }

    fn report_at(source: LocationSource, city: &str, place: Option<Location>) -> WeatherReport {
        let mut forecast = forecast();
        forecast.city = Some(City {
            id: 1,
            name: city.into(),
            coord: source.coords(),
            country: "US".into(),
            population: 0,
            timezone: 0,
            sunrise: 0,
            sunset: 0,
        });
        let days = forecast.days();
        WeatherReport {
            city: city.into(),
            coords: source.coords(),
            source,
            place,
            forecast,
            days,
        }
    }

    fn opts(days: usize, hourly: bool) -> RenderOptions {
        RenderOptions { units: Units::Metric, days, hourly }
    }

    #[test]
    fn capitalizes_each_word() {
        assert_eq!(capitalize_words("scattered clouds"), "Scattered Clouds");
        assert_eq!(capitalize_words("  light   rain "), "Light Rain");
        assert_eq!(capitalize_words(""), "");
    }

    #[test]
    fn renders_current_conditions_and_days() {
        let mut loc = Location::new(33.749, -84.388, "Atlanta");
        loc.country = "US".into();
        let text = report(&report_for(LocationSource::Searched(loc), "Atlanta"), opts(5, false));

        assert!(text.starts_with("Atlanta, US\n"));
        assert!(text.contains("27°C  Scattered Clouds"));
        assert!(text.contains("28° / 26° Feels like 29°"));
        assert!(text.contains("Humidity 60%  Wind 2.5 m/s"));
        assert!(text.contains("Tue, Aug 20, 2024"));
        assert!(text.contains("(20% precip)"));
        assert!(text.contains("Wed, Aug 21, 2024"));
        assert!(text.contains("Light Rain"));
        assert!(!text.contains("6PM"));
    }

    #[test]
    fn limits_days_and_prints_hourly_entries() {
        let source = LocationSource::Device(GpsCoord::new(33.749, -84.388));
        let text = report(&report_for(source, "Atlanta"), opts(1, true));

        assert!(text.starts_with("Atlanta (33.7490, -84.3880)\n"));
        assert!(text.contains("6PM"));
        assert!(text.contains("scattered clouds"));
        assert!(!text.contains("Aug 21"));
    }

    #[test]
    fn device_heading_names_reverse_geocoded_place() {
        let here = GpsCoord::new(33.7748, -84.2963);
        let mut decatur = Location::new(here.lat, here.lon, "Decatur");
        decatur.state = Some("Georgia".into());
        decatur.country = "US".into();

        let text = report(&report_at(LocationSource::Device(here), "Decatur", Some(decatur)), opts(1, false));

        assert!(text.starts_with("Decatur, Georgia, US (33.7748, -84.2963)\n"));
    }

    #[test]
    fn empty_forecast_says_so() {
        let source = LocationSource::Device(GpsCoord::new(0.0, 0.0));
        let rep = WeatherReport {
            city: "Unknown".into(),
            coords: source.coords(),
            source,
            place: None,
            forecast: ForecastResponse::default(),
            days: vec![],
        };

        assert!(report(&rep, opts(5, false)).contains("No forecast data available."));
    }

    #[test]
    fn lists_locations_one_based() {
        let mut paris = Location::new(48.8566, 2.3522, "Paris");
        paris.country = "FR".into();
        let text = locations(&[paris, Location::new(33.6609, -95.5555, "Paris")]);

        assert_eq!(
            text,
            " 1. Paris, FR  (48.8566, 2.3522)\n 2. Paris  (33.6609, -95.5555)\n"
        );
    }
}
