//! Grouping of the flat forecast list into calendar days.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::Serialize;

use crate::model::{ForecastEntry, ForecastResponse};

/// All forecast entries falling on one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub entries: Vec<ForecastEntry>,
}

impl DailyForecast {
    /// Lowest `temp_min` of the day, in Kelvin.
    pub fn low(&self) -> Option<f64> {
        self.entries.iter().map(|e| e.main.temp_min).reduce(f64::min)
    }

    /// Highest `temp_max` of the day, in Kelvin.
    pub fn high(&self) -> Option<f64> {
        self.entries.iter().map(|e| e.main.temp_max).reduce(f64::max)
    }

    pub fn max_pop(&self) -> f64 {
        self.entries.iter().map(|e| e.pop).fold(0.0, f64::max)
    }

    /// Entry closest to local noon; its condition stands for the whole day.
    pub fn representative(&self, offset: FixedOffset) -> Option<&ForecastEntry> {
        let noon = self
            .date
            .and_time(NaiveTime::from_hms_opt(12, 0, 0)?)
            .and_local_timezone(offset)
            .single()?
            .timestamp();

        self.entries.iter().min_by_key(|e| (e.dt - noon).abs())
    }
}

/// Bucket entries by the date of their timestamp in `offset`.
///
/// Days come out in ascending date order; entries within a day keep the
/// order they had in `entries`.
pub fn group_by_day(entries: &[ForecastEntry], offset: FixedOffset) -> Vec<DailyForecast> {
    let mut days: BTreeMap<NaiveDate, Vec<ForecastEntry>> = BTreeMap::new();

    for entry in entries {
        let date = entry.time().with_timezone(&offset).date_naive();
        days.entry(date).or_default().push(entry.clone());
    }

    days.into_iter()
        .map(|(date, entries)| DailyForecast { date, entries })
        .collect()
}

impl ForecastResponse {
    /// Local offset of the forecast's city; UTC when unknown.
    pub fn utc_offset(&self) -> FixedOffset {
        self.city
            .as_ref()
            .and_then(|c| FixedOffset::east_opt(c.timezone))
            .unwrap_or_else(utc)
    }

    pub fn days(&self) -> Vec<DailyForecast> {
        group_by_day(&self.list, self.utc_offset())
    }

    /// The first entry of the earliest day, shown as current conditions.
    pub fn current(&self) -> Option<&ForecastEntry> {
        let offset = self.utc_offset();
        self.list
            .iter()
            .min_by_key(|e| e.time().with_timezone(&offset).date_naive())
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{City, Clouds, Condition, GpsCoord, Measurements, Wind};

    pub(crate) fn entry(dt: i64, temp: f64, icon: &str) -> ForecastEntry {
        ForecastEntry {
            dt,
            main: Measurements {
                temp,
                feels_like: temp,
                temp_min: temp - 1.0,
                temp_max: temp + 1.0,
                pressure: 1013,
                sea_level: None,
                grnd_level: None,
                humidity: 50,
                temp_kf: None,
            },
            weather: vec![Condition {
                id: 800,
                main: "Clear".into(),
                description: "clear sky".into(),
                icon: icon.into(),
            }],
            clouds: Clouds::default(),
            wind: Wind { speed: 2.0, deg: 90, gust: None },
            visibility: Some(10_000),
            pop: 0.0,
            rain: None,
            snow: None,
            sys: None,
            dt_txt: String::new(),
        }
    }

    fn city(timezone: i32) -> City {
        City {
            id: 1,
            name: "Atlanta".into(),
            coord: GpsCoord::new(33.749, -84.388),
            country: "US".into(),
            population: 0,
            timezone,
            sunrise: 0,
            sunset: 0,
        }
    }

    // 2024-08-20T00:00:00Z
    const DAY0: i64 = 1_724_112_000;
    const HOUR: i64 = 3600;

    #[test]
    fn empty_list_has_no_days() {
        assert!(group_by_day(&[], utc()).is_empty());
        let resp = ForecastResponse::default();
        assert!(resp.days().is_empty());
        assert!(resp.current().is_none());
    }

    #[test]
    fn groups_three_hourly_entries_by_utc_date() {
        let entries: Vec<_> = (0..16).map(|i| entry(DAY0 + i * 3 * HOUR, 290.0, "01d")).collect();

        let days = group_by_day(&entries, utc());

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 8, 20).unwrap());
        assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2024, 8, 21).unwrap());
        assert_eq!(days[0].entries.len(), 8);
        assert_eq!(days[1].entries.len(), 8);
    }

    #[test]
    fn offset_moves_entries_across_midnight() {
        // 02:00Z on the 20th is still the 19th in UTC-4.
        let entries = vec![entry(DAY0 + 2 * HOUR, 290.0, "01n"), entry(DAY0 + 5 * HOUR, 291.0, "01n")];
        let eastern = FixedOffset::west_opt(4 * 3600).unwrap();

        let days = group_by_day(&entries, eastern);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 8, 19).unwrap());
        assert_eq!(days[1].date, NaiveDate::from_ymd_opt(2024, 8, 20).unwrap());
    }

    #[test]
    fn days_are_sorted_but_entries_keep_input_order() {
        let entries = vec![
            entry(DAY0 + 30 * HOUR, 280.0, "a"),
            entry(DAY0 + 3 * HOUR, 281.0, "b"),
            entry(DAY0 + 27 * HOUR, 282.0, "c"),
            entry(DAY0, 283.0, "d"),
        ];

        let days = group_by_day(&entries, utc());

        let icons: Vec<Vec<&str>> = days
            .iter()
            .map(|d| d.entries.iter().map(|e| e.icon()).collect())
            .collect();
        assert_eq!(icons, vec![vec!["b", "d"], vec!["a", "c"]]);
    }

    #[test]
    fn daily_aggregates() {
        let mut wet = entry(DAY0 + 15 * HOUR, 295.0, "10d");
        wet.pop = 0.6;
        let day = DailyForecast {
            date: NaiveDate::from_ymd_opt(2024, 8, 20).unwrap(),
            entries: vec![entry(DAY0 + 6 * HOUR, 285.0, "01d"), entry(DAY0 + 12 * HOUR, 300.0, "02d"), wet],
        };

        assert_eq!(day.low(), Some(284.0));
        assert_eq!(day.high(), Some(301.0));
        assert_eq!(day.max_pop(), 0.6);
        assert_eq!(day.representative(utc()).map(|e| e.icon()), Some("02d"));
    }

    #[test]
    fn empty_day_has_no_aggregates() {
        let day = DailyForecast {
            date: NaiveDate::from_ymd_opt(2024, 8, 20).unwrap(),
            entries: vec![],
        };
        assert_eq!(day.low(), None);
        assert_eq!(day.high(), None);
        assert_eq!(day.max_pop(), 0.0);
        assert!(day.representative(utc()).is_none());
    }

    #[test]
    fn response_uses_city_timezone() {
        let resp = ForecastResponse {
            list: vec![entry(DAY0 + 2 * HOUR, 290.0, "late"), entry(DAY0 + 6 * HOUR, 291.0, "early")],
            city: Some(city(-4 * 3600)),
            ..Default::default()
        };

        let days = resp.days();
        assert_eq!(days.len(), 2);
        assert_eq!(resp.current().map(|e| e.icon()), Some("late"));
    }

    #[test]
    fn invalid_timezone_falls_back_to_utc() {
        let resp = ForecastResponse {
            city: Some(city(100 * 3600)),
            ..Default::default()
        };
        assert_eq!(resp.utc_offset(), utc());
    }
}
