//! Virtual forecast provider: the remote source of wind data.

use serde::Deserialize;
use std::future::Future;

use weatherhub_app::ports::ReadingSource;
use weatherhub_domain::error::WeatherHubError;
use weatherhub_domain::reading::{Quality, Reading};
use weatherhub_domain::time::{self, Timestamp};

/// Values reported by a [`VirtualForecast`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub wind_speed: f64,
    pub wind_direction: f64,
    /// Some providers have no gust data; `None` leaves the metric out.
    pub wind_gust: Option<f64>,
    pub precipitation: f64,
    /// Provider-specific precipitation category code, passed through as is.
    pub precipitation_type: f64,
    pub temperature: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            wind_speed: 4.2,
            wind_direction: 225.0,
            wind_gust: Some(7.1),
            precipitation: 0.0,
            precipitation_type: 0.0,
            temperature: 11.8,
        }
    }
}

/// A simulated forecast provider. Its readings are always current.
pub struct VirtualForecast {
    source_id: String,
    settings: ForecastSettings,
}

impl Default for VirtualForecast {
    fn default() -> Self {
        Self::new("forecast", ForecastSettings::default())
    }
}

impl VirtualForecast {
    #[must_use]
    pub fn new(source_id: impl Into<String>, settings: ForecastSettings) -> Self {
        Self {
            source_id: source_id.into(),
            settings,
        }
    }

    /// Readings as observed at `now`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the source id is empty.
    pub fn readings(&self, now: Timestamp) -> Result<Vec<Reading>, WeatherHubError> {
        let s = &self.settings;
        let values = [
            ("wind_speed", Some(s.wind_speed), "m/s"),
            ("wind_direction", Some(s.wind_direction), "\u{b0}"),
            ("wind_gust", s.wind_gust, "m/s"),
            ("precipitation", Some(s.precipitation), "mm/h"),
            ("precipitation_type", Some(s.precipitation_type), ""),
            ("temperature", Some(s.temperature), "\u{b0}C"),
        ];

        values
            .into_iter()
            .filter_map(|(metric, value, unit)| value.map(|v| (metric, v, unit)))
            .map(|(metric, value, unit)| {
                super::reading(&self.source_id, metric, value, unit, now, Quality::Ok)
            })
            .collect()
    }
}

impl ReadingSource for VirtualForecast {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn fetch(&self) -> impl Future<Output = Result<Vec<Reading>, WeatherHubError>> + Send {
        let readings = self.readings(time::now());
        async { readings }
    }
}
