//! Virtual local weather station.

use chrono::TimeDelta;
use serde::Deserialize;
use std::future::Future;

use weatherhub_app::ports::ReadingSource;
use weatherhub_domain::error::WeatherHubError;
use weatherhub_domain::reading::{Quality, Reading};
use weatherhub_domain::time::{self, Timestamp};

/// Values reported by a [`VirtualStation`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StationSettings {
    pub temperature: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub precipitation: f64,
    /// How old the readings are when fetched.
    pub age_secs: u64,
    /// Report every reading with `stale` quality, as a station that lost
    /// contact with its outdoor module does.
    pub stale: bool,
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            temperature: 12.4,
            pressure: 1013.2,
            humidity: 78.0,
            precipitation: 0.0,
            age_secs: 120,
            stale: false,
        }
    }
}

/// A simulated local station.
pub struct VirtualStation {
    source_id: String,
    settings: StationSettings,
}

impl Default for VirtualStation {
    fn default() -> Self {
        Self::new("station", StationSettings::default())
    }
}

impl VirtualStation {
    #[must_use]
    pub fn new(source_id: impl Into<String>, settings: StationSettings) -> Self {
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
        let observed_at = now - time::seconds(s.age_secs).min(TimeDelta::days(365));
        let quality = if s.stale { Quality::Stale } else { Quality::Ok };

        [
            ("temperature", s.temperature, "\u{b0}C"),
            ("pressure", s.pressure, "hPa"),
            ("humidity", s.humidity, "%"),
            ("precipitation", s.precipitation, "mm/h"),
        ]
        .into_iter()
        .map(|(metric, value, unit)| {
            super::reading(&self.source_id, metric, value, unit, observed_at, quality)
        })
        .collect()
    }
}

impl ReadingSource for VirtualStation {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn fetch(&self) -> impl Future<Output = Result<Vec<Reading>, WeatherHubError>> + Send {
        let readings = self.readings(time::now());
        async { readings }
    }
}
