//! Virtual source implementations: local station and forecast provider.

mod forecast;
mod station;

use std::future::Future;

pub use forecast::{ForecastSettings, VirtualForecast};
pub use station::{StationSettings, VirtualStation};

use weatherhub_app::ports::ReadingSource;
use weatherhub_domain::error::WeatherHubError;
use weatherhub_domain::reading::{Quality, Reading};
use weatherhub_domain::time::{self, Timestamp};

/// Wrapper enum for the concrete virtual source types.
pub enum VirtualSource {
    Station(VirtualStation),
    Forecast(VirtualForecast),
}

impl ReadingSource for VirtualSource {
    fn source_id(&self) -> &str {
        match self {
            Self::Station(s) => s.source_id(),
            Self::Forecast(s) => s.source_id(),
        }
    }

    fn fetch(&self) -> impl Future<Output = Result<Vec<Reading>, WeatherHubError>> + Send {
        let readings = match self {
            Self::Station(s) => s.readings(time::now()),
            Self::Forecast(s) => s.readings(time::now()),
        };
        async { readings }
    }
}

/// Build one reading; shared by both virtual sources.
fn reading(
    source_id: &str,
    metric: &str,
    value: f64,
    unit: &str,
    observed_at: Timestamp,
    quality: Quality,
) -> Result<Reading, WeatherHubError> {
    Reading::builder()
        .metric(metric)
        .value(value)
        .unit(unit)
        .source_id(source_id)
        .observed_at(observed_at)
        .quality(quality)
        .build()
}
