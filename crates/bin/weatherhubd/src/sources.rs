//! Builds the configured reading sources.

use std::future::Future;

use weatherhub_adapter_json_file::JsonFileSource;
use weatherhub_adapter_virtual::{VirtualForecast, VirtualSource, VirtualStation};
use weatherhub_app::ports::ReadingSource;
use weatherhub_domain::error::WeatherHubError;
use weatherhub_domain::reading::Reading;

use crate::config::SourceConfig;

/// Any source the daemon knows how to build.
pub enum ConfiguredSource {
    Virtual(VirtualSource),
    File(JsonFileSource),
}

impl ReadingSource for ConfiguredSource {
    fn source_id(&self) -> &str {
        match self {
            Self::Virtual(s) => s.source_id(),
            Self::File(s) => s.source_id(),
        }
    }

    fn fetch(&self) -> impl Future<Output = Result<Vec<Reading>, WeatherHubError>> + Send {
        async move {
            match self {
                Self::Virtual(s) => s.fetch().await,
                Self::File(s) => s.fetch().await,
            }
        }
    }
}

impl SourceConfig {
    #[must_use]
    pub fn build(&self) -> ConfiguredSource {
        match self {
            Self::VirtualStation { id, values } => ConfiguredSource::Virtual(
                VirtualSource::Station(VirtualStation::new(id.clone(), values.clone())),
            ),
            Self::VirtualForecast { id, values } => ConfiguredSource::Virtual(
                VirtualSource::Forecast(VirtualForecast::new(id.clone(), values.clone())),
            ),
            Self::File { id, path } => {
                ConfiguredSource::File(JsonFileSource::new(id.clone(), path.clone()))
            }
        }
    }
}
