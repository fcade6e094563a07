//! JSON file adapter error types.

use std::path::PathBuf;

use weatherhub_domain::error::WeatherHubError;

/// Errors specific to the JSON file adapter.
#[derive(Debug, thiserror::Error)]
pub enum JsonFileError {
    /// Reading or writing the file failed.
    #[error("io error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file content is not the expected JSON document.
    #[error("invalid json in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A domain-level error (validation, etc.).
    #[error("domain error")]
    Domain(#[source] WeatherHubError),
}

impl JsonFileError {
    /// Convert into a [`WeatherHubError::Source`] for propagation across
    /// port boundaries.
    #[must_use]
    pub fn into_domain(self) -> WeatherHubError {
        match self {
            Self::Domain(err) => err,
            other => WeatherHubError::Source(Box::new(other)),
        }
    }
}

impl From<JsonFileError> for WeatherHubError {
    fn from(err: JsonFileError) -> Self {
        err.into_domain()
    }
}
