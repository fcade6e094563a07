//! File-backed reading source.
//!
//! An external fetcher (cron job, provider script) drops a JSON array of
//! readings at a known path; each cycle reads whatever is there.

use std::future::Future;
use std::path::PathBuf;

use weatherhub_app::ports::ReadingSource;
use weatherhub_domain::error::WeatherHubError;
use weatherhub_domain::reading::Reading;

use crate::JsonFileError;

pub struct JsonFileSource {
    source_id: String,
    path: PathBuf,
}

impl JsonFileSource {
    #[must_use]
    pub fn new(source_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.into(),
            path: path.into(),
        }
    }

    async fn read(&self) -> Result<Vec<Reading>, JsonFileError> {
        let Some(bytes) = crate::read_optional(&self.path).await? else {
            tracing::debug!(source_id = %self.source_id, path = %self.path.display(), "no reading file");
            return Ok(Vec::new());
        };
        let readings: Vec<Reading> =
            serde_json::from_slice(&bytes).map_err(|source| JsonFileError::Json {
                path: self.path.clone(),
                source,
            })?;

        // the file names its own source ids; keep only ours
        Ok(readings
            .into_iter()
            .filter(|r| r.source_id == self.source_id)
            .collect())
    }
}

impl ReadingSource for JsonFileSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn fetch(&self) -> impl Future<Output = Result<Vec<Reading>, WeatherHubError>> + Send {
        async { self.read().await.map_err(JsonFileError::into_domain) }
    }
}
