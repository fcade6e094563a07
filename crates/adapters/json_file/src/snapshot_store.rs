//! JSON file snapshot store.

use std::future::Future;
use std::path::{Path, PathBuf};

use weatherhub_app::ports::SnapshotStore;
use weatherhub_domain::error::WeatherHubError;
use weatherhub_domain::snapshot::CycleSnapshot;

use crate::JsonFileError;

/// Keeps the [`CycleSnapshot`] in a single JSON file. Writes go through a
/// sibling temporary file and a rename, so a crash mid-write leaves the
/// previous snapshot intact.
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<CycleSnapshot, JsonFileError> {
        match crate::read_optional(&self.path).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|source| JsonFileError::Json {
                path: self.path.clone(),
                source,
            }),
            None => Ok(CycleSnapshot::default()),
        }
    }

    async fn write(&self, snapshot: &CycleSnapshot) -> Result<(), JsonFileError> {
        let io_err = |source| JsonFileError::Io {
            path: self.path.clone(),
            source,
        };

        let bytes = serde_json::to_vec_pretty(snapshot).map_err(|source| JsonFileError::Json {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        tracing::debug!(path = %self.path.display(), "snapshot saved");
        Ok(())
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> impl Future<Output = Result<CycleSnapshot, WeatherHubError>> + Send {
        async { self.read().await.map_err(JsonFileError::into_domain) }
    }

    fn save(
        &self,
        snapshot: &CycleSnapshot,
    ) -> impl Future<Output = Result<(), WeatherHubError>> + Send {
        let snapshot = snapshot.clone();
        async move { self.write(&snapshot).await.map_err(JsonFileError::into_domain) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use weatherhub_domain::module_state::{ModuleState, ModuleStates};

    fn snapshot() -> CycleSnapshot {
        let since = Utc.with_ymd_and_hms(2024, 10, 12, 14, 0, 0).unwrap();
        let mut snapshot = CycleSnapshot {
            module_states: std::iter::once(ModuleState::active(
                "bottom_section",
                "wind_group",
                "wind_warning",
                since,
            ))
            .collect::<ModuleStates>(),
            ..CycleSnapshot::default()
        };
        snapshot.pressure_history.record(since, 1009.8);
        snapshot
    }

    #[tokio::test]
    async fn should_load_empty_snapshot_when_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().await.unwrap(), CycleSnapshot::default());
    }

    #[tokio::test]
    async fn should_load_what_was_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("nested").join("state.json"));
        store.save(&snapshot()).await.unwrap();

        assert_eq!(store.load().await.unwrap(), snapshot());
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn should_return_source_error_when_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{\"module_states\": 3}").unwrap();

        let err = JsonSnapshotStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, WeatherHubError::Source(_)));
    }
}
