//! # weatherhub-adapter-json-file
//!
//! JSON-on-disk implementations of the application ports.
//!
//! ## Provided adapters
//! - [`JsonFileSource`]: a [`ReadingSource`](weatherhub_app::ports::ReadingSource)
//!   reading a JSON array of readings, written by an external fetcher
//! - [`JsonSnapshotStore`]: a [`SnapshotStore`](weatherhub_app::ports::SnapshotStore)
//!   keeping the state carried between cycles
//! - [`load_overrides`]: reads the debug context overrides file
//!
//! A missing file is never an error: it reads as "no readings", an empty
//! snapshot, or no overrides.
//!
//! ## Dependency rule
//!
//! Depends on `weatherhub-app` (port traits) and `weatherhub-domain` only.

mod error;
mod overrides;
mod reading_file;
mod snapshot_store;

pub use error::JsonFileError;
pub use overrides::load_overrides;
pub use reading_file::JsonFileSource;
pub use snapshot_store::JsonSnapshotStore;

use std::path::Path;

/// Read a file, mapping "not found" to `None`.
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, JsonFileError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(JsonFileError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
