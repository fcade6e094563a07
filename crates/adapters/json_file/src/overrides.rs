//! Debug context overrides file.

use std::path::Path;

use weatherhub_domain::error::WeatherHubError;
use weatherhub_domain::overrides::ContextOverrides;

use crate::JsonFileError;

/// Read context overrides from `path`. A missing file means no overrides.
///
/// # Errors
///
/// Returns [`WeatherHubError::Source`] when the file cannot be read or is
/// not a valid overrides document.
pub async fn load_overrides(path: &Path) -> Result<Option<ContextOverrides>, WeatherHubError> {
    let Some(bytes) = crate::read_optional(path).await? else {
        return Ok(None);
    };
    let overrides = serde_json::from_slice(&bytes).map_err(|source| JsonFileError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(overrides))
}
