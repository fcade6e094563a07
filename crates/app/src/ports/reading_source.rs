//! Reading source port: one weather data provider.

use std::future::Future;

use weatherhub_domain::error::WeatherHubError;
use weatherhub_domain::reading::Reading;

/// A provider of [`Reading`]s, fetched once per cycle.
///
/// Transport and encoding are the adapter's business. A source that has
/// nothing to report returns an empty list rather than an error.
pub trait ReadingSource {
    /// Stable identifier used in metric priority lists.
    fn source_id(&self) -> &str;

    /// Fetch the source's current readings.
    fn fetch(&self) -> impl Future<Output = Result<Vec<Reading>, WeatherHubError>> + Send;
}
