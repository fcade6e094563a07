//! Snapshot store port: persistence for the state carried between cycles.

use std::future::Future;

use weatherhub_domain::error::WeatherHubError;
use weatherhub_domain::snapshot::CycleSnapshot;

pub trait SnapshotStore {
    /// Load the previous cycle's snapshot. A store that has never been
    /// written returns [`CycleSnapshot::default`].
    fn load(&self) -> impl Future<Output = Result<CycleSnapshot, WeatherHubError>> + Send;

    /// Replace the stored snapshot.
    fn save(
        &self,
        snapshot: &CycleSnapshot,
    ) -> impl Future<Output = Result<(), WeatherHubError>> + Send;
}
