//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the cycle pipeline and the outside
//! world: where readings come from and where the state carried between
//! cycles is kept.

pub mod reading_source;
pub mod snapshot_store;

pub use reading_source::ReadingSource;
pub use snapshot_store::SnapshotStore;
