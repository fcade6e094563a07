//! # weatherhub-adapter-virtual
//!
//! Virtual reading sources that produce configurable, deterministic
//! readings. Used for demonstrations, bench setups and end-to-end tests.
//!
//! ## Provided sources
//!
//! | Source | Default id | Metrics |
//! |--------|------------|---------|
//! | [`VirtualStation`] | `station` | `temperature`, `pressure`, `humidity`, `precipitation` |
//! | [`VirtualForecast`] | `forecast` | `wind_speed`, `wind_direction`, `wind_gust`, `precipitation`, `precipitation_type`, `temperature` |
//!
//! ## Dependency rule
//!
//! Depends on `weatherhub-app` (port traits) and `weatherhub-domain` only.

mod sources;

pub use sources::{ForecastSettings, StationSettings, VirtualForecast, VirtualSource, VirtualStation};
