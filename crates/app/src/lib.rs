//! # weatherhub-app
//!
//! Application layer: the update cycle and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `ReadingSource`: one weather data provider
//!   - `SnapshotStore`: state carried between cycles
//! - Provide the cycle's stages:
//!   - `ReadingCollector`: concurrent, deadline-bound fetching
//!   - `FusionResolver`: one fused value per metric, with estimation fallback
//!   - `ContextBuilder`: the variable map conditions are evaluated against
//!   - `TriggerRegistry` / `activate`: per-section module activation
//! - `CycleRunner` wires the stages into one cycle
//!
//! ## Dependency rule
//! Depends on `weatherhub-domain` only (plus `tokio` for task and timer
//! primitives). Never imports adapter crates. Adapters depend on *this*
//! crate, not the reverse.

pub mod activation;
pub mod collector;
pub mod context_builder;
pub mod cycle;
pub mod fusion;
pub mod ports;
