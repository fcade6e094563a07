//! # weatherhub-domain
//!
//! Pure domain model for the weatherhub display controller.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps, cycle identifiers
//! - Define **Readings** (one source's observation of one metric)
//! - Define **Metric source configuration** (priority lists, TTLs, estimation rules)
//! - Define **Fused metrics** (one authoritative value per metric, with attribution)
//! - Define the **Evaluation context** and the **condition grammar** evaluated against it
//! - Define **Triggers** and per-section **Module state**
//! - Pressure-trend bookkeeping and debug context overrides
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod condition;
pub mod context;
pub mod fused;
pub mod metric;
pub mod module_state;
pub mod overrides;
pub mod pressure;
pub mod reading;
pub mod snapshot;
pub mod trigger;
