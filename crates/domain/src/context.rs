//! Evaluation context: the flat variable → value mapping trigger
//! conditions are evaluated against.
//!
//! A context is built fresh every cycle and discarded afterwards. Looking up
//! a variable that was never bound yields [`NEUTRAL_VALUE`], so evaluating a
//! condition never fails on missing data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value bound to metrics that are absent this cycle.
pub const NEUTRAL_VALUE: f64 = 0.0;

/// Local hour of day, 0–23.
pub const VAR_TIME_HOUR: &str = "time_hour";
/// Local month of year, 1–12.
pub const VAR_TIME_MONTH: &str = "time_month";
/// Pressure tendency code: 1 rising, -1 falling, 0 otherwise.
pub const VAR_PRESSURE_TREND: &str = "pressure_trend";

/// Variables bound by the context builder rather than by fusion.
pub const DERIVED_VARIABLES: [&str; 3] = [VAR_TIME_HOUR, VAR_TIME_MONTH, VAR_PRESSURE_TREND];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationContext(BTreeMap<String, f64>);

impl EvaluationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, replacing any previous binding.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    /// Chainable variant of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    /// Value of `name`, or [`NEUTRAL_VALUE`] when unbound.
    #[must_use]
    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(NEUTRAL_VALUE)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for EvaluationContext {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
