//! Reading: one source's observation of one metric for the current cycle.
//!
//! Readings are produced by reading sources (adapters), are immutable once
//! built and only live for the cycle that collected them.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, WeatherHubError};
use crate::time::{self, Timestamp};

/// Quality flag attached by the producing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    Ok,
    Stale,
    Missing,
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Stale => f.write_str("stale"),
            Self::Missing => f.write_str("missing"),
        }
    }
}

/// A single observation of a metric by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Logical metric name, e.g. `wind_speed`.
    pub metric: String,
    /// Observed value; `None` when the source had nothing to report.
    pub value: Option<f64>,
    /// Display unit, e.g. `m/s`. Informational only.
    #[serde(default)]
    pub unit: String,
    pub source_id: String,
    pub observed_at: Timestamp,
    #[serde(default)]
    pub quality: Quality,
}

impl Reading {
    /// Create a builder for constructing a [`Reading`].
    #[must_use]
    pub fn builder() -> ReadingBuilder {
        ReadingBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherHubError::Validation`] when `metric` or `source_id`
    /// is empty.
    pub fn validate(&self) -> Result<(), WeatherHubError> {
        if self.metric.is_empty() {
            return Err(ValidationError::EmptyMetric.into());
        }
        if self.source_id.is_empty() {
            return Err(ValidationError::EmptySourceId.into());
        }
        Ok(())
    }

    /// Age of the reading at `now`. Readings stamped in the future have a
    /// zero age.
    #[must_use]
    pub fn age(&self, now: Timestamp) -> TimeDelta {
        (now - self.observed_at).max(TimeDelta::zero())
    }

    /// Whether this reading can be used for fusion: quality `ok`, a finite
    /// value, and no older than `max_age` at `now`.
    #[must_use]
    pub fn is_usable(&self, max_age: TimeDelta, now: Timestamp) -> bool {
        self.quality == Quality::Ok
            && self.value.is_some_and(f64::is_finite)
            && self.age(now) <= max_age
    }
}

/// Step-by-step builder for [`Reading`].
#[derive(Debug, Default)]
pub struct ReadingBuilder {
    metric: Option<String>,
    value: Option<f64>,
    unit: Option<String>,
    source_id: Option<String>,
    observed_at: Option<Timestamp>,
    quality: Option<Quality>,
}

impl ReadingBuilder {
    #[must_use]
    pub fn metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = Some(metric.into());
        self
    }

    #[must_use]
    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    #[must_use]
    pub fn observed_at(mut self, ts: Timestamp) -> Self {
        self.observed_at = Some(ts);
        self
    }

    #[must_use]
    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Consume the builder, validate, and return a [`Reading`].
    ///
    /// A reading built without a value is flagged [`Quality::Missing`]
    /// unless a quality was set explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherHubError::Validation`] if `metric` or `source_id`
    /// is missing or empty.
    pub fn build(self) -> Result<Reading, WeatherHubError> {
        let quality = self.quality.unwrap_or(if self.value.is_some() {
            Quality::Ok
        } else {
            Quality::Missing
        });
        let reading = Reading {
            metric: self.metric.unwrap_or_default(),
            value: self.value,
            unit: self.unit.unwrap_or_default(),
            source_id: self.source_id.unwrap_or_default(),
            observed_at: self.observed_at.unwrap_or_else(time::now),
            quality,
        };
        reading.validate()?;
        Ok(reading)
    }
}
