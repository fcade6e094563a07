//! Metric source configuration: which sources may supply a metric, in
//! which order, how fresh they must be, and how to estimate the metric when
//! none of them delivers.

use std::collections::HashSet;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, WeatherHubError};
use crate::time;

/// One entry of a metric's source priority list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePriority {
    pub source_id: String,
    /// Maximum accepted age of a reading from this source, in seconds.
    pub max_age_secs: u64,
}

impl SourcePriority {
    #[must_use]
    pub fn new(source_id: impl Into<String>, max_age_secs: u64) -> Self {
        Self {
            source_id: source_id.into(),
            max_age_secs,
        }
    }

    #[must_use]
    pub fn max_age(&self) -> TimeDelta {
        time::seconds(self.max_age_secs)
    }
}

/// Derive a metric from another, already fused metric:
/// `value = fused(from_metric) * factor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationRule {
    pub from_metric: String,
    pub factor: f64,
}

impl EstimationRule {
    #[must_use]
    pub fn new(from_metric: impl Into<String>, factor: f64) -> Self {
        Self {
            from_metric: from_metric.into(),
            factor,
        }
    }

    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.factor
    }
}

/// How a single metric is sourced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSourceConfig {
    pub metric: String,
    /// Sources in decreasing order of trust.
    #[serde(default)]
    pub sources: Vec<SourcePriority>,
    #[serde(default)]
    pub estimate: Option<EstimationRule>,
}

impl MetricSourceConfig {
    /// Create a config for `metric` with no sources yet.
    #[must_use]
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            sources: Vec::new(),
            estimate: None,
        }
    }

    /// Append a source to the priority list.
    #[must_use]
    pub fn source(mut self, source_id: impl Into<String>, max_age_secs: u64) -> Self {
        self.sources.push(SourcePriority::new(source_id, max_age_secs));
        self
    }

    /// Set the fallback estimation rule.
    #[must_use]
    pub fn estimate_from(mut self, from_metric: impl Into<String>, factor: f64) -> Self {
        self.estimate = Some(EstimationRule::new(from_metric, factor));
        self
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherHubError::Validation`] when:
    /// - `metric` is empty ([`ValidationError::EmptyMetric`])
    /// - there is neither a source nor an estimation rule ([`ValidationError::NoSources`])
    /// - a source id is empty or listed twice
    /// - the estimation factor is not finite, or the rule references `metric` itself
    pub fn validate(&self) -> Result<(), WeatherHubError> {
        if self.metric.is_empty() {
            return Err(ValidationError::EmptyMetric.into());
        }
        if self.sources.is_empty() && self.estimate.is_none() {
            return Err(ValidationError::NoSources {
                metric: self.metric.clone(),
            }
            .into());
        }
        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.source_id.is_empty() {
                return Err(ValidationError::EmptySourceId.into());
            }
            if !seen.insert(source.source_id.as_str()) {
                return Err(ValidationError::DuplicateSource {
                    metric: self.metric.clone(),
                    source_id: source.source_id.clone(),
                }
                .into());
            }
        }
        if let Some(rule) = &self.estimate {
            if !rule.factor.is_finite() {
                return Err(ValidationError::InvalidFactor {
                    metric: self.metric.clone(),
                    factor: rule.factor,
                }
                .into());
            }
            if rule.from_metric == self.metric {
                return Err(ValidationError::SelfEstimate {
                    metric: self.metric.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gust_config() -> MetricSourceConfig {
        MetricSourceConfig::new("wind_gust")
            .source("smhi", 3600)
            .source("yr", 3600)
            .estimate_from("wind_speed", 1.4)
    }

    #[test]
    fn should_accept_valid_config() {
        assert!(gust_config().validate().is_ok());
    }

    #[test]
    fn should_accept_estimate_only_config() {
        let config = MetricSourceConfig::new("wind_gust").estimate_from("wind_speed", 1.4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_return_validation_error_when_metric_is_empty() {
        let result = MetricSourceConfig::new("").source("smhi", 60).validate();
        assert!(matches!(
            result,
            Err(WeatherHubError::Validation(ValidationError::EmptyMetric))
        ));
    }

    #[test]
    fn should_return_validation_error_when_nothing_can_supply_metric() {
        let result = MetricSourceConfig::new("pressure").validate();
        assert!(matches!(
            result,
            Err(WeatherHubError::Validation(ValidationError::NoSources { .. }))
        ));
    }

    #[test]
    fn should_return_validation_error_when_source_listed_twice() {
        let result = MetricSourceConfig::new("pressure")
            .source("netatmo", 600)
            .source("netatmo", 900)
            .validate();
        assert!(matches!(
            result,
            Err(WeatherHubError::Validation(ValidationError::DuplicateSource { .. }))
        ));
    }

    #[test]
    fn should_return_validation_error_when_factor_is_not_finite() {
        let result = MetricSourceConfig::new("wind_gust")
            .estimate_from("wind_speed", f64::INFINITY)
            .validate();
        assert!(matches!(
            result,
            Err(WeatherHubError::Validation(ValidationError::InvalidFactor { .. }))
        ));
    }

    #[test]
    fn should_return_validation_error_when_estimating_from_itself() {
        let result = MetricSourceConfig::new("wind_gust")
            .estimate_from("wind_gust", 1.4)
            .validate();
        assert!(matches!(
            result,
            Err(WeatherHubError::Validation(ValidationError::SelfEstimate { .. }))
        ));
    }

    #[test]
    fn should_apply_estimation_factor() {
        let rule = EstimationRule::new("wind_speed", 1.4);
        assert!((rule.apply(10.0) - 14.0).abs() < 1e-9);
    }

    #[test]
    fn should_deserialize_from_toml_shape() {
        let json = serde_json::json!({
            "metric": "precipitation",
            "sources": [
                {"source_id": "netatmo", "max_age_secs": 600},
                {"source_id": "smhi_obs", "max_age_secs": 3600}
            ]
        });
        let config: MetricSourceConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].max_age(), TimeDelta::minutes(10));
        assert!(config.estimate.is_none());
    }
}
