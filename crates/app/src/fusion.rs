//! Data fusion: one authoritative value per metric.
//!
//! For each configured metric the resolver walks the source priority list
//! and takes the first source holding a usable reading (quality `ok`, a
//! finite value, younger than that source's TTL). When several readings of
//! the same source qualify, the most recent one wins. When no source
//! delivers, the metric's estimation rule (if any) derives it from another
//! already fused metric. Otherwise the metric is absent for the cycle.
//!
//! Metrics are resolved in dependency order so that an estimation rule
//! always sees its input metric.

use std::collections::{HashMap, HashSet};

use weatherhub_domain::error::{ValidationError, WeatherHubError};
use weatherhub_domain::fused::{FusedMetric, FusedMetrics};
use weatherhub_domain::metric::MetricSourceConfig;
use weatherhub_domain::reading::Reading;
use weatherhub_domain::time::Timestamp;

#[derive(Debug, Clone)]
pub struct FusionResolver {
    /// Configurations ordered so that every estimation input comes first.
    configs: Vec<MetricSourceConfig>,
}

impl FusionResolver {
    /// Validate the metric configurations and order them for resolution.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherHubError::Validation`] when a configuration is
    /// invalid on its own, a metric is configured twice, an estimation rule
    /// references an unconfigured metric, or estimation rules form a cycle.
    pub fn new(configs: Vec<MetricSourceConfig>) -> Result<Self, WeatherHubError> {
        let mut seen = HashSet::new();
        for config in &configs {
            config.validate()?;
            if !seen.insert(config.metric.as_str()) {
                return Err(ValidationError::DuplicateMetric {
                    metric: config.metric.clone(),
                }
                .into());
            }
        }

        let order = resolution_order(&configs)?;
        let mut slots: Vec<Option<MetricSourceConfig>> = configs.into_iter().map(Some).collect();
        let configs = order.into_iter().filter_map(|i| slots[i].take()).collect();
        Ok(Self { configs })
    }

    /// Configured metric names, in resolution order.
    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.configs.iter().map(|c| c.metric.as_str())
    }

    #[must_use]
    pub fn config(&self, metric: &str) -> Option<&MetricSourceConfig> {
        self.configs.iter().find(|c| c.metric == metric)
    }

    /// Resolve a single metric against this cycle's readings.
    ///
    /// `fused` holds the metrics resolved so far; an estimation rule can
    /// only use a metric found there. Returns `None` when the metric is
    /// not configured or nothing qualifies.
    #[must_use]
    pub fn resolve(
        &self,
        metric: &str,
        readings: &[Reading],
        fused: &FusedMetrics,
        now: Timestamp,
    ) -> Option<FusedMetric> {
        let config = self.config(metric)?;

        for priority in &config.sources {
            let best = readings
                .iter()
                .filter(|r| r.metric == config.metric && r.source_id == priority.source_id)
                .filter(|r| r.is_usable(priority.max_age(), now))
                .max_by_key(|r| r.observed_at);
            if let Some(reading) = best
                && let Some(value) = reading.value
            {
                tracing::debug!(metric, source_id = %priority.source_id, value, "measured");
                return Some(FusedMetric::measured(
                    metric,
                    value,
                    &priority.source_id,
                    reading.observed_at,
                    now,
                ));
            }
            tracing::debug!(metric, source_id = %priority.source_id, "no usable reading");
        }

        let rule = config.estimate.as_ref()?;
        let Some(from) = fused.get(&rule.from_metric) else {
            tracing::debug!(metric, from_metric = %rule.from_metric, "estimation input absent");
            return None;
        };
        let value = rule.apply(from.value);
        if !value.is_finite() {
            return None;
        }
        tracing::debug!(
            metric,
            from_metric = %rule.from_metric,
            factor = rule.factor,
            value,
            "estimated"
        );
        Some(FusedMetric::estimated(metric, value, from, now))
    }

    /// Resolve every configured metric.
    #[must_use]
    pub fn resolve_all(&self, readings: &[Reading], now: Timestamp) -> FusedMetrics {
        let mut fused = FusedMetrics::new();
        for config in &self.configs {
            match self.resolve(&config.metric, readings, &fused, now) {
                Some(metric) => {
                    fused.insert(metric);
                }
                None => tracing::debug!(metric = %config.metric, "absent this cycle"),
            }
        }
        fused
    }
}

/// Indices of `configs` such that each estimation input precedes the
/// metrics estimated from it.
fn resolution_order(configs: &[MetricSourceConfig]) -> Result<Vec<usize>, WeatherHubError> {
    let index: HashMap<&str, usize> = configs
        .iter()
        .enumerate()
        .map(|(i, c)| (c.metric.as_str(), i))
        .collect();

    let mut placed = vec![false; configs.len()];
    let mut order = Vec::with_capacity(configs.len());

    for start in 0..configs.len() {
        // every metric has at most one estimation input, so dependencies form chains
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            if placed[i] {
                break;
            }
            if chain.contains(&i) {
                return Err(ValidationError::EstimationCycle {
                    metric: configs[i].metric.clone(),
                }
                .into());
            }
            chain.push(i);
            current = match &configs[i].estimate {
                Some(rule) => Some(*index.get(rule.from_metric.as_str()).ok_or_else(|| {
                    ValidationError::UnknownEstimateSource {
                        metric: configs[i].metric.clone(),
                        from_metric: rule.from_metric.clone(),
                    }
                })?),
                None => None,
            };
        }
        for &i in chain.iter().rev() {
            placed[i] = true;
            order.push(i);
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use weatherhub_domain::fused::SourceKind;
    use weatherhub_domain::reading::Quality;

    const STATION: &str = "netatmo";
    const FORECAST: &str = "smhi";

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 10, 12, 14, 0, 0).unwrap()
    }

    fn reading(metric: &str, source: &str, value: f64, age_secs: i64) -> Reading {
        Reading::builder()
            .metric(metric)
            .source_id(source)
            .value(value)
            .observed_at(now() - TimeDelta::seconds(age_secs))
            .quality(Quality::Ok)
            .build()
            .unwrap()
    }

    fn wind_configs() -> Vec<MetricSourceConfig> {
        vec![
            MetricSourceConfig::new("wind_gust")
                .source(FORECAST, 3600)
                .estimate_from("wind_speed", 1.4),
            MetricSourceConfig::new("wind_speed").source(FORECAST, 3600),
        ]
    }

    fn temperature_config() -> MetricSourceConfig {
        MetricSourceConfig::new("temperature")
            .source(STATION, 600)
            .source(FORECAST, 3600)
    }

    #[test]
    fn should_take_value_of_single_valid_reading() {
        let resolver = FusionResolver::new(vec![temperature_config()]).unwrap();
        let fused = resolver.resolve_all(&[reading("temperature", STATION, 11.3, 60)], now());

        let temperature = fused.get("temperature").unwrap();
        assert!((temperature.value - 11.3).abs() < f64::EPSILON);
        assert_eq!(temperature.source_kind, SourceKind::Measured);
        assert_eq!(temperature.source_id, STATION);
    }

    #[test]
    fn should_carry_observation_time_of_selected_reading() {
        let resolver = FusionResolver::new(wind_configs()).unwrap();
        let fused = resolver.resolve_all(&[reading("wind_speed", FORECAST, 10.0, 1200)], now());

        let speed = fused.get("wind_speed").unwrap();
        assert_eq!(speed.observed_at, now() - TimeDelta::minutes(20));
        assert_eq!(speed.fused_at, now());
        let gust = fused.get("wind_gust").unwrap();
        assert_eq!(gust.age(), TimeDelta::minutes(20));
    }

    #[test]
    fn should_prefer_higher_priority_source_when_both_are_valid() {
        let resolver = FusionResolver::new(vec![temperature_config()]).unwrap();
        let readings = [
            reading("temperature", FORECAST, 9.0, 60),
            reading("temperature", STATION, 11.3, 60),
        ];
        let fused = resolver.resolve_all(&readings, now());
        assert_eq!(fused.get("temperature").unwrap().source_id, STATION);
    }

    #[test]
    fn should_fall_through_to_next_source_when_reading_is_stale() {
        let resolver = FusionResolver::new(vec![temperature_config()]).unwrap();
        let readings = [
            reading("temperature", STATION, 11.3, 601),
            reading("temperature", FORECAST, 9.0, 60),
        ];
        let fused = resolver.resolve_all(&readings, now());
        assert_eq!(fused.get("temperature").unwrap().source_id, FORECAST);
    }

    #[test]
    fn should_accept_reading_exactly_at_ttl() {
        let resolver = FusionResolver::new(vec![temperature_config()]).unwrap();
        let fused = resolver.resolve_all(&[reading("temperature", STATION, 11.3, 600)], now());
        assert_eq!(fused.get("temperature").unwrap().source_id, STATION);
    }

    #[test]
    fn should_skip_reading_with_bad_quality() {
        let resolver = FusionResolver::new(vec![temperature_config()]).unwrap();
        let mut stale = reading("temperature", STATION, 11.3, 10);
        stale.quality = Quality::Stale;
        let fused = resolver.resolve_all(&[stale, reading("temperature", FORECAST, 9.0, 60)], now());
        assert_eq!(fused.get("temperature").unwrap().source_id, FORECAST);
    }

    #[test]
    fn should_skip_non_finite_value() {
        let resolver = FusionResolver::new(vec![temperature_config()]).unwrap();
        let fused = resolver.resolve_all(&[reading("temperature", STATION, f64::NAN, 10)], now());
        assert!(!fused.contains("temperature"));
    }

    #[test]
    fn should_pick_most_recent_reading_of_a_source() {
        let resolver = FusionResolver::new(vec![temperature_config()]).unwrap();
        let readings = [
            reading("temperature", STATION, 10.0, 300),
            reading("temperature", STATION, 12.0, 30),
            reading("temperature", STATION, 11.0, 120),
        ];
        let fused = resolver.resolve_all(&readings, now());
        assert!((fused.value("temperature").unwrap() - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn should_ignore_sources_not_in_priority_list() {
        let resolver = FusionResolver::new(vec![temperature_config()]).unwrap();
        let fused = resolver.resolve_all(&[reading("temperature", "yr", 8.0, 10)], now());
        assert!(fused.is_empty());
    }

    #[test]
    fn should_estimate_gust_from_wind_speed_when_no_gust_reading() {
        let resolver = FusionResolver::new(wind_configs()).unwrap();
        let fused = resolver.resolve_all(&[reading("wind_speed", FORECAST, 10.0, 60)], now());

        let gust = fused.get("wind_gust").unwrap();
        assert!((gust.value - 14.0).abs() < 1e-9);
        assert_eq!(gust.source_kind, SourceKind::Estimated);
        assert_eq!(gust.derived_from.as_deref(), Some("wind_speed"));
        assert_eq!(gust.source_id, FORECAST);
    }

    #[test]
    fn should_prefer_measured_gust_over_estimate() {
        let resolver = FusionResolver::new(wind_configs()).unwrap();
        let readings = [
            reading("wind_speed", FORECAST, 10.0, 60),
            reading("wind_gust", FORECAST, 12.0, 60),
        ];
        let gust = resolver.resolve_all(&readings, now()).get("wind_gust").cloned().unwrap();
        assert_eq!(gust.source_kind, SourceKind::Measured);
        assert!((gust.value - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn should_leave_metric_absent_when_estimation_input_is_absent() {
        let resolver = FusionResolver::new(wind_configs()).unwrap();
        let fused = resolver.resolve_all(&[], now());
        assert!(fused.is_empty());
    }

    #[test]
    fn should_resolve_estimation_chains_regardless_of_declaration_order() {
        let resolver = FusionResolver::new(vec![
            MetricSourceConfig::new("c").estimate_from("b", 2.0),
            MetricSourceConfig::new("b").estimate_from("a", 3.0),
            MetricSourceConfig::new("a").source(STATION, 60),
        ])
        .unwrap();
        assert_eq!(resolver.metrics().collect::<Vec<_>>(), vec!["a", "b", "c"]);

        let fused = resolver.resolve_all(&[reading("a", STATION, 1.0, 0)], now());
        assert!((fused.value("c").unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn should_produce_at_most_one_value_per_metric() {
        let resolver = FusionResolver::new(vec![temperature_config()]).unwrap();
        let readings = [
            reading("temperature", STATION, 11.0, 10),
            reading("temperature", FORECAST, 9.0, 10),
        ];
        assert_eq!(resolver.resolve_all(&readings, now()).len(), 1);
    }

    #[test]
    fn should_return_none_when_resolving_unconfigured_metric() {
        let resolver = FusionResolver::new(vec![temperature_config()]).unwrap();
        let readings = [reading("humidity", STATION, 80.0, 10)];
        assert!(resolver.resolve("humidity", &readings, &FusedMetrics::new(), now()).is_none());
    }

    #[test]
    fn should_reject_duplicate_metric() {
        let result = FusionResolver::new(vec![temperature_config(), temperature_config()]);
        assert!(matches!(
            result,
            Err(WeatherHubError::Validation(ValidationError::DuplicateMetric { .. }))
        ));
    }

    #[test]
    fn should_reject_estimate_from_unconfigured_metric() {
        let result = FusionResolver::new(vec![
            MetricSourceConfig::new("wind_gust").estimate_from("wind_speed", 1.4),
        ]);
        assert!(matches!(
            result,
            Err(WeatherHubError::Validation(ValidationError::UnknownEstimateSource { .. }))
        ));
    }

    #[test]
    fn should_reject_estimation_cycle() {
        let result = FusionResolver::new(vec![
            MetricSourceConfig::new("a").estimate_from("b", 1.0),
            MetricSourceConfig::new("b").estimate_from("a", 1.0),
        ]);
        assert!(matches!(
            result,
            Err(WeatherHubError::Validation(ValidationError::EstimationCycle { .. }))
        ));
    }
}
