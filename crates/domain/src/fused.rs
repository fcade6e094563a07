//! Fused metric: the single authoritative value of a metric for one cycle.

use std::collections::BTreeMap;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Whether a fused value was observed directly or derived from another metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Measured,
    Estimated,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Measured => f.write_str("measured"),
            Self::Estimated => f.write_str("estimated"),
        }
    }
}

/// One metric's fused value with its attribution.
///
/// For estimated values `source_id` is the source of the metric the estimate
/// was derived from, and `derived_from` names that metric. `observed_at` is
/// when the underlying reading was taken, so renderers can show its age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedMetric {
    pub metric: String,
    pub value: f64,
    pub source_id: String,
    pub source_kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,
    pub observed_at: Timestamp,
    pub fused_at: Timestamp,
}

impl FusedMetric {
    /// A value taken directly from a source's reading.
    #[must_use]
    pub fn measured(
        metric: impl Into<String>,
        value: f64,
        source_id: impl Into<String>,
        observed_at: Timestamp,
        fused_at: Timestamp,
    ) -> Self {
        Self {
            metric: metric.into(),
            value,
            source_id: source_id.into(),
            source_kind: SourceKind::Measured,
            derived_from: None,
            observed_at,
            fused_at,
        }
    }

    /// A value derived from another fused metric.
    #[must_use]
    pub fn estimated(
        metric: impl Into<String>,
        value: f64,
        from: &FusedMetric,
        fused_at: Timestamp,
    ) -> Self {
        Self {
            metric: metric.into(),
            value,
            source_id: from.source_id.clone(),
            source_kind: SourceKind::Estimated,
            derived_from: Some(from.metric.clone()),
            observed_at: from.observed_at,
            fused_at,
        }
    }

    #[must_use]
    pub fn is_estimated(&self) -> bool {
        self.source_kind == SourceKind::Estimated
    }

    /// Age of the underlying reading when it was fused. Never negative.
    #[must_use]
    pub fn age(&self) -> TimeDelta {
        (self.fused_at - self.observed_at).max(TimeDelta::zero())
    }
}

/// The set of metrics fused in one cycle, at most one per metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FusedMetrics(BTreeMap<String, FusedMetric>);

impl FusedMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fused metric, replacing any previous value for the same
    /// metric name.
    pub fn insert(&mut self, fused: FusedMetric) -> Option<FusedMetric> {
        self.0.insert(fused.metric.clone(), fused)
    }

    #[must_use]
    pub fn get(&self, metric: &str) -> Option<&FusedMetric> {
        self.0.get(metric)
    }

    #[must_use]
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.0.get(metric).map(|f| f.value)
    }

    #[must_use]
    pub fn contains(&self, metric: &str) -> bool {
        self.0.contains_key(metric)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in metric-name order.
    pub fn iter(&self) -> impl Iterator<Item = &FusedMetric> {
        self.0.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time;

    #[test]
    fn should_keep_one_value_per_metric() {
        let ts = time::now();
        let mut set = FusedMetrics::new();
        set.insert(FusedMetric::measured("wind_speed", 4.0, "smhi", ts, ts));
        let previous = set.insert(FusedMetric::measured("wind_speed", 5.0, "yr", ts, ts));
        assert_eq!(previous.map(|p| p.source_id), Some("smhi".to_string()));
        assert_eq!(set.len(), 1);
        assert_eq!(set.value("wind_speed"), Some(5.0));
    }

    #[test]
    fn should_attribute_estimate_to_referenced_metric() {
        let ts = time::now();
        let observed = ts - TimeDelta::minutes(20);
        let speed = FusedMetric::measured("wind_speed", 10.0, "smhi", observed, ts);
        let gust = FusedMetric::estimated("wind_gust", 14.0, &speed, ts);
        assert!(gust.is_estimated());
        assert_eq!(gust.observed_at, observed);
        assert_eq!(gust.age(), TimeDelta::minutes(20));
        assert_eq!(gust.source_id, "smhi");
        assert_eq!(gust.derived_from.as_deref(), Some("wind_speed"));
    }

    #[test]
    fn should_serialize_as_plain_map() {
        let ts = time::now();
        let mut set = FusedMetrics::new();
        set.insert(FusedMetric::measured("pressure", 1013.2, "netatmo", ts, ts));
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["pressure"]["source_kind"], "measured");
        assert!(json["pressure"].get("derived_from").is_none());
        assert!(json["pressure"].get("observed_at").is_some());
    }

    #[test]
    fn should_report_zero_age_for_reading_stamped_in_future() {
        let ts = time::now();
        let ahead = ts + TimeDelta::minutes(2);
        let fused = FusedMetric::measured("pressure", 1013.2, "netatmo", ahead, ts);
        assert_eq!(fused.age(), TimeDelta::zero());
    }
}
