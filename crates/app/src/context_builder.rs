//! Evaluation context builder.
//!
//! Binds every fused value under its metric name, then the derived
//! variables (`time_hour`, `time_month`, `pressure_trend`). Configured
//! metrics that are absent this cycle are bound to
//! [`NEUTRAL_VALUE`] so conditions always evaluate over a total context.

use chrono::{FixedOffset, Offset, Utc};
use weatherhub_domain::context::{
    EvaluationContext, NEUTRAL_VALUE, VAR_PRESSURE_TREND, VAR_TIME_HOUR, VAR_TIME_MONTH,
};
use weatherhub_domain::fused::FusedMetrics;
use weatherhub_domain::pressure::TrendDirection;
use weatherhub_domain::time::{self, Timestamp};

#[derive(Debug, Clone)]
pub struct ContextBuilder {
    known_metrics: Vec<String>,
    utc_offset: FixedOffset,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            known_metrics: Vec::new(),
            utc_offset: Utc.fix(),
        }
    }
}

impl ContextBuilder {
    /// Builder whose time variables are computed at `utc_offset`.
    #[must_use]
    pub fn new(utc_offset: FixedOffset) -> Self {
        Self {
            utc_offset,
            ..Self::default()
        }
    }

    /// Metrics that must always be bound, falling back to the neutral value.
    #[must_use]
    pub fn with_known_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_metrics.extend(metrics.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn known_metrics(&self) -> &[String] {
        &self.known_metrics
    }

    /// Build the context without pressure tendency information.
    #[must_use]
    pub fn build(&self, fused: &FusedMetrics, now: Timestamp) -> EvaluationContext {
        self.build_with_trend(fused, now, TrendDirection::InsufficientData)
    }

    #[must_use]
    pub fn build_with_trend(
        &self,
        fused: &FusedMetrics,
        now: Timestamp,
        trend: TrendDirection,
    ) -> EvaluationContext {
        let mut context = EvaluationContext::new();
        for metric in &self.known_metrics {
            context.set(metric.clone(), NEUTRAL_VALUE);
        }
        for metric in fused.iter() {
            context.set(metric.metric.clone(), metric.value);
        }
        context.set(
            VAR_TIME_HOUR,
            f64::from(time::local_hour(now, self.utc_offset)),
        );
        context.set(
            VAR_TIME_MONTH,
            f64::from(time::local_month(now, self.utc_offset)),
        );
        context.set(VAR_PRESSURE_TREND, trend.code());
        context
    }
}
