//! Barometric pressure tendency.
//!
//! The cycle records the fused pressure value into a [`PressureHistory`]
//! and derives a [`PressureTrend`] from it: the change between the latest
//! sample and the sample closest to three hours ago, scaled to a 3-hour
//! rate.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Window the tendency is measured over.
const TREND_WINDOW_HOURS: f64 = 3.0;
/// Two samples closer than this cannot give a meaningful rate.
const MIN_PERIOD_HOURS: f64 = 0.1;

/// Tuning knobs for [`PressureHistory::trend`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSettings {
    /// Minimum recorded span before any trend is reported.
    pub min_span: TimeDelta,
    /// Spans shorter than this produce a `preliminary` trend.
    pub full_hours: f64,
    /// 3-hour change (hPa) beyond which pressure counts as rising/falling.
    pub threshold_hpa: f64,
    /// Samples older than this are pruned.
    pub retention: TimeDelta,
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            min_span: TimeDelta::minutes(30),
            full_hours: 2.5,
            threshold_hpa: 2.0,
            retention: TimeDelta::hours(24),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    /// Numeric code bound to the `pressure_trend` context variable.
    #[must_use]
    pub fn code(self) -> f64 {
        match self {
            Self::Rising => 1.0,
            Self::Falling => -1.0,
            Self::Stable | Self::InsufficientData => 0.0,
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rising => f.write_str("rising"),
            Self::Falling => f.write_str("falling"),
            Self::Stable => f.write_str("stable"),
            Self::InsufficientData => f.write_str("insufficient_data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureTrend {
    pub direction: TrendDirection,
    /// Raw change between the two compared samples.
    pub change_hpa: f64,
    /// `change_hpa` scaled to a 3-hour period.
    pub change_3h: f64,
    /// Hours between the two compared samples.
    pub period_hours: f64,
    pub preliminary: bool,
}

impl PressureTrend {
    #[must_use]
    pub fn insufficient() -> Self {
        Self {
            direction: TrendDirection::InsufficientData,
            change_hpa: 0.0,
            change_3h: 0.0,
            period_hours: 0.0,
            preliminary: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureSample {
    pub at: Timestamp,
    pub hpa: f64,
}

/// Time-ordered pressure samples. Stored samples are re-sorted on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PressureSample>", into = "Vec<PressureSample>")]
pub struct PressureHistory {
    samples: Vec<PressureSample>,
}

impl From<Vec<PressureSample>> for PressureHistory {
    fn from(mut samples: Vec<PressureSample>) -> Self {
        samples.retain(|s| s.hpa.is_finite());
        samples.sort_by_key(|s| s.at);
        Self { samples }
    }
}

impl From<PressureHistory> for Vec<PressureSample> {
    fn from(history: PressureHistory) -> Self {
        history.samples
    }
}

impl PressureHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample, keeping the history ordered by time. Non-finite
    /// values are dropped.
    pub fn record(&mut self, at: Timestamp, hpa: f64) {
        if !hpa.is_finite() {
            return;
        }
        let index = self.samples.partition_point(|s| s.at <= at);
        self.samples.insert(index, PressureSample { at, hpa });
    }

    /// Drop samples older than `retention` relative to `now`. A retention
    /// reaching past the earliest representable time keeps everything.
    pub fn prune(&mut self, now: Timestamp, retention: TimeDelta) {
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return;
        };
        self.samples.retain(|s| s.at >= cutoff);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &PressureSample> {
        self.samples.iter()
    }

    #[must_use]
    pub fn trend(&self, now: Timestamp, settings: &TrendSettings) -> PressureTrend {
        let (Some(first), Some(latest)) = (self.samples.first(), self.samples.last()) else {
            return PressureTrend::insufficient();
        };
        if self.samples.len() < 2 || latest.at - first.at < settings.min_span {
            return PressureTrend::insufficient();
        }

        let target = now - TimeDelta::hours(3);
        let Some(reference) = self
            .samples
            .iter()
            .min_by_key(|s| (s.at - target).abs())
        else {
            return PressureTrend::insufficient();
        };

        let period_hours = hours(latest.at - reference.at);
        if period_hours < MIN_PERIOD_HOURS {
            return PressureTrend::insufficient();
        }

        let change_hpa = latest.hpa - reference.hpa;
        let change_3h = change_hpa * TREND_WINDOW_HOURS / period_hours;
        let direction = if change_3h > settings.threshold_hpa {
            TrendDirection::Rising
        } else if change_3h < -settings.threshold_hpa {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        };

        PressureTrend {
            direction,
            change_hpa,
            change_3h,
            period_hours,
            preliminary: period_hours < settings.full_hours,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn hours(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 3_600_000.0
}
