//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `weatherhub.toml` in the working directory, or at the path in
//! `WEATHERHUB_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, TimeDelta, Utc};
use serde::Deserialize;
use weatherhub_adapter_virtual::{ForecastSettings, StationSettings};
use weatherhub_app::cycle::PressureTracking;
use weatherhub_domain::metric::MetricSourceConfig;
use weatherhub_domain::pressure::TrendSettings;
use weatherhub_domain::time;
use weatherhub_domain::trigger::TriggerConfig;

const DEFAULT_PATH: &str = "weatherhub.toml";
/// Offsets must stay strictly within one day.
const MAX_OFFSET_MINUTES: i32 = 24 * 60 - 1;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Cycle timing.
    pub cycle: CycleConfig,
    /// Where the cycle snapshot is kept.
    pub state: StateConfig,
    pub pressure_trend: PressureTrendConfig,
    pub debug: DebugConfig,
    /// Display sections that always get a module state, even without triggers.
    pub sections: Vec<String>,
    pub metrics: Vec<MetricSourceConfig>,
    pub triggers: Vec<TriggerConfig>,
    pub sources: Vec<SourceConfig>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// How long sources are awaited before the cycle moves on.
    pub deadline_ms: u64,
    /// Offset of local time, used for `time_hour` / `time_month`.
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PressureTrendConfig {
    /// Fused metric fed into the pressure history. Unset disables tracking.
    pub metric: Option<String>,
    pub min_minutes: u64,
    pub full_hours: f64,
    pub threshold_hpa: f64,
    pub retention_hours: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub allow_overrides: bool,
    pub override_file: PathBuf,
    /// Overrides older than this are ignored.
    pub timeout_hours: u64,
}

/// One reading source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    VirtualStation {
        id: String,
        #[serde(default)]
        values: StationSettings,
    },
    VirtualForecast {
        id: String,
        #[serde(default)]
        values: ForecastSettings,
    },
    /// JSON array of readings written by an external fetcher.
    File { id: String, path: PathBuf },
}

impl SourceConfig {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::VirtualStation { id, .. }
            | Self::VirtualForecast { id, .. }
            | Self::File { id, .. } => id,
        }
    }
}

impl Config {
    /// Load configuration from `weatherhub.toml` (or `WEATHERHUB_CONFIG`),
    /// then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("WEATHERHUB_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file. A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Apply overrides looked up by `var` (the process environment in
    /// [`Config::load`]).
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("WEATHERHUB_STATE") {
            self.state.path = PathBuf::from(val);
        }
        if let Some(val) = var("WEATHERHUB_DEADLINE_MS")
            && let Ok(ms) = val.parse()
        {
            self.cycle.deadline_ms = ms;
        }
        if let Some(val) = var("WEATHERHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    /// Check settings the individual sections cannot check on their own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] on the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle.deadline_ms == 0 {
            return Err(ConfigError::Validation(
                "cycle deadline must be non-zero".to_string(),
            ));
        }
        if self.cycle.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ConfigError::Validation(format!(
                "utc offset of {} minutes is out of range",
                self.cycle.utc_offset_minutes
            )));
        }
        let mut ids = HashSet::new();
        for source in &self.sources {
            if source.id().is_empty() {
                return Err(ConfigError::Validation("source id must not be empty".to_string()));
            }
            if !ids.insert(source.id()) {
                return Err(ConfigError::Validation(format!(
                    "source {} is declared twice",
                    source.id()
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.cycle.deadline_ms)
    }

    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.cycle.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

impl PressureTrendConfig {
    /// Tracking settings, or `None` when no pressure metric is set.
    #[must_use]
    pub fn tracking(&self) -> Option<PressureTracking> {
        let metric = self.metric.clone()?;
        Some(PressureTracking {
            metric,
            settings: TrendSettings {
                min_span: time::seconds(self.min_minutes.saturating_mul(60)),
                full_hours: self.full_hours,
                threshold_hpa: self.threshold_hpa,
                retention: time::seconds(self.retention_hours.saturating_mul(3600)),
            },
        })
    }
}

impl DebugConfig {
    /// Whether overrides should be read at all.
    #[must_use]
    pub fn overrides_enabled(&self) -> bool {
        self.enabled && self.allow_overrides
    }

    #[must_use]
    pub fn timeout(&self) -> TimeDelta {
        time::seconds(self.timeout_hours.saturating_mul(3600))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "weatherhubd=info,weatherhub_app=info,weatherhub_adapter_json_file=info"
                .to_string(),
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 10_000,
            utc_offset_minutes: 0,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("weatherhub-state.json"),
        }
    }
}

impl Default for PressureTrendConfig {
    fn default() -> Self {
        Self {
            metric: Some("pressure".to_string()),
            min_minutes: 30,
            full_hours: 2.5,
            threshold_hpa: 2.0,
            retention_hours: 24,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_overrides: false,
            override_file: PathBuf::from("weatherhub-overrides.json"),
            timeout_hours: 1,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
