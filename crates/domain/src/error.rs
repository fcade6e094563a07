//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`WeatherHubError`] via `#[from]` (no `String` variants).

/// Top-level error shared by the domain, application and adapter layers.
#[derive(Debug, thiserror::Error)]
pub enum WeatherHubError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("condition parse error")]
    Parse(#[from] ParseError),

    /// A reading source or snapshot store failed. The boxed error comes from
    /// the adapter that produced it.
    #[error("source error")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("metric must not be empty")]
    EmptyMetric,

    #[error("source id must not be empty")]
    EmptySourceId,

    #[error("target section must not be empty")]
    EmptySection,

    #[error("activation group must not be empty")]
    EmptyGroup,

    #[error("metric {metric} has neither sources nor an estimation rule")]
    NoSources { metric: String },

    #[error("source {source_id} is listed twice for metric {metric}")]
    DuplicateSource { metric: String, source_id: String },

    #[error("metric {metric} is configured twice")]
    DuplicateMetric { metric: String },

    #[error("trigger {name} is declared twice")]
    DuplicateTrigger { name: String },

    #[error("estimation factor for {metric} must be finite, got {factor}")]
    InvalidFactor { metric: String, factor: f64 },

    #[error("metric {metric} cannot be estimated from itself")]
    SelfEstimate { metric: String },

    #[error("metric {metric} is estimated from unconfigured metric {from_metric}")]
    UnknownEstimateSource { metric: String, from_metric: String },

    #[error("estimation rules form a cycle through {metric}")]
    EstimationCycle { metric: String },
}

/// Grammar violation found while parsing a trigger condition.
///
/// Positions are byte offsets into the condition text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("condition is empty")]
    Empty,

    #[error("unexpected character {ch:?} at {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("invalid number {text:?} at {position}")]
    InvalidNumber { text: String, position: usize },

    #[error("expected {expected} at {position}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        position: usize,
    },

    #[error("expected {expected}, found end of condition")]
    UnexpectedEnd { expected: &'static str },

    #[error("unsupported operator {operator} at {position}")]
    UnsupportedOperator {
        operator: &'static str,
        position: usize,
    },
}
