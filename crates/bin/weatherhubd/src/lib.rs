//! # weatherhubd
//!
//! Composition root that wires the adapters into the cycle pipeline.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Build the configured reading sources and the snapshot store
//! - Compile the fusion rules and triggers
//! - Run one update cycle and hand back its outcome
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

pub mod config;
pub mod sources;

use weatherhub_adapter_json_file::{JsonSnapshotStore, load_overrides};
use weatherhub_app::activation::TriggerRegistry;
use weatherhub_app::collector::ReadingCollector;
use weatherhub_app::context_builder::ContextBuilder;
use weatherhub_app::cycle::{CycleOutcome, CycleRunner};
use weatherhub_app::fusion::FusionResolver;
use weatherhub_domain::error::WeatherHubError;
use weatherhub_domain::overrides::ContextOverrides;
use weatherhub_domain::time::Timestamp;

use crate::config::{Config, SourceConfig};
use crate::sources::ConfiguredSource;

pub type Runner = CycleRunner<ConfiguredSource, JsonSnapshotStore>;

/// Wire a cycle runner from configuration.
///
/// # Errors
///
/// Returns an error if the metric fusion rules are invalid. Triggers that
/// fail to compile are disabled and logged instead.
pub fn build_runner(config: &Config) -> Result<Runner, WeatherHubError> {
    let resolver = FusionResolver::new(config.metrics.clone())?;
    let context_builder =
        ContextBuilder::new(config.utc_offset()).with_known_metrics(resolver.metrics());
    let registry =
        TriggerRegistry::from_configs(&config.triggers).with_sections(config.sections.clone());

    let unknown = registry.unknown_variables(context_builder.known_metrics());
    if !unknown.is_empty() {
        tracing::info!(count = unknown.len(), "some trigger variables always read as zero");
    }

    let sources = config.sources.iter().map(SourceConfig::build).collect();
    let collector = ReadingCollector::new(sources, config.deadline());
    let store = JsonSnapshotStore::new(config.state.path.clone());

    let mut runner = CycleRunner::new(collector, resolver, context_builder, registry, store)
        .with_override_timeout(config.debug.timeout());
    if let Some(tracking) = config.pressure_trend.tracking() {
        runner = runner.with_pressure_tracking(tracking);
    }
    Ok(runner)
}

/// Debug overrides to apply this cycle, if enabled and present.
///
/// An unreadable overrides file is logged and ignored.
pub async fn load_active_overrides(config: &Config) -> Option<ContextOverrides> {
    if !config.debug.overrides_enabled() {
        return None;
    }
    match load_overrides(&config.debug.override_file).await {
        Ok(overrides) => overrides,
        Err(err) => {
            tracing::warn!(
                path = %config.debug.override_file.display(),
                error = ?err,
                "debug overrides unreadable, ignored"
            );
            None
        }
    }
}

/// Build everything and run a single cycle at `now`.
///
/// # Errors
///
/// Returns an error if the runner cannot be built or the new snapshot
/// cannot be saved.
pub async fn run_once(config: &Config, now: Timestamp) -> Result<CycleOutcome, WeatherHubError> {
    let runner = build_runner(config)?;
    let overrides = load_active_overrides(config).await;
    runner.run(now, overrides.as_ref()).await
}
