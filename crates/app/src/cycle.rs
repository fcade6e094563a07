//! Update cycle: the full pipeline from readings to module states.
//!
//! ```text
//! collect → fuse → pressure trend → context → overrides → activate → persist
//! ```
//!
//! One call to [`CycleRunner::run`] is one cycle. The previous cycle's
//! snapshot is loaded from the [`SnapshotStore`], read, and replaced.

use std::collections::BTreeSet;

use chrono::TimeDelta;
use serde::Serialize;
use weatherhub_domain::context::EvaluationContext;
use weatherhub_domain::error::WeatherHubError;
use weatherhub_domain::fused::FusedMetrics;
use weatherhub_domain::id::CycleId;
use weatherhub_domain::module_state::ModuleStates;
use weatherhub_domain::overrides::ContextOverrides;
use weatherhub_domain::pressure::{PressureTrend, TrendDirection, TrendSettings};
use weatherhub_domain::snapshot::CycleSnapshot;
use weatherhub_domain::time::Timestamp;

use crate::activation::{TriggerRegistry, activate};
use crate::collector::ReadingCollector;
use crate::context_builder::ContextBuilder;
use crate::fusion::FusionResolver;
use crate::ports::{ReadingSource, SnapshotStore};

/// Which fused metric feeds the pressure history, and how its trend is
/// computed.
#[derive(Debug, Clone)]
pub struct PressureTracking {
    pub metric: String,
    pub settings: TrendSettings,
}

/// Result of one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub cycle_id: CycleId,
    pub fused: FusedMetrics,
    pub context: EvaluationContext,
    pub module_states: ModuleStates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure_trend: Option<PressureTrend>,
    /// Sources that failed or missed the deadline.
    pub missing_sources: BTreeSet<String>,
    pub overrides_applied: bool,
}

pub struct CycleRunner<S, St> {
    collector: ReadingCollector<S>,
    resolver: FusionResolver,
    context_builder: ContextBuilder,
    registry: TriggerRegistry,
    store: St,
    pressure: Option<PressureTracking>,
    override_timeout: TimeDelta,
}

impl<S, St> CycleRunner<S, St>
where
    S: ReadingSource + Send + Sync + 'static,
    St: SnapshotStore,
{
    #[must_use]
    pub fn new(
        collector: ReadingCollector<S>,
        resolver: FusionResolver,
        context_builder: ContextBuilder,
        registry: TriggerRegistry,
        store: St,
    ) -> Self {
        Self {
            collector,
            resolver,
            context_builder,
            registry,
            store,
            pressure: None,
            override_timeout: TimeDelta::hours(1),
        }
    }

    /// Track the pressure tendency of `tracking.metric`.
    #[must_use]
    pub fn with_pressure_tracking(mut self, tracking: PressureTracking) -> Self {
        self.pressure = Some(tracking);
        self
    }

    /// Age after which debug overrides are ignored.
    #[must_use]
    pub fn with_override_timeout(mut self, timeout: TimeDelta) -> Self {
        self.override_timeout = timeout;
        self
    }

    /// Run one cycle at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot store cannot load the previous
    /// snapshot or save the new one. The stored snapshot is left untouched
    /// when loading fails. Failing or late sources only degrade the cycle.
    pub async fn run(
        &self,
        now: Timestamp,
        overrides: Option<&ContextOverrides>,
    ) -> Result<CycleOutcome, WeatherHubError> {
        self.run_cycle(CycleId::new(), now, overrides).await
    }

    #[tracing::instrument(skip_all, fields(cycle_id = %cycle_id))]
    async fn run_cycle(
        &self,
        cycle_id: CycleId,
        now: Timestamp,
        overrides: Option<&ContextOverrides>,
    ) -> Result<CycleOutcome, WeatherHubError> {
        let previous = self.store.load().await.inspect_err(|err| {
            tracing::error!(error = ?err, "previous snapshot unreadable, cycle aborted");
        })?;

        let collection = self.collector.collect().await;
        let fused = self.resolver.resolve_all(&collection.readings, now);
        tracing::info!(
            readings = collection.readings.len(),
            fused = fused.len(),
            missing = collection.missing.len(),
            "readings fused"
        );

        let mut pressure_history = previous.pressure_history;
        let pressure_trend = self.pressure.as_ref().map(|tracking| {
            if let Some(value) = fused.value(&tracking.metric) {
                pressure_history.record(now, value);
            }
            pressure_history.prune(now, tracking.settings.retention);
            let trend = pressure_history.trend(now, &tracking.settings);
            tracing::debug!(
                direction = %trend.direction,
                change_3h = trend.change_3h,
                preliminary = trend.preliminary,
                "pressure trend"
            );
            trend
        });

        let direction = pressure_trend
            .as_ref()
            .map_or(TrendDirection::InsufficientData, |t| t.direction);
        let mut context = self
            .context_builder
            .build_with_trend(&fused, now, direction);

        let overrides_applied = match overrides {
            Some(o) if o.is_expired(now, self.override_timeout) => {
                tracing::info!(created_at = %o.created_at, "debug overrides expired, ignored");
                false
            }
            Some(o) => {
                tracing::warn!(
                    description = %o.description,
                    variables = o.values.len(),
                    "debug overrides applied"
                );
                o.apply(&mut context);
                true
            }
            None => false,
        };

        let module_states = activate(&self.registry, &context, &previous.module_states, now);

        self.store
            .save(&CycleSnapshot {
                module_states: module_states.clone(),
                pressure_history,
            })
            .await?;

        Ok(CycleOutcome {
            cycle_id,
            fused,
            context,
            module_states,
            pressure_trend,
            missing_sources: collection.missing,
            overrides_applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::future::Future;
    use std::sync::Mutex;
    use std::time::Duration;
    use weatherhub_domain::fused::SourceKind;
    use weatherhub_domain::metric::MetricSourceConfig;
    use weatherhub_domain::module_state::ModuleState;
    use weatherhub_domain::reading::{Quality, Reading};
    use weatherhub_domain::trigger::TriggerConfig;

    const BOTTOM: &str = "bottom_section";

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 10, 12, 14, 0, 0).unwrap()
    }

    struct StaticSource {
        id: &'static str,
        values: Vec<(&'static str, f64)>,
    }

    impl ReadingSource for StaticSource {
        fn source_id(&self) -> &str {
            self.id
        }

        fn fetch(&self) -> impl Future<Output = Result<Vec<Reading>, WeatherHubError>> + Send {
            let readings = self
                .values
                .iter()
                .map(|(metric, value)| {
                    Reading::builder()
                        .metric(*metric)
                        .source_id(self.id)
                        .value(*value)
                        .observed_at(now())
                        .quality(Quality::Ok)
                        .build()
                })
                .collect::<Result<Vec<_>, _>>();
            async { readings }
        }
    }

    #[derive(Default)]
    struct InMemoryStore {
        snapshot: Mutex<CycleSnapshot>,
        unreadable: bool,
        saves: Mutex<usize>,
    }

    impl SnapshotStore for InMemoryStore {
        fn load(&self) -> impl Future<Output = Result<CycleSnapshot, WeatherHubError>> + Send {
            let result = if self.unreadable {
                Err(WeatherHubError::Source("corrupt snapshot".into()))
            } else {
                Ok(self.snapshot.lock().unwrap().clone())
            };
            async { result }
        }

        fn save(
            &self,
            snapshot: &CycleSnapshot,
        ) -> impl Future<Output = Result<(), WeatherHubError>> + Send {
            *self.snapshot.lock().unwrap() = snapshot.clone();
            *self.saves.lock().unwrap() += 1;
            async { Ok(()) }
        }
    }

    fn trigger(name: &str, condition: &str, group: &str, priority: i64) -> TriggerConfig {
        TriggerConfig {
            name: name.to_string(),
            condition: condition.to_string(),
            target_section: BOTTOM.to_string(),
            activate_group: group.to_string(),
            priority,
            description: String::new(),
        }
    }

    fn runner(values: Vec<(&'static str, f64)>) -> CycleRunner<StaticSource, InMemoryStore> {
        runner_with_store(values, InMemoryStore::default())
    }

    fn runner_with_store(
        values: Vec<(&'static str, f64)>,
        store: InMemoryStore,
    ) -> CycleRunner<StaticSource, InMemoryStore> {
        let metrics = vec![
            MetricSourceConfig::new("wind_speed").source("smhi", 3600),
            MetricSourceConfig::new("wind_gust")
                .source("smhi", 3600)
                .estimate_from("wind_speed", 1.4),
            MetricSourceConfig::new("pressure").source("smhi", 3600),
        ];
        let resolver = FusionResolver::new(metrics).unwrap();
        let builder = ContextBuilder::default().with_known_metrics(resolver.metrics());
        let registry = TriggerRegistry::from_configs(&[
            trigger("storm", "wind_gust > 13.0", "storm_group", 100),
            trigger("wind", "wind_speed > 8.0 OR wind_gust > 8.0", "wind_group", 80),
        ]);
        CycleRunner::new(
            ReadingCollector::new(
                vec![StaticSource { id: "smhi", values }],
                Duration::from_secs(1),
            ),
            resolver,
            builder,
            registry,
            store,
        )
        .with_pressure_tracking(PressureTracking {
            metric: "pressure".to_string(),
            settings: TrendSettings::default(),
        })
    }

    #[tokio::test]
    async fn should_activate_group_from_estimated_gust() {
        let runner = runner(vec![("wind_speed", 10.0)]);
        let outcome = runner.run(now(), None).await.unwrap();

        let gust = outcome.fused.get("wind_gust").unwrap();
        assert_eq!(gust.source_kind, SourceKind::Estimated);
        assert_eq!(outcome.module_states.active_group(BOTTOM), Some("storm_group"));
    }

    #[tokio::test]
    async fn should_persist_states_and_keep_since_across_cycles() {
        let runner = runner(vec![("wind_speed", 9.0), ("wind_gust", 9.5)]);
        let first = runner.run(now(), None).await.unwrap();
        let later = now() + TimeDelta::minutes(10);
        let second = runner.run(later, None).await.unwrap();

        assert_eq!(first.module_states.active_group(BOTTOM), Some("wind_group"));
        assert_eq!(second.module_states.get(BOTTOM).unwrap().since, now());
    }

    #[tokio::test]
    async fn should_record_pressure_into_history() {
        let runner = runner(vec![("pressure", 1013.2)]);
        let outcome = runner.run(now(), None).await.unwrap();
        assert_eq!(
            outcome.pressure_trend.unwrap().direction,
            TrendDirection::InsufficientData
        );
        assert_eq!(runner.store.snapshot.lock().unwrap().pressure_history.len(), 1);
    }

    #[tokio::test]
    async fn should_apply_active_overrides() {
        let runner = runner(vec![("wind_speed", 2.0)]);
        let overrides = ContextOverrides::new(now()).with_value("wind_speed", 9.0);
        let outcome = runner.run(now(), Some(&overrides)).await.unwrap();
        assert!(outcome.overrides_applied);
        assert_eq!(outcome.module_states.active_group(BOTTOM), Some("wind_group"));
    }

    #[tokio::test]
    async fn should_ignore_expired_overrides() {
        let runner = runner(vec![("wind_speed", 2.0)]);
        let overrides =
            ContextOverrides::new(now() - TimeDelta::hours(2)).with_value("wind_speed", 9.0);
        let outcome = runner.run(now(), Some(&overrides)).await.unwrap();
        assert!(!outcome.overrides_applied);
        assert_eq!(outcome.module_states.active_group(BOTTOM), None);
    }

    #[tokio::test]
    async fn should_produce_identical_states_for_identical_cycles() {
        let runner = runner(vec![("wind_speed", 9.0)]);
        let previous = runner.store.snapshot.lock().unwrap().clone();
        let first = runner.run(now(), None).await.unwrap();
        *runner.store.snapshot.lock().unwrap() = previous;
        let second = runner.run(now(), None).await.unwrap();
        assert_eq!(first.module_states, second.module_states);
    }

    #[tokio::test]
    async fn should_fail_without_saving_when_previous_snapshot_is_unreadable() {
        let store = InMemoryStore {
            unreadable: true,
            ..InMemoryStore::default()
        };
        let runner = runner_with_store(vec![("wind_speed", 9.0)], store);

        let result = runner.run(now(), None).await;

        assert!(matches!(result, Err(WeatherHubError::Source(_))));
        assert_eq!(*runner.store.saves.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn should_fall_back_to_default_layout_without_data() {
        let runner = runner(Vec::new());
        let outcome = runner.run(now(), None).await.unwrap();
        assert!(outcome.fused.is_empty());
        assert!(outcome.module_states.iter().all(ModuleState::is_default));
        assert!((outcome.context.get("wind_gust")).abs() < f64::EPSILON);
    }
}
