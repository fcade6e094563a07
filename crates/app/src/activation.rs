//! Trigger registry and module activation scheduler.
//!
//! Every cycle each trigger is evaluated against the context. True triggers
//! are grouped by target section; the highest priority wins, ties going to
//! the trigger declared first. A section with no true trigger falls back to
//! its default layout. The result is a fresh [`ModuleStates`] snapshot; the
//! previous one is only consulted to keep `since` when a section's group did
//! not change. There is no hysteresis: a value hovering around a threshold
//! flips the section every cycle.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use weatherhub_domain::context::{DERIVED_VARIABLES, EvaluationContext};
use weatherhub_domain::error::{ValidationError, WeatherHubError};
use weatherhub_domain::module_state::{ModuleState, ModuleStates};
use weatherhub_domain::time::Timestamp;
use weatherhub_domain::trigger::{TriggerConfig, TriggerDefinition};

/// A configured trigger that could not be compiled. It never matches.
#[derive(Debug)]
pub struct DisabledTrigger {
    pub name: String,
    pub error: WeatherHubError,
}

#[derive(Debug, Default)]
pub struct TriggerRegistry {
    /// Compiled triggers in declaration order.
    triggers: Vec<TriggerDefinition>,
    disabled: Vec<DisabledTrigger>,
    sections: BTreeSet<String>,
}

impl TriggerRegistry {
    /// Compile every trigger configuration.
    ///
    /// A configuration that fails to compile, or reuses the name of an
    /// earlier trigger, is disabled and logged instead of failing the whole
    /// registry. Its section is still known, so it reports a default layout.
    #[must_use]
    pub fn from_configs(configs: &[TriggerConfig]) -> Self {
        let mut registry = Self::default();
        let mut names = HashSet::new();

        for config in configs {
            if !config.target_section.is_empty() {
                registry.sections.insert(config.target_section.clone());
            }

            let compiled = if names.insert(config.name.as_str()) {
                config.compile()
            } else {
                Err(ValidationError::DuplicateTrigger {
                    name: config.name.clone(),
                }
                .into())
            };

            match compiled {
                Ok(trigger) => registry.triggers.push(trigger),
                Err(error) => {
                    tracing::warn!(
                        trigger = %config.name,
                        condition = %config.condition,
                        error = ?error,
                        "trigger disabled"
                    );
                    registry.disabled.push(DisabledTrigger {
                        name: config.name.clone(),
                        error,
                    });
                }
            }
        }

        registry
    }

    /// Declare sections that have no trigger of their own, so they still
    /// get a state every cycle.
    #[must_use]
    pub fn with_sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections.extend(sections.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn triggers(&self) -> &[TriggerDefinition] {
        &self.triggers
    }

    #[must_use]
    pub fn disabled(&self) -> &[DisabledTrigger] {
        &self.disabled
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(String::as_str)
    }

    /// Variables read by some trigger that are neither in `known_metrics`
    /// nor derived by the context builder. They will always read as zero.
    /// Each one is logged once.
    #[must_use]
    pub fn unknown_variables<'a>(&'a self, known_metrics: &[String]) -> BTreeSet<&'a str> {
        let mut unknown = BTreeSet::new();
        for trigger in &self.triggers {
            for name in trigger.condition.variables() {
                let known = known_metrics.iter().any(|m| m == name)
                    || DERIVED_VARIABLES.contains(&name);
                if !known && unknown.insert(name) {
                    tracing::warn!(
                        trigger = %trigger.name,
                        variable = name,
                        "condition reads a variable no metric provides"
                    );
                }
            }
        }
        unknown
    }
}

/// Compute the module state of every known section.
#[must_use]
pub fn activate(
    registry: &TriggerRegistry,
    context: &EvaluationContext,
    previous: &ModuleStates,
    now: Timestamp,
) -> ModuleStates {
    let mut winners: BTreeMap<&str, &TriggerDefinition> = BTreeMap::new();
    for trigger in &registry.triggers {
        if !trigger.is_active(context) {
            continue;
        }
        tracing::debug!(trigger = %trigger.name, section = %trigger.target_section, "condition true");
        match winners.entry(trigger.target_section.as_str()) {
            Entry::Vacant(entry) => {
                entry.insert(trigger);
            }
            // strictly greater, so the first declared keeps a tie
            Entry::Occupied(mut entry) => {
                if trigger.priority > entry.get().priority {
                    entry.insert(trigger);
                }
            }
        }
    }

    registry
        .sections()
        .map(|section| {
            let winner = winners.get(section);
            let group = winner.map(|t| t.activate_group.as_str());
            let prev = previous.get(section);

            let since = match prev {
                Some(prev) if prev.active_group.as_deref() == group => prev.since,
                _ => {
                    tracing::info!(
                        section,
                        from = prev.and_then(|p| p.active_group.as_deref()).unwrap_or("default"),
                        to = group.unwrap_or("default"),
                        trigger = winner.map(|t| t.name.as_str()),
                        "activation changed"
                    );
                    now
                }
            };

            match winner {
                Some(trigger) => {
                    ModuleState::active(section, &trigger.activate_group, &trigger.name, since)
                }
                None => ModuleState::default_layout(section, since),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};

    const BOTTOM: &str = "bottom_section";

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 11, 3, 9, 0, 0).unwrap()
    }

    fn config(name: &str, condition: &str, section: &str, group: &str, priority: i64) -> TriggerConfig {
        TriggerConfig {
            name: name.to_string(),
            condition: condition.to_string(),
            target_section: section.to_string(),
            activate_group: group.to_string(),
            priority,
            description: String::new(),
        }
    }

    fn weather_registry() -> TriggerRegistry {
        TriggerRegistry::from_configs(&[
            config("rain", "precipitation > 0.2", BOTTOM, "precipitation_group", 100),
            config("wind", "wind_speed > 8.0 OR wind_gust > 8.0", BOTTOM, "wind_group", 80),
            config("frost", "temperature < 0", "top_section", "frost_group", 50),
        ])
    }

    fn stormy() -> EvaluationContext {
        EvaluationContext::new()
            .with("precipitation", 1.2)
            .with("wind_speed", 9.5)
            .with("temperature", 4.0)
    }

    #[test]
    fn should_select_highest_priority_group_when_several_triggers_are_true() {
        let states = activate(&weather_registry(), &stormy(), &ModuleStates::new(), now());
        assert_eq!(states.active_group(BOTTOM), Some("precipitation_group"));
        assert_eq!(states.get(BOTTOM).unwrap().trigger.as_deref(), Some("rain"));
    }

    #[test]
    fn should_select_higher_priority_regardless_of_declaration_order() {
        let registry = TriggerRegistry::from_configs(&[
            config("low", "a > 0", BOTTOM, "low_group", 80),
            config("high", "a > 0", BOTTOM, "high_group", 100),
        ]);
        let ctx = EvaluationContext::new().with("a", 1.0);
        let states = activate(&registry, &ctx, &ModuleStates::new(), now());
        assert_eq!(states.active_group(BOTTOM), Some("high_group"));
    }

    #[test]
    fn should_break_priority_tie_by_declaration_order() {
        let registry = TriggerRegistry::from_configs(&[
            config("first", "a > 0", BOTTOM, "first_group", 50),
            config("second", "a > 0", BOTTOM, "second_group", 50),
        ]);
        let ctx = EvaluationContext::new().with("a", 1.0);
        let states = activate(&registry, &ctx, &ModuleStates::new(), now());
        assert_eq!(states.active_group(BOTTOM), Some("first_group"));
    }

    #[test]
    fn should_fall_back_to_default_when_no_trigger_is_true() {
        let states = activate(
            &weather_registry(),
            &EvaluationContext::new().with("temperature", 10.0),
            &ModuleStates::new(),
            now(),
        );
        assert_eq!(states.len(), 2);
        assert!(states.iter().all(ModuleState::is_default));
    }

    #[test]
    fn should_report_declared_section_without_triggers() {
        let registry = weather_registry().with_sections(["middle_section"]);
        let states = activate(&registry, &stormy(), &ModuleStates::new(), now());
        assert!(states.get("middle_section").unwrap().is_default());
    }

    #[test]
    fn should_keep_since_when_group_is_unchanged() {
        let earlier = now() - TimeDelta::minutes(10);
        let previous: ModuleStates = std::iter::once(ModuleState::active(
            BOTTOM,
            "precipitation_group",
            "rain",
            earlier,
        ))
        .collect();
        let states = activate(&weather_registry(), &stormy(), &previous, now());
        assert_eq!(states.get(BOTTOM).unwrap().since, earlier);
        assert_eq!(states.get("top_section").unwrap().since, now());
    }

    #[test]
    fn should_reset_since_when_group_changes() {
        let earlier = now() - TimeDelta::minutes(10);
        let previous: ModuleStates =
            std::iter::once(ModuleState::active(BOTTOM, "wind_group", "wind", earlier)).collect();
        let states = activate(&weather_registry(), &stormy(), &previous, now());
        assert_eq!(states.get(BOTTOM).unwrap().since, now());
    }

    #[test]
    fn should_flip_every_cycle_without_hysteresis() {
        let registry = weather_registry();
        let above = EvaluationContext::new().with("wind_speed", 8.1);
        let below = EvaluationContext::new().with("wind_speed", 7.9);

        let first = activate(&registry, &above, &ModuleStates::new(), now());
        let second = activate(&registry, &below, &first, now());
        let third = activate(&registry, &above, &second, now());
        assert_eq!(first.active_group(BOTTOM), Some("wind_group"));
        assert_eq!(second.active_group(BOTTOM), None);
        assert_eq!(third.active_group(BOTTOM), Some("wind_group"));
    }

    #[test]
    fn should_produce_identical_states_for_identical_input() {
        let registry = weather_registry();
        let previous = ModuleStates::new();
        let a = activate(&registry, &stormy(), &previous, now());
        let b = activate(&registry, &stormy(), &previous, now());
        assert_eq!(a, b);
    }

    #[test]
    fn should_disable_trigger_with_malformed_condition() {
        let registry = TriggerRegistry::from_configs(&[
            config("broken", "wind_speed >> 3", BOTTOM, "wind_group", 100),
            config("rain", "precipitation > 0.2", BOTTOM, "precipitation_group", 50),
        ]);
        assert_eq!(registry.triggers().len(), 1);
        assert_eq!(registry.disabled().len(), 1);
        assert!(matches!(
            registry.disabled()[0].error,
            WeatherHubError::Parse(_)
        ));

        let ctx = EvaluationContext::new()
            .with("wind_speed", 20.0)
            .with("precipitation", 1.0);
        let states = activate(&registry, &ctx, &ModuleStates::new(), now());
        assert_eq!(states.active_group(BOTTOM), Some("precipitation_group"));
    }

    #[test]
    fn should_disable_duplicate_trigger_name() {
        let registry = TriggerRegistry::from_configs(&[
            config("rain", "precipitation > 0.2", BOTTOM, "precipitation_group", 50),
            config("rain", "precipitation > 5", BOTTOM, "storm_group", 90),
        ]);
        assert_eq!(registry.triggers().len(), 1);
        assert!(matches!(
            registry.disabled()[0].error,
            WeatherHubError::Validation(ValidationError::DuplicateTrigger { .. })
        ));
    }

    #[test]
    fn should_keep_section_of_disabled_trigger() {
        let registry =
            TriggerRegistry::from_configs(&[config("broken", "(", "top_section", "g", 1)]);
        let states = activate(&registry, &EvaluationContext::new(), &ModuleStates::new(), now());
        assert!(states.get("top_section").unwrap().is_default());
    }

    #[test]
    fn should_list_variables_no_metric_provides() {
        let registry = TriggerRegistry::from_configs(&[config(
            "morning_rain",
            "precipitaton > 0.2 AND time_hour >= 6",
            BOTTOM,
            "precipitation_group",
            10,
        )]);
        let unknown = registry.unknown_variables(&["precipitation".to_string()]);
        assert_eq!(unknown.into_iter().collect::<Vec<_>>(), vec!["precipitaton"]);
    }
}
