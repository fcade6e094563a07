//! Trigger: a named condition that, when true, asks a display section to
//! show a specific module group.

use serde::{Deserialize, Serialize};

use crate::condition::Expression;
use crate::context::EvaluationContext;
use crate::error::{ValidationError, WeatherHubError};

/// A compiled trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerDefinition {
    pub name: String,
    pub condition: Expression,
    pub target_section: String,
    pub activate_group: String,
    /// Higher wins when several triggers of a section are true.
    pub priority: i64,
    pub description: String,
}

impl TriggerDefinition {
    /// Create a builder for constructing a [`TriggerDefinition`].
    #[must_use]
    pub fn builder() -> TriggerDefinitionBuilder {
        TriggerDefinitionBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherHubError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `target_section` is empty ([`ValidationError::EmptySection`])
    /// - `activate_group` is empty ([`ValidationError::EmptyGroup`])
    pub fn validate(&self) -> Result<(), WeatherHubError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.target_section.is_empty() {
            return Err(ValidationError::EmptySection.into());
        }
        if self.activate_group.is_empty() {
            return Err(ValidationError::EmptyGroup.into());
        }
        Ok(())
    }

    /// Whether the trigger's condition holds in `context`.
    #[must_use]
    pub fn is_active(&self, context: &EvaluationContext) -> bool {
        self.condition.evaluate(context)
    }
}

impl std::fmt::Display for TriggerDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} => {}/{} (priority {})",
            self.name, self.condition, self.target_section, self.activate_group, self.priority
        )
    }
}

/// Step-by-step builder for [`TriggerDefinition`].
#[derive(Debug, Default)]
pub struct TriggerDefinitionBuilder {
    name: Option<String>,
    condition: Option<Expression>,
    target_section: Option<String>,
    activate_group: Option<String>,
    priority: Option<i64>,
    description: Option<String>,
}

impl TriggerDefinitionBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: Expression) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn target_section(mut self, section: impl Into<String>) -> Self {
        self.target_section = Some(section.into());
        self
    }

    #[must_use]
    pub fn activate_group(mut self, group: impl Into<String>) -> Self {
        self.activate_group = Some(group.into());
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Consume the builder, validate, and return a [`TriggerDefinition`].
    ///
    /// A trigger built without a condition never fires (`0 != 0`).
    ///
    /// # Errors
    ///
    /// Returns [`WeatherHubError::Validation`] if required fields are missing or empty.
    pub fn build(self) -> Result<TriggerDefinition, WeatherHubError> {
        let trigger = TriggerDefinition {
            name: self.name.unwrap_or_default(),
            condition: self.condition.unwrap_or_else(never),
            target_section: self.target_section.unwrap_or_default(),
            activate_group: self.activate_group.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
        };
        trigger.validate()?;
        Ok(trigger)
    }
}

fn never() -> Expression {
    Expression::Compare {
        left: crate::condition::Arithmetic::Number(0.0),
        op: crate::condition::CompareOp::Ne,
        right: 0.0,
    }
}

/// A trigger as written in configuration, with its condition still as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub name: String,
    pub condition: String,
    pub target_section: String,
    pub activate_group: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub description: String,
}

impl TriggerConfig {
    /// Parse the condition and validate the resulting definition.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherHubError::Parse`] when the condition text is
    /// malformed, or [`WeatherHubError::Validation`] when a required field
    /// is empty.
    pub fn compile(&self) -> Result<TriggerDefinition, WeatherHubError> {
        let condition = Expression::parse(&self.condition)?;
        TriggerDefinition::builder()
            .name(&self.name)
            .condition(condition)
            .target_section(&self.target_section)
            .activate_group(&self.activate_group)
            .priority(self.priority)
            .description(&self.description)
            .build()
    }
}
