//! Debug context overrides.
//!
//! A set of variable values that replace whatever the context builder bound
//! for a cycle. Used on a bench to force a layout without waiting for the
//! weather to cooperate. Overrides expire `timeout` after `created_at`.

use std::collections::BTreeMap;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::time::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextOverrides {
    #[serde(default)]
    pub description: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}

impl ContextOverrides {
    #[must_use]
    pub fn new(created_at: Timestamp) -> Self {
        Self {
            description: String::new(),
            created_at,
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn is_expired(&self, now: Timestamp, timeout: TimeDelta) -> bool {
        now - self.created_at > timeout
    }

    /// Overwrite the context's bindings with the override values.
    pub fn apply(&self, context: &mut EvaluationContext) {
        for (name, value) in &self.values {
            context.set(name.clone(), *value);
        }
    }
}
