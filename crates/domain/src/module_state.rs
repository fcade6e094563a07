//! Module state: which activation group each display section shows.
//!
//! A section is either in its default layout (`active_group == None`) or
//! showing one group. The whole [`ModuleStates`] snapshot is replaced every
//! cycle; the previous snapshot is only read to carry `since` forward.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleState {
    pub section: String,
    pub active_group: Option<String>,
    /// Name of the trigger that selected `active_group`.
    #[serde(default)]
    pub trigger: Option<String>,
    /// When the section entered its current state.
    pub since: Timestamp,
}

impl ModuleState {
    /// A section showing its default layout.
    #[must_use]
    pub fn default_layout(section: impl Into<String>, since: Timestamp) -> Self {
        Self {
            section: section.into(),
            active_group: None,
            trigger: None,
            since,
        }
    }

    /// A section showing `group`, selected by `trigger`.
    #[must_use]
    pub fn active(
        section: impl Into<String>,
        group: impl Into<String>,
        trigger: impl Into<String>,
        since: Timestamp,
    ) -> Self {
        Self {
            section: section.into(),
            active_group: Some(group.into()),
            trigger: Some(trigger.into()),
            since,
        }
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.active_group.is_none()
    }
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.active_group {
            Some(group) => write!(f, "{}={group}", self.section),
            None => write!(f, "{}=default", self.section),
        }
    }
}

/// Per-section state snapshot, keyed by section id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleStates(BTreeMap<String, ModuleState>);

impl ModuleStates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, state: ModuleState) {
        self.0.insert(state.section.clone(), state);
    }

    #[must_use]
    pub fn get(&self, section: &str) -> Option<&ModuleState> {
        self.0.get(section)
    }

    /// Active group of `section`; `None` for a default layout or an
    /// unknown section.
    #[must_use]
    pub fn active_group(&self, section: &str) -> Option<&str> {
        self.0.get(section).and_then(|s| s.active_group.as_deref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in section order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleState> {
        self.0.values()
    }
}

impl FromIterator<ModuleState> for ModuleStates {
    fn from_iter<T: IntoIterator<Item = ModuleState>>(iter: T) -> Self {
        let mut states = Self::new();
        for state in iter {
            states.insert(state);
        }
        states
    }
}
