//! State carried from one cycle to the next.

use serde::{Deserialize, Serialize};

use crate::module_state::ModuleStates;
use crate::pressure::PressureHistory;

/// Everything a cycle needs from the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleSnapshot {
    pub module_states: ModuleStates,
    pub pressure_history: PressureHistory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_missing_fields_when_deserializing() {
        let snapshot: CycleSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.module_states.is_empty());
        assert!(snapshot.pressure_history.is_empty());
    }
}
