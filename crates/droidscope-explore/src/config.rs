use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits and timing for one exploration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Interaction budget; launches count against it.
    pub max_interactions: u64,
    /// Consecutive cycles without a new interaction before the run is
    /// considered stuck. Zero disables loop detection.
    pub max_no_progress: u32,
    /// Pause before each selection so the UI can settle.
    pub settle_delay_ms: u64,
    /// Elements whose class contains this are treated as text inputs.
    pub keyboard_class_marker: String,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            max_interactions: 500,
            max_no_progress: 10,
            settle_delay_ms: 500,
            keyboard_class_marker: "EditText".to_string(),
        }
    }
}

impl ExplorationConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
