//! Interaction counting and stopping conditions.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The interaction budget was used up.
    BudgetReached,
    /// Too many consecutive cycles produced no interaction.
    NoProgress,
    /// The automation session failed beyond recovery.
    AutomationFailure,
}

/// Global interaction counter with loop detection. A no-progress ceiling
/// of zero disables loop detection.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    count: u64,
    last_seen: u64,
    no_progress: u32,
    max_interactions: u64,
    max_no_progress: u32,
}

impl ProgressTracker {
    pub fn new(max_interactions: u64, max_no_progress: u32) -> Self {
        Self {
            count: 0,
            last_seen: 0,
            no_progress: 0,
            max_interactions,
            max_no_progress,
        }
    }

    /// Count one interaction and return its number.
    pub fn record(&mut self) -> u64 {
        self.count += 1;
        self.count
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn no_progress(&self) -> u32 {
        self.no_progress
    }

    /// Treat the current count as already seen, so the first check after
    /// this only counts interactions made since.
    pub fn mark_seen(&mut self) {
        self.last_seen = self.count;
        self.no_progress = 0;
    }

    pub fn budget_reached(&self) -> bool {
        self.count >= self.max_interactions
    }

    /// Evaluate the stopping conditions after a completed cycle.
    pub fn check(&mut self) -> Option<StopReason> {
        tracing::info!("Checking for stopping conditions.");

        if self.count == self.last_seen {
            self.no_progress += 1;
        } else {
            self.last_seen = self.count;
            self.no_progress = 0;
        }

        if self.max_no_progress > 0 && self.no_progress >= self.max_no_progress {
            tracing::info!(
                "Infinite loop detected, {} iterations without interaction, stopping traversal.",
                self.no_progress
            );
            return Some(StopReason::NoProgress);
        }

        if self.budget_reached() {
            tracing::info!(
                "Test reached maximum interaction count of {} interactions, stopping traversal.",
                self.count
            );
            return Some(StopReason::BudgetReached);
        }

        None
    }
}
