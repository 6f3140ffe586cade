use crate::automation::Point;

/// A single step of an exploration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    /// Foreground screen when the step was taken.
    pub screen: String,
    pub kind: TraceStepKind,
    /// Step number, monotonic within the run.
    pub step_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceStepKind {
    Launch { relaunch: bool },
    Click { id: String, center: Point, leaf: bool },
    /// A click failed and was replaced by a back navigation.
    ClickFailed { id: String },
    Back { forced: bool },
    HideKeyboard,
    /// Nothing to do on the launch screen.
    Idle,
}

/// Ordered record of everything the explorer did.
#[derive(Debug, Clone, Default)]
pub struct ExplorationTrace {
    steps: Vec<TraceStep>,
    next_step: u64,
}

impl ExplorationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, screen: impl Into<String>, kind: TraceStepKind) {
        self.steps.push(TraceStep {
            screen: screen.into(),
            kind,
            step_number: self.next_step,
        });
        self.next_step += 1;
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn clicks(&self) -> impl Iterator<Item = &TraceStep> {
        self.steps
            .iter()
            .filter(|s| matches!(s.kind, TraceStepKind::Click { .. }))
    }
}
