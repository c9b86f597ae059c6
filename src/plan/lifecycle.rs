use crate::plan::step::{RunStatus, StepId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle state of a single step. Set to `Pending` the instant the step is
/// announced; terminal states admit no further transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl StepState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn can_advance(self, to: StepState) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
        )
    }
}

impl From<RunStatus> for StepState {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Succeeded => Self::Succeeded,
            RunStatus::Failed => Self::Failed,
        }
    }
}

impl std::fmt::Display for StepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Tracks every announced step through `pending -> running -> terminal`.
///
/// An invalid transition is a programming-contract violation on the agent
/// side, not a recoverable condition, so it panics; the agent loop boundary
/// converts the unwind into a terminal failure event.
#[derive(Debug, Default)]
pub struct StepLifecycle {
    states: BTreeMap<StepId, StepState>,
}

impl StepLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn announce(&mut self, id: &StepId) {
        let previous = self.states.insert(id.clone(), StepState::Pending);
        assert!(
            previous.is_none(),
            "step `{id}` announced more than once"
        );
    }

    pub fn start(&mut self, id: &StepId) {
        self.advance(id, StepState::Running);
    }

    pub fn finish(&mut self, id: &StepId, status: RunStatus) {
        self.advance(id, status.into());
    }

    pub fn state(&self, id: &StepId) -> Option<StepState> {
        self.states.get(id).copied()
    }

    fn advance(&mut self, id: &StepId, to: StepState) {
        let current = self
            .states
            .get_mut(id)
            .unwrap_or_else(|| panic!("step `{id}` was never announced"));
        assert!(
            current.can_advance(to),
            "invalid step transition for `{id}`: {current} -> {to}"
        );
        *current = to;
    }
}
