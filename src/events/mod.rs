pub mod bridge;

pub use bridge::{event_channel, EventBridge, EventDrain};

use crate::plan::{RunStatus, Step, StepId};
use serde::{Deserialize, Serialize};

/// Lifecycle event carried from the agent worker to the observer. The wire
/// form tags on `kind` and keeps the `id`/`status`/`error`/`payload` field
/// names stable for any external transport that persists the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentEvent {
    NewStep {
        payload: Step,
    },
    StepStarted {
        id: StepId,
    },
    ToolOutput {
        id: StepId,
        payload: String,
    },
    StepFinished {
        id: StepId,
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    AgentFinished {
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl AgentEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AgentFinished { .. })
    }

    pub fn step_id(&self) -> Option<&StepId> {
        match self {
            Self::NewStep { payload } => Some(&payload.id),
            Self::StepStarted { id } | Self::ToolOutput { id, .. } => Some(id),
            Self::StepFinished { id, .. } => Some(id),
            Self::AgentFinished { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AgentEvent;
    use crate::plan::{RunStatus, Step, StepId};
    use serde_json::json;

    #[test]
    fn wire_form_tags_on_kind_and_keeps_field_names() {
        let event = AgentEvent::StepFinished {
            id: StepId::new("2"),
            status: RunStatus::Failed,
            error: Some("exit code 1".to_string()),
        };
        let encoded = serde_json::to_value(&event).expect("encode");
        assert_eq!(
            encoded,
            json!({
                "kind": "step_finished",
                "id": "2",
                "status": "failed",
                "error": "exit code 1"
            })
        );
    }

    #[test]
    fn new_step_nests_the_step_under_payload() {
        let event = AgentEvent::NewStep {
            payload: Step::new("1", "list files", "run_command"),
        };
        let encoded = serde_json::to_value(&event).expect("encode");
        assert_eq!(encoded["kind"], "new_step");
        assert_eq!(encoded["payload"]["id"], "1");
        assert_eq!(encoded["payload"]["action"], "run_command");
    }

    #[test]
    fn only_agent_finished_is_terminal() {
        let finished = AgentEvent::AgentFinished {
            status: RunStatus::Succeeded,
            error: None,
        };
        let started = AgentEvent::StepStarted {
            id: StepId::new("1"),
        };
        assert!(finished.is_terminal());
        assert!(!started.is_terminal());
        assert_eq!(started.step_id(), Some(&StepId::new("1")));
        assert_eq!(finished.step_id(), None);
    }
}
