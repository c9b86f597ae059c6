use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier for one unit of work. Ordinal (`"3"`) or dotted-path (`"3.1"`);
/// dotted depth drives indentation in the plan pane.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub String);

impl StepId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn depth(&self) -> usize {
        self.0.matches('.').count()
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One discrete unit of work produced by the decision source. Immutable once
/// created. The action kind stays a plain string so an unrecognized kind
/// survives deserialization and is reported by the dispatcher instead of
/// failing the parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub description: String,
    pub action: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Step {
    pub fn new(id: impl Into<String>, description: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: StepId::new(id),
            description: description.into(),
            action: action.into(),
            parameters: Map::new(),
        }
    }

    pub fn with_parameter(mut self, key: &str, value: Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn string_parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}

/// Terminal outcome of a step or of the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Produced exactly once per step by the dispatcher. Carries enough context
/// for the agent loop to decide whether to continue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
}

impl StepResult {
    pub fn succeeded() -> Self {
        Self {
            status: RunStatus::Succeeded,
            stdout: None,
            stderr: None,
            error: None,
            summary: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            stdout: None,
            stderr: None,
            error: Some(error.into()),
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: Value) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}

/// History entry fed back to the decision source after each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: Step,
    pub result: StepResult,
}
