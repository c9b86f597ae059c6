pub mod command_line;
pub mod feedback;
pub mod mutation;
pub mod subprocess;

pub use command_line::split_command_line;
pub use feedback::{AutoConfirm, Confirmation, StdinConfirm};
pub use mutation::{CodeMutation, MutationRegistry};
pub use subprocess::{run_with_timeout, CommandError, CommandOutput};

use crate::plan::{Step, StepResult};
use crate::policy::ExecutionPolicy;
use crate::sandbox::{Sandbox, SandboxError};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown action: {action}")]
    UnknownAction { action: String },
    #[error("step is missing required parameter `{parameter}`")]
    MissingParameter { parameter: String },
    #[error("failed to parse command line: {0}")]
    CommandParse(String),
    #[error("shell command cannot be empty")]
    EmptyCommand,
    #[error("command is rejected by the execution policy")]
    PolicyViolation,
    #[error("Unknown modify_code operation: {operation}")]
    UnknownOperation { operation: String },
    #[error("Unknown verification tool: {tool}")]
    UnknownTool { tool: String },
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Maps a step's declared action kind to its handler. Every side-effecting
/// handler consults the policy (commands) and the sandbox (paths) before it
/// does any work; there is no bypass path. `execute` is total: all failures
/// come back as a failed `StepResult`, never as an unwind.
pub struct ActionDispatcher {
    policy: ExecutionPolicy,
    sandbox: Sandbox,
    mutations: MutationRegistry,
    verifiers: BTreeMap<String, Vec<String>>,
    confirmation: Box<dyn Confirmation>,
    step_timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(policy: ExecutionPolicy, sandbox: Sandbox) -> Self {
        Self {
            policy,
            sandbox,
            mutations: MutationRegistry::new(),
            verifiers: BTreeMap::new(),
            confirmation: Box::new(AutoConfirm::from_env()),
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_mutations(mut self, mutations: MutationRegistry) -> Self {
        self.mutations = mutations;
        self
    }

    pub fn with_verifiers(mut self, verifiers: BTreeMap<String, Vec<String>>) -> Self {
        self.verifiers = verifiers;
        self
    }

    pub fn with_confirmation(mut self, confirmation: Box<dyn Confirmation>) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn execute(&self, step: &Step) -> StepResult {
        match self.try_execute(step) {
            Ok(result) => result,
            Err(err) => StepResult::failed(err.to_string()),
        }
    }

    fn try_execute(&self, step: &Step) -> Result<StepResult, DispatchError> {
        match step.action.as_str() {
            "run_command" => self.run_command_step(step),
            "modify_code" => self.modify_code_step(step),
            "verify_code" => self.verify_code_step(step),
            "human_feedback" => Ok(self.human_feedback_step(step)),
            other => Err(DispatchError::UnknownAction {
                action: other.to_string(),
            }),
        }
    }

    fn run_command_step(&self, step: &Step) -> Result<StepResult, DispatchError> {
        let raw = step
            .string_parameter("command")
            .ok_or(DispatchError::MissingParameter {
                parameter: "command".to_string(),
            })?;
        let argv = split_command_line(raw).map_err(DispatchError::CommandParse)?;
        if argv.is_empty() {
            return Err(DispatchError::EmptyCommand);
        }
        if !self.policy.is_allowed(&argv) {
            return Err(DispatchError::PolicyViolation);
        }
        let cwd = match step.string_parameter("cwd") {
            Some(relative) => self.sandbox.resolve(relative)?,
            None => self.sandbox.root().to_path_buf(),
        };
        run_gated_command(&argv, cwd, self.step_timeout)
    }

    fn modify_code_step(&self, step: &Step) -> Result<StepResult, DispatchError> {
        let operation = step
            .string_parameter("operation")
            .ok_or(DispatchError::MissingParameter {
                parameter: "operation".to_string(),
            })?;
        let mutation =
            self.mutations
                .get(operation)
                .ok_or_else(|| DispatchError::UnknownOperation {
                    operation: operation.to_string(),
                })?;
        match mutation.apply(&self.sandbox, &step.parameters) {
            Ok(summary) => Ok(StepResult::succeeded().with_summary(summary)),
            Err(reason) => Ok(StepResult::failed(reason)),
        }
    }

    fn verify_code_step(&self, step: &Step) -> Result<StepResult, DispatchError> {
        let tool = step
            .string_parameter("tool")
            .ok_or(DispatchError::MissingParameter {
                parameter: "tool".to_string(),
            })?;
        let argv = self
            .verifiers
            .get(tool)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownTool {
                tool: tool.to_string(),
            })?;
        if argv.is_empty() {
            return Err(DispatchError::EmptyCommand);
        }
        if !self.policy.is_allowed(&argv) {
            return Err(DispatchError::PolicyViolation);
        }
        let mut result = run_gated_command(&argv, self.sandbox.root().to_path_buf(), self.step_timeout)?;
        result.summary = Some(json!({
            "tool": tool,
            "command": argv.join(" "),
        }));
        Ok(result)
    }

    fn human_feedback_step(&self, step: &Step) -> StepResult {
        let question = step
            .string_parameter("question")
            .unwrap_or(step.description.as_str());
        if self.confirmation.request_confirmation(question) {
            StepResult::succeeded()
        } else {
            StepResult::failed("Operation cancelled by operator")
        }
    }
}

fn run_gated_command(
    argv: &[String],
    cwd: PathBuf,
    timeout: Duration,
) -> Result<StepResult, DispatchError> {
    let output = run_with_timeout(argv, &cwd, timeout)?;
    let mut result = if output.success() {
        StepResult::succeeded()
    } else {
        StepResult::failed(format!("Command failed with exit code {}", output.exit_code))
    };
    result.stdout = Some(output.stdout);
    result.stderr = Some(output.stderr);
    Ok(result)
}
