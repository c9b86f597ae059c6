pub mod decision;

pub use decision::{load_plan_file, DecisionError, DecisionSource, ScriptedSource};

use crate::dispatch::ActionDispatcher;
use crate::events::{AgentEvent, EventBridge};
use crate::plan::{RunStatus, StepLifecycle, StepRecord};
use crate::shared::log_run_event;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error("unhandled agent failure: {0}")]
    Unhandled(String),
}

/// Drives the run to completion: one cycle per step, halting on the first
/// failure or when the decision source is done. Exactly one `AgentFinished`
/// terminates the stream, emitted from this single point even when the cycle
/// body unwinds.
pub fn run_agent(
    source: &mut dyn DecisionSource,
    dispatcher: &ActionDispatcher,
    events: &EventBridge,
    log_root: Option<&Path>,
) -> RunStatus {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        drive(source, dispatcher, events, log_root)
    }));
    let (status, error) = match outcome {
        Ok(Ok(status)) => (status, None),
        Ok(Err(err)) => (RunStatus::Failed, Some(err.to_string())),
        Err(panic) => (RunStatus::Failed, Some(panic_message(panic))),
    };
    if let (Some(root), Some(message)) = (log_root, error.as_deref()) {
        let _ = log_run_event(root, "run.error", &[("error", message)]);
    }
    events.send(AgentEvent::AgentFinished { status, error });
    status
}

/// Runs the agent on a detached worker thread. The process may exit while
/// the worker is still blocked on a subprocess; that is an accepted
/// limitation, not a leak requiring coordinated shutdown.
pub fn spawn_agent(
    mut source: Box<dyn DecisionSource>,
    dispatcher: ActionDispatcher,
    events: EventBridge,
    log_root: Option<PathBuf>,
) -> thread::JoinHandle<RunStatus> {
    thread::spawn(move || run_agent(source.as_mut(), &dispatcher, &events, log_root.as_deref()))
}

fn drive(
    source: &mut dyn DecisionSource,
    dispatcher: &ActionDispatcher,
    events: &EventBridge,
    log_root: Option<&Path>,
) -> Result<RunStatus, AgentError> {
    let mut lifecycle = StepLifecycle::new();
    let mut history: Vec<StepRecord> = Vec::new();

    loop {
        if source.is_finished() {
            return Ok(RunStatus::Succeeded);
        }
        let Some(step) = source.next_step(&history)? else {
            return Ok(RunStatus::Succeeded);
        };

        events.send(AgentEvent::NewStep {
            payload: step.clone(),
        });
        lifecycle.announce(&step.id);

        events.send(AgentEvent::StepStarted {
            id: step.id.clone(),
        });
        lifecycle.start(&step.id);

        let result = dispatcher.execute(&step);

        if let Some(stdout) = result.stdout.as_deref() {
            if !stdout.trim().is_empty() {
                events.send(AgentEvent::ToolOutput {
                    id: step.id.clone(),
                    payload: stdout.trim_end().to_string(),
                });
            }
        }

        let step_id = step.id.clone();
        let status = result.status;
        let error = result.error.clone();
        history.push(StepRecord { step, result });

        lifecycle.finish(&step_id, status);
        events.send(AgentEvent::StepFinished {
            id: step_id.clone(),
            status,
            error,
        });
        if let Some(root) = log_root {
            let _ = log_run_event(
                root,
                "step.finished",
                &[("id", step_id.0.as_str()), ("status", &status.to_string())],
            );
        }

        if status != RunStatus::Succeeded {
            return Ok(RunStatus::Failed);
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "agent worker panicked".to_string()
    }
}
