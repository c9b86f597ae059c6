use crate::events::{AgentEvent, EventDrain};
use crate::plan::{RunStatus, Step, StepId, StepState};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

pub const OBSERVER_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
    pub step: Step,
    pub state: StepState,
}

/// View model reconstructed solely from the event stream. Owned and mutated
/// by the observer loop only; the worker never touches it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanView {
    pub goal: String,
    pub project_label: String,
    entries: Vec<PlanEntry>,
    index: BTreeMap<StepId, usize>,
    pub log: Vec<String>,
    pub current_step: Option<StepId>,
    pub final_status: Option<RunStatus>,
}

impl PlanView {
    pub fn new(goal: impl Into<String>, project_root: &Path) -> Self {
        let project_label = project_root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| project_root.display().to_string());
        Self {
            goal: goal.into(),
            project_label,
            entries: Vec::new(),
            index: BTreeMap::new(),
            log: Vec::new(),
            current_step: None,
            final_status: None,
        }
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn is_finished(&self) -> bool {
        self.final_status.is_some()
    }

    /// Applies one event. Duplicate announcements are ignored and status
    /// assignment is last-write-wins per step id, so replaying a stream into
    /// a fresh view is deterministic and a stray duplicate cannot corrupt
    /// the plan.
    pub fn apply(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::NewStep { payload } => {
                if self.index.contains_key(&payload.id) {
                    return;
                }
                self.index.insert(payload.id.clone(), self.entries.len());
                self.entries.push(PlanEntry {
                    step: payload.clone(),
                    state: StepState::Pending,
                });
            }
            AgentEvent::StepStarted { id } => {
                self.current_step = Some(id.clone());
                if let Some(entry) = self.entry_mut(id) {
                    if !entry.state.is_terminal() {
                        entry.state = StepState::Running;
                    }
                }
            }
            AgentEvent::ToolOutput { payload, .. } => {
                for line in payload.lines() {
                    self.log.push(line.to_string());
                }
            }
            AgentEvent::StepFinished { id, status, error } => {
                if let Some(entry) = self.entry_mut(id) {
                    entry.state = (*status).into();
                }
                if self.current_step.as_ref() == Some(id) {
                    self.current_step = None;
                }
                if let Some(message) = error.as_deref() {
                    if !message.is_empty() {
                        self.log.push(message.to_string());
                    }
                }
            }
            AgentEvent::AgentFinished { status, error } => {
                self.final_status = Some(*status);
                self.current_step = None;
                if let Some(message) = error.as_deref() {
                    if !message.is_empty() {
                        self.log.push(message.to_string());
                    }
                }
            }
        }
    }

    pub fn status_line(&self) -> String {
        if let Some(status) = self.final_status {
            return format!("Status: run {status}");
        }
        if let Some(current) = &self.current_step {
            return format!("Status: running step {current}");
        }
        "Status: planning".to_string()
    }

    /// One display line per announced step, indented by dotted-id depth.
    pub fn plan_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| {
                let glyph = match entry.state {
                    StepState::Pending => "[ ]",
                    StepState::Running => "[▶]",
                    StepState::Succeeded => "[✔]",
                    StepState::Failed => "[✘]",
                };
                let indent = "  ".repeat(entry.step.id.depth());
                format!("{glyph} {indent}{}. {}", entry.step.id, entry.step.description)
            })
            .collect()
    }

    fn entry_mut(&mut self, id: &StepId) -> Option<&mut PlanEntry> {
        self.index.get(id).copied().map(|at| &mut self.entries[at])
    }
}

/// Cooperative consumer loop: drains everything currently queued, updates the
/// view, calls the render callback once per batch, and exits on the terminal
/// event, a disconnected bridge, or cancellation. The bounded wait keeps it
/// from busy-spinning while idle.
pub fn run_observer<F>(drain: &EventDrain, view: &mut PlanView, cancel: &AtomicBool, mut render: F)
where
    F: FnMut(&PlanView),
{
    render(view);
    loop {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        match drain.recv_timeout(OBSERVER_POLL_INTERVAL) {
            Ok(event) => {
                view.apply(&event);
                for queued in drain.drain_available() {
                    view.apply(&queued);
                }
                render(view);
                if view.is_finished() {
                    return;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
