use crate::plan::{Step, StepRecord};
use std::collections::VecDeque;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("decision source failed: {0}")]
    Failure(String),
    #[error("failed to read plan file {path}: {source}")]
    PlanRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse plan file {path}: {source}")]
    PlanParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The external collaborator that decides what the next unit of work is.
/// `Ok(None)` or `is_finished` is a clean stop; an error is an unrecoverable
/// stop reported once at the loop boundary.
pub trait DecisionSource: Send {
    fn next_step(&mut self, history: &[StepRecord]) -> Result<Option<Step>, DecisionError>;
    fn is_finished(&self) -> bool;
}

/// Replays a fixed step sequence. Like the dynamic planner it stands in for,
/// it halts permanently once the history records a failure; there is no
/// retry or resume path.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    done: bool,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            done: false,
        }
    }
}

impl DecisionSource for ScriptedSource {
    fn next_step(&mut self, history: &[StepRecord]) -> Result<Option<Step>, DecisionError> {
        if self.done {
            return Ok(None);
        }
        let failed_already = history
            .last()
            .map(|record| !record.result.is_success())
            .unwrap_or(false);
        if failed_already {
            self.done = true;
            return Ok(None);
        }
        match self.steps.pop_front() {
            Some(step) => Ok(Some(step)),
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.done
    }
}

/// Loads a JSON array of steps from disk, for driving a run from a prepared
/// plan file on the command line.
pub fn load_plan_file(path: &Path) -> Result<ScriptedSource, DecisionError> {
    let raw = std::fs::read_to_string(path).map_err(|source| DecisionError::PlanRead {
        path: path.display().to_string(),
        source,
    })?;
    let steps: Vec<Step> =
        serde_json::from_str(&raw).map_err(|source| DecisionError::PlanParse {
            path: path.display().to_string(),
            source,
        })?;
    Ok(ScriptedSource::new(steps))
}

#[cfg(test)]
mod tests {
    use super::{load_plan_file, DecisionSource, ScriptedSource};
    use crate::plan::{Step, StepRecord, StepResult};
    use tempfile::tempdir;

    #[test]
    fn scripted_source_yields_steps_in_order_then_finishes() {
        let mut source = ScriptedSource::new(vec![
            Step::new("1", "first", "run_command"),
            Step::new("2", "second", "run_command"),
        ]);
        assert!(!source.is_finished());
        assert_eq!(source.next_step(&[]).expect("next").expect("step").id.0, "1");
        assert_eq!(source.next_step(&[]).expect("next").expect("step").id.0, "2");
        assert!(source.next_step(&[]).expect("next").is_none());
        assert!(source.is_finished());
    }

    #[test]
    fn scripted_source_halts_permanently_after_a_recorded_failure() {
        let mut source = ScriptedSource::new(vec![
            Step::new("1", "first", "run_command"),
            Step::new("2", "second", "run_command"),
        ]);
        let step = source.next_step(&[]).expect("next").expect("step");
        let history = vec![StepRecord {
            step,
            result: StepResult::failed("boom"),
        }];
        assert!(source.next_step(&history).expect("next").is_none());
        assert!(source.is_finished());
        assert!(source.next_step(&[]).expect("next").is_none());
    }

    #[test]
    fn plan_file_round_trips_steps() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("plan.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "1", "description": "greet", "action": "run_command",
                 "parameters": {"command": "echo hi"}},
                {"id": "2", "description": "confirm", "action": "human_feedback"}
            ]"#,
        )
        .expect("write plan");
        let mut source = load_plan_file(&path).expect("load");
        let first = source.next_step(&[]).expect("next").expect("step");
        assert_eq!(first.string_parameter("command"), Some("echo hi"));
        let second = source.next_step(&[]).expect("next").expect("step");
        assert_eq!(second.action, "human_feedback");
    }

    #[test]
    fn malformed_plan_file_is_a_parse_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("plan.json");
        std::fs::write(&path, "{not json").expect("write plan");
        assert!(load_plan_file(&path).is_err());
    }
}
