use foreman::agent::{spawn_agent, DecisionSource, ScriptedSource};
use foreman::dispatch::{ActionDispatcher, AutoConfirm};
use foreman::events::event_channel;
use foreman::observer::{run_observer, PlanView};
use foreman::plan::{RunStatus, Step, StepState};
use foreman::policy::ExecutionPolicy;
use foreman::sandbox::Sandbox;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use tempfile::tempdir;

fn dispatcher(root: &Path) -> ActionDispatcher {
    ActionDispatcher::new(
        ExecutionPolicy::allow_list(["echo", "sh"]),
        Sandbox::new(root).expect("sandbox"),
    )
    .with_confirmation(Box::new(AutoConfirm { confirm: true }))
}

fn command_step(id: &str, description: &str, command: &str) -> Step {
    Step::new(id, description, "run_command").with_parameter("command", json!(command))
}

#[test]
fn worker_and_observer_complete_a_clean_run_across_threads() {
    let dir = tempdir().expect("temp dir");
    let (bridge, drain) = event_channel();
    let source: Box<dyn DecisionSource> = Box::new(ScriptedSource::new(vec![
        command_step("1", "say hello", "echo hello"),
        command_step("2", "say goodbye", "echo goodbye"),
    ]));

    let worker = spawn_agent(source, dispatcher(dir.path()), bridge, None);

    let mut view = PlanView::new("two echoes", dir.path());
    let cancel = AtomicBool::new(false);
    run_observer(&drain, &mut view, &cancel, |_| {});

    assert_eq!(worker.join().expect("worker"), RunStatus::Succeeded);
    assert_eq!(view.final_status, Some(RunStatus::Succeeded));
    assert_eq!(view.entries().len(), 2);
    assert!(view
        .entries()
        .iter()
        .all(|entry| entry.state == StepState::Succeeded));
    assert!(view.log.contains(&"hello".to_string()));
    assert!(view.log.contains(&"goodbye".to_string()));
}

#[test]
fn a_failing_step_halts_the_run_and_the_observer_sees_it() {
    let dir = tempdir().expect("temp dir");
    let (bridge, drain) = event_channel();
    let source: Box<dyn DecisionSource> = Box::new(ScriptedSource::new(vec![
        command_step("1", "warm up", "echo ok"),
        command_step("2", "break", "sh -c 'exit 9'"),
        command_step("3", "unreachable", "echo never"),
    ]));

    let worker = spawn_agent(source, dispatcher(dir.path()), bridge, None);

    let mut view = PlanView::new("halt on failure", dir.path());
    let cancel = AtomicBool::new(false);
    run_observer(&drain, &mut view, &cancel, |_| {});

    assert_eq!(worker.join().expect("worker"), RunStatus::Failed);
    assert_eq!(view.final_status, Some(RunStatus::Failed));
    // Step 3 was never announced; the plan holds only what actually ran.
    assert_eq!(view.entries().len(), 2);
    assert_eq!(view.entries()[0].state, StepState::Succeeded);
    assert_eq!(view.entries()[1].state, StepState::Failed);
    assert!(view
        .log
        .iter()
        .any(|line| line.contains("exit code 9")));
}

#[test]
fn an_empty_plan_finishes_immediately_with_success() {
    let dir = tempdir().expect("temp dir");
    let (bridge, drain) = event_channel();
    let source: Box<dyn DecisionSource> = Box::new(ScriptedSource::new(Vec::new()));

    let worker = spawn_agent(source, dispatcher(dir.path()), bridge, None);

    let mut view = PlanView::new("nothing to do", dir.path());
    let cancel = AtomicBool::new(false);
    run_observer(&drain, &mut view, &cancel, |_| {});

    assert_eq!(worker.join().expect("worker"), RunStatus::Succeeded);
    assert_eq!(view.final_status, Some(RunStatus::Succeeded));
    assert!(view.entries().is_empty());
}

#[test]
fn run_log_records_each_finished_step() {
    let dir = tempdir().expect("temp dir");
    let (bridge, drain) = event_channel();
    let source: Box<dyn DecisionSource> = Box::new(ScriptedSource::new(vec![command_step(
        "1",
        "say hi",
        "echo hi",
    )]));

    let worker = spawn_agent(
        source,
        dispatcher(dir.path()),
        bridge,
        Some(dir.path().to_path_buf()),
    );

    let mut view = PlanView::new("logged run", dir.path());
    let cancel = AtomicBool::new(false);
    run_observer(&drain, &mut view, &cancel, |_| {});
    worker.join().expect("worker");

    let raw = std::fs::read_to_string(foreman::shared::agent_log_path(dir.path()))
        .expect("log readable");
    assert!(raw.contains("step.finished id=1 status=succeeded"));
}
