use crate::agent::{load_plan_file, spawn_agent, DecisionSource, ScriptedSource};
use crate::config::load_run_config;
use crate::dispatch::{ActionDispatcher, AutoConfirm, Confirmation, StdinConfirm};
use crate::events::event_channel;
use crate::observer::{run_observer, PlanView};
use crate::plan::RunStatus;
use crate::sandbox::Sandbox;
use crate::shared::log_run_event;
use crate::tui;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

const USAGE: &str = "usage: foreman --goal <text> --project-root <path> [--plan <file>] [--headless]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub goal: String,
    pub project_root: PathBuf,
    pub plan_file: Option<PathBuf>,
    pub headless: bool,
}

pub fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut goal = None;
    let mut project_root = None;
    let mut plan_file = None;
    let mut headless = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--goal" => {
                goal = Some(
                    iter.next()
                        .ok_or_else(|| format!("--goal requires a value\n{USAGE}"))?
                        .clone(),
                );
            }
            "--project-root" => {
                project_root = Some(PathBuf::from(
                    iter.next()
                        .ok_or_else(|| format!("--project-root requires a value\n{USAGE}"))?,
                ));
            }
            "--plan" => {
                plan_file = Some(PathBuf::from(
                    iter.next()
                        .ok_or_else(|| format!("--plan requires a value\n{USAGE}"))?,
                ));
            }
            "--headless" => headless = true,
            other => return Err(format!("unknown argument `{other}`\n{USAGE}")),
        }
    }

    Ok(CliArgs {
        goal: goal.ok_or_else(|| format!("--goal is required\n{USAGE}"))?,
        project_root: project_root
            .ok_or_else(|| format!("--project-root is required\n{USAGE}"))?,
        plan_file,
        headless,
    })
}

/// Wires the run together: config, sandbox, policy, dispatcher, the agent
/// worker thread, and the foreground observer. Returns the run's final
/// status; a completed run is a success at the process level regardless of
/// that status, so only setup failures surface as `Err`.
pub fn run(args: Vec<String>) -> Result<RunStatus, String> {
    let cli = parse_args(&args)?;
    if !cli.project_root.is_dir() {
        return Err(format!(
            "project root `{}` is not a directory",
            cli.project_root.display()
        ));
    }

    let config = load_run_config(&cli.project_root).map_err(|err| err.to_string())?;
    let sandbox = Sandbox::new(&cli.project_root).map_err(|err| err.to_string())?;
    let project_root = sandbox.root().to_path_buf();

    let confirmation: Box<dyn Confirmation> = if cli.headless {
        Box::new(StdinConfirm)
    } else {
        // The cockpit owns the terminal, so confirmations cannot prompt.
        Box::new(AutoConfirm::from_env())
    };
    let dispatcher = ActionDispatcher::new(config.policy.build(), sandbox)
        .with_verifiers(config.verifiers.clone())
        .with_step_timeout(config.step_timeout())
        .with_confirmation(confirmation);

    let source: Box<dyn DecisionSource> = match &cli.plan_file {
        Some(path) => Box::new(load_plan_file(path).map_err(|err| err.to_string())?),
        None => Box::new(ScriptedSource::new(Vec::new())),
    };

    let _ = log_run_event(&project_root, "run.started", &[("goal", &cli.goal)]);

    let (bridge, drain) = event_channel();
    let mut view = PlanView::new(cli.goal.clone(), &project_root);
    // Detached on purpose: the process may exit while a step is still
    // blocked on a subprocess.
    let _worker = spawn_agent(source, dispatcher, bridge, Some(project_root.clone()));

    if cli.headless {
        let cancel = AtomicBool::new(false);
        let mut printed = 0usize;
        run_observer(&drain, &mut view, &cancel, |view| {
            for line in &view.log[printed..] {
                println!("{line}");
            }
            printed = view.log.len();
        });
        println!("{}", view.status_line());
    } else {
        tui::run_cockpit(&drain, &mut view)?;
    }

    let status = view.final_status.unwrap_or(RunStatus::Failed);
    let _ = log_run_event(&project_root, "run.stopped", &[("status", &status.to_string())]);
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::parse_args;
    use std::path::PathBuf;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    #[test]
    fn parses_the_full_argument_surface() {
        let cli = parse_args(&args(&[
            "--goal",
            "tidy the build",
            "--project-root",
            "/tmp/project",
            "--plan",
            "plan.json",
            "--headless",
        ]))
        .expect("parse");
        assert_eq!(cli.goal, "tidy the build");
        assert_eq!(cli.project_root, PathBuf::from("/tmp/project"));
        assert_eq!(cli.plan_file, Some(PathBuf::from("plan.json")));
        assert!(cli.headless);
    }

    #[test]
    fn goal_and_project_root_are_required() {
        let err = parse_args(&args(&["--goal", "x"])).expect_err("missing root");
        assert!(err.contains("--project-root is required"));
        let err = parse_args(&args(&["--project-root", "/tmp"])).expect_err("missing goal");
        assert!(err.contains("--goal is required"));
    }

    #[test]
    fn unknown_arguments_are_rejected_with_usage() {
        let err = parse_args(&args(&["--bogus"])).expect_err("unknown");
        assert!(err.contains("unknown argument `--bogus`"));
        assert!(err.contains("usage:"));
    }

    #[test]
    fn flag_values_cannot_be_omitted() {
        let err = parse_args(&args(&["--goal"])).expect_err("dangling flag");
        assert!(err.contains("--goal requires a value"));
    }
}
