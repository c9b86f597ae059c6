use foreman::dispatch::{ActionDispatcher, AutoConfirm, CodeMutation, MutationRegistry};
use foreman::plan::{RunStatus, Step};
use foreman::policy::ExecutionPolicy;
use foreman::sandbox::Sandbox;
use serde_json::{json, Map, Value};
use tempfile::tempdir;

/// File-writing mutation in the shape a real registry entry takes: parameters
/// in, sandbox-resolved path, summary out.
struct WriteFile;

impl CodeMutation for WriteFile {
    fn apply(&self, sandbox: &Sandbox, parameters: &Map<String, Value>) -> Result<Value, String> {
        let path = parameters
            .get("path")
            .and_then(Value::as_str)
            .ok_or("missing `path` parameter")?;
        let contents = parameters
            .get("contents")
            .and_then(Value::as_str)
            .ok_or("missing `contents` parameter")?;
        let target = sandbox.resolve(path).map_err(|err| err.to_string())?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|err| err.to_string())?;
        }
        std::fs::write(&target, contents).map_err(|err| err.to_string())?;
        Ok(json!({ "path": path, "bytes": contents.len() }))
    }
}

fn dispatcher(root: &std::path::Path) -> ActionDispatcher {
    let mut mutations = MutationRegistry::new();
    mutations.register("write_file", Box::new(WriteFile));
    ActionDispatcher::new(ExecutionPolicy::DenyAll, Sandbox::new(root).expect("sandbox"))
        .with_mutations(mutations)
        .with_confirmation(Box::new(AutoConfirm { confirm: true }))
}

#[test]
fn a_registered_mutation_writes_through_the_sandbox() {
    let dir = tempdir().expect("temp dir");
    let step = Step::new("1", "write the module", "modify_code")
        .with_parameter("operation", json!("write_file"))
        .with_parameter("path", json!("src/lib.rs"))
        .with_parameter("contents", json!("pub fn answer() -> u32 { 42 }\n"));

    let result = dispatcher(dir.path()).execute(&step);
    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(result.summary.as_ref().expect("summary")["path"], "src/lib.rs");
    let written = std::fs::read_to_string(dir.path().join("src/lib.rs")).expect("read");
    assert!(written.contains("answer"));
}

#[test]
fn a_mutation_cannot_write_outside_the_sandbox() {
    let outer = tempdir().expect("temp dir");
    let root = outer.path().join("project");
    std::fs::create_dir(&root).expect("mkdir");
    let step = Step::new("1", "escape", "modify_code")
        .with_parameter("operation", json!("write_file"))
        .with_parameter("path", json!("../leak.txt"))
        .with_parameter("contents", json!("leaked"));

    let result = dispatcher(&root).execute(&step);
    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.error.as_deref().expect("error").contains("escapes"));
    assert!(!outer.path().join("leak.txt").exists());
}

#[cfg(unix)]
#[test]
fn a_mutation_cannot_write_through_a_symlinked_directory() {
    let outer = tempdir().expect("temp dir");
    let root = outer.path().join("project");
    let outside = outer.path().join("outside");
    std::fs::create_dir(&root).expect("mkdir root");
    std::fs::create_dir(&outside).expect("mkdir outside");
    std::os::unix::fs::symlink(&outside, root.join("link")).expect("symlink");

    let step = Step::new("1", "escape via link", "modify_code")
        .with_parameter("operation", json!("write_file"))
        .with_parameter("path", json!("link/new.txt"))
        .with_parameter("contents", json!("leaked"));

    let result = dispatcher(&root).execute(&step);
    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.error.as_deref().expect("error").contains("escapes"));
    assert!(!outside.join("new.txt").exists());
}

#[test]
fn missing_mutation_parameters_fail_the_step_cleanly() {
    let dir = tempdir().expect("temp dir");
    let step = Step::new("1", "half configured", "modify_code")
        .with_parameter("operation", json!("write_file"))
        .with_parameter("path", json!("src/lib.rs"));

    let result = dispatcher(dir.path()).execute(&step);
    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.error.as_deref(), Some("missing `contents` parameter"));
}
