use crate::shared::time::now_secs;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn agent_log_path(project_root: &Path) -> PathBuf {
    project_root.join(".foreman/logs/agent.log")
}

/// Appends one `<epoch-secs> <event> key=value...` line to the run log,
/// creating the log directory on first use.
pub fn log_run_event(
    project_root: &Path,
    event: &str,
    fields: &[(&str, &str)],
) -> std::io::Result<()> {
    let mut line = format!("{} {event}", now_secs());
    for (key, value) in fields {
        let _ = write!(line, " {key}={value}");
    }

    let path = agent_log_path(project_root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    writeln!(file, "{line}")
}
