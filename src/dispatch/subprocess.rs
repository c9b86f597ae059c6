use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("binary `{binary}` was not found")]
    MissingBinary { binary: String },
    #[error("command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("io error running command in {cwd}: {source}")]
    Io {
        cwd: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs `argv` inside `cwd` with a hard timeout. Both output pipes are read
/// on their own threads so a chatty child never deadlocks against a full
/// pipe buffer while the parent waits.
pub fn run_with_timeout(
    argv: &[String],
    cwd: &Path,
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    let (binary, args) = argv
        .split_first()
        .ok_or_else(|| CommandError::MissingBinary {
            binary: String::new(),
        })?;

    let mut command = Command::new(binary);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(CommandError::MissingBinary {
                binary: binary.clone(),
            })
        }
        Err(err) => return Err(io_error(cwd, err)),
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io_error(cwd, std::io::Error::other("missing stdout pipe")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io_error(cwd, std::io::Error::other("missing stderr pipe")))?;

    let stdout_reader = thread::spawn(move || read_to_string(stdout));
    let stderr_reader = thread::spawn(move || read_to_string(stderr));

    let start = Instant::now();
    let exit_status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout_reader.join();
                    let _ = stderr_reader.join();
                    return Err(CommandError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                thread::sleep(WAIT_POLL_INTERVAL);
            }
            Err(err) => return Err(io_error(cwd, err)),
        }
    };

    Ok(CommandOutput {
        exit_code: exit_status.code().unwrap_or(-1),
        stdout: stdout_reader.join().unwrap_or_default(),
        stderr: stderr_reader.join().unwrap_or_default(),
    })
}

fn read_to_string(pipe: impl Read) -> String {
    let mut buf = String::new();
    let mut reader = BufReader::new(pipe);
    let _ = reader.read_to_string(&mut buf);
    buf
}

fn io_error(cwd: &Path, source: std::io::Error) -> CommandError {
    CommandError::Io {
        cwd: PathBuf::from(cwd).display().to_string(),
        source,
    }
}
