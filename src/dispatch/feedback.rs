use std::io::{BufRead, Write};

/// Seam for the human-confirmation collaborator: a yes/no question answered
/// by an operator (or a preconfigured stand-in).
pub trait Confirmation: Send {
    fn request_confirmation(&self, question: &str) -> bool;
}

/// Answers every question with a fixed value. The default mirrors the
/// original operator tooling: confirm unless `FOREMAN_AUTO_CONFIRM` is set to
/// `false`, so unattended runs never block on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoConfirm {
    pub confirm: bool,
}

impl AutoConfirm {
    pub fn from_env() -> Self {
        Self::from_setting(std::env::var("FOREMAN_AUTO_CONFIRM").ok().as_deref())
    }

    /// Only a literal `false` (any case) declines; unset or any other value
    /// confirms.
    fn from_setting(raw: Option<&str>) -> Self {
        let confirm = raw
            .map(|value| !value.eq_ignore_ascii_case("false"))
            .unwrap_or(true);
        Self { confirm }
    }
}

impl Confirmation for AutoConfirm {
    fn request_confirmation(&self, _question: &str) -> bool {
        self.confirm
    }
}

/// Interactive prompt on stdin for headless runs. Blank input counts as yes;
/// anything starting with `y` confirms; an unreadable stdin declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirmation for StdinConfirm {
    fn request_confirmation(&self, question: &str) -> bool {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{question} [Y/n]: ");
        let _ = stderr.flush();

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => {
                let trimmed = answer.trim();
                trimmed.is_empty() || trimmed.to_ascii_lowercase().starts_with('y')
            }
        }
    }
}
