use std::collections::BTreeSet;

/// Gate deciding which commands may execute. Pure predicate over the argv
/// form of a command; immutable after construction and selected once at
/// startup, never swapped mid-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// Permit commands whose first token matches one of the configured
    /// binaries.
    AllowList(BTreeSet<String>),
    /// Reject every command.
    DenyAll,
}

impl ExecutionPolicy {
    pub fn allow_list<I, S>(binaries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AllowList(binaries.into_iter().map(Into::into).collect())
    }

    pub fn is_allowed(&self, command: &[String]) -> bool {
        match self {
            Self::AllowList(allowed) => command
                .first()
                .map(|binary| allowed.contains(binary))
                .unwrap_or(false),
            Self::DenyAll => false,
        }
    }
}
