use crate::sandbox::Sandbox;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Seam for the external code-rewriting collaborator. An implementation
/// performs one named structural edit against files under the sandbox and
/// reports a structured summary; the dispatcher passes that summary through
/// verbatim.
pub trait CodeMutation: Send + Sync {
    fn apply(&self, sandbox: &Sandbox, parameters: &Map<String, Value>) -> Result<Value, String>;
}

/// Explicit lookup table from operation name to mutation, constructed once
/// and injected into the dispatcher. No ambient global registry.
#[derive(Default)]
pub struct MutationRegistry {
    entries: BTreeMap<String, Box<dyn CodeMutation>>,
}

impl MutationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, operation: impl Into<String>, mutation: Box<dyn CodeMutation>) {
        self.entries.insert(operation.into(), mutation);
    }

    pub fn get(&self, operation: &str) -> Option<&dyn CodeMutation> {
        self.entries.get(operation).map(Box::as_ref)
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for MutationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationRegistry")
            .field("operations", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
