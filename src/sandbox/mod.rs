use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("sandbox root `{path}` is not a directory")]
    RootNotDirectory { path: String },
    #[error("path `{path}` escapes the sandbox root")]
    PathEscape { path: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Filesystem boundary every file and command action is confined to: one
/// resolved root directory. Read-only after construction, safe to share with
/// the worker thread by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Resolves the root, creating the directory when it does not exist yet.
    pub fn new(root: &Path) -> Result<Self, SandboxError> {
        if !root.exists() {
            fs::create_dir_all(root).map_err(|source| io_error(root, source))?;
        }
        let root = fs::canonicalize(root).map_err(|source| io_error(root, source))?;
        if !root.is_dir() {
            return Err(SandboxError::RootNotDirectory {
                path: root.display().to_string(),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins `candidate` against the root and re-validates that the result
    /// stays at or below it. Absolute candidates are validated the same way.
    pub fn resolve(&self, candidate: impl AsRef<Path>) -> Result<PathBuf, SandboxError> {
        let candidate = candidate.as_ref();
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };
        let normalized = normalize_lexically(&joined).ok_or_else(|| escape(candidate))?;
        // Symlinks inside the tree could still point elsewhere, so the
        // deepest existing ancestor is canonicalized before the containment
        // check; a nonexistent leaf must not skip it.
        let resolved = canonicalize_existing_prefix(&normalized)?;
        if resolved == self.root || resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(escape(candidate))
        }
    }
}

fn escape(candidate: &Path) -> SandboxError {
    SandboxError::PathEscape {
        path: candidate.display().to_string(),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SandboxError {
    SandboxError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Canonicalizes the deepest ancestor of `path` that exists, then re-appends
/// the nonexistent remainder. The remainder holds only normal components
/// (`..`/`.` were removed lexically), so the result is what the path will
/// point at once created.
fn canonicalize_existing_prefix(path: &Path) -> Result<PathBuf, SandboxError> {
    let mut remainder: Vec<std::ffi::OsString> = Vec::new();
    let mut prefix = path.to_path_buf();
    loop {
        match fs::canonicalize(&prefix) {
            Ok(canonical) => {
                let mut resolved = canonical;
                for part in remainder.iter().rev() {
                    resolved.push(part);
                }
                return Ok(resolved);
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                match (prefix.file_name(), prefix.parent()) {
                    (Some(name), Some(parent)) => {
                        remainder.push(name.to_os_string());
                        prefix = parent.to_path_buf();
                    }
                    _ => return Ok(path.to_path_buf()),
                }
            }
            Err(err) => return Err(io_error(path, err)),
        }
    }
}

fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => {
                normalized.push(component.as_os_str());
            }
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
        }
    }
    Some(normalized)
}
