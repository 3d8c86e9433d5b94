use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Workspace safety checks to keep edits inside the target workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Absolute path to workspace root
    workspace_root: PathBuf,
    /// Canonical paths to forbidden directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Path escapes through '..' after its last existing ancestor: {0}")]
    UnresolvableParent(PathBuf),

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl WorkspaceGuard {
    /// Create a new workspace guard with the given root.
    ///
    /// The workspace root will be canonicalized to handle symlinks correctly.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        Self::with_forbidden(workspace_root, Vec::new())
    }

    /// Create a guard that also rejects the given directories.
    ///
    /// Relative entries resolve against the workspace root; entries that do
    /// not exist are skipped. The repository metadata directory and the
    /// toolchain directories under the home directory are always forbidden.
    pub fn with_forbidden(
        workspace_root: impl AsRef<Path>,
        forbidden: Vec<PathBuf>,
    ) -> Result<Self, SafetyError> {
        let workspace_root = workspace_root.as_ref().canonicalize()?;

        let mut candidates = vec![workspace_root.join(".git")];
        if let Some(home) = home::home_dir() {
            candidates.push(home.join(".cargo/registry"));
            candidates.push(home.join(".cargo/git"));
            candidates.push(home.join(".rustup"));
        }
        candidates.extend(forbidden.into_iter().map(|path| {
            if path.is_absolute() {
                path
            } else {
                workspace_root.join(path)
            }
        }));

        let forbidden_paths = candidates
            .into_iter()
            .filter_map(|path| path.canonicalize().ok())
            .collect();

        Ok(Self {
            workspace_root,
            forbidden_paths,
        })
    }

    /// Check if an existing path is safe to edit.
    ///
    /// Returns the canonicalized absolute path if safe.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let canonical = self.absolute(path.as_ref()).canonicalize()?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    /// Resolve a path that may not exist yet (a file about to be created).
    ///
    /// The deepest existing ancestor is canonicalized and the missing tail
    /// is appended; the tail may not contain `..`.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let absolute = self.absolute(path.as_ref());
        if absolute.exists() {
            return self.validate_path(&absolute);
        }

        let mut missing = Vec::new();
        let mut ancestor = absolute.as_path();
        while !ancestor.exists() {
            let Some(parent) = ancestor.parent() else {
                break;
            };
            // `file_name` is `None` for a trailing `..`
            let Some(name) = ancestor.file_name() else {
                return Err(SafetyError::UnresolvableParent(absolute.clone()));
            };
            missing.push(name.to_os_string());
            ancestor = parent;
        }
        let mut resolved = ancestor.canonicalize()?;
        for name in missing.iter().rev() {
            resolved.push(name);
        }
        self.check_canonical(&resolved)?;
        Ok(resolved)
    }

    /// Absolute form of `path` with `.` and `..` folded, without touching the
    /// filesystem.
    ///
    /// A relative path that climbs above the workspace root is rejected here.
    /// Everything else still has to pass [`resolve`](Self::resolve), since
    /// symlinks are only visible to the filesystem.
    pub fn lexical(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let mut normalized = if path.is_absolute() {
            PathBuf::new()
        } else {
            self.workspace_root.clone()
        };
        let floor = normalized.components().count();

        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if normalized.components().count() <= floor.max(1) {
                        if path.is_relative() {
                            return Err(SafetyError::OutsideWorkspace {
                                path: self.workspace_root.join(path),
                                workspace: self.workspace_root.clone(),
                            });
                        }
                        continue;
                    }
                    normalized.pop();
                }
                other => normalized.push(other),
            }
        }
        Ok(normalized)
    }

    /// Re-validate a previously-validated canonical path.
    ///
    /// Call this immediately before write to close the TOCTOU window:
    /// the path is re-canonicalized and re-checked against workspace
    /// and forbidden boundaries.
    pub fn revalidate(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        let canonical = path.canonicalize()?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.workspace_root) {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                workspace: self.workspace_root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    /// Get the workspace root.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Path relative to the workspace root, for display.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.workspace_root).unwrap_or(path)
    }
}
