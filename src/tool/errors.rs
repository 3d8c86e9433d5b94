use crate::edit::EditError;
use crate::safety::SafetyError;
use crate::sync::SyncError;
use crate::tool::permission::PermissionDenied;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),

    #[error("File {0} not found")]
    FileNotFound(PathBuf),

    #[error("Path is a directory, not a file: {0}")]
    IsDirectory(PathBuf),

    #[error("File is not valid UTF-8: {0}")]
    InvalidUtf8(PathBuf),

    #[error("File {0} was modified while the edit was being computed; read it again before editing")]
    ConcurrentModification(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("edit task failed: {0}")]
    TaskFailed(String),
}

impl ToolError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> ToolError {
        let path = path.into();
        move |source| ToolError::Io { path, source }
    }

    /// Stable identifier of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Edit(err) => err.kind(),
            ToolError::Sync(SyncError::Abandoned { .. }) => "lock_abandoned",
            ToolError::Sync(_) => "sync",
            ToolError::Safety(_) => "path_rejected",
            ToolError::PermissionDenied(_) => "permission_denied",
            ToolError::FileNotFound(_) => "file_not_found",
            ToolError::IsDirectory(_) => "is_directory",
            ToolError::InvalidUtf8(_) => "invalid_utf8",
            ToolError::ConcurrentModification(_) => "concurrent_modification",
            ToolError::Io { .. } => "io",
            ToolError::TaskFailed(_) => "task_failed",
        }
    }
}
