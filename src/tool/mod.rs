//! The edit tool: one `(oldString → newString)` substitution on one file.
//!
//! [`EditTool::execute`] is the single entry point the agent layer calls. It
//! owns the ordering that keeps edits safe under parallel tool calls:
//!
//! 1. identical strings are rejected before anything else runs;
//! 2. the path is normalized lexically, without touching the filesystem;
//! 3. the permission gate is awaited, before any file I/O or locking;
//! 4. the path is resolved against the filesystem and checked against the
//!    workspace boundary;
//! 5. a write lock keyed by the resolved path and a semaphore permit are
//!    taken, and both move into the blocking job that reads, matches, and
//!    writes, so they outlive a caller that stops waiting.

mod errors;
mod output;
mod permission;
mod write;

pub use errors::ToolError;
pub use output::{DiffSummary, EditMetadata, ToolOutput};
pub use permission::{AllowAll, DenyAll, PermissionDenied, PermissionGate, PermissionRequest};
pub use write::{atomic_write, Fingerprint};

use crate::config::ToolConfig;
use crate::edit::{self, EditError};
use crate::matcher::Strategy;
use crate::safety::WorkspaceGuard;
use crate::sync::{LockManager, Semaphore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of unified-diff context lines.
pub const DEFAULT_DIFF_CONTEXT: usize = 3;

/// Default cap on edits doing file I/O at the same time.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Arguments of one edit call, as sent by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditParams {
    pub file_path: PathBuf,
    pub old_string: String,
    pub new_string: String,
    #[serde(default)]
    pub replace_all: bool,
}

/// Per-call context supplied by the agent layer.
#[derive(Clone)]
pub struct ToolContext {
    pub session_id: String,
    pub message_id: String,
    pub gate: Arc<dyn PermissionGate>,
}

impl ToolContext {
    pub fn new(
        session_id: impl Into<String>,
        message_id: impl Into<String>,
        gate: Arc<dyn PermissionGate>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            message_id: message_id.into(),
            gate,
        }
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("session_id", &self.session_id)
            .field("message_id", &self.message_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct EditTool {
    locks: LockManager,
    limiter: Semaphore,
    guard: WorkspaceGuard,
    diff_context: usize,
}

impl EditTool {
    /// The lock manager and semaphore are shared with whoever else needs to
    /// coordinate on the same files.
    pub fn new(guard: WorkspaceGuard, locks: LockManager, limiter: Semaphore) -> Self {
        Self {
            locks,
            limiter,
            guard,
            diff_context: DEFAULT_DIFF_CONTEXT,
        }
    }

    pub fn with_diff_context(mut self, lines: usize) -> Self {
        self.diff_context = lines;
        self
    }

    /// Build a tool rooted at `root` with limits and forbidden paths from `config`.
    pub fn from_config(config: &ToolConfig, root: impl AsRef<Path>) -> Result<Self, ToolError> {
        let guard = WorkspaceGuard::with_forbidden(root, config.workspace.forbidden.clone())?;
        let limiter = Semaphore::new(config.limits.max_concurrent)?;
        Ok(Self::new(guard, LockManager::new(), limiter).with_diff_context(config.output.diff_context))
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn guard(&self) -> &WorkspaceGuard {
        &self.guard
    }

    pub async fn execute(
        &self,
        params: EditParams,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        if params.old_string == params.new_string {
            return Err(EditError::NoOp.into());
        }

        let requested = self.guard.lexical(&params.file_path).map_err(|err| {
            warn!(path = %params.file_path.display(), error = %err, "edit path rejected");
            err
        })?;
        let requested_relative = self.guard.relative(&requested).display().to_string();

        let request = PermissionRequest {
            permission: "edit".to_string(),
            patterns: vec![requested_relative.clone()],
            metadata: serde_json::json!({
                "filePath": requested.display().to_string(),
                "oldString": params.old_string,
                "newString": params.new_string,
                "replaceAll": params.replace_all,
            }),
            session_id: ctx.session_id.clone(),
            message_id: ctx.message_id.clone(),
        };
        ctx.gate.ask(request).await.map_err(|err| {
            warn!(path = %requested_relative, reason = %err.reason, "edit permission denied");
            err
        })?;

        let path = self.guard.resolve(&requested).map_err(|err| {
            warn!(path = %requested_relative, error = %err, "edit path rejected");
            err
        })?;
        let relative = self.guard.relative(&path).display().to_string();

        let key = path.display().to_string();
        let lock = self.locks.acquire_write(key).await?;
        debug!(path = %relative, "write lock held");
        let permit = self.limiter.acquire().await?;

        let job = FileJob {
            path: path.clone(),
            guard: self.guard.clone(),
            old_string: params.old_string,
            new_string: params.new_string,
            replace_all: params.replace_all,
        };
        // held until the job returns, even if this future is dropped
        let applied = tokio::task::spawn_blocking(move || {
            let _held = (lock, permit);
            job.run()
        })
        .await
        .unwrap_or_else(|err| Err(ToolError::TaskFailed(err.to_string())))?;

        let summary = DiffSummary::new(&relative, &applied.before, &applied.after, self.diff_context);
        info!(
            path = %relative,
            strategy = applied.strategy.map(Strategy::name).unwrap_or("none"),
            replacements = applied.replacements,
            additions = summary.additions,
            deletions = summary.deletions,
            "edit applied"
        );

        Ok(ToolOutput {
            title: relative,
            output: output::summary_line(applied.strategy, applied.replacements, applied.created),
            metadata: EditMetadata {
                file_path: path.display().to_string(),
                diff: summary.diff,
                additions: summary.additions,
                deletions: summary.deletions,
                strategy: applied.strategy,
                replacements: applied.replacements,
                created: applied.created,
                session_id: ctx.session_id.clone(),
                message_id: ctx.message_id.clone(),
            },
        })
    }
}

/// Blocking part of an edit, run on the blocking pool.
struct FileJob {
    path: PathBuf,
    guard: WorkspaceGuard,
    old_string: String,
    new_string: String,
    replace_all: bool,
}

struct Applied {
    before: String,
    after: String,
    strategy: Option<Strategy>,
    replacements: usize,
    created: bool,
}

impl FileJob {
    fn run(self) -> Result<Applied, ToolError> {
        if self.old_string.is_empty() {
            self.write_whole()
        } else {
            self.replace_in_file()
        }
    }

    /// Empty `oldString`: create the file, or overwrite it with `newString`.
    fn write_whole(self) -> Result<Applied, ToolError> {
        let path = &self.path;
        let created = !path.exists();
        let before = if created {
            String::new()
        } else {
            if path.is_dir() {
                return Err(ToolError::IsDirectory(path.clone()));
            }
            let bytes = fs::read(path).map_err(ToolError::io(path))?;
            String::from_utf8_lossy(&bytes).into_owned()
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ToolError::io(parent))?;
            self.guard.revalidate(parent)?;
        }
        atomic_write(path, self.new_string.as_bytes()).map_err(ToolError::io(path))?;

        Ok(Applied {
            before,
            after: self.new_string,
            strategy: None,
            replacements: 0,
            created,
        })
    }

    fn replace_in_file(self) -> Result<Applied, ToolError> {
        let path = &self.path;
        if !path.exists() {
            return Err(ToolError::FileNotFound(path.clone()));
        }
        if path.is_dir() {
            return Err(ToolError::IsDirectory(path.clone()));
        }

        let bytes = fs::read(path).map_err(ToolError::io(path))?;
        let fingerprint = Fingerprint::of(&bytes);
        let before = String::from_utf8(bytes).map_err(|_| ToolError::InvalidUtf8(path.clone()))?;

        let replacement =
            edit::replace(&before, &self.old_string, &self.new_string, self.replace_all)?;

        let current = fs::read(path).map_err(ToolError::io(path))?;
        if Fingerprint::of(&current) != fingerprint {
            return Err(ToolError::ConcurrentModification(path.clone()));
        }
        self.guard.revalidate(path)?;
        atomic_write(path, replacement.content.as_bytes()).map_err(ToolError::io(path))?;

        Ok(Applied {
            before,
            after: replacement.content,
            strategy: Some(replacement.strategy),
            replacements: replacement.replacements,
            created: false,
        })
    }
}
