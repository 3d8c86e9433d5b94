//! Approval gate consulted before any file is touched.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// What the tool is about to do, as presented to whoever approves it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    /// Always `"edit"` for this tool.
    pub permission: String,
    /// Workspace-relative paths the edit will write.
    pub patterns: Vec<String>,
    /// Preview data (file path and diff) for the approver.
    pub metadata: serde_json::Value,
    pub session_id: String,
    pub message_id: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("permission denied for {permission}: {reason}")]
pub struct PermissionDenied {
    pub permission: String,
    pub reason: String,
}

impl PermissionDenied {
    pub fn new(permission: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
            reason: reason.into(),
        }
    }
}

/// Asks the surrounding agent (or a human) whether an edit may proceed.
///
/// The tool awaits this before reading the file or taking any lock, so a
/// rejection never leaves state behind.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn ask(&self, request: PermissionRequest) -> Result<(), PermissionDenied>;
}

/// Approves everything. Used by the CLI with `--yes` and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl PermissionGate for AllowAll {
    async fn ask(&self, _request: PermissionRequest) -> Result<(), PermissionDenied> {
        Ok(())
    }
}

/// Rejects everything with a fixed reason.
#[derive(Debug, Clone)]
pub struct DenyAll {
    pub reason: String,
}

#[async_trait]
impl PermissionGate for DenyAll {
    async fn ask(&self, request: PermissionRequest) -> Result<(), PermissionDenied> {
        Err(PermissionDenied::new(request.permission, self.reason.clone()))
    }
}
