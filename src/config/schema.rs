use crate::tool::{DEFAULT_DIFF_CONTEXT, DEFAULT_MAX_CONCURRENT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Largest accepted `[output] diff_context`.
pub const MAX_DIFF_CONTEXT: usize = 1000;

/// Contents of `ironcode-edit.toml`. Every section is optional.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    #[serde(default)]
    pub workspace: WorkspaceSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceSection {
    /// Workspace root; relative roots resolve against the config file's directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Extra directories edits may never touch, relative to the root or absolute.
    #[serde(default)]
    pub forbidden: Vec<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LimitsSection {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    #[serde(default = "default_diff_context")]
    pub diff_context: usize,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            diff_context: DEFAULT_DIFF_CONTEXT,
        }
    }
}

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT
}

fn default_diff_context() -> usize {
    DEFAULT_DIFF_CONTEXT
}

impl ToolConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.limits.max_concurrent == 0 {
            issues.push(ValidationIssue::OutOfRange {
                field: "limits.max_concurrent",
                message: "must be at least 1".to_string(),
            });
        }
        if self.limits.max_concurrent > tokio::sync::Semaphore::MAX_PERMITS {
            issues.push(ValidationIssue::OutOfRange {
                field: "limits.max_concurrent",
                message: format!("must not exceed {}", tokio::sync::Semaphore::MAX_PERMITS),
            });
        }
        if self.output.diff_context > MAX_DIFF_CONTEXT {
            issues.push(ValidationIssue::OutOfRange {
                field: "output.diff_context",
                message: format!("must not exceed {MAX_DIFF_CONTEXT}"),
            });
        }

        if let Some(root) = &self.workspace.root {
            if root.as_os_str().is_empty() {
                issues.push(ValidationIssue::EmptyPath {
                    field: "workspace.root",
                    index: None,
                });
            }
        }
        for (index, path) in self.workspace.forbidden.iter().enumerate() {
            if path.as_os_str().is_empty() {
                issues.push(ValidationIssue::EmptyPath {
                    field: "workspace.forbidden",
                    index: Some(index),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    OutOfRange {
        field: &'static str,
        message: String,
    },
    EmptyPath {
        field: &'static str,
        index: Option<usize>,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::OutOfRange { field, message } => write!(f, "'{field}' {message}"),
            ValidationIssue::EmptyPath { field, index } => match index {
                Some(index) => write!(f, "'{field}' entry {index} is an empty path"),
                None => write!(f, "'{field}' is an empty path"),
            },
        }
    }
}
