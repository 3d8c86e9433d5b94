use crate::matcher::Strategy;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};

/// What a successful edit hands back to the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    /// Workspace-relative path of the edited file.
    pub title: String,
    /// Human-readable summary.
    pub output: String,
    pub metadata: EditMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMetadata {
    pub file_path: String,
    /// Unified diff of the change.
    pub diff: String,
    pub additions: usize,
    pub deletions: usize,
    /// `None` when the file was written without matching (empty `oldString`).
    pub strategy: Option<Strategy>,
    pub replacements: usize,
    pub created: bool,
    pub session_id: String,
    pub message_id: String,
}

/// Unified diff plus per-line change counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSummary {
    pub diff: String,
    pub additions: usize,
    pub deletions: usize,
}

impl DiffSummary {
    pub fn new(path: &str, before: &str, after: &str, context: usize) -> Self {
        let diff = TextDiff::from_lines(before, after);

        let mut additions = 0;
        let mut deletions = 0;
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => additions += 1,
                ChangeTag::Delete => deletions += 1,
                ChangeTag::Equal => {}
            }
        }

        let text = diff
            .unified_diff()
            .context_radius(context)
            .header(path, path)
            .to_string();

        Self {
            diff: text,
            additions,
            deletions,
        }
    }
}

pub(crate) fn summary_line(strategy: Option<Strategy>, replacements: usize, created: bool) -> String {
    match strategy {
        None if created => "Created file.".to_string(),
        None => "Overwrote file.".to_string(),
        Some(Strategy::Exact) if replacements == 1 => "Edit applied successfully.".to_string(),
        Some(strategy) => format!(
            "Edit applied successfully ({} occurrence{}, matched by {}).",
            replacements,
            if replacements == 1 { "" } else { "s" },
            strategy
        ),
    }
}
