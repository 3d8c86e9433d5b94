//! Patch applier: turn located spans into new content.
//!
//! Every edit compiles down to byte-span replacement over the original
//! content. Spans come from [`locate`] and are always expressed against the
//! untouched input, so multi-span replacement walks them in ascending order
//! while copying the gaps between them into a fresh buffer. The caller's
//! content is never modified; failure leaves nothing half-applied.

use crate::matcher::{locate, MatchOutcome, MatchSpan, Strategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("oldString and newString must be different")]
    NoOp,

    #[error("oldString not found in content")]
    NotFound,

    #[error(
        "Found {count} matches for oldString. Provide more surrounding lines in oldString to identify the correct match."
    )]
    AmbiguousMatch { count: usize },

    #[error("Invalid byte range: [{start}, {end}) in content of length {len}")]
    InvalidSpan { start: usize, end: usize, len: usize },
}

impl EditError {
    /// Stable identifier of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EditError::NoOp => "no_op",
            EditError::NotFound => "not_found",
            EditError::AmbiguousMatch { .. } => "ambiguous_match",
            EditError::InvalidSpan { .. } => "invalid_span",
        }
    }
}

/// A single `(oldString → newString)` request against some content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub content: String,
    pub old_string: String,
    pub new_string: String,
    #[serde(default)]
    pub replace_all: bool,
}

impl EditRequest {
    pub fn new(
        content: impl Into<String>,
        old_string: impl Into<String>,
        new_string: impl Into<String>,
        replace_all: bool,
    ) -> Self {
        Self {
            content: content.into(),
            old_string: old_string.into(),
            new_string: new_string.into(),
            replace_all,
        }
    }

    pub fn execute(&self) -> Result<Replacement, EditError> {
        replace(
            &self.content,
            &self.old_string,
            &self.new_string,
            self.replace_all,
        )
    }
}

/// Successful edit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Replacement holds the new content; the input was not modified"]
pub struct Replacement {
    pub content: String,
    /// Strategy that located the replaced span(s).
    pub strategy: Strategy,
    /// Number of spans replaced.
    pub replacements: usize,
}

/// Apply `new_string` over the spans of a match outcome.
///
/// A single match is replaced regardless of `replace_all`; several matches
/// need `replace_all`, otherwise the edit is ambiguous.
pub fn apply(
    content: &str,
    outcome: &MatchOutcome,
    new_string: &str,
    replace_all: bool,
) -> Result<String, EditError> {
    match outcome {
        MatchOutcome::NoMatch => Err(EditError::NotFound),
        MatchOutcome::SingleMatch(span) => splice(content, std::slice::from_ref(span), new_string),
        MatchOutcome::MultipleMatches(spans) if replace_all => splice(content, spans, new_string),
        MatchOutcome::MultipleMatches(spans) => Err(EditError::AmbiguousMatch { count: spans.len() }),
    }
}

/// Locate and replace in one step.
///
/// Identical strings are rejected before any strategy runs.
pub fn replace(
    content: &str,
    old_string: &str,
    new_string: &str,
    replace_all: bool,
) -> Result<Replacement, EditError> {
    if old_string == new_string {
        return Err(EditError::NoOp);
    }

    let outcome = locate(content, old_string);
    let content = apply(content, &outcome, new_string, replace_all)?;
    let strategy = outcome.strategy().ok_or(EditError::NotFound)?;

    Ok(Replacement {
        content,
        strategy,
        replacements: outcome.count(),
    })
}

/// Replace every span with `new_text`, walking them in ascending order.
fn splice(content: &str, spans: &[MatchSpan], new_text: &str) -> Result<String, EditError> {
    validate(content, spans)?;

    let removed: usize = spans.iter().map(MatchSpan::len).sum();
    let mut out = String::with_capacity(content.len() - removed + new_text.len() * spans.len());
    let mut cursor = 0;
    for span in spans {
        out.push_str(&content[cursor..span.start]);
        out.push_str(new_text);
        cursor = span.end;
    }
    out.push_str(&content[cursor..]);
    Ok(out)
}

/// Spans must be in bounds, on char boundaries, ascending and disjoint.
fn validate(content: &str, spans: &[MatchSpan]) -> Result<(), EditError> {
    let mut previous_end = 0;
    for span in spans {
        let in_bounds = span.start <= span.end
            && span.end <= content.len()
            && span.start >= previous_end
            && content.is_char_boundary(span.start)
            && content.is_char_boundary(span.end);
        if !in_bounds {
            return Err(EditError::InvalidSpan {
                start: span.start,
                end: span.end,
                len: content.len(),
            });
        }
        previous_end = span.end;
    }
    Ok(())
}
