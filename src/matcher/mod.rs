//! Match engine: locate `oldString` inside file content despite formatting drift.
//!
//! [`locate`] runs a fixed cascade of strategies, strictest first. The first
//! strategy that finds anything wins and reports every non-overlapping
//! occurrence it found; later, more lenient strategies are never consulted.
//!
//! | # | Strategy | Tolerates |
//! |---|---|---|
//! | 1 | [`Strategy::Exact`] | nothing |
//! | 2 | [`Strategy::LineTrimmed`] | trailing whitespace, ragged indentation |
//! | 3 | [`Strategy::WhitespaceNormalized`] | runs of spaces/tabs |
//! | 4 | [`Strategy::IndentationFlexible`] | a uniform indentation shift (claimed at step 2) |
//! | 5 | [`Strategy::BlockAnchor`] | interior drift between matching first/last lines |
//! | 6 | [`Strategy::ContextAware`] | interior drift between matching context lines |
//! | 7 | [`Strategy::EscapeNormalized`] | literal `\n`, `\t`, `\"` … escapes |
//! | 8 | [`Strategy::TrimmedBoundary`] | leading/trailing blank space around the block |

mod lines;
mod normalize;
pub mod similarity;
mod strategy;

use serde::Serialize;
use std::fmt;
use std::ops::Range;
use strategy::{Haystack, Needle, StrategyFn};
use tracing::{debug, trace};

/// One matching algorithm of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Exact,
    LineTrimmed,
    WhitespaceNormalized,
    IndentationFlexible,
    BlockAnchor,
    ContextAware,
    EscapeNormalized,
    TrimmedBoundary,
}

impl Strategy {
    /// Cascade order, strictest first.
    pub const CASCADE: [Strategy; 8] = [
        Strategy::Exact,
        Strategy::LineTrimmed,
        Strategy::WhitespaceNormalized,
        Strategy::IndentationFlexible,
        Strategy::BlockAnchor,
        Strategy::ContextAware,
        Strategy::EscapeNormalized,
        Strategy::TrimmedBoundary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Exact => "exact",
            Strategy::LineTrimmed => "line_trimmed",
            Strategy::WhitespaceNormalized => "whitespace_normalized",
            Strategy::IndentationFlexible => "indentation_flexible",
            Strategy::BlockAnchor => "block_anchor",
            Strategy::ContextAware => "context_aware",
            Strategy::EscapeNormalized => "escape_normalized",
            Strategy::TrimmedBoundary => "trimmed_boundary",
        }
    }

    fn finder(self) -> StrategyFn {
        match self {
            Strategy::Exact => strategy::exact,
            Strategy::LineTrimmed => strategy::line_trimmed,
            Strategy::WhitespaceNormalized => strategy::whitespace_normalized,
            Strategy::IndentationFlexible => strategy::indentation_flexible,
            Strategy::BlockAnchor => strategy::block_anchor,
            Strategy::ContextAware => strategy::context_aware,
            Strategy::EscapeNormalized => strategy::escape_normalized,
            Strategy::TrimmedBoundary => strategy::trimmed_boundary,
        }
    }

    /// Run this strategy alone, outside the cascade.
    pub fn find_all(self, content: &str, old_string: &str) -> Vec<MatchSpan> {
        let haystack = Haystack::new(content);
        let needle = Needle::new(old_string);
        self.run(&haystack, &needle)
    }

    fn run(self, haystack: &Haystack<'_>, needle: &Needle<'_>) -> Vec<MatchSpan> {
        label((self.finder())(haystack, needle), self)
    }

    /// Run this strategy as a step of [`locate`].
    ///
    /// The line-trimmed step claims every trim-equal window, re-indented ones
    /// included, and attributes them to indentation-flexible when none of
    /// them is ragged.
    fn run_in_cascade(self, haystack: &Haystack<'_>, needle: &Needle<'_>) -> Vec<MatchSpan> {
        if self != Strategy::LineTrimmed {
            return self.run(haystack, needle);
        }
        let (spans, ragged) = strategy::trimmed_windows(haystack, needle);
        let strategy = if ragged {
            Strategy::LineTrimmed
        } else {
            Strategy::IndentationFlexible
        };
        label(spans, strategy)
    }
}

fn label(spans: Vec<Range<usize>>, strategy: Strategy) -> Vec<MatchSpan> {
    spans
        .into_iter()
        .map(|range| MatchSpan::new(range, strategy))
        .collect()
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A located occurrence: `[start, end)` byte offsets into the original content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    pub strategy: Strategy,
}

impl MatchSpan {
    pub fn new(range: Range<usize>, strategy: Strategy) -> Self {
        Self {
            start: range.start,
            end: range.end,
            strategy,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Result of [`locate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    NoMatch,
    SingleMatch(MatchSpan),
    /// Two or more occurrences, ascending and non-overlapping.
    MultipleMatches(Vec<MatchSpan>),
}

impl MatchOutcome {
    fn from_spans(mut spans: Vec<MatchSpan>) -> Self {
        match spans.len() {
            0 => MatchOutcome::NoMatch,
            1 => MatchOutcome::SingleMatch(spans.remove(0)),
            _ => MatchOutcome::MultipleMatches(spans),
        }
    }

    pub fn spans(&self) -> &[MatchSpan] {
        match self {
            MatchOutcome::NoMatch => &[],
            MatchOutcome::SingleMatch(span) => std::slice::from_ref(span),
            MatchOutcome::MultipleMatches(spans) => spans,
        }
    }

    pub fn count(&self) -> usize {
        self.spans().len()
    }

    /// The strategy that produced the spans, if any.
    pub fn strategy(&self) -> Option<Strategy> {
        self.spans().first().map(|span| span.strategy)
    }
}

/// Locate `old_string` in `content`.
///
/// Pure: no I/O, no mutation. An empty `old_string` locates nothing.
pub fn locate(content: &str, old_string: &str) -> MatchOutcome {
    if old_string.is_empty() {
        return MatchOutcome::NoMatch;
    }

    let haystack = Haystack::new(content);
    let needle = Needle::new(old_string);

    for strategy in Strategy::CASCADE {
        let spans = strategy.run_in_cascade(&haystack, &needle);
        if spans.is_empty() {
            trace!(strategy = strategy.name(), "strategy found no occurrence");
            continue;
        }
        debug!(
            strategy = spans[0].strategy.name(),
            occurrences = spans.len(),
            "located oldString"
        );
        return MatchOutcome::from_spans(spans);
    }

    MatchOutcome::NoMatch
}
