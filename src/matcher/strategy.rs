//! The individual matching strategies of the cascade.
//!
//! Each strategy is a pure function from content and search text to the
//! byte ranges it located, ascending and non-overlapping. Strategies never
//! consult each other except where one explicitly re-runs stricter ones on
//! rewritten text (escape-normalized, trimmed-boundary).

use crate::matcher::lines::{scan_windows, LineIndex, SearchLines};
use crate::matcher::normalize::{dedent, NormalizedText};
use crate::matcher::similarity::{
    at_least, interior_score, BLOCK_ANCHOR_THRESHOLD, CONTEXT_INTERIOR_THRESHOLD,
    CONTEXT_LINE_THRESHOLD,
};
use std::ops::Range;

/// Content prepared once and shared by every strategy.
pub(crate) struct Haystack<'a> {
    index: LineIndex<'a>,
}

impl<'a> Haystack<'a> {
    pub(crate) fn new(content: &'a str) -> Self {
        Self {
            index: LineIndex::new(content),
        }
    }

    pub(crate) fn content(&self) -> &'a str {
        self.index.text()
    }

    pub(crate) fn lines(&self) -> &LineIndex<'a> {
        &self.index
    }
}

/// Search text prepared once and shared by every strategy.
pub(crate) struct Needle<'a> {
    text: &'a str,
    lines: SearchLines<'a>,
}

impl<'a> Needle<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            text,
            lines: SearchLines::new(text),
        }
    }

    pub(crate) fn text(&self) -> &'a str {
        self.text
    }

    pub(crate) fn lines(&self) -> &SearchLines<'a> {
        &self.lines
    }
}

pub(crate) fn exact(haystack: &Haystack<'_>, needle: &Needle<'_>) -> Vec<Range<usize>> {
    let find = needle.text();
    if find.is_empty() {
        return Vec::new();
    }
    haystack
        .content()
        .match_indices(find)
        .map(|(start, matched)| start..start + matched.len())
        .collect()
}

/// Windows whose lines are equal after trimming, minus pure re-indentations.
///
/// A window that only differs from the search by a uniform indentation
/// shift is left for [`indentation_flexible`], which names that drift more
/// precisely. What remains here is trailing-whitespace and ragged
/// indentation drift.
pub(crate) fn line_trimmed(haystack: &Haystack<'_>, needle: &Needle<'_>) -> Vec<Range<usize>> {
    let search = needle.lines();
    let dedented_search = dedent(search.lines());
    scan_windows(haystack.lines(), search, |window| {
        trimmed_equal(window, search.lines()) && dedent(window) != dedented_search
    })
}

/// Every trim-equal window, and whether any of them differs from the search
/// by more than a uniform indentation shift.
///
/// The cascade runs this in place of [`line_trimmed`] so that re-indented
/// windows are claimed before [`whitespace_normalized`] can match elsewhere.
/// When no window is ragged, the spans belong to [`indentation_flexible`].
pub(crate) fn trimmed_windows(
    haystack: &Haystack<'_>,
    needle: &Needle<'_>,
) -> (Vec<Range<usize>>, bool) {
    let search = needle.lines();
    let dedented_search = dedent(search.lines());
    let mut ragged = false;
    let spans = scan_windows(haystack.lines(), search, |window| {
        if !trimmed_equal(window, search.lines()) {
            return false;
        }
        if dedent(window) != dedented_search {
            ragged = true;
        }
        true
    });
    (spans, ragged)
}

/// Windows whose lines are equal after trimming, with no exclusions.
pub(crate) fn any_trimmed(haystack: &Haystack<'_>, needle: &Needle<'_>) -> Vec<Range<usize>> {
    let search = needle.lines();
    scan_windows(haystack.lines(), search, |window| {
        trimmed_equal(window, search.lines())
    })
}

fn trimmed_equal(window: &[&str], search: &[&str]) -> bool {
    window
        .iter()
        .zip(search)
        .all(|(line, wanted)| line.trim() == wanted.trim())
}

pub(crate) fn whitespace_normalized(
    haystack: &Haystack<'_>,
    needle: &Needle<'_>,
) -> Vec<Range<usize>> {
    let find = NormalizedText::collapse_whitespace(needle.text()).into_string();
    if find.trim().is_empty() {
        return Vec::new();
    }

    let content = NormalizedText::collapse_whitespace(haystack.content());
    content
        .as_str()
        .match_indices(find.as_str())
        .map(|(start, matched)| content.to_original(start..start + matched.len()))
        .collect()
}

pub(crate) fn indentation_flexible(
    haystack: &Haystack<'_>,
    needle: &Needle<'_>,
) -> Vec<Range<usize>> {
    let search = needle.lines();
    let dedented_search = dedent(search.lines());
    scan_windows(haystack.lines(), search, |window| {
        dedent(window) == dedented_search
    })
}

pub(crate) fn block_anchor(haystack: &Haystack<'_>, needle: &Needle<'_>) -> Vec<Range<usize>> {
    let search = needle.lines().lines();
    if search.len() < 3 {
        return Vec::new();
    }
    let first = search[0].trim();
    let last = search[search.len() - 1].trim();
    if first.is_empty() || last.is_empty() {
        return Vec::new();
    }

    let index = haystack.lines();
    let search_interior = &search[1..search.len() - 1];

    // (first line, last line, score)
    let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
    for start in 0..index.len() {
        if index.line(start).trim() != first {
            continue;
        }
        let end = (start + 2..index.len()).find(|&line| index.line(line).trim() == last);
        if let Some(end) = end {
            let interior = index.window(start + 1, end - start - 1);
            candidates.push((start, end, interior_score(search_interior, interior)));
        }
    }

    let best = candidates
        .iter()
        .map(|&(_, _, score)| score)
        .fold(f64::NEG_INFINITY, f64::max);
    if best < BLOCK_ANCHOR_THRESHOLD {
        return Vec::new();
    }

    let trailing = needle.lines().trailing_newline();
    let mut spans = Vec::new();
    let mut next_free = 0;
    for (start, end, score) in candidates {
        if (best - score).abs() > f64::EPSILON || start < next_free {
            continue;
        }
        spans.push(index.span(start, end - start + 1, trailing));
        next_free = end + 1;
    }
    spans
}

pub(crate) fn context_aware(haystack: &Haystack<'_>, needle: &Needle<'_>) -> Vec<Range<usize>> {
    let search = needle.lines().lines();
    let count = search.len();
    if count < 3 {
        return Vec::new();
    }
    let context = if count >= 6 { 2 } else { 1 };

    scan_windows(haystack.lines(), needle.lines(), |window| {
        let context_ok = (0..context)
            .chain(count - context..count)
            .all(|idx| at_least(window[idx], search[idx], CONTEXT_LINE_THRESHOLD));
        if !context_ok {
            return false;
        }

        let mut considered = 0usize;
        let mut equal = 0usize;
        for idx in context..count - context {
            let (line, wanted) = (window[idx].trim(), search[idx].trim());
            if line.is_empty() && wanted.is_empty() {
                continue;
            }
            considered += 1;
            if line == wanted {
                equal += 1;
            }
        }
        considered == 0 || equal as f64 / considered as f64 >= CONTEXT_INTERIOR_THRESHOLD
    })
}

pub(crate) fn escape_normalized(
    haystack: &Haystack<'_>,
    needle: &Needle<'_>,
) -> Vec<Range<usize>> {
    let find = NormalizedText::unescape(needle.text());
    let content = NormalizedText::unescape(haystack.content());
    if !find.changed() && !content.changed() {
        return Vec::new();
    }
    let find = find.into_string();
    if find.is_empty() {
        return Vec::new();
    }

    let unescaped_haystack = Haystack::new(content.as_str());
    let unescaped_needle = Needle::new(&find);
    let retries: [StrategyFn; 3] = [exact, any_trimmed, whitespace_normalized];

    retries
        .iter()
        .map(|strategy| strategy(&unescaped_haystack, &unescaped_needle))
        .find(|spans| !spans.is_empty())
        .map(|spans| {
            spans
                .into_iter()
                .map(|span| content.to_original(span))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn trimmed_boundary(
    haystack: &Haystack<'_>,
    needle: &Needle<'_>,
) -> Vec<Range<usize>> {
    let trimmed = needle.text().trim();
    if trimmed == needle.text() || trimmed.is_empty() {
        return Vec::new();
    }

    let trimmed_needle = Needle::new(trimmed);
    let spans = exact(haystack, &trimmed_needle);
    if !spans.is_empty() {
        return spans;
    }
    any_trimmed(haystack, &trimmed_needle)
}

pub(crate) type StrategyFn = fn(&Haystack<'_>, &Needle<'_>) -> Vec<Range<usize>>;
