//! Line-oriented views over content and search text.
//!
//! Every line-based strategy works on the same model: text is split on `\n`,
//! a line's span excludes its terminator (and a trailing `\r`, so CRLF files
//! keep their line endings intact), and a window of lines maps back to a
//! single byte range of the original text.

use std::ops::Range;

/// Byte-offset index of the lines in a piece of content.
#[derive(Debug, Clone)]
pub(crate) struct LineIndex<'a> {
    text: &'a str,
    /// `(start, end)` of each line, terminator excluded.
    bounds: Vec<(usize, usize)>,
    lines: Vec<&'a str>,
}

impl<'a> LineIndex<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let mut bounds = Vec::new();
        let mut start = 0;
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                bounds.push((start, strip_cr(text, start, idx)));
                start = idx + 1;
            }
        }
        bounds.push((start, strip_cr(text, start, text.len())));

        let lines = bounds.iter().map(|&(s, e)| &text[s..e]).collect();
        Self {
            text,
            bounds,
            lines,
        }
    }

    pub(crate) fn text(&self) -> &'a str {
        self.text
    }

    pub(crate) fn len(&self) -> usize {
        self.lines.len()
    }

    pub(crate) fn line(&self, idx: usize) -> &'a str {
        self.lines[idx]
    }

    /// Lines `[first, first + count)`.
    pub(crate) fn window(&self, first: usize, count: usize) -> &[&'a str] {
        &self.lines[first..first + count]
    }

    /// Byte range covered by a window of lines.
    ///
    /// With `include_newline`, the range is extended past the terminator of
    /// the last line when one exists, so a search text ending in `\n`
    /// consumes the newline it names.
    pub(crate) fn span(&self, first: usize, count: usize, include_newline: bool) -> Range<usize> {
        let last = first + count - 1;
        let start = self.bounds[first].0;
        let mut end = self.bounds[last].1;
        if include_newline && last + 1 < self.bounds.len() {
            end = self.bounds[last + 1].0;
        }
        start..end
    }
}

fn strip_cr(text: &str, start: usize, end: usize) -> usize {
    if end > start && text.as_bytes()[end - 1] == b'\r' {
        end - 1
    } else {
        end
    }
}

/// The search text (`oldString`) split into lines.
#[derive(Debug, Clone)]
pub(crate) struct SearchLines<'a> {
    lines: Vec<&'a str>,
    trailing_newline: bool,
}

impl<'a> SearchLines<'a> {
    pub(crate) fn new(find: &'a str) -> Self {
        let mut lines: Vec<&'a str> = find
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        let trailing_newline = lines.len() > 1 && lines.last() == Some(&"");
        if trailing_newline {
            lines.pop();
        }
        Self {
            lines,
            trailing_newline,
        }
    }

    pub(crate) fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    pub(crate) fn len(&self) -> usize {
        self.lines.len()
    }

    pub(crate) fn trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    /// At least one line carries non-whitespace text.
    pub(crate) fn has_content(&self) -> bool {
        self.lines.iter().any(|line| !line.trim().is_empty())
    }
}

/// Slide a window of `search.len()` lines over `index`, greedily collecting
/// non-overlapping windows accepted by `accept`.
pub(crate) fn scan_windows<F>(
    index: &LineIndex<'_>,
    search: &SearchLines<'_>,
    mut accept: F,
) -> Vec<Range<usize>>
where
    F: FnMut(&[&str]) -> bool,
{
    let count = search.len();
    if count == 0 || !search.has_content() || index.len() < count {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut first = 0;
    while first + count <= index.len() {
        if accept(index.window(first, count)) {
            spans.push(index.span(first, count, search.trailing_newline()));
            first += count;
        } else {
            first += 1;
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_bounds() {
        let index = LineIndex::new("a\nbb\n\nccc");
        assert_eq!(index.len(), 4);
        assert_eq!(index.line(1), "bb");
        assert_eq!(index.line(2), "");
        assert_eq!(index.span(1, 2, false), 2..5);
        assert_eq!(index.span(0, 4, false), 0..9);
    }

    #[test]
    fn test_line_index_strips_carriage_return() {
        let index = LineIndex::new("one\r\ntwo\r\n");
        assert_eq!(index.line(0), "one");
        assert_eq!(index.line(1), "two");
        assert_eq!(index.span(0, 2, false), 0..8);
        assert_eq!(index.span(0, 1, true), 0..5);
    }

    #[test]
    fn test_search_lines_trailing_newline() {
        let search = SearchLines::new("foo\nbar\n");
        assert_eq!(search.lines(), &["foo", "bar"]);
        assert!(search.trailing_newline());

        let single = SearchLines::new("\n");
        assert_eq!(single.len(), 1);
        assert!(!single.has_content());
    }

    #[test]
    fn test_scan_windows_is_non_overlapping() {
        let index = LineIndex::new("x\nx\nx\nx\nx");
        let search = SearchLines::new("x\nx");
        let spans = scan_windows(&index, &search, |window| window.iter().all(|l| *l == "x"));
        assert_eq!(spans, vec![0..3, 4..7]);
    }
}
