//! Text normalizations that keep a map back to the original bytes.
//!
//! Lenient strategies search a rewritten copy of the content (whitespace
//! collapsed, escapes decoded). [`NormalizedText`] records, for every byte of
//! the rewritten copy, the original byte range it came from, so a match found
//! in the copy translates to an exact span of the untouched content.

use std::ops::Range;

/// A rewritten copy of some text plus a per-byte origin map.
#[derive(Debug, Clone)]
pub(crate) struct NormalizedText {
    text: String,
    origin: Vec<Range<usize>>,
    changed: bool,
}

impl NormalizedText {
    /// Collapse every run of spaces and tabs to a single space.
    pub(crate) fn collapse_whitespace(source: &str) -> Self {
        let mut out = Builder::with_capacity(source.len());
        let mut chars = source.char_indices().peekable();

        while let Some((idx, ch)) = chars.next() {
            if is_horizontal_space(ch) {
                let mut end = idx + ch.len_utf8();
                while let Some(&(next_idx, next)) = chars.peek() {
                    if !is_horizontal_space(next) {
                        break;
                    }
                    end = next_idx + next.len_utf8();
                    chars.next();
                }
                out.push(' ', idx..end);
            } else {
                out.push(ch, idx..idx + ch.len_utf8());
            }
        }

        out.finish(source)
    }

    /// Decode the escape sequences a model tends to emit literally.
    ///
    /// `\n`, `\t` and `\r` become their control characters; `\'`, `\"`,
    /// `` \` ``, `\\` and `\$` lose the backslash; a backslash before a real
    /// newline is dropped. Any other backslash pair is kept verbatim.
    pub(crate) fn unescape(source: &str) -> Self {
        let mut out = Builder::with_capacity(source.len());
        let mut chars = source.char_indices().peekable();

        while let Some((idx, ch)) = chars.next() {
            if ch != '\\' {
                out.push(ch, idx..idx + ch.len_utf8());
                continue;
            }

            let Some(&(next_idx, next)) = chars.peek() else {
                out.push('\\', idx..idx + 1);
                continue;
            };

            let decoded = match next {
                'n' | '\n' => Some('\n'),
                't' => Some('\t'),
                'r' => Some('\r'),
                '\'' | '"' | '`' | '\\' | '$' => Some(next),
                _ => None,
            };

            match decoded {
                Some(decoded) => {
                    chars.next();
                    out.push(decoded, idx..next_idx + next.len_utf8());
                }
                None => out.push('\\', idx..idx + 1),
            }
        }

        out.finish(source)
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the rewrite differs from the source at all.
    pub(crate) fn changed(&self) -> bool {
        self.changed
    }

    /// Translate a non-empty byte range of the rewritten text to the original.
    pub(crate) fn to_original(&self, range: Range<usize>) -> Range<usize> {
        debug_assert!(range.start < range.end);
        self.origin[range.start].start..self.origin[range.end - 1].end
    }

    pub(crate) fn into_string(self) -> String {
        self.text
    }
}

struct Builder {
    text: String,
    origin: Vec<Range<usize>>,
}

impl Builder {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            origin: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, ch: char, from: Range<usize>) {
        self.text.push(ch);
        for _ in 0..ch.len_utf8() {
            self.origin.push(from.clone());
        }
    }

    fn finish(self, source: &str) -> NormalizedText {
        let changed = self.text != source;
        NormalizedText {
            text: self.text,
            origin: self.origin,
            changed,
        }
    }
}

pub(crate) fn is_horizontal_space(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// Width in bytes of a line's leading spaces and tabs.
pub(crate) fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Strip the common leading indentation from a block of lines.
///
/// The common indentation is the minimum over non-blank lines. Blank
/// (whitespace-only) lines come back empty.
pub(crate) fn dedent<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let common = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indent_width(line))
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                &line[common..]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace_maps_runs() {
        let normalized = NormalizedText::collapse_whitespace("a  \tb c");
        assert_eq!(normalized.as_str(), "a b c");
        assert!(normalized.changed());
        // " b" in the rewritten text covers the whole run in the source
        assert_eq!(normalized.to_original(1..3), 1..5);
    }

    #[test]
    fn test_collapse_whitespace_keeps_newlines() {
        let normalized = NormalizedText::collapse_whitespace("x\n  y");
        assert_eq!(normalized.as_str(), "x\n y");
    }

    #[test]
    fn test_unescape_known_sequences() {
        let normalized = NormalizedText::unescape(r#"say \"hi\"\n\tdone \q"#);
        assert_eq!(normalized.as_str(), "say \"hi\"\n\tdone \\q");
        // the decoded newline maps back to the two-byte `\n`
        let newline = normalized.as_str().find('\n').unwrap();
        assert_eq!(normalized.to_original(newline..newline + 1), 10..12);
    }

    #[test]
    fn test_unescape_unchanged_text() {
        let normalized = NormalizedText::unescape("plain text");
        assert!(!normalized.changed());
        assert_eq!(normalized.into_string(), "plain text");
    }

    #[test]
    fn test_unescape_multibyte_origin() {
        let normalized = NormalizedText::unescape("é\\n");
        assert_eq!(normalized.as_str(), "é\n");
        assert_eq!(normalized.to_original(0..2), 0..2);
        assert_eq!(normalized.to_original(2..3), 2..4);
    }

    #[test]
    fn test_dedent_common_indent() {
        let lines = ["    if x {", "        y();", "", "    }"];
        assert_eq!(dedent(&lines), vec!["if x {", "    y();", "", "}"]);
    }

    #[test]
    fn test_dedent_blank_lines_normalize() {
        let lines = ["  a", "   ", "  b"];
        assert_eq!(dedent(&lines), vec!["a", "", "b"]);
    }
}
