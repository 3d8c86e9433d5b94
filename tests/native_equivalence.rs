//! Tests for the C boundary
//!
//! Two kinds of checks. Marshalling: the pointer route and `replace_json`
//! must carry `edit::replace`'s result through unchanged, content and error
//! text byte for byte. Behaviour: for inputs whose correct edit can be built
//! independently with plain string operations (exact occurrences, shifted
//! blocks, collapsed spacing), the boundary must produce exactly that edit.

use ironcode_edit::edit;
use ironcode_edit::ffi::{edit_replace_ffi, free_string, replace_json, ReplaceResponse};
use proptest::prelude::*;
use std::ffi::{CStr, CString};

fn via_ffi(content: &str, old: &str, new: &str, replace_all: bool) -> ReplaceResponse {
    let content = CString::new(content).unwrap();
    let old = CString::new(old).unwrap();
    let new = CString::new(new).unwrap();
    unsafe {
        let raw = edit_replace_ffi(content.as_ptr(), old.as_ptr(), new.as_ptr(), replace_all);
        assert!(!raw.is_null());
        let json = CStr::from_ptr(raw).to_str().unwrap().to_owned();
        free_string(raw);
        serde_json::from_str(&json).unwrap()
    }
}

fn via_reference(content: &str, old: &str, new: &str, replace_all: bool) -> ReplaceResponse {
    match edit::replace(content, old, new, replace_all) {
        Ok(result) => ReplaceResponse {
            success: true,
            content: Some(result.content),
            error: None,
        },
        Err(err) => ReplaceResponse {
            success: false,
            content: None,
            error: Some(err.to_string()),
        },
    }
}

fn assert_marshalled_unchanged(content: &str, old: &str, new: &str, replace_all: bool) {
    let native = via_ffi(content, old, new, replace_all);
    let reference = via_reference(content, old, new, replace_all);
    assert_eq!(native, reference, "content={content:?} old={old:?}");
    assert_eq!(
        serde_json::from_str::<ReplaceResponse>(&replace_json(content, old, new, replace_all))
            .unwrap(),
        reference
    );
}

#[test]
fn test_fixed_corpus_marshalled_unchanged() {
    let corpus: &[(&str, &str, &str, bool)] = &[
        ("Hello world", "world", "Rust", false),
        ("foo bar foo baz foo", "foo", "replaced", false),
        ("foo bar foo baz foo", "foo", "replaced", true),
        ("Hello world", "xyz", "abc", false),
        ("same", "same", "same", false),
        (
            "    if (true) {\n        console.log('test');\n    }",
            "if (true) {\n    console.log('test');\n}",
            "if (false) {\n    console.log('test');\n}",
            false,
        ),
        ("let   x =\t1;", "let x = 1;", "let x = 2;", false),
        ("first\nsecond", "first\\nsecond", "joined", false),
        ("a\r\nb\r\nc\r\n", "a\nb\n", "z\n", false),
        ("fn f() {\n    a();\n    b();\n}\n", "fn f() {\n    a();\n    c();\n}", "fn f() {}", false),
        ("café  crème", "café crème", "tea", false),
        ("", "x", "y", false),
        ("text", "", "new", false),
    ];
    for &(content, old, new, replace_all) in corpus {
        assert_marshalled_unchanged(content, old, new, replace_all);
    }
}

fn ok(content: String) -> ReplaceResponse {
    ReplaceResponse {
        success: true,
        content: Some(content),
        error: None,
    }
}

fn failed(error: String) -> ReplaceResponse {
    ReplaceResponse {
        success: false,
        content: None,
        error: Some(error),
    }
}

/// Lines that can never take part in a letter-only match.
fn filler_lines() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[0-9]{1,4}", 0..4)
}

/// Small alphabet so matches, near-matches and drift are all common.
fn text() -> impl Strategy<Value = String> {
    "[ab \\t\\n\\\\{}é]{0,48}"
}

fn needle() -> impl Strategy<Value = String> {
    "[ab \\t\\n\\\\{}é]{0,12}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_marshalling_preserves_result(
        content in text(),
        old in needle(),
        new in needle(),
        replace_all in any::<bool>(),
    ) {
        let native = via_ffi(&content, &old, &new, replace_all);
        let reference = via_reference(&content, &old, &new, replace_all);
        prop_assert_eq!(native, reference);
    }

    #[test]
    fn prop_exact_occurrences_follow_std(
        content in text(),
        old in "[ab{}]{1,4}",
        new in needle(),
        replace_all in any::<bool>(),
    ) {
        prop_assume!(old != new);
        let count = content.matches(old.as_str()).count();
        prop_assume!(count > 0);

        let expected = if replace_all {
            ok(content.replace(old.as_str(), &new))
        } else if count == 1 {
            ok(content.replacen(old.as_str(), &new, 1))
        } else {
            failed(format!(
                "Found {count} matches for oldString. Provide more surrounding lines in oldString to identify the correct match."
            ))
        };
        prop_assert_eq!(via_ffi(&content, &old, &new, replace_all), expected);
    }

    #[test]
    fn prop_shifted_block_replaced_whole(
        prefix in filler_lines(),
        block in prop::collection::vec("[a-z]{1,6}", 2..5),
        suffix in filler_lines(),
        indent in 1usize..8,
        new in "[A-Z]{1,6}",
    ) {
        let pad = " ".repeat(indent);
        let mut lines = prefix.clone();
        lines.extend(block.iter().map(|line| format!("{pad}{line}")));
        lines.extend(suffix.iter().cloned());
        let content = lines.join("\n");

        let mut expected = prefix;
        expected.push(new.clone());
        expected.extend(suffix);

        let native = via_ffi(&content, &block.join("\n"), &new, false);
        prop_assert_eq!(native, ok(expected.join("\n")));
    }

    #[test]
    fn prop_spaced_line_replaced_whole(
        prefix in filler_lines(),
        words in prop::collection::vec("[a-z]{1,5}", 2..5),
        gaps in prop::collection::vec(2usize..5, 4),
        suffix in filler_lines(),
        new in "[A-Z]{1,6}",
    ) {
        let mut spaced = words[0].clone();
        for (word, gap) in words[1..].iter().zip(&gaps) {
            spaced.push_str(&" ".repeat(*gap));
            spaced.push_str(word);
        }
        let mut lines = prefix.clone();
        lines.push(spaced);
        lines.extend(suffix.iter().cloned());
        let content = lines.join("\n");

        let mut expected = prefix;
        expected.push(new.clone());
        expected.extend(suffix);

        let native = via_ffi(&content, &words.join(" "), &new, false);
        prop_assert_eq!(native, ok(expected.join("\n")));
    }

    #[test]
    fn prop_exact_replace_all_matches_std(
        content in text(),
        old in "[ab{}]{1,4}",
        new in needle(),
    ) {
        prop_assume!(old != new);
        prop_assume!(content.contains(old.as_str()));
        let result = edit::replace(&content, &old, &new, true).unwrap();
        prop_assert_eq!(result.content, content.replace(old.as_str(), &new));
    }

    #[test]
    fn prop_located_spans_are_valid(content in text(), old in needle()) {
        let outcome = ironcode_edit::locate(&content, &old);
        let mut previous_end = 0;
        for span in outcome.spans() {
            prop_assert!(span.start >= previous_end);
            prop_assert!(span.start <= span.end && span.end <= content.len());
            prop_assert!(content.is_char_boundary(span.start));
            prop_assert!(content.is_char_boundary(span.end));
            previous_end = span.end;
        }
    }

    #[test]
    fn prop_failure_never_changes_content(
        content in text(),
        old in needle(),
        new in needle(),
    ) {
        let snapshot = content.clone();
        let _ = edit::replace(&content, &old, &new, false);
        prop_assert_eq!(content, snapshot);
    }
}
