//! Integration tests for config loading
//!
//! Tests parsing, defaults, validation, and root resolution of
//! `ironcode-edit.toml`.

use ironcode_edit::config::{
    load_from_path, load_from_str, load_or_default, ConfigError, ToolConfig, ValidationIssue,
    CONFIG_FILE_NAME,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_load_full_config() {
    let toml = r#"
[workspace]
root = "/srv/project"
forbidden = ["target", "vendor/generated"]

[limits]
max_concurrent = 8

[output]
diff_context = 5
"#;

    let config = load_from_str(toml).unwrap();
    assert_eq!(config.workspace.root, Some(PathBuf::from("/srv/project")));
    assert_eq!(
        config.workspace.forbidden,
        vec![PathBuf::from("target"), PathBuf::from("vendor/generated")]
    );
    assert_eq!(config.limits.max_concurrent, 8);
    assert_eq!(config.output.diff_context, 5);
}

#[test]
fn test_missing_sections_use_defaults() {
    let config = load_from_str("[output]\ndiff_context = 0\n").unwrap();
    assert_eq!(config.limits.max_concurrent, 4);
    assert_eq!(config.output.diff_context, 0);
    assert!(config.workspace.forbidden.is_empty());

    assert_eq!(load_from_str("").unwrap(), ToolConfig::default());
}

#[test]
fn test_unknown_key_is_a_parse_error() {
    let err = load_from_str("[limits]\nmax_concurent = 2\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml { path: None, .. }));
    assert!(err.to_string().starts_with("failed to parse config TOML"));
}

#[test]
fn test_validation_collects_issues() {
    let toml = r#"
[workspace]
forbidden = [""]

[limits]
max_concurrent = 0

[output]
diff_context = 100000
"#;

    let err = load_from_str(toml).unwrap_err();
    let source = match err {
        ConfigError::Validation { source, .. } => source,
        other => panic!("expected validation error, got {other}"),
    };
    assert_eq!(source.issues.len(), 3);
    assert!(source.issues.contains(&ValidationIssue::EmptyPath {
        field: "workspace.forbidden",
        index: Some(0),
    }));
}

#[test]
fn test_load_from_path_resolves_relative_root() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "[workspace]\nroot = \"project\"\n").unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.workspace.root, Some(dir.path().join("project")));
}

#[test]
fn test_load_from_path_reports_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "[limits]\nmax_concurrent = 0\n").unwrap();

    let err = load_from_path(&path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains(&path.display().to_string()));
    assert!(message.contains("'limits.max_concurrent' must be at least 1"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_load_or_default() {
    let dir = TempDir::new().unwrap();
    assert_eq!(load_or_default(dir.path()).unwrap(), ToolConfig::default());

    fs::write(dir.path().join(CONFIG_FILE_NAME), "[limits]\nmax_concurrent = 2\n").unwrap();
    assert_eq!(load_or_default(dir.path()).unwrap().limits.max_concurrent, 2);

    let missing = load_from_path(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));
}
