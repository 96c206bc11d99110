//! Configuration files feeding the dispatcher and the CLI run context.

use record_hooks::cli::RunContext;
use record_hooks::config::{ConfigLoader, ValidationError};
use record_hooks::HooksError;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(temp: &TempDir, body: &str) -> PathBuf {
    let path = temp.path().join("hooks.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_file_config_shapes_registered_handlers() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        r#"
[dispatch]
max_depth = 4

[handlers]
disabled = ["contact_mirror", "linked_copy"]

[handlers.weight]
line_entity = "salesorderdetail"
"#,
    );
    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.dispatch_settings().max_depth, 4);

    let dispatcher = config.dispatcher();
    let names: Vec<&str> = dispatcher.registrations().iter().map(|r| r.name()).collect();
    assert_eq!(
        names,
        vec!["duplicate_guard", "weight.create", "weight.update", "weight.delete"]
    );
}

#[test]
fn test_invalid_file_is_reported_with_every_problem() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        r#"
[query]
page_size = 10000

[logging]
level = "loud"

[handlers]
disabled = ["audit"]
"#,
    );
    let config = ConfigLoader::load_from_file(&path).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().any(|e| matches!(e, ValidationError::Query(_))));
    assert!(errors.iter().any(|e| matches!(e, ValidationError::Logging(_))));
    assert!(errors
        .iter()
        .any(|e| matches!(e, ValidationError::Handler(name, _) if name == "audit")));

    let workspace = temp.path().join("workspace");
    let err = RunContext::new(workspace, Some(path)).err().unwrap();
    match err {
        HooksError::Config(message) => {
            assert!(message.starts_with("Configuration validation failed:"));
            assert!(message.contains("page_size must be between 1 and 5000, got 10000"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_malformed_file_is_a_config_error() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "[query]\npage_size = \"many\"\n");
    assert!(ConfigLoader::load_from_file(&path).is_err());
    let err = RunContext::new(temp.path().to_path_buf(), Some(path)).err().unwrap();
    assert!(matches!(err, HooksError::Config(_)));
}

#[test]
fn test_relative_store_path_lands_in_workspace() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "[store]\npath = \"data/records\"\n");
    let workspace = temp.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();
    let ctx = RunContext::new(workspace.clone(), Some(path)).unwrap();
    assert_eq!(ctx.workspace_root(), workspace.as_path());
    assert!(workspace.join("data").join("records").is_dir());
}
