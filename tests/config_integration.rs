//! Integration tests for configuration loading and workflow discovery.

use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use stageline::core::{Config, CONFIG_ENV_VAR};
use stageline::workflow::{ConfigError, StageKind};

const CUSTOM_CONFIG: &str = r#"
[workflow]
auto_add_timestamp = true
calculate_spent_time = true
timestamp_format = "%d.%m.%Y %H:%M"

[task_statuses]
completed = "✓|x"

[indent]
use_tab = false
tab_size = 3

[[workflow.definitions]]
id = "triage"
name = "Triage"

[[workflow.definitions.stages]]
id = "new"
name = "New"
type = "linear"

[[workflow.definitions.stages]]
id = "closed"
name = "Closed"
type = "terminal"
"#;

#[test]
fn test_load_from_file_reads_all_sections() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stageline.toml");
    fs::write(&path, CUSTOM_CONFIG).unwrap();

    let config = Config::load_from_file(&path).unwrap();

    assert!(config.workflow.enabled);
    assert!(config.workflow.auto_add_timestamp);
    assert_eq!(config.workflow.timestamp_format, "%d.%m.%Y %H:%M");
    assert_eq!(config.task_statuses.completed_symbol(), '✓');
    assert_eq!(config.task_statuses.not_started_symbol(), ' ');
    assert_eq!(config.indent.unit(), "   ");
    assert_eq!(config.workflow.definitions.len(), 1);
    assert!(matches!(config.workflow.definitions[0].stages[1].kind, StageKind::Terminal));
}

#[test]
fn test_load_from_file_reports_parse_errors() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "[workflow\nenabled = ").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_unknown_stage_reference_fails_validation() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stageline.toml");
    fs::write(
        &path,
        r#"
[[workflow.definitions]]
id = "loop"
name = "Loop"

[[workflow.definitions.stages]]
id = "a"
name = "A"
type = "linear"
next = "missing"
"#,
    )
    .unwrap();

    let config = Config::load_from_file(&path).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::UnknownStageReference { .. })));
}

#[test]
fn test_dotted_stage_id_fails_validation() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("stageline.toml");
    fs::write(
        &path,
        r#"
[[workflow.definitions]]
id = "release"
name = "Release"

[[workflow.definitions.stages]]
id = "v1.0"
name = "Version 1"
type = "terminal"
"#,
    )
    .unwrap();

    let config = Config::load_from_file(&path).unwrap();
    let err = config.validate().unwrap_err();
    assert!(matches!(&err, ConfigError::InvalidMarkerId { id, .. } if id == "v1.0"));
    assert!(err.to_string().contains("must not contain '.'"));
}

#[test]
fn test_dotted_workflow_file_is_skipped_on_discovery() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("workflows")).unwrap();
    fs::write(
        temp_dir.path().join("workflows").join("release.yaml"),
        "id: release\nname: Release\nstages:\n  - id: build\n    name: Build\n    type: cycle\n    subStages:\n      - id: rc.1\n        name: RC 1\n",
    )
    .unwrap();

    let registry = Config::default().registry_in(temp_dir.path()).unwrap();
    assert!(registry.get("release").is_none());
}

#[test]
fn test_registry_in_merges_discovered_workflows() {
    let temp_dir = TempDir::new().unwrap();
    let workflows_dir = temp_dir.path().join(".stageline").join("workflows");
    fs::create_dir_all(&workflows_dir).unwrap();
    fs::write(
        workflows_dir.join("project_workflow.yaml"),
        "id: project_workflow\nname: Overridden\nstages:\n  - id: only\n    name: Only\n    type: terminal\n",
    )
    .unwrap();
    fs::create_dir_all(temp_dir.path().join("workflows")).unwrap();
    fs::write(
        temp_dir.path().join("workflows").join("release.yml"),
        "id: release\nname: Release\nstages:\n  - id: ship\n    name: Ship\n    type: terminal\n",
    )
    .unwrap();

    let registry = Config::default().registry_in(temp_dir.path()).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get("project_workflow").unwrap().name, "Overridden");
    assert!(registry.get("release").is_some());
}

#[test]
fn test_registry_in_without_workflow_dirs() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Config::default().registry_in(temp_dir.path()).unwrap();

    assert_eq!(registry.len(), 1);
    assert!(registry.get("project_workflow").is_some());
}

#[test]
#[serial(stageline_env)]
fn test_load_uses_env_var() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("custom.toml");
    fs::write(&path, CUSTOM_CONFIG).unwrap();

    let original = std::env::var_os(CONFIG_ENV_VAR);
    std::env::set_var(CONFIG_ENV_VAR, &path);

    let result = Config::load();

    match original {
        Some(val) => std::env::set_var(CONFIG_ENV_VAR, val),
        None => std::env::remove_var(CONFIG_ENV_VAR),
    }

    let config = result.unwrap();
    assert!(config.registry().get("triage").is_some());
}

#[test]
#[serial(stageline_env)]
fn test_load_fails_on_missing_env_file() {
    let temp_dir = TempDir::new().unwrap();

    let original = std::env::var_os(CONFIG_ENV_VAR);
    std::env::set_var(CONFIG_ENV_VAR, temp_dir.path().join("missing.toml"));

    let result = Config::load();

    match original {
        Some(val) => std::env::set_var(CONFIG_ENV_VAR, val),
        None => std::env::remove_var(CONFIG_ENV_VAR),
    }

    assert!(result.is_err());
}
