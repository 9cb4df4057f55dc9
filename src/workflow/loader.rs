//! Workflow file loader.
//!
//! Parses YAML workflow files into definitions.

use std::path::Path;

use anyhow::Context;

use super::definition::WorkflowDefinition;

/// Parse a workflow definition from a file.
pub fn parse_workflow(path: &Path) -> anyhow::Result<WorkflowDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow file {}", path.display()))?;
    parse_workflow_str(&content)
}

/// Parse a workflow definition from a string.
pub fn parse_workflow_str(content: &str) -> anyhow::Result<WorkflowDefinition> {
    let workflow: WorkflowDefinition = serde_yaml::from_str(content)?;
    workflow.validate()?;
    Ok(workflow)
}

/// Discover workflow files in a directory.
///
/// Looks in `.stageline/workflows/` and `workflows/`. Files that fail to
/// parse are logged and skipped.
pub fn discover_workflows(dir: &Path) -> anyhow::Result<Vec<(String, WorkflowDefinition)>> {
    let mut workflows = Vec::new();

    let workflows_dir = dir.join(".stageline").join("workflows");
    if workflows_dir.exists() {
        workflows.extend(scan_workflow_dir(&workflows_dir)?);
    }

    let alt_workflows_dir = dir.join("workflows");
    if alt_workflows_dir.exists() {
        workflows.extend(scan_workflow_dir(&alt_workflows_dir)?);
    }

    Ok(workflows)
}

/// Scan a directory for workflow files, sorted by file name.
fn scan_workflow_dir(dir: &Path) -> anyhow::Result<Vec<(String, WorkflowDefinition)>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|e| e == "yaml" || e == "yml"))
        .collect();
    paths.sort();

    let mut workflows = Vec::new();
    for path in paths {
        match parse_workflow(&path) {
            Ok(workflow) => {
                let name = path.file_stem().and_then(|n| n.to_str()).unwrap_or("unknown").to_string();
                workflows.push((name, workflow));
            }
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to parse workflow file");
            }
        }
    }

    Ok(workflows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_workflow() {
        let yaml = r#"
id: bugfix
name: Bug Fix
stages:
  - id: triage
    name: Triage
    type: linear
  - id: closed
    name: Closed
    type: terminal
"#;

        let workflow = parse_workflow_str(yaml).unwrap();
        assert_eq!(workflow.id, "bugfix");
        assert_eq!(workflow.stages.len(), 2);
    }

    #[test]
    fn test_parse_no_stages_fails() {
        let yaml = r"
id: empty
name: Empty
stages: []
";

        assert!(parse_workflow_str(yaml).is_err());
    }

    #[test]
    fn test_parse_unknown_stage_type_fails() {
        let yaml = r"
id: odd
name: Odd
stages:
  - id: a
    name: A
    type: parallel
";

        assert!(parse_workflow_str(yaml).is_err());
    }

    #[test]
    fn test_discover_skips_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let workflows_dir = dir.path().join(".stageline").join("workflows");
        std::fs::create_dir_all(&workflows_dir).unwrap();
        std::fs::write(
            workflows_dir.join("simple.yaml"),
            "id: simple\nname: Simple\nstages:\n  - id: only\n    name: Only\n    type: terminal\n",
        )
        .unwrap();
        std::fs::write(workflows_dir.join("broken.yml"), "id: [").unwrap();
        std::fs::write(workflows_dir.join("notes.txt"), "ignored").unwrap();

        let workflows = discover_workflows(dir.path()).unwrap();
        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0].0, "simple");
        assert_eq!(workflows[0].1.id, "simple");
    }
}
