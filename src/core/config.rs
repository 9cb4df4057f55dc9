//! Configuration management for Stageline.
//!
//! Handles loading and saving configuration from TOML files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::workflow::{
    discover_workflows, lint_workflow, ConfigError, WorkflowDefinition, WorkflowLint,
    WorkflowRegistry,
};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "STAGELINE_CONFIG";

/// Name of the project-local config file.
pub const LOCAL_CONFIG_FILE: &str = ".stageline.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workflow behavior and definitions
    pub workflow: WorkflowConfig,

    /// Checkbox status symbols
    pub task_statuses: TaskStatusConfig,

    /// Indentation of generated lines
    pub indent: IndentConfig,
}

/// Workflow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Whether Enter interception and menus are active
    pub enabled: bool,

    /// Append a start timestamp to generated task lines
    pub auto_add_timestamp: bool,

    /// chrono format of start timestamps
    pub timestamp_format: String,

    /// Remove the start timestamp when a task is completed
    pub remove_timestamp_on_transition: bool,

    /// Record time spent on a task when it is completed
    pub calculate_spent_time: bool,

    /// Record the total time of the workflow on its final stage
    pub calculate_full_spent_time: bool,

    /// Remove stage markers from completed tasks
    pub auto_remove_last_stage_marker: bool,

    /// Also complete the root task when the workflow completes
    pub complete_root_on_terminal: bool,

    /// Workflow definitions
    pub definitions: Vec<WorkflowDefinition>,
}

/// Task status symbols. Alternatives are separated by `|`; the first one is
/// written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskStatusConfig {
    pub completed: String,
    pub in_progress: String,
    pub abandoned: String,
    pub planned: String,
    pub not_started: String,
}

/// Indentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndentConfig {
    /// Indent with tabs instead of spaces
    pub use_tab: bool,

    /// Number of spaces per level when `use_tab` is off
    pub tab_size: usize,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. the file named by `STAGELINE_CONFIG`
    /// 2. `.stageline.toml` in current directory
    /// 3. `~/.config/stageline/config.toml`
    /// 4. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::load_from_file(Path::new(&path));
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> anyhow::Result<()> {
        let config_dir =
            Self::config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        std::fs::create_dir_all(&config_dir)?;

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_dir.join("config.toml"), content)?;

        Ok(())
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("stageline"))
    }

    /// Get the global config file path.
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Check the workflow definitions for structural errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for definition in &self.workflow.definitions {
            definition.validate()?;
            if !seen.insert(definition.id.as_str()) {
                return Err(ConfigError::DuplicateWorkflow(definition.id.clone()));
            }
        }
        Ok(())
    }

    /// Non-fatal warnings about the workflow definitions.
    pub fn lints(&self) -> Vec<WorkflowLint> {
        self.workflow.definitions.iter().flat_map(lint_workflow).collect()
    }

    /// Registry of the inline workflow definitions.
    pub fn registry(&self) -> WorkflowRegistry {
        WorkflowRegistry::new(self.workflow.definitions.iter().cloned())
    }

    /// Registry of the inline definitions plus workflow files found under
    /// `dir`. Discovered files replace inline definitions with the same id.
    pub fn registry_in(&self, dir: &Path) -> anyhow::Result<WorkflowRegistry> {
        let mut registry = self.registry();
        for (source, definition) in discover_workflows(dir)? {
            tracing::debug!(source = %source, workflow = %definition.id, "Discovered workflow");
            registry.add(definition);
        }
        Ok(registry)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_add_timestamp: false,
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
            remove_timestamp_on_transition: false,
            calculate_spent_time: false,
            calculate_full_spent_time: false,
            auto_remove_last_stage_marker: false,
            complete_root_on_terminal: false,
            definitions: vec![WorkflowDefinition::project_workflow()],
        }
    }
}

impl TaskStatusConfig {
    /// Symbol written when a task is completed.
    pub fn completed_symbol(&self) -> char {
        first_symbol(&self.completed, 'x')
    }

    /// Symbol written on newly generated tasks.
    pub fn not_started_symbol(&self) -> char {
        first_symbol(&self.not_started, ' ')
    }

    /// Check if `symbol` marks a completed task.
    pub fn is_completed(&self, symbol: char) -> bool {
        self.completed.split('|').any(|s| s.chars().eq(std::iter::once(symbol)))
    }
}

impl Default for TaskStatusConfig {
    fn default() -> Self {
        Self {
            completed: "x|X".to_string(),
            in_progress: ">|/".to_string(),
            abandoned: "-".to_string(),
            planned: "?".to_string(),
            not_started: " ".to_string(),
        }
    }
}

impl IndentConfig {
    /// One level of indentation.
    pub fn unit(&self) -> String {
        if self.use_tab {
            "\t".to_string()
        } else {
            " ".repeat(self.tab_size.max(1))
        }
    }
}

impl Default for IndentConfig {
    fn default() -> Self {
        Self { use_tab: true, tab_size: 4 }
    }
}

fn first_symbol(symbols: &str, fallback: char) -> char {
    symbols.split('|').next().and_then(|s| s.chars().next()).unwrap_or(fallback)
}
