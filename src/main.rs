//! Stageline - multi-stage task workflows in markdown outlines.
//!
//! Resolves workflow tasks in a file, shows the actions available on a line
//! and applies them.

#![allow(clippy::single_match_else)]

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stageline::core::{BufferEditor, Change, Config, EditPlan, Editor, TextDocument};
use stageline::workflow::{
    extract_markers, set_status, CurrentStage, MenuItem, WorkflowAction, WorkflowCommands, WorkflowMenu,
};

/// Multi-stage task workflows in markdown outlines
#[derive(Parser)]
#[command(name = "stageline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default locations
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the workflow state of a line
    Resolve {
        /// Markdown file
        file: PathBuf,

        /// 1-based line number
        #[arg(short, long)]
        line: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the workflow actions available on a line
    Menu {
        /// Markdown file
        file: PathBuf,

        /// 1-based line number
        #[arg(short, long)]
        line: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Apply a workflow action to a line
    Apply {
        /// Markdown file
        file: PathBuf,

        /// 1-based line number
        #[arg(short, long)]
        line: usize,

        /// Menu index, action id (start, next, complete, move:<stage>[/<sub>],
        /// bubble:<stage>, child-same-stage, sibling, subtask,
        /// new-root:<workflow>, root:<workflow>)
        #[arg(short, long)]
        action: String,

        /// Print the result instead of writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Check off a task and advance its workflow
    Check {
        /// Markdown file
        file: PathBuf,

        /// 1-based line number
        #[arg(short, long)]
        line: usize,

        /// Print the result instead of writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Simulate Enter at the end of a line
    Enter {
        /// Markdown file
        file: PathBuf,

        /// 1-based line number
        #[arg(short, long)]
        line: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List configured workflows
    Workflows {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Validate workflow configuration
    Lint,

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Resolve { file, line, format } => cmd_resolve(config_path, &file, line, &format)?,
        Commands::Menu { file, line, format } => cmd_menu(config_path, &file, line, &format)?,
        Commands::Apply { file, line, action, dry_run } => {
            cmd_apply(config_path, &file, line, &action, dry_run)?;
        }
        Commands::Check { file, line, dry_run } => cmd_check(config_path, &file, line, dry_run)?,
        Commands::Enter { file, line, format } => cmd_enter(config_path, &file, line, &format)?,
        Commands::Workflows { format } => cmd_workflows(config_path, &format)?,
        Commands::Lint => cmd_lint(config_path)?,
        Commands::Config { path } => cmd_config(config_path, path)?,
        Commands::Completions { shell } => cmd_completions(shell),
    }

    Ok(())
}

/// Load configuration from `--config` or the default locations.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    }
}

/// Build installed workflow commands, including workflow files discovered in
/// the current directory.
fn load_commands(config_path: Option<&Path>) -> Result<WorkflowCommands> {
    let config = load_config(config_path)?;
    let cwd = std::env::current_dir()?;
    let registry = config.registry_in(&cwd)?;

    let mut commands = WorkflowCommands::with_registry(config, registry);
    commands.install().context("Invalid workflow configuration")?;
    Ok(commands)
}

/// Read a file and place the cursor at the end of `line`.
fn open_editor(file: &Path, line: usize) -> Result<BufferEditor> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let lines = TextDocument::new(text.as_str()).lines();
    BufferEditor::at_line_end(text, line).ok_or_else(|| {
        anyhow::anyhow!("Line {line} is out of range ({} has {lines} lines)", file.display())
    })
}

/// Show the workflow state of a line.
fn cmd_resolve(config_path: Option<&Path>, file: &Path, line: usize, format: &str) -> Result<()> {
    let commands = load_commands(config_path)?;
    let editor = open_editor(file, line)?;
    let state = commands.synthesizer().resolve(editor.document(), line);

    match format {
        "json" => {
            let value = state.map(|state| {
                serde_json::json!({
                    "line": state.line_number,
                    "source_line": state.source_line,
                    "workflow": state.workflow.id,
                    "root": state.is_root_task(),
                    "stage": state.current_stage().map(|s| &s.id),
                    "sub_stage": state.current_sub_stage().map(|s| &s.id),
                })
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => match state {
            None => println!("Line {line} is not a workflow task"),
            Some(state) => {
                println!("Workflow: {} ({})", state.workflow.name, state.workflow.id);
                match state.current {
                    CurrentStage::Root => println!("Stage: root task"),
                    CurrentStage::Stage { stage, sub_stage } => {
                        println!("Stage: {} [{}] ({})", stage.name, stage.id, stage.type_name());
                        if let Some(sub_stage) = sub_stage {
                            println!("Sub-stage: {} [{}]", sub_stage.name, sub_stage.id);
                        }
                    }
                }
                if state.is_inherited() {
                    println!("Inherited from line {}", state.source_line);
                }
            }
        },
    }

    Ok(())
}

/// List the actions available on a line.
fn cmd_menu(config_path: Option<&Path>, file: &Path, line: usize, format: &str) -> Result<()> {
    let commands = load_commands(config_path)?;
    let editor = open_editor(file, line)?;
    print_menu(commands.open_menu(&editor).as_ref(), line, format)
}

/// Simulate Enter at the end of a line.
fn cmd_enter(config_path: Option<&Path>, file: &Path, line: usize, format: &str) -> Result<()> {
    let commands = load_commands(config_path)?;
    let editor = open_editor(file, line)?;

    match commands.handle_enter(&editor) {
        Some(menu) => print_menu(Some(&menu), line, format),
        None if format == "json" => print_menu(None, line, format),
        None => {
            println!("Line {line} is not a workflow task; Enter inserts a new line");
            Ok(())
        }
    }
}

fn print_menu(menu: Option<&WorkflowMenu>, line: usize, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&menu)?),
        _ => match menu {
            None => println!("Line {line} is not a workflow task"),
            Some(menu) => {
                println!("Workflow actions for line {line}:");
                for (index, item) in menu.items.iter().enumerate() {
                    println!("  {index}. {} [{}]", item.title, item.action);
                }
            }
        },
    }
    Ok(())
}

/// Apply a workflow action and write the file.
fn cmd_apply(
    config_path: Option<&Path>,
    file: &Path,
    line: usize,
    action: &str,
    dry_run: bool,
) -> Result<()> {
    let commands = load_commands(config_path)?;
    let mut editor = open_editor(file, line)?;

    let menu = commands
        .open_menu(&editor)
        .unwrap_or(WorkflowMenu { line_number: line, items: Vec::new() });
    let item = select_item(&menu, action)?;

    if dry_run {
        let plan = commands.synthesizer().synthesize(editor.document(), line, &item.action);
        if plan.is_empty() {
            anyhow::bail!("Action '{}' does not apply to line {line}", item.action);
        }
        let mut preview = editor.document().clone();
        preview.apply(&plan.changes)?;
        print!("{preview}");
        return Ok(());
    }

    if !commands.select(&mut editor, &menu, &item)? {
        anyhow::bail!("Action '{}' does not apply to line {line}", item.action);
    }

    write_atomically(file, editor.text())?;
    println!("Applied '{}' to {}:{line}", item.title, file.display());
    Ok(())
}

/// Pick a menu item by index, action id, or the `next` alias.
fn select_item(menu: &WorkflowMenu, action: &str) -> Result<MenuItem> {
    if let Ok(index) = action.parse::<usize>() {
        return menu
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No menu item {index} (menu has {} items)", menu.len()));
    }

    if action == "next" {
        return menu
            .items
            .iter()
            .find(|item| matches!(item.action, WorkflowAction::MoveTo { .. }))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No next stage on line {}; try 'complete'", menu.line_number));
    }

    if let Some(item) = menu.find(action) {
        return Ok(item.clone());
    }

    let parsed: WorkflowAction = action.parse()?;
    anyhow::bail!("Action '{parsed}' does not apply to line {}", menu.line_number)
}

/// Mark a task completed and run the workflow follow-up for it.
fn cmd_check(config_path: Option<&Path>, file: &Path, line: usize, dry_run: bool) -> Result<()> {
    let commands = load_commands(config_path)?;
    let mut editor = open_editor(file, line)?;

    let check = {
        let statuses = &commands.config().task_statuses;
        let current = editor
            .document()
            .line(line)
            .ok_or_else(|| anyhow::anyhow!("Line {line} is out of range"))?;
        let markers = extract_markers(current.text)
            .ok_or_else(|| anyhow::anyhow!("Line {line} is not a task"))?;

        if statuses.is_completed(markers.status) {
            None
        } else {
            set_status(current.text, statuses.completed_symbol())
                .map(|checked| EditPlan { changes: vec![Change::replace_line(&current, checked)], cursor: None })
        }
    };
    if let Some(plan) = &check {
        editor.dispatch(plan)?;
    }

    let advanced = commands.handle_completion(&mut editor, line)?;

    if dry_run {
        print!("{}", editor.text());
        return Ok(());
    }
    if check.is_none() && !advanced {
        println!("Nothing to do on {}:{line}", file.display());
        return Ok(());
    }

    write_atomically(file, editor.text())?;
    if advanced {
        println!("Checked {}:{line} and advanced its workflow", file.display());
    } else {
        println!("Checked {}:{line}", file.display());
    }
    Ok(())
}

/// Replace `path` with `content` through a temporary file in the same
/// directory.
fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid file path {}", path.display()))?;
    let tmp = path.with_file_name(format!(".{}.stageline.tmp", file_name.to_string_lossy()));

    std::fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// List configured workflows.
fn cmd_workflows(config_path: Option<&Path>, format: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = config.registry_in(&std::env::current_dir()?)?;

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(registry.get_all())?;
            println!("{json}");
        }
        _ => {
            for workflow in registry.get_all() {
                println!("{} - {}", workflow.id, workflow.name);
                if let Some(description) = &workflow.description {
                    println!("  {description}");
                }
                for stage in &workflow.stages {
                    let sub_stages: Vec<&str> = stage.sub_stages().iter().map(|s| s.id.as_str()).collect();
                    if sub_stages.is_empty() {
                        println!("  - {} [{}]", stage.id, stage.type_name());
                    } else {
                        println!("  - {} [{}] {}", stage.id, stage.type_name(), sub_stages.join(" > "));
                    }
                }
            }
            println!("\nTotal: {} workflows", registry.len());
        }
    }

    Ok(())
}

/// Validate and lint configuration.
fn cmd_lint(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = config.registry_in(&std::env::current_dir()?)?;

    config.validate().context("Invalid workflow configuration")?;
    for workflow in registry.get_all() {
        workflow.validate().with_context(|| format!("Invalid workflow '{}'", workflow.id))?;
    }

    let lints: Vec<_> = registry.get_all().iter().flat_map(stageline::workflow::lint_workflow).collect();
    for lint in &lints {
        println!("warning: {lint}");
    }
    println!("Configuration OK: {} workflows, {} warnings", registry.len(), lints.len());

    Ok(())
}

/// Show configuration.
fn cmd_config(config_path: Option<&Path>, show_path: bool) -> Result<()> {
    if show_path {
        let path = config_path.map(Path::to_path_buf).or_else(Config::config_path);
        if let Some(path) = path {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = load_config(config_path)?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "stageline", &mut io::stdout());
}
