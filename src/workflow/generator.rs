//! Rendering of new workflow task lines.

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;

use crate::core::{Clock, Config};

use super::definition::{WorkflowDefinition, WorkflowStage, WorkflowSubStage};
use super::markers::{render_markers, render_workflow_tag};

/// Prefix of the start timestamp on generated tasks.
pub(crate) const START_MARKER: &str = "🛫";

/// Renders task lines for stages and sub-stages.
pub struct TaskTextGenerator<'a> {
    config: &'a Config,
    clock: &'a dyn Clock,
}

impl<'a> TaskTextGenerator<'a> {
    /// Create a generator.
    pub fn new(config: &'a Config, clock: &'a dyn Clock) -> Self {
        Self { config, clock }
    }

    /// Render the task line for `stage` at `sub_stage`.
    ///
    /// `is_first_stage` adds the `#workflow/<id>` tag, used only when a new
    /// workflow instance is started.
    pub fn render_task(
        &self,
        workflow: &WorkflowDefinition,
        stage: &WorkflowStage,
        indentation: &str,
        sub_stage: Option<&WorkflowSubStage>,
        is_first_stage: bool,
    ) -> String {
        let mut text = self.task_prefix(indentation);
        text.push_str(&stage.name);
        if let Some(sub_stage) = sub_stage {
            text.push_str(&format!(" ({})", sub_stage.name));
        }
        if is_first_stage {
            text.push(' ');
            text.push_str(&render_workflow_tag(&workflow.id));
        }
        text.push(' ');
        text.push_str(&render_markers(Some(&stage.id), sub_stage.map(|s| s.id.as_str())));

        if self.config.workflow.auto_add_timestamp {
            let timestamp = format_timestamp(self.clock.now(), &self.config.workflow.timestamp_format);
            text.push_str(&format!(" {START_MARKER} {timestamp}"));
        }

        text
    }

    /// Render a root task named after the workflow.
    pub fn render_root(&self, workflow: &WorkflowDefinition, indentation: &str) -> String {
        format!("{}{} {}", self.task_prefix(indentation), workflow.name, render_workflow_tag(&workflow.id))
    }

    /// Render an empty task with no markers.
    pub fn render_plain(&self, indentation: &str) -> String {
        self.task_prefix(indentation)
    }

    /// `<indentation>- [<not started>] `, where typing starts on a new line.
    pub fn task_prefix(&self, indentation: &str) -> String {
        format!("{indentation}- [{}] ", self.config.task_statuses.not_started_symbol())
    }
}

/// Default format of start timestamps.
pub(crate) const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format `time` with a strftime pattern, falling back to the default
/// pattern when `format` is malformed.
pub(crate) fn format_timestamp(time: NaiveDateTime, format: &str) -> String {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        tracing::warn!(format, "Invalid timestamp format, using default");
        return time.format(DEFAULT_TIMESTAMP_FORMAT).to_string();
    }
    time.format_with_items(items.into_iter()).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::core::FixedClock;

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(9, 30, 0).unwrap())
    }

    #[test]
    fn test_render_stage_task() {
        let config = Config::default();
        let clock = clock();
        let generator = TaskTextGenerator::new(&config, &clock);
        let workflow = WorkflowDefinition::project_workflow();
        let planning = workflow.stage("planning").unwrap();

        assert_eq!(
            generator.render_task(&workflow, planning, "\t", None, false),
            "\t- [ ] Planning [stage::planning]"
        );
    }

    #[test]
    fn test_render_first_stage_with_sub_stage() {
        let config = Config::default();
        let clock = clock();
        let generator = TaskTextGenerator::new(&config, &clock);
        let workflow = WorkflowDefinition::project_workflow();
        let stage = workflow.stage("in_progress").unwrap();

        assert_eq!(
            generator.render_task(&workflow, stage, "", stage.first_sub_stage(), true),
            "- [ ] In Progress (Development) #workflow/project_workflow \
             [stage::in_progress] [substage::development]"
        );
    }

    #[test]
    fn test_render_with_timestamp() {
        let mut config = Config::default();
        config.workflow.auto_add_timestamp = true;
        let clock = clock();
        let generator = TaskTextGenerator::new(&config, &clock);
        let workflow = WorkflowDefinition::project_workflow();
        let planning = workflow.stage("planning").unwrap();

        assert_eq!(
            generator.render_task(&workflow, planning, "", None, false),
            "- [ ] Planning [stage::planning] 🛫 2024-05-01 09:30:00"
        );
    }

    #[test]
    fn test_invalid_timestamp_format_falls_back() {
        assert_eq!(format_timestamp(clock().0, "%Q"), "2024-05-01 09:30:00");
        assert_eq!(format_timestamp(clock().0, "%H:%M"), "09:30");
    }

    #[test]
    fn test_render_root() {
        let config = Config::default();
        let clock = clock();
        let generator = TaskTextGenerator::new(&config, &clock);

        assert_eq!(
            generator.render_root(&WorkflowDefinition::project_workflow(), "\t"),
            "\t- [ ] Project Workflow #workflow/project_workflow"
        );
    }

    #[test]
    fn test_render_plain() {
        let config = Config::default();
        let clock = clock();
        let generator = TaskTextGenerator::new(&config, &clock);

        assert_eq!(generator.render_plain("    "), "    - [ ] ");
    }
}
