//! Edit synthesis for workflow actions.
//!
//! Every action produces one [`EditPlan`]: a sorted batch of changes that is
//! dispatched as a single transaction. A change either inserts new lines
//! after an untouched line or replaces exactly one whole line (followed by
//! any inserted lines), so each touched line appears in one change only.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::core::{
    position_in_insert, Change, Clock, Config, EditPlan, Line, SystemClock, TextDocument,
};

use super::definition::{WorkflowDefinition, WorkflowStage, WorkflowSubStage};
use super::error::UnknownAction;
use super::generator::{TaskTextGenerator, START_MARKER};
use super::markers::{
    extract_markers, indent_width, indentation, marker_offset, render_workflow_tag, set_status,
    strip_markers,
};
use super::planner::{bubble_targets, is_final_stage, next_stage};
use super::registry::WorkflowRegistry;
use super::resolver::{ancestors, resolve_line, CurrentStage, ResolvedState};

static SPENT_TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(⏱️\s+([0-9:]+)\)").expect("valid spent time regex"));

static SYSTEM_CLOCK: SystemClock = SystemClock;

/// A user-facing workflow action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Insert the first stage under a root task.
    Start,

    /// Complete the current task and insert the given stage below it.
    MoveTo { stage_id: String, sub_stage_id: Option<String> },

    /// Complete the current task without a successor.
    Complete,

    /// Complete the current sub-stage task and its parent stage task, then
    /// move on to the given main stage.
    CompleteSubstageAndMoveTo { stage_id: String },

    /// Insert a child task at the current stage.
    AddChildWithSameStage,

    /// Insert an empty task at the same level.
    AddSibling,

    /// Insert an empty task one level deeper.
    AddSubtask,

    /// Write a new root task for a workflow.
    CreateRoot { workflow_id: String },

    /// Tag an existing plain task as a workflow root.
    ConvertToRoot { workflow_id: String },
}

impl WorkflowAction {
    /// Stable identifier, used on the command line.
    pub fn id(&self) -> String {
        match self {
            Self::Start => "start".to_string(),
            Self::MoveTo { stage_id, sub_stage_id: Some(sub) } => format!("move:{stage_id}/{sub}"),
            Self::MoveTo { stage_id, sub_stage_id: None } => format!("move:{stage_id}"),
            Self::Complete => "complete".to_string(),
            Self::CompleteSubstageAndMoveTo { stage_id } => format!("bubble:{stage_id}"),
            Self::AddChildWithSameStage => "child-same-stage".to_string(),
            Self::AddSibling => "sibling".to_string(),
            Self::AddSubtask => "subtask".to_string(),
            Self::CreateRoot { workflow_id } => format!("new-root:{workflow_id}"),
            Self::ConvertToRoot { workflow_id } => format!("root:{workflow_id}"),
        }
    }

    /// Check if the action moves the workflow forward.
    pub fn is_progression(&self) -> bool {
        matches!(
            self,
            Self::Start | Self::MoveTo { .. } | Self::Complete | Self::CompleteSubstageAndMoveTo { .. }
        )
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl FromStr for WorkflowAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "start" => Self::Start,
            "complete" => Self::Complete,
            "child-same-stage" => Self::AddChildWithSameStage,
            "sibling" => Self::AddSibling,
            "subtask" => Self::AddSubtask,
            _ => {
                let argument = |prefix: &str| s.strip_prefix(prefix).filter(|id| !id.is_empty()).map(str::to_string);

                if let Some(target) = s.strip_prefix("move:") {
                    let (stage, sub) = match target.split_once('/') {
                        Some((stage, sub)) => (stage, Some(sub)),
                        None => (target, None),
                    };
                    if stage.is_empty() || sub.is_some_and(str::is_empty) {
                        return Err(UnknownAction(s.to_string()));
                    }
                    Self::MoveTo {
                        stage_id: stage.to_string(),
                        sub_stage_id: sub.map(str::to_string),
                    }
                } else if let Some(stage_id) = argument("bubble:") {
                    Self::CompleteSubstageAndMoveTo { stage_id }
                } else if let Some(workflow_id) = argument("new-root:") {
                    Self::CreateRoot { workflow_id }
                } else if let Some(workflow_id) = argument("root:") {
                    Self::ConvertToRoot { workflow_id }
                } else {
                    return Err(UnknownAction(s.to_string()));
                }
            }
        };
        Ok(action)
    }
}

impl Serialize for WorkflowAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.id())
    }
}

/// Turns workflow actions on a document line into edit plans.
///
/// Line numbers are 1-based. An out-of-range line, a line that does not
/// resolve for an action that needs workflow state, or a transition the
/// workflow does not allow from that line yields an empty plan.
pub struct Synthesizer<'a> {
    config: &'a Config,
    registry: &'a WorkflowRegistry,
    clock: &'a dyn Clock,
}

impl<'a> Synthesizer<'a> {
    /// Create a synthesizer using the system clock.
    pub fn new(config: &'a Config, registry: &'a WorkflowRegistry) -> Self {
        Self { config, registry, clock: &SYSTEM_CLOCK }
    }

    /// Use `clock` for timestamps and spent time.
    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Resolve the workflow state of a line.
    pub fn resolve(&self, doc: &TextDocument, line_number: usize) -> Option<ResolvedState<'a>> {
        resolve_line(doc, line_number, self.registry)
    }

    /// Build the plan for `action` on a line.
    pub fn synthesize(&self, doc: &TextDocument, line_number: usize, action: &WorkflowAction) -> EditPlan {
        match action {
            WorkflowAction::Start => self.start(doc, line_number),
            WorkflowAction::MoveTo { stage_id, sub_stage_id } => {
                self.advance(doc, line_number, stage_id, sub_stage_id.as_deref())
            }
            WorkflowAction::Complete => self.complete(doc, line_number),
            WorkflowAction::CompleteSubstageAndMoveTo { stage_id } => {
                self.complete_substage_and_bubble(doc, line_number, stage_id)
            }
            WorkflowAction::AddChildWithSameStage => self.add_child_with_same_stage(doc, line_number),
            WorkflowAction::AddSibling => self.add_sibling(doc, line_number),
            WorkflowAction::AddSubtask => self.add_subtask(doc, line_number),
            WorkflowAction::CreateRoot { workflow_id } => self.create_root(doc, line_number, workflow_id),
            WorkflowAction::ConvertToRoot { workflow_id } => self.convert_to_root(doc, line_number, workflow_id),
        }
    }

    /// Insert the workflow's first stage as a child of the root task.
    pub fn start(&self, doc: &TextDocument, line_number: usize) -> EditPlan {
        let Some((line, state)) = self.line_state(doc, line_number) else {
            return EditPlan::empty();
        };
        if !state.is_root_task() || state.is_inherited() {
            tracing::debug!(line = line_number, "Start requires a root task");
            return EditPlan::empty();
        }
        let Some(first) = state.workflow.first_stage() else {
            return EditPlan::empty();
        };

        let child_indent = self.child_indentation(line.text);
        let new_task =
            self.generator().render_task(state.workflow, first, &child_indent, first.first_sub_stage(), true);
        self.insert_below(doc, &line, &child_indent, &new_task)
    }

    /// Complete the current task and insert its successor below it.
    ///
    /// `stage_id` and `sub_stage_id` must name the position the planner
    /// computes for the line. Any other target, including a move off a
    /// terminal stage, yields an empty plan.
    pub fn advance(
        &self,
        doc: &TextDocument,
        line_number: usize,
        stage_id: &str,
        sub_stage_id: Option<&str>,
    ) -> EditPlan {
        let Some((line, state)) = self.line_state(doc, line_number) else {
            return EditPlan::empty();
        };
        let CurrentStage::Stage { stage: current, sub_stage: current_sub } = state.current else {
            tracing::debug!(line = line_number, "Cannot advance a root task");
            return EditPlan::empty();
        };

        let transition = match next_stage(current, state.workflow, current_sub) {
            Ok(transition) => transition,
            Err(error) => {
                tracing::debug!(line = line_number, error = %error, "No successor to advance to");
                return EditPlan::empty();
            }
        };
        if transition.next_stage_id() != stage_id || transition.next_sub_stage_id() != sub_stage_id {
            tracing::debug!(
                line = line_number,
                planned = %transition.next_stage_id(),
                requested = %stage_id,
                "Requested stage is not the planned successor"
            );
            return EditPlan::empty();
        }

        self.transition(doc, &line, &state, transition.stage, transition.sub_stage, Vec::new())
    }

    /// Mark the current task completed without inserting a successor.
    ///
    /// Only a terminal stage, or a stage with nothing after it, can be
    /// completed this way.
    pub fn complete(&self, doc: &TextDocument, line_number: usize) -> EditPlan {
        let Some((line, state)) = self.line_state(doc, line_number) else {
            return EditPlan::empty();
        };
        let CurrentStage::Stage { stage, sub_stage } = state.current else {
            tracing::debug!(line = line_number, "Cannot complete a workflow that was not started");
            return EditPlan::empty();
        };
        if !is_final_stage(stage, sub_stage, state.workflow) {
            tracing::debug!(line = line_number, stage = %stage.id, "Stage has a successor, not completing");
            return EditPlan::empty();
        }

        let completed = self.completed_text(doc, &line, &state, true);
        let mut changes = Vec::with_capacity(2);

        if self.config.workflow.complete_root_on_terminal {
            changes.extend(self.root_completion(doc, line_number, &state.workflow.id));
        }

        changes.push(Change::replace_line(&line, completed.clone()));
        let cursor = position_in_insert(&changes, changes.len() - 1, completed.len());
        EditPlan { changes, cursor: Some(cursor) }
    }

    /// Complete the current sub-stage task and leave its stage for
    /// `stage_id`, which must be one of the stage's bubble targets.
    ///
    /// The nearest ancestor task marked with the current stage and no
    /// sub-stage is completed in the same batch, and the target stage is
    /// inserted below the sub-stage task at that ancestor's indentation.
    /// Without such an ancestor only the sub-stage task transitions.
    pub fn complete_substage_and_bubble(
        &self,
        doc: &TextDocument,
        line_number: usize,
        stage_id: &str,
    ) -> EditPlan {
        let Some((line, state)) = self.line_state(doc, line_number) else {
            return EditPlan::empty();
        };
        let CurrentStage::Stage { stage: current, sub_stage: Some(_) } = state.current else {
            tracing::debug!(line = line_number, "Bubble-up requires a sub-stage task");
            return EditPlan::empty();
        };
        let Some(target) = bubble_targets(current, state.workflow).into_iter().find(|t| t.id == stage_id) else {
            tracing::debug!(
                workflow = %state.workflow.id,
                stage = %current.id,
                target = %stage_id,
                "Not a bubble target"
            );
            return EditPlan::empty();
        };

        let mut preceding = Vec::with_capacity(1);
        match parent_stage_task(doc, line_number, &current.id) {
            Some(parent) => {
                tracing::debug!(parent = parent.number, from = %current.id, to = %target.id, "Completing parent stage task");
                let completed_parent = self.completed_text(doc, &parent, &state, false);
                preceding.push(Change::replace_line(&parent, completed_parent));
            }
            None => {
                tracing::debug!(line = line_number, stage = %current.id, "No parent stage task, moving current task");
            }
        }

        self.transition(doc, &line, &state, target, target.first_sub_stage(), preceding)
    }

    /// Follow-up edits once the user has checked off a workflow task.
    ///
    /// The line keeps its completion symbol and gets the usual spent-time
    /// and marker cleanup. A final stage also completes the root task. Any
    /// other stage gets its planned successor inserted after the task's
    /// subtree, so existing children stay where they are.
    pub fn after_completion(&self, doc: &TextDocument, line_number: usize) -> EditPlan {
        let Some((line, state)) = self.line_state(doc, line_number) else {
            return EditPlan::empty();
        };
        let statuses = &self.config.task_statuses;
        if !extract_markers(line.text).is_some_and(|m| statuses.is_completed(m.status)) {
            return EditPlan::empty();
        }
        let CurrentStage::Stage { stage, sub_stage } = state.current else {
            return EditPlan::empty();
        };
        if state.is_inherited() {
            tracing::debug!(line = line_number, source = state.source_line, "Checked task has no markers of its own");
            return EditPlan::empty();
        }

        let final_stage = is_final_stage(stage, sub_stage, state.workflow);
        let completed = self.completed_text(doc, &line, &state, final_stage);
        let mut changes = Vec::with_capacity(2);

        let transition = match next_stage(stage, state.workflow, sub_stage) {
            Ok(transition) => transition,
            Err(error) => {
                tracing::debug!(line = line_number, error = %error, "Checked task has no successor");
                if final_stage {
                    changes.extend(self.root_completion(doc, line_number, &state.workflow.id));
                }
                if completed != line.text {
                    changes.push(Change::replace_line(&line, completed));
                }
                return EditPlan { changes, cursor: None };
            }
        };

        let indent = self.successor_indentation(doc, &line, &state, transition.stage);
        let new_task =
            self.generator().render_task(state.workflow, transition.stage, &indent, transition.sub_stage, false);
        let prefix_len = self.generator().task_prefix(&indent).len();
        let ending = doc.line_ending();
        let end = subtree_end(doc, &line);

        let offset = if end.number == line.number {
            let offset = completed.len() + ending.len() + prefix_len;
            changes.push(Change::replace_line(&line, format!("{completed}{ending}{new_task}")));
            offset
        } else {
            if completed != line.text {
                changes.push(Change::replace_line(&line, completed));
            }
            changes.push(Change::insert(end.to, format!("{ending}{new_task}")));
            ending.len() + prefix_len
        };
        let cursor = position_in_insert(&changes, changes.len() - 1, offset);

        tracing::debug!(
            workflow = %state.workflow.id,
            from = %stage.id,
            to = %transition.stage.id,
            after_line = end.number,
            "Planned transition for checked task"
        );
        EditPlan { changes, cursor: Some(cursor) }
    }

    /// Insert a child task at the current stage and sub-stage.
    pub fn add_child_with_same_stage(&self, doc: &TextDocument, line_number: usize) -> EditPlan {
        let Some((line, state)) = self.line_state(doc, line_number) else {
            return EditPlan::empty();
        };
        let CurrentStage::Stage { stage, sub_stage } = state.current else {
            return EditPlan::empty();
        };

        let child_indent = self.child_indentation(line.text);
        let new_task = self.generator().render_task(state.workflow, stage, &child_indent, sub_stage, false);
        self.insert_below(doc, &line, &child_indent, &new_task)
    }

    /// Insert an empty task at the same indentation.
    pub fn add_sibling(&self, doc: &TextDocument, line_number: usize) -> EditPlan {
        let Some(line) = self.line(doc, line_number) else {
            return EditPlan::empty();
        };
        let indent = indentation(line.text).to_string();
        let new_task = self.generator().render_plain(&indent);
        self.insert_below(doc, &line, &indent, &new_task)
    }

    /// Insert an empty task one level deeper.
    pub fn add_subtask(&self, doc: &TextDocument, line_number: usize) -> EditPlan {
        let Some(line) = self.line(doc, line_number) else {
            return EditPlan::empty();
        };
        let indent = self.child_indentation(line.text);
        let new_task = self.generator().render_plain(&indent);
        self.insert_below(doc, &line, &indent, &new_task)
    }

    /// Write a root task for `workflow_id` at the line's indentation.
    ///
    /// A blank line is replaced; any other line gets the root task below it.
    pub fn create_root(&self, doc: &TextDocument, line_number: usize, workflow_id: &str) -> EditPlan {
        let Some(line) = self.line(doc, line_number) else {
            return EditPlan::empty();
        };
        let Some(workflow) = self.workflow(workflow_id) else {
            return EditPlan::empty();
        };

        let indent = indentation(line.text).to_string();
        let root = self.generator().render_root(workflow, &indent);
        if !line.text.trim().is_empty() {
            return self.insert_below(doc, &line, &indent, &root);
        }

        let prefix_len = self.generator().task_prefix(&indent).len();
        let changes = vec![Change::replace_line(&line, root)];
        let cursor = position_in_insert(&changes, 0, prefix_len);
        EditPlan { changes, cursor: Some(cursor) }
    }

    /// Append a `#workflow/<id>` tag to a task without workflow markers.
    pub fn convert_to_root(&self, doc: &TextDocument, line_number: usize, workflow_id: &str) -> EditPlan {
        let Some(line) = self.line(doc, line_number) else {
            return EditPlan::empty();
        };
        let Some(workflow) = self.workflow(workflow_id) else {
            return EditPlan::empty();
        };
        match extract_markers(line.text) {
            Some(markers) if !markers.has_workflow_markers() => {}
            Some(_) => {
                tracing::debug!(line = line_number, "Task already carries workflow markers");
                return EditPlan::empty();
            }
            None => {
                tracing::debug!(line = line_number, "Only tasks can become workflow roots");
                return EditPlan::empty();
            }
        }

        let text = format!("{} {}", line.text.trim_end(), render_workflow_tag(&workflow.id));
        let changes = vec![Change::replace_line(&line, text.clone())];
        let cursor = position_in_insert(&changes, 0, text.len());
        EditPlan { changes, cursor: Some(cursor) }
    }

    fn generator(&self) -> TaskTextGenerator<'a> {
        TaskTextGenerator::new(self.config, self.clock)
    }

    fn line<'d>(&self, doc: &'d TextDocument, line_number: usize) -> Option<Line<'d>> {
        let line = doc.line(line_number);
        if line.is_none() {
            tracing::debug!(line = line_number, lines = doc.lines(), "Line out of range");
        }
        line
    }

    fn line_state<'d>(
        &self,
        doc: &'d TextDocument,
        line_number: usize,
    ) -> Option<(Line<'d>, ResolvedState<'a>)> {
        let line = self.line(doc, line_number)?;
        let state = resolve_line(doc, line_number, self.registry)?;
        Some((line, state))
    }

    fn workflow(&self, workflow_id: &str) -> Option<&'a WorkflowDefinition> {
        let workflow = self.registry.get(workflow_id);
        if workflow.is_none() {
            tracing::debug!(workflow = %workflow_id, "Unknown workflow");
        }
        workflow
    }

    fn child_indentation(&self, line_text: &str) -> String {
        format!("{}{}", indentation(line_text), self.config.indent.unit())
    }

    fn insert_below(&self, doc: &TextDocument, line: &Line<'_>, indent: &str, new_task: &str) -> EditPlan {
        let ending = doc.line_ending();
        let prefix_len = self.generator().task_prefix(indent).len();
        let changes = vec![Change::insert(line.to, format!("{ending}{new_task}"))];
        let cursor = position_in_insert(&changes, 0, ending.len() + prefix_len);
        EditPlan { changes, cursor: Some(cursor) }
    }

    /// Complete `line` and insert `target` at `target_sub` directly below it.
    ///
    /// `preceding` holds changes to lines above `line` that belong to the
    /// same batch.
    fn transition(
        &self,
        doc: &TextDocument,
        line: &Line<'_>,
        state: &ResolvedState<'a>,
        target: &'a WorkflowStage,
        target_sub: Option<&'a WorkflowSubStage>,
        mut changes: Vec<Change>,
    ) -> EditPlan {
        let new_indent = self.successor_indentation(doc, line, state, target);
        let completed = self.completed_text(doc, line, state, false);
        let new_task = self.generator().render_task(state.workflow, target, &new_indent, target_sub, false);
        let prefix_len = self.generator().task_prefix(&new_indent).len();
        let ending = doc.line_ending();

        changes.push(Change::replace_line(line, format!("{completed}{ending}{new_task}")));
        let cursor = position_in_insert(&changes, changes.len() - 1, completed.len() + ending.len() + prefix_len);

        tracing::debug!(
            workflow = %state.workflow.id,
            from = %state.stage_label(),
            to = %target.id,
            sub_stage = ?target_sub.map(|s| s.id.as_str()),
            "Planned stage transition"
        );
        EditPlan { changes, cursor: Some(cursor) }
    }

    /// Indentation for the task following `line` at `target`: the parent
    /// stage task's when a sub-stage task leaves its stage, else the line's.
    fn successor_indentation(
        &self,
        doc: &TextDocument,
        line: &Line<'_>,
        state: &ResolvedState<'_>,
        target: &WorkflowStage,
    ) -> String {
        if let CurrentStage::Stage { stage, sub_stage: Some(_) } = state.current {
            if target.id != stage.id {
                if let Some(parent) = parent_stage_task(doc, line.number, &stage.id) {
                    return indentation(parent.text).to_string();
                }
            }
        }
        indentation(line.text).to_string()
    }

    /// Change completing the workflow's root task, unless it already is.
    fn root_completion(&self, doc: &TextDocument, line_number: usize, workflow_id: &str) -> Option<Change> {
        let root = root_task(doc, line_number, workflow_id)?;
        let statuses = &self.config.task_statuses;
        if statuses.is_completed(extract_markers(root.text)?.status) {
            return None;
        }
        set_status(root.text, statuses.completed_symbol()).map(|text| Change::replace_line(&root, text))
    }

    /// Text of `line` once completed: status, spent time, timestamp and
    /// marker cleanup according to configuration.
    fn completed_text(&self, doc: &TextDocument, line: &Line<'_>, state: &ResolvedState<'_>, completing: bool) -> String {
        let settings = &self.config.workflow;
        let statuses = &self.config.task_statuses;
        let mut text = match extract_markers(line.text) {
            Some(markers) if statuses.is_completed(markers.status) => line.text.to_string(),
            _ => set_status(line.text, statuses.completed_symbol()).unwrap_or_else(|| line.text.to_string()),
        };

        let now = self.clock.now();
        if let Some((started, span)) = find_start_timestamp(&text, &settings.timestamp_format, now) {
            let spent = (now - started).num_seconds().max(0);

            let label = if !settings.calculate_spent_time {
                None
            } else if settings.calculate_full_spent_time && self.ends_workflow(state, completing) {
                let total = spent.saturating_add(recorded_spent_seconds(doc, line, &state.workflow.id));
                Some(format!(" (Total: {})", format_spent(total)))
            } else {
                Some(format!(" (⏱️ {})", format_spent(spent)))
            };

            let removed = settings.remove_timestamp_on_transition;
            if removed {
                text.replace_range(span.clone(), "");
            }
            if let Some(label) = label {
                let at = marker_offset(&text)
                    .unwrap_or_else(|| if removed { text.trim_end().len() } else { span.start });
                text.insert_str(at, &label);
            }
        }

        if settings.auto_remove_last_stage_marker {
            text = strip_markers(&text);
        }
        text
    }

    fn ends_workflow(&self, state: &ResolvedState<'_>, completing: bool) -> bool {
        match state.current {
            CurrentStage::Root => false,
            CurrentStage::Stage { stage, sub_stage } => {
                completing && is_final_stage(stage, sub_stage, state.workflow)
            }
        }
    }
}

/// Nearest ancestor that is a stage task for `stage_id` without a sub-stage.
fn parent_stage_task<'d>(doc: &'d TextDocument, line_number: usize, stage_id: &str) -> Option<Line<'d>> {
    ancestors(doc, line_number).find(|line| {
        extract_markers(line.text)
            .is_some_and(|m| m.stage_id.as_deref() == Some(stage_id) && m.sub_stage_id.is_none())
    })
}

/// Nearest ancestor that is the root task of `workflow_id`.
fn root_task<'d>(doc: &'d TextDocument, line_number: usize, workflow_id: &str) -> Option<Line<'d>> {
    ancestors(doc, line_number).find(|line| {
        extract_markers(line.text).is_some_and(|m| m.is_root() && m.workflow_id.as_deref() == Some(workflow_id))
    })
}

/// Last line of the subtree under `line`: the run of following lines
/// indented deeper than it, or `line` itself.
fn subtree_end<'d>(doc: &'d TextDocument, line: &Line<'d>) -> Line<'d> {
    let depth = indent_width(line.text);
    ((line.number + 1)..=doc.lines())
        .map_while(|number| doc.line(number))
        .take_while(|l| indent_width(l.text) > depth)
        .last()
        .unwrap_or(*line)
}

/// Start time and byte span (including the leading space) of the `🛫 <time>`
/// token in `text`.
fn find_start_timestamp(text: &str, format: &str, now: NaiveDateTime) -> Option<(NaiveDateTime, Range<usize>)> {
    let marker = text.find(START_MARKER)?;
    let after = text[marker + START_MARKER.len()..].trim_start();
    let (started, rest) = parse_timestamp(after, format, now)?;

    let start = text[..marker].trim_end().len();
    let end = text.len() - rest.len();
    Some((started, start..end))
}

/// Parse a timestamp at the start of `input`.
///
/// Formats without a time of day start at midnight; formats without a date
/// fall on the day of `now`.
fn parse_timestamp<'t>(input: &'t str, format: &str, now: NaiveDateTime) -> Option<(NaiveDateTime, &'t str)> {
    if let Ok(parsed) = NaiveDateTime::parse_and_remainder(input, format) {
        return Some(parsed);
    }
    if let Ok((date, rest)) = NaiveDate::parse_and_remainder(input, format) {
        return date.and_hms_opt(0, 0, 0).map(|start| (start, rest));
    }
    let (time, rest) = NaiveTime::parse_and_remainder(input, format).ok()?;
    Some((now.date().and_time(time), rest))
}

/// Seconds already recorded with `(⏱️ …)` on the workflow's tasks from the
/// root task down to `line`, counting only tasks not nested deeper than it.
fn recorded_spent_seconds(doc: &TextDocument, line: &Line<'_>, workflow_id: &str) -> i64 {
    let Some(root) = root_task(doc, line.number, workflow_id) else {
        return 0;
    };
    let depth = indent_width(line.text);

    (root.number..line.number)
        .filter_map(|number| doc.line(number))
        .filter(|l| indent_width(l.text) <= depth)
        .filter_map(|l| SPENT_TIME_REGEX.captures(l.text).and_then(|c| parse_spent(&c[1])))
        .fold(0, i64::saturating_add)
}

/// Parse `HH:MM:SS` or `MM:SS` into seconds. Values that overflow are
/// rejected.
fn parse_spent(value: &str) -> Option<i64> {
    let parts = value.split(':').map(str::parse::<i64>).collect::<Result<Vec<_>, _>>().ok()?;
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return None,
    };
    hours.checked_mul(3600)?.checked_add(minutes.checked_mul(60)?)?.checked_add(seconds)
}

fn format_spent(seconds: i64) -> String {
    format!("{:02}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}
