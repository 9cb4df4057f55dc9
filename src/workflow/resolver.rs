//! Workflow resolution from document text.
//!
//! Nothing is cached between calls: every action re-reads the markers of the
//! line and its indentation ancestors, so the document stays the only source
//! of truth under arbitrary manual edits.

use crate::core::{Line, TextDocument};

use super::definition::{WorkflowDefinition, WorkflowStage, WorkflowSubStage};
use super::markers::{extract_markers, indent_width, Markers};
use super::registry::WorkflowRegistry;

/// Position of a task inside its workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentStage<'a> {
    /// The root task that originates the workflow instance.
    Root,

    /// A stage task, optionally at a sub-stage.
    Stage { stage: &'a WorkflowStage, sub_stage: Option<&'a WorkflowSubStage> },
}

/// Workflow state reconstructed for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedState<'a> {
    /// Workflow the line belongs to
    pub workflow: &'a WorkflowDefinition,

    /// Root sentinel or current stage
    pub current: CurrentStage<'a>,

    /// Line the state was resolved for
    pub line_number: usize,

    /// Line whose markers were used
    pub source_line: usize,
}

impl<'a> ResolvedState<'a> {
    /// Check if the line is the workflow's root task.
    pub fn is_root_task(&self) -> bool {
        matches!(self.current, CurrentStage::Root)
    }

    /// Current stage, `None` for the root task.
    pub fn current_stage(&self) -> Option<&'a WorkflowStage> {
        match self.current {
            CurrentStage::Root => None,
            CurrentStage::Stage { stage, .. } => Some(stage),
        }
    }

    /// Current sub-stage, if any.
    pub fn current_sub_stage(&self) -> Option<&'a WorkflowSubStage> {
        match self.current {
            CurrentStage::Root => None,
            CurrentStage::Stage { sub_stage, .. } => sub_stage,
        }
    }

    /// Check if the state was inherited from an ancestor line.
    pub fn is_inherited(&self) -> bool {
        self.line_number != self.source_line
    }

    /// Stage id as written in markers, `root` for the root task.
    pub fn stage_label(&self) -> &'a str {
        self.current_stage().map_or("root", |s| s.id.as_str())
    }
}

/// Iterator over the indentation ancestors of a line, nearest first.
///
/// An earlier line is an ancestor when it is less indented than every line
/// already on the chain. Blank lines are skipped.
#[derive(Debug, Clone)]
pub struct Ancestors<'d> {
    doc: &'d TextDocument,
    next_line: usize,
    threshold: usize,
}

impl<'d> Iterator for Ancestors<'d> {
    type Item = Line<'d>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_line >= 1 && self.threshold > 0 {
            let line = self.doc.line(self.next_line)?;
            self.next_line -= 1;

            if line.text.trim().is_empty() {
                continue;
            }
            let width = indent_width(line.text);
            if width < self.threshold {
                self.threshold = width;
                return Some(line);
            }
        }
        None
    }
}

/// Walk the indentation ancestors of a 1-based line.
pub fn ancestors(doc: &TextDocument, line_number: usize) -> Ancestors<'_> {
    let threshold = doc.line(line_number).map_or(0, |line| indent_width(line.text));
    Ancestors { doc, next_line: line_number.saturating_sub(1), threshold }
}

/// Resolve the workflow state of `line_text` at `line_number`.
///
/// Returns `None` when the line is out of range, is not a task, has no
/// workflow lineage, or refers to a workflow, stage or sub-stage missing from
/// the registry.
pub fn resolve<'a>(
    line_text: &str,
    doc: &TextDocument,
    line_number: usize,
    registry: &'a WorkflowRegistry,
) -> Option<ResolvedState<'a>> {
    if line_number == 0 || line_number > doc.lines() {
        tracing::debug!(line = line_number, lines = doc.lines(), "Line out of range");
        return None;
    }

    let markers = extract_markers(line_text)?;
    if markers.has_workflow_markers() {
        return resolve_markers(&markers, doc, line_number, registry);
    }

    let (source, markers) = ancestors(doc, line_number).find_map(|line| {
        extract_markers(line.text)
            .filter(Markers::has_workflow_markers)
            .map(|markers| (line.number, markers))
    })?;

    let state = resolve_markers(&markers, doc, source, registry)?;
    Some(ResolvedState { line_number, ..state })
}

/// Resolve the line at `line_number` using the document's own text.
pub fn resolve_line<'a>(
    doc: &TextDocument,
    line_number: usize,
    registry: &'a WorkflowRegistry,
) -> Option<ResolvedState<'a>> {
    let line = doc.line(line_number)?;
    resolve(line.text, doc, line_number, registry)
}

fn resolve_markers<'a>(
    markers: &Markers,
    doc: &TextDocument,
    line_number: usize,
    registry: &'a WorkflowRegistry,
) -> Option<ResolvedState<'a>> {
    let workflow_id = match &markers.workflow_id {
        Some(id) => id.clone(),
        None => ancestor_marker(doc, line_number, |m| m.workflow_id.clone())?,
    };

    let Some(workflow) = registry.get(&workflow_id) else {
        tracing::debug!(workflow = %workflow_id, "Unknown workflow");
        return None;
    };

    if markers.is_root() {
        return Some(ResolvedState {
            workflow,
            current: CurrentStage::Root,
            line_number,
            source_line: line_number,
        });
    }

    let stage_id = match &markers.stage_id {
        Some(id) => id.clone(),
        None => ancestor_marker(doc, line_number, |m| m.stage_id.clone())?,
    };

    let Some(stage) = workflow.stage(&stage_id) else {
        tracing::debug!(workflow = %workflow.id, stage = %stage_id, "Unknown stage");
        return None;
    };

    let sub_stage = match &markers.sub_stage_id {
        None => None,
        Some(id) => {
            let Some(sub_stage) = stage.sub_stage(id) else {
                tracing::debug!(stage = %stage.id, sub_stage = %id, "Orphaned sub-stage marker");
                return None;
            };
            Some(sub_stage)
        }
    };

    Some(ResolvedState {
        workflow,
        current: CurrentStage::Stage { stage, sub_stage },
        line_number,
        source_line: line_number,
    })
}

/// First value `pick` yields from the markers of an indentation ancestor.
fn ancestor_marker<F>(doc: &TextDocument, line_number: usize, pick: F) -> Option<String>
where
    F: Fn(&Markers) -> Option<String>,
{
    ancestors(doc, line_number).find_map(|line| extract_markers(line.text).and_then(|m| pick(&m)))
}
