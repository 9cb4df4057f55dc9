//! Transition planning over a workflow's stage graph.
//!
//! These are pure functions of the definition and the current position; they
//! never read or write the document.

use std::fmt;

use super::definition::{NextStage, WorkflowDefinition, WorkflowStage, WorkflowSubStage};
use super::error::PlanError;

/// Target of a planned transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<'a> {
    /// Stage to move to
    pub stage: &'a WorkflowStage,

    /// Sub-stage to move to, if the stage has sub-stages
    pub sub_stage: Option<&'a WorkflowSubStage>,
}

impl<'a> Transition<'a> {
    /// Id of the target stage.
    pub fn next_stage_id(&self) -> &'a str {
        &self.stage.id
    }

    /// Id of the target sub-stage.
    pub fn next_sub_stage_id(&self) -> Option<&'a str> {
        self.sub_stage.map(|s| s.id.as_str())
    }

    /// Check if the transition stays on `stage` at `sub_stage`.
    pub fn is_same_position(&self, stage: &WorkflowStage, sub_stage: Option<&WorkflowSubStage>) -> bool {
        self.stage.id == stage.id && self.next_sub_stage_id() == sub_stage.map(|s| s.id.as_str())
    }

    fn entering(stage: &'a WorkflowStage) -> Self {
        Self { stage, sub_stage: stage.first_sub_stage() }
    }
}

/// Compute the position following `current` at `current_sub_stage`.
///
/// Sub-stages advance by position without wrapping; the last sub-stage
/// falls through to the stage successor.
pub fn next_stage<'a>(
    current: &'a WorkflowStage,
    workflow: &'a WorkflowDefinition,
    current_sub_stage: Option<&WorkflowSubStage>,
) -> Result<Transition<'a>, PlanError> {
    if current.is_terminal() {
        return Err(PlanError::TerminalStage(current.id.clone()));
    }

    if let Some(sub_stage) = current_sub_stage {
        let sub_stages = current.sub_stages();
        if let Some(index) = sub_stages.iter().position(|s| s.id == sub_stage.id) {
            if let Some(next) = sub_stages.get(index + 1) {
                return Ok(Transition { stage: current, sub_stage: Some(next) });
            }
        }
    }

    if let Some(target) = current.declared_successor() {
        return workflow.stage(target).map(Transition::entering).ok_or_else(|| {
            PlanError::UnknownStage { from: current.id.clone(), target: target.to_string() }
        });
    }

    positional_successor(current, workflow)
        .map(Transition::entering)
        .ok_or_else(|| PlanError::NoSuccessor(current.id.clone()))
}

/// Candidate main stages a sub-stage task can bubble up to.
///
/// All of `canProceedTo` when declared, else the first `next`, else the
/// positional successor. Duplicates and unknown ids are dropped.
pub fn bubble_targets<'a>(stage: &WorkflowStage, workflow: &'a WorkflowDefinition) -> Vec<&'a WorkflowStage> {
    if stage.is_terminal() {
        return Vec::new();
    }

    let ids: Vec<&str> = if !stage.can_proceed_to().is_empty() {
        stage.can_proceed_to().iter().map(String::as_str).collect()
    } else if let Some(next) = stage.next().and_then(NextStage::first) {
        vec![next]
    } else {
        return positional_successor(stage, workflow).into_iter().collect();
    };

    let mut targets: Vec<&WorkflowStage> = Vec::with_capacity(ids.len());
    for id in ids {
        match workflow.stage(id) {
            Some(target) if !targets.iter().any(|t| t.id == target.id) => targets.push(target),
            Some(_) => {}
            None => tracing::debug!(stage = %stage.id, target = %id, "Skipping unknown bubble target"),
        }
    }
    targets
}

/// Check if completing `stage` at `sub_stage` ends the workflow.
pub fn is_final_stage(
    stage: &WorkflowStage,
    sub_stage: Option<&WorkflowSubStage>,
    workflow: &WorkflowDefinition,
) -> bool {
    matches!(
        next_stage(stage, workflow, sub_stage),
        Err(PlanError::TerminalStage(_) | PlanError::NoSuccessor(_))
    )
}

fn positional_successor<'a>(
    stage: &WorkflowStage,
    workflow: &'a WorkflowDefinition,
) -> Option<&'a WorkflowStage> {
    let index = workflow.stage_index(&stage.id)?;
    workflow.stages.get(index + 1)
}

/// A non-fatal configuration warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowLint {
    /// `next` names a different stage than `canProceedTo[0]`, which wins.
    NextDisagrees { workflow: String, stage: String, can_proceed_to: String, next: String },

    /// A non-terminal stage has no successor and is treated as terminal.
    DeadEnd { workflow: String, stage: String },
}

impl fmt::Display for WorkflowLint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NextDisagrees { workflow, stage, can_proceed_to, next } => write!(
                f,
                "{workflow}/{stage}: next '{next}' disagrees with canProceedTo '{can_proceed_to}'; \
                 canProceedTo is used"
            ),
            Self::DeadEnd { workflow, stage } => write!(
                f,
                "{workflow}/{stage}: non-terminal stage has no successor and will be completed"
            ),
        }
    }
}

/// Collect configuration warnings for a definition.
pub fn lint_workflow(workflow: &WorkflowDefinition) -> Vec<WorkflowLint> {
    let mut lints = Vec::new();

    for stage in &workflow.stages {
        if stage.is_terminal() {
            continue;
        }

        if let (Some(first), Some(next)) =
            (stage.can_proceed_to().first(), stage.next().and_then(NextStage::first))
        {
            if first != next {
                lints.push(WorkflowLint::NextDisagrees {
                    workflow: workflow.id.clone(),
                    stage: stage.id.clone(),
                    can_proceed_to: first.clone(),
                    next: next.to_string(),
                });
            }
        }

        if stage.declared_successor().is_none() && positional_successor(stage, workflow).is_none() {
            lints.push(WorkflowLint::DeadEnd {
                workflow: workflow.id.clone(),
                stage: stage.id.clone(),
            });
        }
    }

    lints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review() -> WorkflowDefinition {
        WorkflowDefinition::new(
            "review",
            "Review",
            vec![
                WorkflowStage::linear("draft", "Draft").with_next("edit"),
                WorkflowStage::cycle(
                    "edit",
                    "Edit",
                    vec![
                        WorkflowSubStage::new("a", "A"),
                        WorkflowSubStage::new("b", "B"),
                        WorkflowSubStage::new("c", "C"),
                    ],
                )
                .with_can_proceed_to(["publish", "draft", "publish"]),
                WorkflowStage::linear("publish", "Publish"),
                WorkflowStage::terminal("done", "Done"),
            ],
        )
    }

    #[test]
    fn test_terminal_stage_has_no_successor() {
        let workflow = review();
        let done = workflow.stage("done").unwrap();

        assert_eq!(
            next_stage(done, &workflow, None),
            Err(PlanError::TerminalStage("done".to_string()))
        );
    }

    #[test]
    fn test_sub_stages_advance_by_position() {
        let workflow = review();
        let edit = workflow.stage("edit").unwrap();

        let from_a = next_stage(edit, &workflow, edit.sub_stage("a")).unwrap();
        assert_eq!(from_a.next_stage_id(), "edit");
        assert_eq!(from_a.next_sub_stage_id(), Some("b"));

        let from_b = next_stage(edit, &workflow, edit.sub_stage("b")).unwrap();
        assert_eq!(from_b.next_sub_stage_id(), Some("c"));
    }

    #[test]
    fn test_last_sub_stage_never_wraps() {
        let workflow = review();
        let edit = workflow.stage("edit").unwrap();

        let from_c = next_stage(edit, &workflow, edit.sub_stage("c")).unwrap();
        assert_eq!(from_c.next_stage_id(), "publish");
        assert_eq!(from_c.next_sub_stage_id(), None);
    }

    #[test]
    fn test_next_stage_enters_first_sub_stage() {
        let workflow = review();
        let draft = workflow.stage("draft").unwrap();

        let transition = next_stage(draft, &workflow, None).unwrap();
        assert_eq!(transition.next_stage_id(), "edit");
        assert_eq!(transition.next_sub_stage_id(), Some("a"));
    }

    #[test]
    fn test_positional_fallback() {
        let workflow = review();
        let publish = workflow.stage("publish").unwrap();

        assert_eq!(next_stage(publish, &workflow, None).unwrap().next_stage_id(), "done");
    }

    #[test]
    fn test_last_stage_without_successor() {
        let workflow = WorkflowDefinition::new(
            "wf",
            "Workflow",
            vec![WorkflowStage::linear("only", "Only")],
        );
        let only = workflow.stage("only").unwrap();

        assert_eq!(next_stage(only, &workflow, None), Err(PlanError::NoSuccessor("only".to_string())));
        assert!(is_final_stage(only, None, &workflow));
    }

    #[test]
    fn test_unknown_declared_successor() {
        let workflow = WorkflowDefinition::new(
            "wf",
            "Workflow",
            vec![WorkflowStage::linear("a", "A").with_next("gone"), WorkflowStage::terminal("b", "B")],
        );
        let a = workflow.stage("a").unwrap();

        assert_eq!(
            next_stage(a, &workflow, None),
            Err(PlanError::UnknownStage { from: "a".to_string(), target: "gone".to_string() })
        );
    }

    #[test]
    fn test_bubble_targets_are_deduplicated() {
        let workflow = review();
        let edit = workflow.stage("edit").unwrap();

        let ids: Vec<&str> = bubble_targets(edit, &workflow).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["publish", "draft"]);
    }

    #[test]
    fn test_bubble_targets_fall_back_to_position() {
        let workflow = WorkflowDefinition::new(
            "wf",
            "Workflow",
            vec![
                WorkflowStage::cycle("loop", "Loop", vec![WorkflowSubStage::new("x", "X")]),
                WorkflowStage::terminal("end", "End"),
            ],
        );
        let stage = workflow.stage("loop").unwrap();

        let targets = bubble_targets(stage, &workflow);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, "end");
    }

    #[test]
    fn test_is_final_stage() {
        let workflow = review();
        let edit = workflow.stage("edit").unwrap();

        assert!(is_final_stage(workflow.stage("done").unwrap(), None, &workflow));
        assert!(!is_final_stage(edit, edit.sub_stage("c"), &workflow));
    }

    #[test]
    fn test_lint_reports_disagreement_and_dead_ends() {
        let workflow = WorkflowDefinition::new(
            "wf",
            "Workflow",
            vec![
                WorkflowStage::linear("a", "A").with_next("b").with_can_proceed_to(["c"]),
                WorkflowStage::terminal("b", "B"),
                WorkflowStage::linear("c", "C"),
            ],
        );

        let lints = lint_workflow(&workflow);
        assert_eq!(lints.len(), 2);
        assert!(matches!(&lints[0], WorkflowLint::NextDisagrees { next, .. } if next == "b"));
        assert!(matches!(&lints[1], WorkflowLint::DeadEnd { stage, .. } if stage == "c"));
        assert!(lints[0].to_string().contains("canProceedTo is used"));
    }

    #[test]
    fn test_default_workflow_is_lint_free() {
        assert!(lint_workflow(&WorkflowDefinition::project_workflow()).is_empty());
    }
}
