//! Workflow action menu.

use serde::Serialize;

use super::error::PlanError;
use super::markers::extract_markers;
use super::planner::{bubble_targets, next_stage};
use super::registry::WorkflowRegistry;
use super::resolver::{CurrentStage, ResolvedState};
use super::synthesizer::WorkflowAction;

/// One selectable entry of the workflow menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    /// Label shown to the user
    pub title: String,

    /// Action performed on selection
    pub action: WorkflowAction,
}

impl MenuItem {
    fn new(title: impl Into<String>, action: WorkflowAction) -> Self {
        Self { title: title.into(), action }
    }
}

/// Actions available on a resolved workflow line.
///
/// Dropping a menu never touches the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowMenu {
    /// Line the menu was built for
    pub line_number: usize,

    /// Items in display order
    pub items: Vec<MenuItem>,
}

impl WorkflowMenu {
    /// Build the menu for a resolved line.
    pub fn build(state: &ResolvedState<'_>) -> Self {
        let mut items = Vec::new();

        match state.current {
            CurrentStage::Root => items.push(MenuItem::new("Start workflow", WorkflowAction::Start)),
            CurrentStage::Stage { stage, sub_stage } => {
                match next_stage(stage, state.workflow, sub_stage) {
                    Ok(transition) => {
                        let name = &transition.stage.name;
                        let title = match transition.sub_stage {
                            _ if transition.is_same_position(stage, sub_stage) => match sub_stage {
                                Some(current_sub) => format!("Continue {name} ({})", current_sub.name),
                                None => format!("Continue {name}"),
                            },
                            Some(next_sub) if transition.stage.id == stage.id => {
                                format!("Move to {name} ({})", next_sub.name)
                            }
                            _ => format!("Move to {name}"),
                        };
                        items.push(MenuItem::new(
                            title,
                            WorkflowAction::MoveTo {
                                stage_id: transition.next_stage_id().to_string(),
                                sub_stage_id: transition.next_sub_stage_id().map(str::to_string),
                            },
                        ));
                    }
                    Err(PlanError::TerminalStage(_) | PlanError::NoSuccessor(_)) => {
                        items.push(MenuItem::new("Complete workflow", WorkflowAction::Complete));
                    }
                    Err(error) => {
                        tracing::debug!(error = %error, "No transition available");
                    }
                }

                if stage.is_cycle() && sub_stage.is_some() {
                    for target in bubble_targets(stage, state.workflow) {
                        items.push(MenuItem::new(
                            format!("Complete substage and move to {}", target.name),
                            WorkflowAction::CompleteSubstageAndMoveTo { stage_id: target.id.clone() },
                        ));
                    }
                }

                items.push(MenuItem::new(
                    "Add child task with same stage",
                    WorkflowAction::AddChildWithSameStage,
                ));
            }
        }

        items.push(MenuItem::new("Add new task", WorkflowAction::AddSibling));
        items.push(MenuItem::new("Add new sub-task", WorkflowAction::AddSubtask));

        Self { line_number: state.line_number, items }
    }

    /// Build the menu for a line outside any workflow.
    ///
    /// Every configured workflow can be started at the line. A task without
    /// workflow markers can also become the root itself.
    pub fn for_unresolved(line_number: usize, line_text: &str, registry: &WorkflowRegistry) -> Self {
        let convertible = extract_markers(line_text).is_some_and(|m| !m.has_workflow_markers());
        let mut items = Vec::with_capacity(registry.len() * 2);

        for workflow in registry.get_all() {
            if convertible {
                items.push(MenuItem::new(
                    format!("Add as {} workflow root", workflow.name),
                    WorkflowAction::ConvertToRoot { workflow_id: workflow.id.clone() },
                ));
            }
            items.push(MenuItem::new(
                format!("Start {} workflow here", workflow.name),
                WorkflowAction::CreateRoot { workflow_id: workflow.id.clone() },
            ));
        }

        Self { line_number, items }
    }

    /// Find an item by its action id.
    pub fn find(&self, id: &str) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.action.id() == id)
    }

    /// Get an item by its position.
    pub fn get(&self, index: usize) -> Option<&MenuItem> {
        self.items.get(index)
    }

    /// Items that advance the workflow.
    pub fn progression_items(&self) -> impl Iterator<Item = &MenuItem> {
        self.items.iter().filter(|item| item.action.is_progression())
    }

    /// Check if the menu has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TextDocument;
    use crate::workflow::{resolve_line, WorkflowDefinition, WorkflowRegistry, WorkflowStage, WorkflowSubStage};

    fn registry() -> WorkflowRegistry {
        WorkflowRegistry::new([WorkflowDefinition::new(
            "review",
            "Review",
            vec![
                WorkflowStage::linear("draft", "Draft").with_next("edit"),
                WorkflowStage::cycle(
                    "edit",
                    "Edit",
                    vec![WorkflowSubStage::new("write", "Write"), WorkflowSubStage::new("proof", "Proof")],
                )
                .with_can_proceed_to(["publish", "draft"]),
                WorkflowStage::terminal("publish", "Publish"),
            ],
        )])
    }

    fn menu_for(text: &str, line_number: usize) -> WorkflowMenu {
        let registry = registry();
        let doc = TextDocument::new(text);
        let state = resolve_line(&doc, line_number, &registry).unwrap();
        WorkflowMenu::build(&state)
    }

    fn titles(menu: &WorkflowMenu) -> Vec<&str> {
        menu.items.iter().map(|item| item.title.as_str()).collect()
    }

    #[test]
    fn test_root_menu() {
        let menu = menu_for("- [ ] Article #workflow/review", 1);
        assert_eq!(titles(&menu), vec!["Start workflow", "Add new task", "Add new sub-task"]);
    }

    #[test]
    fn test_linear_stage_menu() {
        let menu = menu_for("- [ ] Article #workflow/review\n\t- [ ] Draft [stage::draft]", 2);

        assert_eq!(
            titles(&menu),
            vec!["Move to Edit", "Add child task with same stage", "Add new task", "Add new sub-task"]
        );
        assert_eq!(menu.line_number, 2);
    }

    #[test]
    fn test_cycle_sub_stage_menu() {
        let text = "- [ ] Article #workflow/review\n\t- [ ] Edit [stage::edit]\n\t\t- [ ] Edit (Write) [substage::write]";
        let menu = menu_for(text, 3);

        assert_eq!(
            titles(&menu),
            vec![
                "Move to Edit (Proof)",
                "Complete substage and move to Publish",
                "Complete substage and move to Draft",
                "Add child task with same stage",
                "Add new task",
                "Add new sub-task",
            ]
        );
        assert_eq!(
            menu.find("bubble:publish").map(|item| &item.action),
            Some(&WorkflowAction::CompleteSubstageAndMoveTo { stage_id: "publish".to_string() })
        );
    }

    #[test]
    fn test_terminal_menu_offers_only_completion() {
        let menu = menu_for("- [ ] Article #workflow/review\n\t- [ ] Publish [stage::publish]", 2);

        let progression: Vec<&MenuItem> = menu.progression_items().collect();
        assert_eq!(progression.len(), 1);
        assert_eq!(progression[0].title, "Complete workflow");
        assert_eq!(progression[0].action, WorkflowAction::Complete);
    }

    #[test]
    fn test_self_loop_is_offered_as_continue() {
        let registry = WorkflowRegistry::new([WorkflowDefinition::new(
            "loop",
            "Loop",
            vec![
                WorkflowStage::cycle("iterate", "Iterate", Vec::new()).with_can_proceed_to(["iterate", "done"]),
                WorkflowStage::terminal("done", "Done"),
            ],
        )]);
        let doc = TextDocument::new("- [ ] Job #workflow/loop\n\t- [ ] Iterate [stage::iterate]");
        let state = resolve_line(&doc, 2, &registry).unwrap();

        let menu = WorkflowMenu::build(&state);
        assert_eq!(menu.items[0].title, "Continue Iterate");
        assert_eq!(menu.find("move:iterate").map(|item| item.title.as_str()), Some("Continue Iterate"));
    }

    #[test]
    fn test_unresolved_plain_task_can_become_root() {
        let menu = WorkflowMenu::for_unresolved(4, "- [ ] Buy milk", &registry());

        assert_eq!(titles(&menu), vec!["Add as Review workflow root", "Start Review workflow here"]);
        assert_eq!(menu.line_number, 4);
        assert!(menu.find("root:review").is_some());
        assert!(menu.progression_items().next().is_none());
    }

    #[test]
    fn test_unresolved_text_line_offers_new_root() {
        let menu = WorkflowMenu::for_unresolved(1, "Some notes", &registry());
        assert_eq!(titles(&menu), vec!["Start Review workflow here"]);
        assert_eq!(
            menu.items[0].action,
            WorkflowAction::CreateRoot { workflow_id: "review".to_string() }
        );

        let stale = WorkflowMenu::for_unresolved(1, "- [ ] Old #workflow/gone", &registry());
        assert_eq!(titles(&stale), vec!["Start Review workflow here"]);

        assert!(WorkflowMenu::for_unresolved(1, "", &WorkflowRegistry::default()).is_empty());
    }

    #[test]
    fn test_menu_serializes_action_ids() {
        let menu = menu_for("- [ ] Article #workflow/review", 1);
        let json = serde_json::to_value(&menu).unwrap();

        assert_eq!(json["items"][0]["action"], "start");
        assert_eq!(json["line_number"], 1);
    }
}
