//! Read-only lookup of workflow definitions by id.

use super::definition::WorkflowDefinition;

/// Registry of configured workflow definitions.
///
/// Built once from configuration and never mutated while a transition is
/// computed. When two definitions share an id the later one wins, so
/// discovered workflow files override inline configuration.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRegistry {
    workflows: Vec<WorkflowDefinition>,
}

impl WorkflowRegistry {
    /// Create a registry from definitions.
    pub fn new(definitions: impl IntoIterator<Item = WorkflowDefinition>) -> Self {
        let mut registry = Self::default();
        for definition in definitions {
            registry.add(definition);
        }
        registry
    }

    /// Add a definition, replacing any existing one with the same id.
    pub fn add(&mut self, definition: WorkflowDefinition) {
        if let Some(existing) = self.workflows.iter_mut().find(|w| w.id == definition.id) {
            tracing::debug!(workflow = %definition.id, "Replacing workflow definition");
            *existing = definition;
        } else {
            self.workflows.push(definition);
        }
    }

    /// Get a workflow by its id.
    pub fn get(&self, id: &str) -> Option<&WorkflowDefinition> {
        self.workflows.iter().find(|w| w.id == id)
    }

    /// Get all workflows in registration order.
    pub fn get_all(&self) -> &[WorkflowDefinition] {
        &self.workflows
    }

    /// Get total number of workflows.
    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}
