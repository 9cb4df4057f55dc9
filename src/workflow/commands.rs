//! Front-end adapter binding workflow actions to an editor.

use crate::core::{Clock, Config, EditError, Editor, SystemClock};

use super::error::ConfigError;
use super::menu::{MenuItem, WorkflowMenu};
use super::registry::WorkflowRegistry;
use super::resolver::resolve_line;
use super::synthesizer::Synthesizer;

/// Workflow commands registered against an editor.
///
/// Nothing is intercepted until [`install`](Self::install) succeeds, and
/// [`dispose`](Self::dispose) turns interception off again.
pub struct WorkflowCommands {
    config: Config,
    registry: WorkflowRegistry,
    installed: bool,
    clock: Box<dyn Clock>,
}

impl WorkflowCommands {
    /// Create commands over the inline definitions of `config`.
    pub fn new(config: Config) -> Self {
        let registry = config.registry();
        Self::with_registry(config, registry)
    }

    /// Create commands over an explicit registry.
    pub fn with_registry(config: Config, registry: WorkflowRegistry) -> Self {
        Self { config, registry, installed: false, clock: Box::new(SystemClock) }
    }

    /// Use `clock` for timestamps and spent time.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Validate configuration and start intercepting.
    ///
    /// Lints are logged as warnings. Commands stay inactive when workflows
    /// are disabled.
    pub fn install(&mut self) -> Result<(), ConfigError> {
        self.config.validate()?;
        for definition in self.registry.get_all() {
            definition.validate()?;
        }
        for lint in self.config.lints() {
            tracing::warn!(%lint, "Workflow configuration");
        }

        self.installed = self.config.workflow.enabled;
        tracing::debug!(
            workflows = self.registry.len(),
            active = self.installed,
            "Installed workflow commands"
        );
        Ok(())
    }

    /// Stop intercepting.
    pub fn dispose(&mut self) {
        self.installed = false;
    }

    /// Check if commands are installed and enabled.
    pub fn is_active(&self) -> bool {
        self.installed
    }

    /// Configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registry in use.
    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    /// Synthesizer bound to this configuration and clock.
    pub fn synthesizer(&self) -> Synthesizer<'_> {
        Synthesizer::new(&self.config, &self.registry).with_clock(self.clock.as_ref())
    }

    /// Handle Enter at the cursor.
    ///
    /// Returns a menu only when the cursor is at the end of a task line whose
    /// own markers resolve; otherwise the caller performs its default Enter.
    pub fn handle_enter<E: Editor>(&self, editor: &E) -> Option<WorkflowMenu> {
        if !self.installed {
            return None;
        }

        let doc = editor.document();
        let line = doc.line_at(editor.cursor())?;
        if editor.cursor() != line.to {
            return None;
        }

        let state = resolve_line(doc, line.number, &self.registry)?;
        if state.is_inherited() {
            return None;
        }
        Some(WorkflowMenu::build(&state))
    }

    /// Open the workflow menu for the line at the cursor.
    ///
    /// Unmarked tasks nested under a workflow task get the menu of that task.
    /// Lines outside any workflow get the actions that create a root task.
    pub fn open_menu<E: Editor>(&self, editor: &E) -> Option<WorkflowMenu> {
        if !self.installed {
            return None;
        }

        let doc = editor.document();
        let line = doc.line_at(editor.cursor())?;
        if let Some(state) = resolve_line(doc, line.number, &self.registry) {
            return Some(WorkflowMenu::build(&state));
        }

        let menu = WorkflowMenu::for_unresolved(line.number, line.text, &self.registry);
        (!menu.is_empty()).then_some(menu)
    }

    /// React to the user checking off the task on `line_number`.
    ///
    /// Inserts the planned successor after the task's subtree, or completes
    /// the root task when the stage was the last one. Returns `Ok(false)` when
    /// the line is not a checked workflow task.
    pub fn handle_completion<E: Editor>(&self, editor: &mut E, line_number: usize) -> Result<bool, EditError> {
        if !self.installed {
            return Ok(false);
        }

        let plan = self.synthesizer().after_completion(editor.document(), line_number);
        if plan.is_empty() {
            return Ok(false);
        }

        editor.dispatch(&plan)?;
        tracing::info!(line = line_number, changes = plan.len(), "Advanced checked workflow task");
        Ok(true)
    }

    /// Perform a menu item and dispatch its edits as one transaction.
    ///
    /// Returns `Ok(false)` when the action had nothing to do.
    pub fn select<E: Editor>(
        &self,
        editor: &mut E,
        menu: &WorkflowMenu,
        item: &MenuItem,
    ) -> Result<bool, EditError> {
        let plan = self.synthesizer().synthesize(editor.document(), menu.line_number, &item.action);
        if plan.is_empty() {
            tracing::debug!(line = menu.line_number, action = %item.action, "Nothing to apply");
            return Ok(false);
        }

        editor.dispatch(&plan)?;
        tracing::info!(
            line = menu.line_number,
            action = %item.action,
            changes = plan.len(),
            "Applied workflow action"
        );
        Ok(true)
    }
}
