//! Multi-stage task workflows inside outline documents.
//!
//! A workflow is a small state machine of stages attached to a root task:
//!
//! ```text
//! - [ ] Launch #workflow/project_workflow
//!     - [x] Planning [stage::planning]
//!     - [ ] In Progress (Development) [stage::in_progress] [substage::development]
//! ```
//!
//! ## Pipeline
//!
//! Each action runs once, front to back, and keeps no state:
//!
//! - `resolver` - rebuilds the workflow position of a line from its markers
//!   and indentation ancestors
//! - `planner` - computes the next stage or sub-stage
//! - `generator` - renders the new task line
//! - `synthesizer` - turns a transition into one atomic batch of line edits
//! - `menu` / `commands` - the actions offered to the user and their dispatch

mod commands;
mod definition;
mod error;
mod generator;
mod loader;
mod markers;
mod menu;
mod planner;
mod registry;
mod resolver;
mod synthesizer;

pub use commands::WorkflowCommands;
pub use definition::{NextStage, StageKind, WorkflowDefinition, WorkflowStage, WorkflowSubStage};
pub use error::{ConfigError, PlanError, UnknownAction};
pub use generator::TaskTextGenerator;
pub use loader::{discover_workflows, parse_workflow, parse_workflow_str};
pub use markers::{
    extract_markers, indent_width, indentation, is_task_line, is_valid_marker_id, marker_offset,
    render_markers, render_workflow_tag, replace_markers, set_status, strip_markers, Markers,
};
pub use menu::{MenuItem, WorkflowMenu};
pub use planner::{bubble_targets, is_final_stage, lint_workflow, next_stage, Transition, WorkflowLint};
pub use registry::WorkflowRegistry;
pub use resolver::{ancestors, resolve, resolve_line, Ancestors, CurrentStage, ResolvedState};
pub use synthesizer::{Synthesizer, WorkflowAction};
