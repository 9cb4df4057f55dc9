//! # Stageline
//!
//! Multi-stage task workflows embedded in markdown outlines.
//!
//! A workflow is declared once in configuration and attached to a task with a
//! `#workflow/<id>` tag. Stage tasks carry plain-text markers, so the
//! document itself is the only state:
//!
//! ```text
//! - [ ] Write the release notes #workflow/project_workflow
//!     - [x] Planning [stage::planning]
//!     - [ ] In Progress (Development) [stage::in_progress] [substage::development]
//! ```
//!
//! ## Features
//!
//! - **Resolution**: Any task line resolves to its workflow, stage and
//!   sub-stage by walking indentation ancestors
//! - **Transitions**: Linear, cycle and terminal stages with ordered sub-stages
//! - **Atomic edits**: Every action yields one batch of line changes
//! - **Spent time**: Optional start timestamps and time tracking
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the actions available on line 2
//! stageline menu notes.md --line 2
//!
//! # Advance the workflow
//! stageline apply notes.md --line 2 --action next
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::redundant_clone)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::format_push_string)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

pub mod core;
pub mod workflow;

// Re-export commonly used types
pub use crate::core::{BufferEditor, Config, EditPlan, Editor, TextDocument};
pub use workflow::{
    resolve, MenuItem, ResolvedState, Synthesizer, WorkflowAction, WorkflowCommands,
    WorkflowDefinition, WorkflowMenu, WorkflowRegistry,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "stageline";
