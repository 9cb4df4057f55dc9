//! Core types and functionality for Stageline.
//!
//! This module contains the pieces the workflow engine runs on: the
//! line-indexed document, the editor it dispatches through, the clock used
//! for timestamps, and configuration.

mod clock;
mod config;
mod document;
mod editor;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    Config, IndentConfig, TaskStatusConfig, WorkflowConfig, CONFIG_ENV_VAR, LOCAL_CONFIG_FILE,
};
pub use document::{position_in_insert, Change, EditError, EditPlan, Line, TextDocument};
pub use editor::{BufferEditor, Editor};
