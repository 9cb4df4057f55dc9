//! Workflow error types.

use thiserror::Error;

/// Structural errors in workflow configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Workflow has an empty id.
    #[error("Workflow '{0}' has an empty id")]
    EmptyWorkflowId(String),

    /// Two workflows share an id.
    #[error("Workflow id '{0}' is defined more than once")]
    DuplicateWorkflow(String),

    /// Workflow has no stages.
    #[error("Workflow '{0}' must have at least one stage")]
    NoStages(String),

    /// Stage has an empty id.
    #[error("Workflow '{workflow}' has a stage with an empty id")]
    EmptyStageId { workflow: String },

    /// Two stages share an id.
    #[error("Workflow '{workflow}' defines stage '{stage}' more than once")]
    DuplicateStage { workflow: String, stage: String },

    /// A cycle stage declares an empty sub-stage list.
    #[error("Stage '{stage}' in workflow '{workflow}' declares an empty subStages list")]
    EmptySubStages { workflow: String, stage: String },

    /// A stage or sub-stage id cannot be written as a marker and read back.
    #[error("Workflow '{workflow}' uses id '{id}', which must not contain '.', whitespace or brackets")]
    InvalidMarkerId { workflow: String, id: String },

    /// Two sub-stages of one stage share an id.
    #[error("Stage '{stage}' in workflow '{workflow}' defines sub-stage '{sub_stage}' more than once")]
    DuplicateSubStage { workflow: String, stage: String, sub_stage: String },

    /// A successor reference names a stage that does not exist.
    #[error("Stage '{stage}' in workflow '{workflow}' refers to unknown stage '{target}'")]
    UnknownStageReference { workflow: String, stage: String, target: String },
}

/// Errors from the transition planner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Terminal stages have no successor; they are completed instead.
    #[error("Stage '{0}' is terminal and has no successor")]
    TerminalStage(String),

    /// No successor is declared and no stage follows positionally.
    #[error("Stage '{0}' has no successor stage")]
    NoSuccessor(String),

    /// The declared successor does not exist in the workflow.
    #[error("Stage '{from}' proceeds to unknown stage '{target}'")]
    UnknownStage { from: String, target: String },
}

/// A workflow action id that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown workflow action '{0}'")]
pub struct UnknownAction(pub String);
