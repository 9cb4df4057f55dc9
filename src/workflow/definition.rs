//! Workflow definition schema.
//!
//! Definitions are read from TOML configuration or YAML workflow files and
//! use the camelCase field names of the persisted settings format:
//!
//! ```yaml
//! id: review
//! name: Review
//! stages:
//!   - id: draft
//!     name: Draft
//!     type: linear
//!     next: edit
//!   - id: edit
//!     name: Edit
//!     type: cycle
//!     subStages:
//!       - { id: write, name: Write }
//!       - { id: proof, name: Proof }
//!     canProceedTo: [publish]
//!   - id: publish
//!     name: Publish
//!     type: terminal
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::markers::is_valid_marker_id;

/// A workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Identifier used in `#workflow/<id>` tags
    pub id: String,

    /// Display name
    pub name: String,

    /// What this workflow is for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Stages in positional order
    pub stages: Vec<WorkflowStage>,
}

/// One node of a workflow's stage graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStage {
    /// Identifier used in `[stage::<id>]` markers
    pub id: String,

    /// Display name, used as the generated task label
    pub name: String,

    /// Stage type and its type-specific fields
    #[serde(flatten)]
    pub kind: StageKind,
}

/// Stage type. Only cycle stages carry sub-stages and only non-terminal
/// stages carry successors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StageKind {
    /// Proceeds to a single successor.
    Linear {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next: Option<NextStage>,

        #[serde(default, rename = "canProceedTo", skip_serializing_if = "Vec::is_empty")]
        can_proceed_to: Vec<String>,
    },

    /// Repeats through ordered sub-stages before moving on.
    Cycle {
        #[serde(default, rename = "subStages", skip_serializing_if = "Option::is_none")]
        sub_stages: Option<Vec<WorkflowSubStage>>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        next: Option<NextStage>,

        #[serde(default, rename = "canProceedTo", skip_serializing_if = "Vec::is_empty")]
        can_proceed_to: Vec<String>,
    },

    /// Ends the workflow.
    Terminal,
}

/// A `next` declaration: a single stage id or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NextStage {
    One(String),
    Many(Vec<String>),
}

impl NextStage {
    /// The stage id a transition follows. Lists use their first entry.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::One(id) => Some(id.as_str()),
            Self::Many(ids) => ids.first().map(String::as_str),
        }
    }

    /// All referenced stage ids.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::One(id) => vec![id.as_str()],
            Self::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

/// An ordered position within a cycle stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSubStage {
    /// Identifier used in `[substage::<id>]` markers
    pub id: String,

    /// Display name
    pub name: String,
}

impl WorkflowSubStage {
    /// Create a sub-stage.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

impl WorkflowStage {
    /// Create a linear stage with no declared successor.
    pub fn linear(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: StageKind::Linear { next: None, can_proceed_to: Vec::new() },
        }
    }

    /// Create a cycle stage. An empty list means no sub-stages.
    pub fn cycle(
        id: impl Into<String>,
        name: impl Into<String>,
        sub_stages: Vec<WorkflowSubStage>,
    ) -> Self {
        let sub_stages = if sub_stages.is_empty() { None } else { Some(sub_stages) };
        Self {
            id: id.into(),
            name: name.into(),
            kind: StageKind::Cycle { sub_stages, next: None, can_proceed_to: Vec::new() },
        }
    }

    /// Create a terminal stage.
    pub fn terminal(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), kind: StageKind::Terminal }
    }

    /// Set `next`. Has no effect on terminal stages.
    pub fn with_next(mut self, stage_id: impl Into<String>) -> Self {
        match &mut self.kind {
            StageKind::Linear { next, .. } | StageKind::Cycle { next, .. } => {
                *next = Some(NextStage::One(stage_id.into()));
            }
            StageKind::Terminal => {}
        }
        self
    }

    /// Set `canProceedTo`. Has no effect on terminal stages.
    pub fn with_can_proceed_to<I, S>(mut self, stage_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match &mut self.kind {
            StageKind::Linear { can_proceed_to, .. } | StageKind::Cycle { can_proceed_to, .. } => {
                *can_proceed_to = stage_ids.into_iter().map(Into::into).collect();
            }
            StageKind::Terminal => {}
        }
        self
    }

    /// Check if this is a terminal stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, StageKind::Terminal)
    }

    /// Check if this is a cycle stage.
    pub fn is_cycle(&self) -> bool {
        matches!(self.kind, StageKind::Cycle { .. })
    }

    /// Type name as written in configuration.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            StageKind::Linear { .. } => "linear",
            StageKind::Cycle { .. } => "cycle",
            StageKind::Terminal => "terminal",
        }
    }

    /// Ordered sub-stages; empty unless this is a cycle stage with sub-stages.
    pub fn sub_stages(&self) -> &[WorkflowSubStage] {
        match &self.kind {
            StageKind::Cycle { sub_stages: Some(sub_stages), .. } => sub_stages,
            _ => &[],
        }
    }

    /// Look up a sub-stage by id.
    pub fn sub_stage(&self, id: &str) -> Option<&WorkflowSubStage> {
        self.sub_stages().iter().find(|s| s.id == id)
    }

    /// First sub-stage, if any.
    pub fn first_sub_stage(&self) -> Option<&WorkflowSubStage> {
        self.sub_stages().first()
    }

    /// Declared `canProceedTo` ids.
    pub fn can_proceed_to(&self) -> &[String] {
        match &self.kind {
            StageKind::Linear { can_proceed_to, .. } | StageKind::Cycle { can_proceed_to, .. } => {
                can_proceed_to
            }
            StageKind::Terminal => &[],
        }
    }

    /// Declared `next`.
    pub fn next(&self) -> Option<&NextStage> {
        match &self.kind {
            StageKind::Linear { next, .. } | StageKind::Cycle { next, .. } => next.as_ref(),
            StageKind::Terminal => None,
        }
    }

    /// The explicitly declared successor: `canProceedTo[0]`, else `next`.
    pub fn declared_successor(&self) -> Option<&str> {
        self.can_proceed_to()
            .first()
            .map(String::as_str)
            .or_else(|| self.next().and_then(NextStage::first))
    }
}

impl WorkflowDefinition {
    /// Create a workflow definition.
    pub fn new(id: impl Into<String>, name: impl Into<String>, stages: Vec<WorkflowStage>) -> Self {
        Self { id: id.into(), name: name.into(), description: None, stages }
    }

    /// Look up a stage by id.
    pub fn stage(&self, id: &str) -> Option<&WorkflowStage> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Position of a stage.
    pub fn stage_index(&self, id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id == id)
    }

    /// The stage a new workflow instance starts in.
    pub fn first_stage(&self) -> Option<&WorkflowStage> {
        self.stages.first()
    }

    /// Check the definition for structural errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::EmptyWorkflowId(self.name.clone()));
        }
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages(self.id.clone()));
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if stage.id.trim().is_empty() {
                return Err(ConfigError::EmptyStageId { workflow: self.id.clone() });
            }
            self.check_marker_id(&stage.id)?;
            if !seen.insert(stage.id.as_str()) {
                return Err(ConfigError::DuplicateStage {
                    workflow: self.id.clone(),
                    stage: stage.id.clone(),
                });
            }
        }

        for stage in &self.stages {
            if let StageKind::Cycle { sub_stages: Some(sub_stages), .. } = &stage.kind {
                if sub_stages.is_empty() {
                    return Err(ConfigError::EmptySubStages {
                        workflow: self.id.clone(),
                        stage: stage.id.clone(),
                    });
                }
                let mut seen_sub = HashSet::new();
                for sub_stage in sub_stages {
                    self.check_marker_id(&sub_stage.id)?;
                    if !seen_sub.insert(sub_stage.id.as_str()) {
                        return Err(ConfigError::DuplicateSubStage {
                            workflow: self.id.clone(),
                            stage: stage.id.clone(),
                            sub_stage: sub_stage.id.clone(),
                        });
                    }
                }
            }

            let references = stage
                .can_proceed_to()
                .iter()
                .map(String::as_str)
                .chain(stage.next().map(NextStage::ids).unwrap_or_default());
            for target in references {
                if !seen.contains(target) {
                    return Err(ConfigError::UnknownStageReference {
                        workflow: self.id.clone(),
                        stage: stage.id.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    fn check_marker_id(&self, id: &str) -> Result<(), ConfigError> {
        if is_valid_marker_id(id) {
            Ok(())
        } else {
            Err(ConfigError::InvalidMarkerId { workflow: self.id.clone(), id: id.to_string() })
        }
    }

    /// The default project-management workflow.
    pub fn project_workflow() -> Self {
        Self {
            id: "project_workflow".to_string(),
            name: "Project Workflow".to_string(),
            description: Some("Standard project management workflow".to_string()),
            stages: vec![
                WorkflowStage::linear("planning", "Planning").with_next("in_progress"),
                WorkflowStage::cycle(
                    "in_progress",
                    "In Progress",
                    vec![
                        WorkflowSubStage::new("development", "Development"),
                        WorkflowSubStage::new("testing", "Testing"),
                    ],
                )
                .with_can_proceed_to(["review", "cancelled"]),
                WorkflowStage::cycle("review", "Review", Vec::new())
                    .with_can_proceed_to(["in_progress", "completed"]),
                WorkflowStage::terminal("completed", "Completed"),
                WorkflowStage::terminal("cancelled", "Cancelled"),
            ],
        }
    }
}
