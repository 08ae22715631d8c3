//! Planned changes against recorded stack state

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single planned change to one logical resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action (`<kind>-<logical id>`)
    pub id: String,

    /// Kind of change
    pub action_type: ActionType,

    /// CloudFormation resource type (e.g. "AWS::EC2::VPC")
    pub resource_type: String,

    /// Logical ID inside the template
    pub logical_id: String,

    /// Human readable description
    pub description: String,

    /// Additional details (fingerprints, deletion policy, ...)
    pub details: BTreeMap<String, serde_json::Value>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        resource_type: impl Into<String>,
        logical_id: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let logical_id = logical_id.into();
        Self {
            id: format!("{}-{}", action_type, logical_id),
            description: format!("{} {} ({})", action_type, logical_id, resource_type),
            action_type,
            resource_type,
            logical_id,
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// Kind of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Resource is declared but not yet recorded
    Create,
    /// Resource is recorded with a different body
    Update,
    /// Resource is recorded but no longer declared
    Delete,
    /// Recorded body matches the declaration
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Outcome of applying a plan or tearing a stack down
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Operator-facing warnings (data loss, orphaned resources)
    pub warnings: Vec<String>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: String,
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

/// Ordered list of actions for one stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Stack the plan was computed for
    pub stack_name: String,

    /// Actions in logical ID order
    pub actions: Vec<Action>,

    /// Whether anything other than no-ops is planned
    pub has_changes: bool,
}

impl Plan {
    pub fn new(stack_name: impl Into<String>, mut actions: Vec<Action>) -> Self {
        actions.sort_by(|a, b| a.logical_id.cmp(&b.logical_id));
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            stack_name: stack_name.into(),
            actions,
            has_changes,
        }
    }

    pub fn empty(stack_name: impl Into<String>) -> Self {
        Self::new(stack_name, Vec::new())
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Counts per action type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}
