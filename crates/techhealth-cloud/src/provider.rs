//! Provider trait definition

use crate::action::{ApplyResult, Plan};
use crate::error::Result;
use crate::state::StackState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provider abstraction
///
/// A provider owns the recorded state of the stacks it deployed and knows
/// how to turn a desired [`ResourceSet`] into a [`Plan`].
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g. "cloudformation")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Recorded state of one stack
    async fn get_state(&self, stack_name: &str) -> Result<StackState>;

    /// Calculate the diff between desired and recorded state
    async fn plan(&self, desired: &ResourceSet) -> Result<Plan>;

    /// Apply the planned actions
    async fn apply(&self, desired: &ResourceSet, plan: &Plan) -> Result<ApplyResult>;

    /// Tear down every resource recorded for the stack
    async fn destroy_all(&self, stack_name: &str) -> Result<ApplyResult>;
}

/// What happens to a resource when the stack is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeletionPolicy {
    #[default]
    Delete,
    Retain,
    Snapshot,
}

impl std::fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletionPolicy::Delete => write!(f, "Delete"),
            DeletionPolicy::Retain => write!(f, "Retain"),
            DeletionPolicy::Snapshot => write!(f, "Snapshot"),
        }
    }
}

/// Desired resources of one stack, keyed by logical ID
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    pub stack_name: String,

    /// Rendered document the resources came from
    pub template: serde_json::Value,

    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ResourceSet {
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            ..Self::default()
        }
    }

    pub fn add(&mut self, resource: ResourceConfig) {
        self.resources.insert(resource.logical_id.clone(), resource);
    }

    pub fn get(&self, logical_id: &str) -> Option<&ResourceConfig> {
        self.resources.get(logical_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// One declared resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Logical ID inside the template
    pub logical_id: String,

    /// CloudFormation resource type
    pub resource_type: String,

    /// Digest of the resource body, used to detect drift between deploys
    pub fingerprint: String,

    pub deletion_policy: DeletionPolicy,

    /// Resource body as rendered
    pub body: serde_json::Value,
}
