//! Template to resource set conversion

use crate::error::{AwsError, Result};
use sha2::{Digest, Sha256};
use techhealth_cloud::{DeletionPolicy, ResourceConfig, ResourceSet, ResourceState, StackState};

/// Resource types whose deletion destroys stored data
pub const DATA_BEARING_TYPES: &[&str] = &["AWS::RDS::DBInstance", "AWS::RDS::DBCluster"];

pub fn holds_data(resource_type: &str) -> bool {
    DATA_BEARING_TYPES.contains(&resource_type)
}

/// Recorded resources whose data is gone once the stack is destroyed
pub fn data_loss_hazards(stack: &StackState) -> Vec<&ResourceState> {
    stack
        .iter()
        .map(|(_, resource)| resource)
        .filter(|r| r.deletion_policy == DeletionPolicy::Delete && holds_data(&r.resource_type))
        .collect()
}

/// SHA-256 of the serialized resource body
///
/// Object keys serialize in sorted order, so equal bodies always produce
/// equal digests.
pub fn fingerprint(body: &serde_json::Value) -> Result<String> {
    let bytes = serde_json::to_vec(body)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn deletion_policy(body: &serde_json::Value) -> DeletionPolicy {
    match body.get("DeletionPolicy").and_then(|v| v.as_str()) {
        Some("Retain") | Some("RetainExceptOnCreate") => DeletionPolicy::Retain,
        Some("Snapshot") => DeletionPolicy::Snapshot,
        _ => DeletionPolicy::Delete,
    }
}

/// Build the desired resource set from a rendered template
pub fn resource_set(stack_name: &str, template: serde_json::Value) -> Result<ResourceSet> {
    let resources = template
        .get("Resources")
        .and_then(|r| r.as_object())
        .ok_or(AwsError::MissingResources)?;

    let mut set = ResourceSet::new(stack_name);
    for (logical_id, body) in resources {
        let resource_type = body
            .get("Type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| AwsError::MissingType(logical_id.clone()))?;

        set.add(ResourceConfig {
            logical_id: logical_id.clone(),
            resource_type: resource_type.to_string(),
            fingerprint: fingerprint(body)?,
            deletion_policy: deletion_policy(body),
            body: body.clone(),
        });
    }

    tracing::debug!(
        "Built resource set for {} with {} resources",
        stack_name,
        set.len()
    );
    set.template = template;
    Ok(set)
}
