//! CloudFormation provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("Template has no Resources section")]
    MissingResources,

    #[error("Resource {0} has no Type")]
    MissingType(String),

    #[error("Plan was computed for stack {plan}, not {desired}")]
    StackMismatch { plan: String, desired: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cloud error: {0}")]
    Cloud(#[from] techhealth_cloud::CloudError),
}

impl From<AwsError> for techhealth_cloud::CloudError {
    fn from(e: AwsError) -> Self {
        match e {
            AwsError::Cloud(inner) => inner,
            AwsError::Io(inner) => techhealth_cloud::CloudError::Io(inner),
            AwsError::Json(inner) => techhealth_cloud::CloudError::Json(inner),
            other => techhealth_cloud::CloudError::InvalidTemplate(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
