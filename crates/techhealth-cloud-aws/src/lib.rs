//! CloudFormation provider for TechHealth stacks
//!
//! This crate implements the CloudProvider trait on top of a synthesized
//! CloudFormation template and the local state store. Deploying records a
//! fingerprint of every resource body, so re-deploying an unchanged
//! description plans no changes.
//!
//! # Example
//!
//! ```ignore
//! use techhealth_cloud::CloudProvider;
//! use techhealth_cloud_aws::{CloudFormationProvider, resource_set};
//!
//! let provider = CloudFormationProvider::new(".", ".techhealth/out");
//! let desired = resource_set("TechhealthMigrationStack", template)?;
//!
//! let plan = provider.plan(&desired).await?;
//! if plan.has_changes {
//!     provider.apply(&desired, &plan).await?;
//! }
//! ```

pub mod error;
pub mod provider;
pub mod template;

pub use error::{AwsError, Result};
pub use provider::CloudFormationProvider;
pub use template::{DATA_BEARING_TYPES, data_loss_hazards, fingerprint, holds_data, resource_set};
