//! Bootstraps AWS accounts into a data mesh.
//!
//! A central mesh account hosts the `DataMeshManager`, `DataMeshAdminProducer`
//! and `DataMeshAdminConsumer` roles, administers the Lake Formation catalog
//! and tracks subscriptions in DynamoDB. Producer and consumer accounts are
//! enabled by trusting them on the matching admin role.
//!
//! [`admin::DataMeshAdmin`] and [`consumer::DataMeshConsumer`] depend on the
//! service traits ([`account::IdentityOperations`], [`iam::IamOperations`],
//! [`lakeformation::LakeFormationOperations`], [`tracker::SubscriptionStore`])
//! rather than on the SDK clients directly.

pub mod account;
pub mod admin;
pub mod command_line;
pub mod config;
pub mod constants;
pub mod consumer;
pub mod context;
pub mod dynamodb;
pub mod error;
pub mod iam;
pub mod lakeformation;
pub mod logging;
pub mod tracker;
pub mod utils;

pub use error::MeshError;

#[cfg(test)]
mod testing;
