//! # IAM Module
//!
//! Roles, users, groups and managed policies for the data mesh account.
//!
//! Every mesh role comes with a user and a group: the user is a member of the
//! group, and the group may assume the role. Policies are rendered from
//! templates in [`policy`] and attached to the role.

mod client;
pub mod policy;
mod role;

pub use client::{version_to_prune, IamClient, IamOperations, PolicyVersionInfo};
pub use policy::{PolicyTemplate, TemplateConfig};
pub use role::{MeshRole, RoleTriple};
