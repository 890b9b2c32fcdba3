use anyhow::{Context, Result};
use aws_sdk_iam::Client;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, info};

use crate::account::AccountId;
use crate::error::MeshError;
use crate::iam::policy::{
    add_account_trust, assume_role_policy, decode_policy_document, group_assume_role_policy,
    trusted_principals, TemplateConfig,
};
use crate::iam::{MeshRole, RoleTriple};

/// IAM keeps at most this many versions of a managed policy.
const MAX_POLICY_VERSIONS: usize = 5;

/// A managed policy version as far as pruning is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVersionInfo {
    pub version_id: String,
    pub is_default: bool,
    pub created_secs: i64,
}

/// Picks the version to delete so a new one can be created, if any.
///
/// The default version is never chosen; among the rest the oldest goes.
pub fn version_to_prune(versions: &[PolicyVersionInfo]) -> Option<&str> {
    if versions.len() < MAX_POLICY_VERSIONS {
        return None;
    }
    versions
        .iter()
        .filter(|v| !v.is_default)
        .min_by_key(|v| v.created_secs)
        .map(|v| v.version_id.as_str())
}

/// IAM operations the mesh orchestration depends on.
pub trait IamOperations: Send + Sync {
    /// Ensures the role, its managed policy, user and group exist and are
    /// wired together. Safe to call repeatedly.
    fn configure_role(
        &self,
        role: MeshRole,
        config: &TemplateConfig,
    ) -> impl Future<Output = Result<RoleTriple>> + Send;

    /// Whether `role_name` exists in the caller's account.
    fn role_exists(&self, role_name: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Lets principals of `account` assume `role_name`. Existing trust is
    /// kept; trusting an account twice is a no-op.
    fn add_trust_to_role(
        &self,
        account: &AccountId,
        role_name: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// IAM client wrapper.
#[derive(Debug, Clone)]
pub struct IamClient {
    client: Client,
}

impl IamClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn configure_role(
        &self,
        role: MeshRole,
        config: &TemplateConfig,
    ) -> Result<RoleTriple> {
        let account = &config.data_mesh_account_id;
        let document = role.template().render(config).to_string();

        let policy_arn = self
            .ensure_policy(account, role.policy_name(), role.policy_description(), &document)
            .await?;

        let role_arn = self
            .ensure_role(
                role.role_name(),
                role.role_description(),
                &assume_role_policy(account),
            )
            .await?;

        self.client
            .attach_role_policy()
            .role_name(role.role_name())
            .policy_arn(&policy_arn)
            .send()
            .await
            .with_context(|| format!("Failed to attach {} to {}", policy_arn, role.role_name()))?;
        debug!(role_name = role.role_name(), policy_arn = %policy_arn, "Policy attached");

        let group_name = role.group_name();
        let group_arn = self.ensure_group(&group_name).await?;
        self.client
            .put_group_policy()
            .group_name(&group_name)
            .policy_name(role.group_policy_name())
            .policy_document(group_assume_role_policy(&role_arn))
            .send()
            .await
            .with_context(|| format!("Failed to put assume-role policy on group {}", group_name))?;

        let user_name = role.user_name();
        let user_arn = self.ensure_user(&user_name).await?;
        self.client
            .add_user_to_group()
            .group_name(&group_name)
            .user_name(&user_name)
            .send()
            .await
            .with_context(|| format!("Failed to add {} to {}", user_name, group_name))?;

        info!(role_arn = %role_arn, "Configured {} role", role.role_name());

        Ok(RoleTriple {
            role_arn,
            user_arn,
            group_arn,
        })
    }

    /// Creates the managed policy, or makes `document` its new default
    /// version when it already exists.
    async fn ensure_policy(
        &self,
        account: &AccountId,
        policy_name: &str,
        description: &str,
        document: &str,
    ) -> Result<String> {
        let policy_arn = format!("arn:aws:iam::{}:policy/{}", account, policy_name);

        match self.client.get_policy().policy_arn(&policy_arn).send().await {
            Ok(_) => {
                if let Some(version_id) = self.version_to_prune(&policy_arn).await? {
                    self.client
                        .delete_policy_version()
                        .policy_arn(&policy_arn)
                        .version_id(&version_id)
                        .send()
                        .await
                        .with_context(|| format!("Failed to prune {} of {}", version_id, policy_name))?;
                    debug!(policy_arn = %policy_arn, version_id = %version_id, "Pruned policy version");
                }

                self.client
                    .create_policy_version()
                    .policy_arn(&policy_arn)
                    .policy_document(document)
                    .set_as_default(true)
                    .send()
                    .await
                    .with_context(|| format!("Failed to update policy {}", policy_name))?;
                info!(policy_arn = %policy_arn, "Updated policy");
            }
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_entity_exception()) => {
                self.client
                    .create_policy()
                    .policy_name(policy_name)
                    .description(description)
                    .policy_document(document)
                    .send()
                    .await
                    .with_context(|| format!("Failed to create policy {}", policy_name))?;
                info!(policy_arn = %policy_arn, "Created policy");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to look up policy {}", policy_name))
            }
        }

        Ok(policy_arn)
    }

    async fn version_to_prune(&self, policy_arn: &str) -> Result<Option<String>> {
        let output = self
            .client
            .list_policy_versions()
            .policy_arn(policy_arn)
            .send()
            .await
            .with_context(|| format!("Failed to list versions of {}", policy_arn))?;

        let versions: Vec<PolicyVersionInfo> = output
            .versions()
            .iter()
            .filter_map(|v| {
                Some(PolicyVersionInfo {
                    version_id: v.version_id()?.to_string(),
                    is_default: v.is_default_version(),
                    created_secs: v.create_date().map(|d| d.secs()).unwrap_or_default(),
                })
            })
            .collect();

        Ok(version_to_prune(&versions).map(str::to_string))
    }

    async fn ensure_role(
        &self,
        role_name: &str,
        description: &str,
        trust_policy: &str,
    ) -> Result<String> {
        let existing = match self.client.get_role().role_name(role_name).send().await {
            Ok(output) => output.role().map(|r| r.arn().to_string()),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_entity_exception()) => {
                None
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to look up role {}", role_name)),
        };
        if let Some(arn) = existing {
            debug!(role_name = %role_name, "Role exists");
            return Ok(arn);
        }

        let output = self
            .client
            .create_role()
            .role_name(role_name)
            .description(description)
            .assume_role_policy_document(trust_policy)
            .send()
            .await
            .with_context(|| format!("Failed to create role {}", role_name))?;
        info!(role_name = %role_name, "Created role");

        output
            .role()
            .map(|r| r.arn().to_string())
            .ok_or_else(|| MeshError::MissingField("Role").into())
    }

    async fn ensure_group(&self, group_name: &str) -> Result<String> {
        let existing = match self.client.get_group().group_name(group_name).send().await {
            Ok(output) => output.group().map(|g| g.arn().to_string()),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_entity_exception()) => {
                None
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to look up group {}", group_name))
            }
        };
        if let Some(arn) = existing {
            return Ok(arn);
        }

        let output = self
            .client
            .create_group()
            .group_name(group_name)
            .send()
            .await
            .with_context(|| format!("Failed to create group {}", group_name))?;
        info!(group_name = %group_name, "Created group");

        output
            .group()
            .map(|g| g.arn().to_string())
            .ok_or_else(|| MeshError::MissingField("Group").into())
    }

    async fn ensure_user(&self, user_name: &str) -> Result<String> {
        let existing = match self.client.get_user().user_name(user_name).send().await {
            Ok(output) => output.user().map(|u| u.arn().to_string()),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_entity_exception()) => {
                None
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to look up user {}", user_name)),
        };
        if let Some(arn) = existing {
            return Ok(arn);
        }

        let output = self
            .client
            .create_user()
            .user_name(user_name)
            .send()
            .await
            .with_context(|| format!("Failed to create user {}", user_name))?;
        info!(user_name = %user_name, "Created user");

        output
            .user()
            .map(|u| u.arn().to_string())
            .ok_or_else(|| MeshError::MissingField("User").into())
    }

    pub async fn role_exists(&self, role_name: &str) -> Result<bool> {
        match self.client.get_role().role_name(role_name).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_entity_exception()) => {
                Ok(false)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to look up role {}", role_name)),
        }
    }

    async fn trust_policy(&self, role_name: &str) -> Result<String> {
        let output = self
            .client
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .with_context(|| format!("Failed to look up role {}", role_name))?;

        let raw = output
            .role()
            .and_then(|r| r.assume_role_policy_document())
            .ok_or(MeshError::MissingField("AssumeRolePolicyDocument"))?;
        decode_policy_document(raw)
    }

    /// Principals currently allowed to assume `role_name`.
    pub async fn trusted_principals(&self, role_name: &str) -> Result<Vec<String>> {
        let document = self.trust_policy(role_name).await?;
        let policy: Value = serde_json::from_str(&document)?;
        Ok(trusted_principals(&policy))
    }

    pub async fn add_trust_to_role(&self, account: &AccountId, role_name: &str) -> Result<()> {
        let document = self.trust_policy(role_name).await?;

        let Some(updated) = add_account_trust(&document, account)? else {
            info!(account_id = %account, role_name = %role_name, "Account already trusted");
            return Ok(());
        };

        self.client
            .update_assume_role_policy()
            .role_name(role_name)
            .policy_document(updated)
            .send()
            .await
            .with_context(|| format!("Failed to update trust policy of {}", role_name))?;

        info!(account_id = %account, role_name = %role_name, "Added trust for account");
        Ok(())
    }
}

impl IamOperations for IamClient {
    async fn configure_role(&self, role: MeshRole, config: &TemplateConfig) -> Result<RoleTriple> {
        IamClient::configure_role(self, role, config).await
    }

    async fn role_exists(&self, role_name: &str) -> Result<bool> {
        IamClient::role_exists(self, role_name).await
    }

    async fn add_trust_to_role(&self, account: &AccountId, role_name: &str) -> Result<()> {
        IamClient::add_trust_to_role(self, account, role_name).await
    }
}
