//! # Data mesh administration
//!
//! Bootstraps the mesh account and enables other accounts to take part in
//! it. Every step is a call into IAM, Lake Formation or the subscription
//! tracker; nothing is rolled back when a step fails, and re-running
//! [`DataMeshAdmin::initialize_mesh_account`] converges.

use anyhow::Result;
use aws_sdk_lakeformation::types::Permission as LfPermission;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::account::{AccountId, IdentityOperations, StsClient};
use crate::config::MeshConfig;
use crate::context::AwsContext;
use crate::error::MeshError;
use crate::iam::{IamClient, IamOperations, MeshRole, RoleTriple, TemplateConfig};
use crate::lakeformation::{
    DataResource, LakeFormationClient, LakeFormationOperations, PermissionGrant,
};
use crate::tracker::{SubscriberTracker, SubscriptionStore, TrackerEndpoints};

/// Everything a bootstrap run created or confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeshAccountSetup {
    pub manager: RoleTriple,
    pub producer_admin: RoleTriple,
    pub consumer_admin: RoleTriple,
    pub subscription_tracker: TrackerEndpoints,
}

/// Narrows [`DataMeshAdmin::list_data_access`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataAccessFilter {
    pub database_name: Option<String>,
    pub table_name: Option<String>,
    pub principal: Option<String>,
    pub granted_after: Option<DateTime<Utc>>,
    pub granted_before: Option<DateTime<Utc>>,
}

pub struct DataMeshAdmin<S, I, L, T> {
    config: MeshConfig,
    sts: S,
    iam: I,
    lake_formation: L,
    tracker: T,
}

impl DataMeshAdmin<StsClient, IamClient, LakeFormationClient, SubscriberTracker> {
    /// Admin operating with the context's credentials.
    pub fn from_context(ctx: &AwsContext, config: MeshConfig) -> Self {
        Self::with_clients(
            config,
            ctx.sts_client(),
            ctx.iam_client(),
            ctx.lake_formation_client(),
            ctx.subscriber_tracker(),
        )
    }
}

impl<S, I, L, T> DataMeshAdmin<S, I, L, T>
where
    S: IdentityOperations,
    I: IamOperations,
    L: LakeFormationOperations,
    T: SubscriptionStore,
{
    pub fn with_clients(config: MeshConfig, sts: S, iam: I, lake_formation: L, tracker: T) -> Self {
        Self {
            config,
            sts,
            iam,
            lake_formation,
            tracker,
        }
    }

    /// Sets up the caller's account as the data mesh account.
    ///
    /// Replaces the Lake Formation admin list with the Manager role and the
    /// caller. Two runs against the same account race on that write and the
    /// last one wins.
    #[instrument(skip(self))]
    pub async fn initialize_mesh_account(&self) -> Result<MeshAccountSetup> {
        let caller = self.sts.caller_identity().await?;
        let templates = TemplateConfig::for_session(&self.config, &caller.account);
        info!(account_id = %caller.account, "Bootstrapping data mesh account");

        let manager = self.iam.configure_role(MeshRole::Manager, &templates).await?;

        self.lake_formation
            .put_data_lake_settings(&[manager.role_arn.clone(), caller.arn.clone()])
            .await?;

        let producer_admin = self
            .iam
            .configure_role(MeshRole::ProducerAdmin, &templates)
            .await?;
        self.lake_formation
            .grant_permissions(
                &PermissionGrant::new(&producer_admin.role_arn, DataResource::Catalog)
                    .with_grant_option(LfPermission::CreateDatabase),
            )
            .await?;

        let consumer_admin = self
            .iam
            .configure_role(MeshRole::ConsumerAdmin, &templates)
            .await?;

        let subscription_tracker = self.tracker.initialize().await?;

        info!(account_id = %caller.account, "Data mesh account ready");
        Ok(MeshAccountSetup {
            manager,
            producer_admin,
            consumer_admin,
            subscription_tracker,
        })
    }

    /// Lets `account_id` assume the producer admin role.
    pub async fn enable_account_as_producer(&self, account_id: &str) -> Result<()> {
        self.enable_account(account_id, MeshRole::ProducerAdmin).await
    }

    /// Lets `account_id` assume the consumer admin role.
    pub async fn enable_account_as_consumer(&self, account_id: &str) -> Result<()> {
        self.enable_account(account_id, MeshRole::ConsumerAdmin).await
    }

    async fn enable_account(&self, account_id: &str, role: MeshRole) -> Result<()> {
        let account: AccountId = account_id.parse()?;
        let role_name = role.role_name();

        // the role only exists in the mesh account
        if !self.iam.role_exists(role_name).await? {
            return Err(MeshError::NotMeshAccount {
                role_name: role_name.to_string(),
            }
            .into());
        }

        self.iam.add_trust_to_role(&account, role_name).await?;
        info!(account_id = %account, role_name = %role_name, "Enabled account");
        Ok(())
    }

    pub async fn list_data_access(&self, filter: &DataAccessFilter) -> Result<Vec<PermissionGrant>> {
        debug!(?filter, "list_data_access requested");
        Err(MeshError::NotImplemented("list_data_access").into())
    }
}
