//! In-memory stand-ins for the AWS-backed operations.
//!
//! Each fake keeps its state behind an `Arc<Mutex<_>>` so a test can hand a
//! clone to the code under test and inspect the same state afterwards.

use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::account::{AccountId, CallerIdentity, IdentityOperations};
use crate::iam::policy::{add_account_trust, assume_role_policy, trusted_principals};
use crate::iam::{IamOperations, MeshRole, RoleTriple, TemplateConfig};
use crate::lakeformation::{LakeFormationOperations, PermissionGrant};
use crate::tracker::{Subscription, SubscriptionRequest, SubscriptionStore, TrackerEndpoints};

pub const MESH_ACCOUNT: &str = "111111111111";
pub const PRODUCER_ACCOUNT: &str = "222222222222";
pub const CONSUMER_ACCOUNT: &str = "333333333333";

pub fn account(id: &str) -> AccountId {
    id.parse().unwrap()
}

#[derive(Debug, Clone)]
pub struct FakeSts {
    identity: CallerIdentity,
}

impl FakeSts {
    pub fn new(account_id: &str) -> Self {
        Self {
            identity: CallerIdentity {
                account: account(account_id),
                arn: format!("arn:aws:iam::{}:user/admin", account_id),
                user_id: "AIDAEXAMPLE".into(),
            },
        }
    }

    pub fn with_arn(mut self, arn: &str) -> Self {
        self.identity.arn = arn.to_string();
        self
    }

    pub fn caller_arn(&self) -> &str {
        &self.identity.arn
    }
}

impl IdentityOperations for FakeSts {
    async fn caller_identity(&self) -> Result<CallerIdentity> {
        Ok(self.identity.clone())
    }
}

#[derive(Debug, Default)]
pub struct IamState {
    pub roles: HashMap<String, RoleTriple>,
    /// Versions created per managed policy name.
    pub policy_versions: HashMap<String, usize>,
    pub attachments: HashSet<(String, String)>,
    pub trust_policies: HashMap<String, String>,
    pub trust_updates: usize,
    pub fail_on_role: Option<MeshRole>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeIam {
    pub state: Arc<Mutex<IamState>>,
}

impl FakeIam {
    pub fn failing_on(role: MeshRole) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().fail_on_role = Some(role);
        fake
    }

    pub fn trusted_principals(&self, role_name: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .trust_policies
            .get(role_name)
            .map(|doc| trusted_principals(&serde_json::from_str(doc).unwrap()))
            .unwrap_or_default()
    }
}

impl IamOperations for FakeIam {
    async fn configure_role(&self, role: MeshRole, config: &TemplateConfig) -> Result<RoleTriple> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_role == Some(role) {
            return Err(anyhow!("AccessDenied: cannot create {}", role.role_name()));
        }

        let account = &config.data_mesh_account_id;
        *state
            .policy_versions
            .entry(role.policy_name().to_string())
            .or_default() += 1;
        state
            .attachments
            .insert((role.role_name().to_string(), role.policy_name().to_string()));
        state
            .trust_policies
            .entry(role.role_name().to_string())
            .or_insert_with(|| assume_role_policy(account));

        let triple = state
            .roles
            .entry(role.role_name().to_string())
            .or_insert_with(|| RoleTriple {
                role_arn: account.role_arn(role.role_name()),
                user_arn: format!("arn:aws:iam::{}:user/{}", account, role.user_name()),
                group_arn: format!("arn:aws:iam::{}:group/{}", account, role.group_name()),
            });
        Ok(triple.clone())
    }

    async fn role_exists(&self, role_name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().roles.contains_key(role_name))
    }

    async fn add_trust_to_role(&self, account: &AccountId, role_name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let document = state
            .trust_policies
            .get(role_name)
            .ok_or_else(|| anyhow!("NoSuchEntity: role {}", role_name))?;

        if let Some(updated) = add_account_trust(document, account)? {
            state.trust_policies.insert(role_name.to_string(), updated);
            state.trust_updates += 1;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LakeFormationState {
    pub admins: Vec<String>,
    pub create_table_defaults_cleared: bool,
    pub grants: Vec<PermissionGrant>,
    pub tables: HashSet<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeLakeFormation {
    pub state: Arc<Mutex<LakeFormationState>>,
}

impl FakeLakeFormation {
    pub fn with_admins(admins: &[&str]) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().admins = admins.iter().map(|a| a.to_string()).collect();
        fake
    }

    pub fn with_table(self, database: &str, table: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .tables
            .insert((database.to_string(), table.to_string()));
        self
    }

    pub fn admins(&self) -> Vec<String> {
        self.state.lock().unwrap().admins.clone()
    }
}

impl LakeFormationOperations for FakeLakeFormation {
    async fn put_data_lake_settings(&self, admins: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.admins = admins.to_vec();
        state.create_table_defaults_cleared = true;
        Ok(())
    }

    async fn grant_permissions(&self, grant: &PermissionGrant) -> Result<()> {
        self.state.lock().unwrap().grants.push(grant.clone());
        Ok(())
    }

    async fn table_exists(&self, database: &str, table: &str) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tables
            .contains(&(database.to_string(), table.to_string())))
    }
}

#[derive(Debug, Default)]
pub struct TrackerState {
    pub initialized: usize,
    pub subscriptions: HashMap<String, Subscription>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeTracker {
    pub state: Arc<Mutex<TrackerState>>,
}

impl FakeTracker {
    pub fn subscription_count(&self) -> usize {
        self.state.lock().unwrap().subscriptions.len()
    }
}

impl SubscriptionStore for FakeTracker {
    async fn initialize(&self) -> Result<TrackerEndpoints> {
        self.state.lock().unwrap().initialized += 1;
        Ok(TrackerEndpoints::new(
            crate::constants::SUBSCRIPTIONS_TABLE_NAME,
            None,
            "us-east-1",
        ))
    }

    async fn create_subscription_request(
        &self,
        request: SubscriptionRequest,
    ) -> Result<Subscription> {
        let subscription = Subscription::pending(request);
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .insert(subscription.subscription_id.clone(), subscription.clone());
        Ok(subscription)
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .get(subscription_id)
            .cloned())
    }
}
