//! AWS account identifiers and caller identity

use crate::error::MeshError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tracing::{debug, info};

/// A 12-digit AWS account id.
///
/// Parsing is the only way to build one, so any `AccountId` in hand has
/// already been validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ARN of the account's root principal, used in trust policies.
    pub fn root_arn(&self) -> String {
        format!("arn:aws:iam::{}:root", self.0)
    }

    pub fn role_arn(&self, role_name: &str) -> String {
        format!("arn:aws:iam::{}:role/{}", self.0, role_name)
    }
}

impl FromStr for AccountId {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == 12 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(AccountId(s.to_string()))
        } else {
            Err(MeshError::InvalidAccountId(s.to_string()))
        }
    }
}

impl TryFrom<String> for AccountId {
    type Error = MeshError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the principal whose credentials are in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account: AccountId,
    pub arn: String,
    pub user_id: String,
}

/// Identity introspection, split out so orchestration can run against fakes.
pub trait IdentityOperations: Send + Sync {
    fn caller_identity(&self) -> impl Future<Output = Result<CallerIdentity>> + Send;
}

/// STS client wrapper.
#[derive(Debug, Clone)]
pub struct StsClient {
    client: aws_sdk_sts::Client,
}

impl StsClient {
    pub fn new(client: aws_sdk_sts::Client) -> Self {
        Self { client }
    }

    /// Calls `GetCallerIdentity`. Needs no permissions, so it doubles as a
    /// credentials check.
    pub async fn get_caller_identity(&self) -> Result<CallerIdentity> {
        let output = self
            .client
            .get_caller_identity()
            .send()
            .await
            .context("Failed to get AWS caller identity - check credentials")?;

        let account: AccountId = output
            .account()
            .ok_or(MeshError::MissingField("Account"))?
            .parse()?;
        let arn = output.arn().ok_or(MeshError::MissingField("Arn"))?;
        let user_id = output.user_id().unwrap_or_default();

        debug!(account_id = %account, arn = %arn, "Resolved caller identity");

        Ok(CallerIdentity {
            account,
            arn: arn.to_string(),
            user_id: user_id.to_string(),
        })
    }
}

impl IdentityOperations for StsClient {
    async fn caller_identity(&self) -> Result<CallerIdentity> {
        let identity = self.get_caller_identity().await?;
        info!(account_id = %identity.account, "Running as {}", identity.arn);
        Ok(identity)
    }
}
