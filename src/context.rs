//! Shared AWS configuration context
//!
//! The SDK configuration is loaded once per session and every service client
//! is built from it, so no client handles are shared implicitly between
//! callers.

use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;
use tracing::info;

use crate::account::StsClient;
use crate::config::MeshConfig;
use crate::dynamodb::DynamoDb;
use crate::iam::IamClient;
use crate::lakeformation::LakeFormationClient;
use crate::tracker::SubscriberTracker;

#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
    region: String,
}

impl AwsContext {
    /// Loads credentials and settings from the environment, config files and
    /// instance roles for `region`.
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            config: Arc::new(config),
            region: region.to_string(),
        }
    }

    pub async fn from_config(config: &MeshConfig) -> Self {
        Self::new(&config.region).await
    }

    /// A context whose credentials come from assuming `role_arn` with the
    /// current credentials.
    pub async fn assume_role(&self, role_arn: &str, session_name: &str) -> Self {
        info!(role_arn = %role_arn, session_name = %session_name, "Assuming role");

        let provider = AssumeRoleProvider::builder(role_arn)
            .session_name(session_name)
            .region(Region::new(self.region.clone()))
            .configure(&self.config)
            .build()
            .await;

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(provider)
            .load()
            .await;

        Self {
            config: Arc::new(config),
            region: self.region.clone(),
        }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn sts_client(&self) -> StsClient {
        StsClient::new(aws_sdk_sts::Client::new(self.sdk_config()))
    }

    pub fn iam_client(&self) -> IamClient {
        IamClient::new(aws_sdk_iam::Client::new(self.sdk_config()))
    }

    pub fn lake_formation_client(&self) -> LakeFormationClient {
        LakeFormationClient::new(aws_sdk_lakeformation::Client::new(self.sdk_config()))
    }

    pub fn dynamodb(&self) -> DynamoDb {
        DynamoDb::new(self.sdk_config())
    }

    pub fn subscriber_tracker(&self) -> SubscriberTracker {
        SubscriberTracker::new(self.dynamodb(), &self.region)
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
