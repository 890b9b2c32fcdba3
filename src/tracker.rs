//! Subscription tracking backed by DynamoDB.
//!
//! A subscription records a consumer's request for access to tables a
//! producer published into the mesh. Records are created `PENDING`; what
//! happens to them afterwards is up to whoever reviews the requests.

use anyhow::Result;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::account::AccountId;
use crate::constants::{SUBSCRIPTIONS_TABLE_NAME, SUBSCRIPTION_ID_KEY};
use crate::dynamodb::{DynamoDb, Item, Table};
use crate::error::MeshError;

pub const STATUS_PENDING: &str = "PENDING";

/// Table-level permissions a consumer may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TablePermission {
    Select,
    Insert,
    Delete,
    Describe,
    Alter,
    Drop,
    All,
}

impl TablePermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            TablePermission::Select => "SELECT",
            TablePermission::Insert => "INSERT",
            TablePermission::Delete => "DELETE",
            TablePermission::Describe => "DESCRIBE",
            TablePermission::Alter => "ALTER",
            TablePermission::Drop => "DROP",
            TablePermission::All => "ALL",
        }
    }
}

impl FromStr for TablePermission {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SELECT" => Ok(TablePermission::Select),
            "INSERT" => Ok(TablePermission::Insert),
            "DELETE" => Ok(TablePermission::Delete),
            "DESCRIBE" => Ok(TablePermission::Describe),
            "ALTER" => Ok(TablePermission::Alter),
            "DROP" => Ok(TablePermission::Drop),
            "ALL" => Ok(TablePermission::All),
            _ => Err(MeshError::InvalidPermission(s.to_string())),
        }
    }
}

impl fmt::Display for TablePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a consumer asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub owner_account_id: AccountId,
    pub database_name: String,
    pub tables: Vec<String>,
    pub permissions: Vec<TablePermission>,
    pub requesting_principal: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subscription {
    pub subscription_id: String,
    pub owner_account_id: AccountId,
    pub database_name: String,
    pub tables: Vec<String>,
    pub requested_permissions: Vec<TablePermission>,
    pub requesting_principal: String,
    pub status: String,
    /// RFC 3339
    pub created_at: String,
}

impl Subscription {
    /// A new pending subscription with a fresh id.
    pub fn pending(request: SubscriptionRequest) -> Self {
        Self {
            subscription_id: Uuid::new_v4().to_string(),
            owner_account_id: request.owner_account_id,
            database_name: request.database_name,
            tables: request.tables,
            requested_permissions: request.permissions,
            requesting_principal: request.requesting_principal,
            status: STATUS_PENDING.to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// How to reach the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrackerEndpoints {
    pub table_name: String,
    pub table_arn: Option<String>,
    pub region: String,
    pub endpoint: String,
}

impl TrackerEndpoints {
    pub fn new(table_name: &str, table_arn: Option<String>, region: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            table_arn,
            region: region.to_string(),
            endpoint: format!("https://dynamodb.{}.amazonaws.com", region),
        }
    }
}

/// Subscription storage the mesh operations depend on.
pub trait SubscriptionStore: Send + Sync {
    /// Makes sure the store exists and reports where it is.
    fn initialize(&self) -> impl Future<Output = Result<TrackerEndpoints>> + Send;

    fn create_subscription_request(
        &self,
        request: SubscriptionRequest,
    ) -> impl Future<Output = Result<Subscription>> + Send;

    fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> impl Future<Output = Result<Option<Subscription>>> + Send;
}

#[derive(Debug, Clone)]
pub struct SubscriberTracker {
    ddb: DynamoDb,
    region: String,
    table_name: String,
}

impl SubscriberTracker {
    pub fn new(ddb: DynamoDb, region: &str) -> Self {
        Self {
            ddb,
            region: region.to_string(),
            table_name: SUBSCRIPTIONS_TABLE_NAME.to_string(),
        }
    }

    fn table(&self) -> Table<'_> {
        Table::new(&self.table_name, SUBSCRIPTION_ID_KEY, None)
    }

    pub async fn initialize(&self) -> Result<TrackerEndpoints> {
        if self.ddb.create_table_if_not_exists(&self.table()).await?.is_some() {
            self.ddb.wait_until_active(&self.table_name).await?;
        }
        self.endpoints().await
    }

    pub async fn endpoints(&self) -> Result<TrackerEndpoints> {
        let description = self.ddb.describe_table(&self.table_name).await?;
        let table_arn = description
            .table()
            .and_then(|t| t.table_arn())
            .map(str::to_string);
        Ok(TrackerEndpoints::new(&self.table_name, table_arn, &self.region))
    }

    pub async fn create_subscription_request(
        &self,
        request: SubscriptionRequest,
    ) -> Result<Subscription> {
        let subscription = Subscription::pending(request);
        self.ddb
            .put_new_item(
                &self.table_name,
                SUBSCRIPTION_ID_KEY,
                Item::from_record(&subscription)?,
            )
            .await?;

        info!(
            subscription_id = %subscription.subscription_id,
            owner_account_id = %subscription.owner_account_id,
            database = %subscription.database_name,
            "Created subscription request"
        );
        Ok(subscription)
    }

    pub async fn get_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>> {
        let key = Item::new().set_string(SUBSCRIPTION_ID_KEY, subscription_id);
        self.ddb
            .get_item(&self.table_name, key)
            .await?
            .map(Item::into_record)
            .transpose()
    }

    /// All subscriptions, or only those against `owner`'s products.
    pub async fn list_subscriptions(&self, owner: Option<&AccountId>) -> Result<Vec<Subscription>> {
        let (filter, names, values) = match owner {
            Some(owner) => (
                Some("#owner = :owner".to_string()),
                Some(HashMap::from([(
                    "#owner".to_string(),
                    "OwnerAccountId".to_string(),
                )])),
                Some(HashMap::from([(
                    ":owner".to_string(),
                    AttributeValue::S(owner.to_string()),
                )])),
            ),
            None => (None, None, None),
        };

        self.ddb
            .scan(&self.table_name, filter, names, values)
            .await?
            .into_iter()
            .map(Item::into_record)
            .collect()
    }
}

impl SubscriptionStore for SubscriberTracker {
    async fn initialize(&self) -> Result<TrackerEndpoints> {
        SubscriberTracker::initialize(self).await
    }

    async fn create_subscription_request(
        &self,
        request: SubscriptionRequest,
    ) -> Result<Subscription> {
        SubscriberTracker::create_subscription_request(self, request).await
    }

    async fn get_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>> {
        SubscriberTracker::get_subscription(self, subscription_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SubscriptionRequest {
        SubscriptionRequest {
            owner_account_id: "222222222222".parse().unwrap(),
            database_name: "tpcds-222222222222".into(),
            tables: vec!["customer".into()],
            permissions: vec![TablePermission::Select, TablePermission::Describe],
            requesting_principal: "333333333333".into(),
        }
    }

    #[test]
    fn test_parse_permissions() {
        assert_eq!("select".parse::<TablePermission>().unwrap(), TablePermission::Select);
        assert_eq!(" DESCRIBE ".parse::<TablePermission>().unwrap(), TablePermission::Describe);
        assert!(matches!(
            "UPDATE".parse::<TablePermission>(),
            Err(MeshError::InvalidPermission(_))
        ));
    }

    #[test]
    fn test_pending_subscription() {
        let first = Subscription::pending(request());
        let second = Subscription::pending(request());

        assert_eq!(first.status, STATUS_PENDING);
        assert_eq!(first.database_name, "tpcds-222222222222");
        assert_ne!(first.subscription_id, second.subscription_id);
        assert!(chrono::DateTime::parse_from_rfc3339(&first.created_at).is_ok());
    }

    #[test]
    fn test_subscription_item_layout() {
        let subscription = Subscription::pending(request());
        let item = Item::from_record(&subscription).unwrap();

        assert_eq!(
            item.get_string(SUBSCRIPTION_ID_KEY),
            Some(&subscription.subscription_id)
        );
        assert_eq!(item.get_string("OwnerAccountId"), Some(&"222222222222".to_string()));
        assert_eq!(item.get_string("Status"), Some(&STATUS_PENDING.to_string()));

        let restored: Subscription = item.into_record().unwrap();
        assert_eq!(restored, subscription);
    }

    #[test]
    fn test_endpoints() {
        let endpoints = TrackerEndpoints::new(SUBSCRIPTIONS_TABLE_NAME, None, "eu-west-1");
        assert_eq!(endpoints.endpoint, "https://dynamodb.eu-west-1.amazonaws.com");

        let value = serde_json::to_value(&endpoints).unwrap();
        assert_eq!(value["TableName"], SUBSCRIPTIONS_TABLE_NAME);
        assert_eq!(value["Region"], "eu-west-1");
    }
}
