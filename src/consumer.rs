//! Consumer side of the mesh: asking producers for access to their tables.

use anyhow::Result;
use tracing::{info, warn};

use crate::account::AccountId;
use crate::constants::DATA_MESH_ADMIN_CONSUMER_ROLENAME;
use crate::context::AwsContext;
use crate::error::MeshError;
use crate::lakeformation::{LakeFormationClient, LakeFormationOperations};
use crate::tracker::{
    SubscriberTracker, Subscription, SubscriptionRequest, SubscriptionStore, TablePermission,
};

const SESSION_NAME: &str = "DataMeshConsumer";

/// An access request as entered by a user, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRequest {
    pub owner_account_id: String,
    pub database_name: String,
    pub tables: Vec<String>,
    pub permissions: Vec<String>,
    pub requesting_principal: String,
}

impl AccessRequest {
    pub fn validate(self) -> Result<SubscriptionRequest> {
        let owner_account_id: AccountId = self.owner_account_id.parse()?;

        let database_name = self.database_name.trim().to_string();
        if database_name.is_empty() {
            return Err(MeshError::EmptyRequest("database").into());
        }

        let tables: Vec<String> = self
            .tables
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if tables.is_empty() {
            return Err(MeshError::EmptyRequest("table").into());
        }

        let permissions = self
            .permissions
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| p.parse::<TablePermission>())
            .collect::<Result<Vec<_>, _>>()?;
        if permissions.is_empty() {
            return Err(MeshError::EmptyRequest("permission").into());
        }

        Ok(SubscriptionRequest {
            owner_account_id,
            database_name,
            tables,
            permissions,
            requesting_principal: self.requesting_principal,
        })
    }
}

pub struct DataMeshConsumer<L, T> {
    lake_formation: L,
    tracker: T,
}

impl DataMeshConsumer<LakeFormationClient, SubscriberTracker> {
    /// Consumer acting through the consumer admin role of `mesh_account`.
    pub async fn from_context(ctx: &AwsContext, mesh_account: &AccountId) -> Self {
        let role_arn = mesh_account.role_arn(DATA_MESH_ADMIN_CONSUMER_ROLENAME);
        let assumed = ctx.assume_role(&role_arn, SESSION_NAME).await;
        Self::with_clients(assumed.lake_formation_client(), assumed.subscriber_tracker())
    }
}

impl<L, T> DataMeshConsumer<L, T>
where
    L: LakeFormationOperations,
    T: SubscriptionStore,
{
    pub fn with_clients(lake_formation: L, tracker: T) -> Self {
        Self {
            lake_formation,
            tracker,
        }
    }

    /// Records a pending subscription for tables in the mesh catalog.
    ///
    /// Fails with [`MeshError::TableNotFound`] before anything is written
    /// when any requested table is missing.
    pub async fn request_access_to_product(&self, request: AccessRequest) -> Result<Subscription> {
        let request = request.validate()?;

        for table in &request.tables {
            if !self
                .lake_formation
                .table_exists(&request.database_name, table)
                .await?
            {
                warn!(database = %request.database_name, table = %table, "Requested table not found");
                return Err(MeshError::TableNotFound {
                    database: request.database_name.clone(),
                    table: table.clone(),
                }
                .into());
            }
        }

        let subscription = self.tracker.create_subscription_request(request).await?;
        info!(subscription_id = %subscription.subscription_id, "Requested access");
        Ok(subscription)
    }

    pub async fn get_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>> {
        self.tracker.get_subscription(subscription_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLakeFormation, FakeTracker, CONSUMER_ACCOUNT, PRODUCER_ACCOUNT};
    use crate::tracker::STATUS_PENDING;

    const DATABASE: &str = "tpcds-222222222222";

    fn request(tables: &[&str], permissions: &[&str]) -> AccessRequest {
        AccessRequest {
            owner_account_id: PRODUCER_ACCOUNT.into(),
            database_name: DATABASE.into(),
            tables: tables.iter().map(|t| t.to_string()).collect(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            requesting_principal: CONSUMER_ACCOUNT.into(),
        }
    }

    fn consumer() -> (DataMeshConsumer<FakeLakeFormation, FakeTracker>, FakeTracker) {
        let lf = FakeLakeFormation::default()
            .with_table(DATABASE, "customer")
            .with_table(DATABASE, "orders");
        let tracker = FakeTracker::default();
        (DataMeshConsumer::with_clients(lf, tracker.clone()), tracker)
    }

    #[tokio::test]
    async fn test_request_for_existing_table_is_retrievable() {
        let (consumer, _) = consumer();

        let created = consumer
            .request_access_to_product(request(&["customer", "orders"], &["SELECT", "describe"]))
            .await
            .unwrap();
        assert_eq!(created.status, STATUS_PENDING);
        assert_eq!(
            created.requested_permissions,
            vec![TablePermission::Select, TablePermission::Describe]
        );

        let fetched = consumer
            .get_subscription(&created.subscription_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.owner_account_id.as_str(), PRODUCER_ACCOUNT);
        assert_eq!(fetched.database_name, DATABASE);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_request_for_missing_table_creates_nothing() {
        let (consumer, tracker) = consumer();

        let err = consumer
            .request_access_to_product(request(&["customer", "web_sales"], &["SELECT"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MeshError>(),
            Some(MeshError::TableNotFound { table, .. }) if table == "web_sales"
        ));
        assert_eq!(tracker.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_subscription_is_none() {
        let (consumer, _) = consumer();
        assert!(consumer.get_subscription("missing").await.unwrap().is_none());
    }

    #[test]
    fn test_validate_rejects_incomplete_requests() {
        let cases = [
            (request(&[], &["SELECT"]), "table"),
            (request(&["  "], &["SELECT"]), "table"),
            (request(&["customer"], &[]), "permission"),
            (
                AccessRequest {
                    database_name: " ".into(),
                    ..request(&["customer"], &["SELECT"])
                },
                "database",
            ),
        ];
        for (request, what) in cases {
            let err = request.validate().unwrap_err();
            assert!(
                matches!(err.downcast_ref::<MeshError>(), Some(MeshError::EmptyRequest(w)) if *w == what),
                "{what}"
            );
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = request(&["customer"], &["SELECT", "UPDATE"])
            .validate()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MeshError>(),
            Some(MeshError::InvalidPermission(p)) if p == "UPDATE"
        ));

        let err = AccessRequest {
            owner_account_id: "producer".into(),
            ..request(&["customer"], &["SELECT"])
        }
        .validate()
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MeshError>(),
            Some(MeshError::InvalidAccountId(_))
        ));
    }
}
