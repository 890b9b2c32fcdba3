//! # AWS Lake Formation
//!
//! Data-lake settings and catalog permissions for the mesh account.

use anyhow::{anyhow, Context, Result};
use aws_sdk_lakeformation::types::{
    CatalogResource, DataLakePrincipal, DataLakeSettings, DatabaseResource,
    Permission as LfPermission, Resource as LfResource, TableResource,
};
use aws_sdk_lakeformation::Client;
use std::future::Future;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::MeshError;

/// A catalog object permissions can be granted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataResource {
    Catalog,
    Database { name: String },
    Table { database: String, name: String },
}

impl FromStr for DataResource {
    type Err = anyhow::Error;

    /// `CATALOG`, `database` or `database.table`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("catalog") {
            return Ok(DataResource::Catalog);
        }
        match s.split_once('.') {
            Some((database, name)) if !database.is_empty() && !name.is_empty() => {
                Ok(DataResource::Table {
                    database: database.to_string(),
                    name: name.to_string(),
                })
            }
            None if !s.is_empty() => Ok(DataResource::Database {
                name: s.to_string(),
            }),
            _ => Err(anyhow!("Invalid resource format: {}", s)),
        }
    }
}

/// A Lake Formation grant (or revocation) for one principal.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionGrant {
    pub principal: String,
    pub resource: DataResource,
    pub permissions: Vec<LfPermission>,
    /// Subset of `permissions` the principal may grant on to others.
    pub grantable: Vec<LfPermission>,
}

impl PermissionGrant {
    pub fn new(principal: impl Into<String>, resource: DataResource) -> Self {
        Self {
            principal: principal.into(),
            resource,
            permissions: Vec::new(),
            grantable: Vec::new(),
        }
    }

    pub fn permission(mut self, permission: LfPermission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn with_grant_option(mut self, permission: LfPermission) -> Self {
        self.permissions.push(permission.clone());
        self.grantable.push(permission);
        self
    }
}

/// Parses a Lake Formation permission name, case-insensitively.
///
/// Names the SDK does not know are rejected rather than sent as `Unknown`.
pub fn parse_permission(s: &str) -> Result<LfPermission, MeshError> {
    let name = s.trim().to_uppercase();
    if LfPermission::values().contains(&name.as_str()) {
        Ok(LfPermission::from(name.as_str()))
    } else {
        Err(MeshError::InvalidPermission(s.trim().to_string()))
    }
}

/// Lake Formation operations the mesh orchestration depends on.
pub trait LakeFormationOperations: Send + Sync {
    /// Replaces the account's data-lake settings: `admins` become the only
    /// administrators and default create-table permissions are cleared.
    fn put_data_lake_settings(&self, admins: &[String]) -> impl Future<Output = Result<()>> + Send;

    fn grant_permissions(&self, grant: &PermissionGrant) -> impl Future<Output = Result<()>> + Send;

    fn table_exists(&self, database: &str, table: &str)
        -> impl Future<Output = Result<bool>> + Send;
}

/// Lake Formation client wrapper.
#[derive(Debug, Clone)]
pub struct LakeFormationClient {
    client: Client,
}

impl LakeFormationClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn put_data_lake_settings(&self, admins: &[String]) -> Result<()> {
        let settings = DataLakeSettings::builder()
            .set_data_lake_admins(Some(admins.iter().map(|a| principal(a)).collect()))
            .set_create_table_default_permissions(Some(Vec::new()))
            .build();

        self.client
            .put_data_lake_settings()
            .data_lake_settings(settings)
            .send()
            .await
            .context("Failed to put data lake settings")?;

        info!(admins = ?admins, "Replaced data lake settings");
        Ok(())
    }

    /// Current data-lake administrators.
    pub async fn data_lake_admins(&self) -> Result<Vec<String>> {
        let output = self
            .client
            .get_data_lake_settings()
            .send()
            .await
            .context("Failed to get data lake settings")?;

        Ok(output
            .data_lake_settings()
            .map(|s| {
                s.data_lake_admins()
                    .iter()
                    .filter_map(|p| p.data_lake_principal_identifier())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn grant_permissions(&self, grant: &PermissionGrant) -> Result<()> {
        let request = self
            .client
            .grant_permissions()
            .principal(principal(&grant.principal))
            .resource(convert_resource(&grant.resource)?)
            .set_permissions(Some(grant.permissions.clone()));

        let request = if grant.grantable.is_empty() {
            request
        } else {
            request.set_permissions_with_grant_option(Some(grant.grantable.clone()))
        };

        request
            .send()
            .await
            .with_context(|| format!("Failed to grant permissions to {}", grant.principal))?;

        info!(
            principal = %grant.principal,
            resource = ?grant.resource,
            permissions = ?grant.permissions,
            "Granted permissions"
        );
        Ok(())
    }

    pub async fn revoke_permissions(&self, grant: &PermissionGrant) -> Result<()> {
        let request = self
            .client
            .revoke_permissions()
            .principal(principal(&grant.principal))
            .resource(convert_resource(&grant.resource)?)
            .set_permissions(Some(grant.permissions.clone()));

        let request = if grant.grantable.is_empty() {
            request
        } else {
            request.set_permissions_with_grant_option(Some(grant.grantable.clone()))
        };

        request
            .send()
            .await
            .with_context(|| format!("Failed to revoke permissions from {}", grant.principal))?;

        info!(
            principal = %grant.principal,
            resource = ?grant.resource,
            permissions = ?grant.permissions,
            "Revoked permissions"
        );
        Ok(())
    }

    /// Checks the table through its LF-Tags, which Lake Formation can only
    /// report for catalog entries that exist.
    pub async fn table_exists(&self, database: &str, table: &str) -> Result<bool> {
        let resource = convert_resource(&DataResource::Table {
            database: database.to_string(),
            name: table.to_string(),
        })?;

        match self.client.get_resource_lf_tags().resource(resource).send().await {
            Ok(_) => Ok(true),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_entity_not_found_exception()) =>
            {
                debug!(database = %database, table = %table, "Table not found");
                Ok(false)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to look up {}.{}", database, table)),
        }
    }
}

impl LakeFormationOperations for LakeFormationClient {
    async fn put_data_lake_settings(&self, admins: &[String]) -> Result<()> {
        LakeFormationClient::put_data_lake_settings(self, admins).await
    }

    async fn grant_permissions(&self, grant: &PermissionGrant) -> Result<()> {
        LakeFormationClient::grant_permissions(self, grant).await
    }

    async fn table_exists(&self, database: &str, table: &str) -> Result<bool> {
        LakeFormationClient::table_exists(self, database, table).await
    }
}

fn principal(identifier: &str) -> DataLakePrincipal {
    DataLakePrincipal::builder()
        .data_lake_principal_identifier(identifier)
        .build()
}

fn convert_resource(resource: &DataResource) -> Result<LfResource> {
    match resource {
        DataResource::Catalog => Ok(LfResource::builder()
            .catalog(CatalogResource::builder().build())
            .build()),
        DataResource::Database { name } => Ok(LfResource::builder()
            .database(
                DatabaseResource::builder()
                    .name(name)
                    .build()
                    .map_err(|e| anyhow!("Failed to build database resource: {}", e))?,
            )
            .build()),
        DataResource::Table { database, name } => Ok(LfResource::builder()
            .table(
                TableResource::builder()
                    .database_name(database)
                    .name(name)
                    .build()
                    .map_err(|e| anyhow!("Failed to build table resource: {}", e))?,
            )
            .build()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resources() {
        assert_eq!("CATALOG".parse::<DataResource>().unwrap(), DataResource::Catalog);
        assert_eq!(
            "sales".parse::<DataResource>().unwrap(),
            DataResource::Database {
                name: "sales".into()
            }
        );
        assert_eq!(
            "tpcds.customer".parse::<DataResource>().unwrap(),
            DataResource::Table {
                database: "tpcds".into(),
                name: "customer".into()
            }
        );
        assert!("".parse::<DataResource>().is_err());
        assert!(".orders".parse::<DataResource>().is_err());
    }

    #[test]
    fn test_grant_option_implies_permission() {
        let grant = PermissionGrant::new("arn:aws:iam::111111111111:role/x", DataResource::Catalog)
            .with_grant_option(LfPermission::CreateDatabase);
        assert_eq!(grant.permissions, vec![LfPermission::CreateDatabase]);
        assert_eq!(grant.grantable, vec![LfPermission::CreateDatabase]);
    }

    #[test]
    fn test_parse_permission() {
        assert_eq!(parse_permission("select").unwrap(), LfPermission::Select);
        assert_eq!(
            parse_permission(" create_database ").unwrap(),
            LfPermission::CreateDatabase
        );
        assert!(matches!(
            parse_permission("SELET"),
            Err(MeshError::InvalidPermission(p)) if p == "SELET"
        ));
        assert!(parse_permission("").is_err());
    }

    #[test]
    fn test_convert_table_resource() {
        let resource = convert_resource(&DataResource::Table {
            database: "tpcds".into(),
            name: "customer".into(),
        })
        .unwrap();
        assert!(resource.table().is_some());
        assert!(resource.database().is_none());
        assert!(resource.catalog().is_none());
    }
}
