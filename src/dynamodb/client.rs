use anyhow::{anyhow, Context, Result};
use aws_sdk_dynamodb::{
    operation::{create_table::CreateTableOutput, describe_table::DescribeTableOutput},
    types::{
        AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
        ScalarAttributeType, TableStatus,
    },
    Client,
};
use std::collections::HashMap;
use tokio::time::Duration;
use tracing::{debug, info};

use crate::dynamodb::{Item, Table};
use crate::utils::{backoff_budget, retry_with_backoff};

const ACTIVE_POLL_DELAY: Duration = Duration::from_secs(1);
const ACTIVE_POLL_RETRIES: usize = 8;

/// DynamoDB client wrapper for the operations the subscription tracker uses.
///
/// # Tables
///
/// Tables are created on demand with string keys and on-demand billing.
/// A freshly created table is `CREATING` for a few seconds; use
/// [`DynamoDb::wait_until_active`] before writing to it.
///
/// # Items
///
/// Items are passed around as [`Item`], which converts to and from any
/// serde type through `serde_dynamo`.
///
/// # Error Handling
///
/// Every method returns `anyhow::Result` with the failing call as context.
#[derive(Debug, Clone)]
pub struct DynamoDb {
    client: Client,
}

impl DynamoDb {
    /// Creates a new `DynamoDb` instance.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }

    // --- Table Operations ---

    /// Creates a table if it doesn't exist.
    pub async fn create_table_if_not_exists(
        &self,
        table: &Table<'_>,
    ) -> Result<Option<CreateTableOutput>> {
        if self.table_exists(table.name()).await? {
            info!("Table '{}' exists", table.name());
            return Ok(None);
        }

        let mut attribute_definitions = vec![AttributeDefinition::builder()
            .attribute_name(table.partition_key())
            .attribute_type(ScalarAttributeType::S)
            .build()?];

        let mut key_schema = vec![KeySchemaElement::builder()
            .attribute_name(table.partition_key())
            .key_type(KeyType::Hash)
            .build()?];

        if let Some(sort_key) = table.sort_key() {
            attribute_definitions.push(
                AttributeDefinition::builder()
                    .attribute_name(sort_key)
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            );
            key_schema.push(
                KeySchemaElement::builder()
                    .attribute_name(sort_key)
                    .key_type(KeyType::Range)
                    .build()?,
            );
        }

        let output = self
            .client
            .create_table()
            .table_name(table.name())
            .billing_mode(BillingMode::PayPerRequest)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema))
            .send()
            .await
            .with_context(|| format!("Failed to create table '{}'", table.name()))?;
        info!("Table '{}' created", table.name());
        Ok(Some(output))
    }

    /// Checks if a table exists.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let mut start = None;
        loop {
            let tables = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start)
                .send()
                .await
                .context("Failed to list tables")?;

            if tables.table_names().iter().any(|t| t == table_name) {
                return Ok(true);
            }
            start = tables.last_evaluated_table_name().map(str::to_string);
            if start.is_none() {
                return Ok(false);
            }
        }
    }

    /// Retrieves table description.
    pub async fn describe_table(&self, table_name: &str) -> Result<DescribeTableOutput> {
        self.client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .with_context(|| format!("Failed to describe table '{}'", table_name))
    }

    async fn table_status(&self, table_name: &str) -> Result<Option<TableStatus>> {
        let output = self.describe_table(table_name).await?;
        Ok(output.table().and_then(|t| t.table_status()).cloned())
    }

    /// Polls until the table reports `ACTIVE`.
    pub async fn wait_until_active(&self, table_name: &str) -> Result<()> {
        debug!(
            "Waiting up to {:?} for table '{}'",
            backoff_budget(ACTIVE_POLL_DELAY, ACTIVE_POLL_RETRIES),
            table_name
        );
        retry_with_backoff(
            || async move {
                match self.table_status(table_name).await {
                    Ok(Some(TableStatus::Active)) => Ok(()),
                    Ok(status) => Err(anyhow!("Table '{}' is {:?}", table_name, status)),
                    Err(e) => Err(e),
                }
            },
            ACTIVE_POLL_DELAY,
            ACTIVE_POLL_RETRIES,
        )
        .await?;
        info!("Table '{table_name}' is active");
        Ok(())
    }

    // --- Item Operations ---

    /// Puts an item, failing if one with the same `key_attribute` exists.
    pub async fn put_new_item(&self, table_name: &str, key_attribute: &str, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(table_name)
            .set_item(Some(item.attributes))
            .condition_expression("attribute_not_exists(#key)")
            .expression_attribute_names("#key", key_attribute)
            .send()
            .await
            .with_context(|| format!("Failed to put item into '{}'", table_name))?;

        info!("Item added to '{table_name}'");
        Ok(())
    }

    /// Gets an item from a DynamoDB table.
    pub async fn get_item(&self, table_name: &str, key: Item) -> Result<Option<Item>> {
        let response = self
            .client
            .get_item()
            .table_name(table_name)
            .set_key(Some(key.attributes))
            .consistent_read(true)
            .send()
            .await
            .with_context(|| format!("Failed to get item from '{}'", table_name))?;

        Ok(response.item.map(|attrs| Item { attributes: attrs }))
    }

    // --- Scan Operations ---

    /// Performs a scan operation on a DynamoDB table, following pagination.
    pub async fn scan(
        &self,
        table_name: &str,
        filter_expression: Option<String>,
        expression_attribute_names: Option<HashMap<String, String>>,
        expression_attribute_values: Option<HashMap<String, AttributeValue>>,
    ) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut last_evaluated_key = None;

        loop {
            let mut scan = self.client.scan().table_name(table_name);

            if let Some(filter) = &filter_expression {
                scan = scan.filter_expression(filter);
            }

            if let Some(names) = &expression_attribute_names {
                scan = scan.set_expression_attribute_names(Some(names.clone()));
            }

            if let Some(values) = &expression_attribute_values {
                scan = scan.set_expression_attribute_values(Some(values.clone()));
            }

            if let Some(key) = last_evaluated_key {
                scan = scan.set_exclusive_start_key(Some(key));
            }

            let response = scan
                .send()
                .await
                .with_context(|| format!("Failed to scan '{}'", table_name))?;

            if let Some(new_items) = response.items {
                items.extend(
                    new_items
                        .into_iter()
                        .map(|attrs| Item { attributes: attrs }),
                );
            }

            last_evaluated_key = response.last_evaluated_key;

            if last_evaluated_key.is_none() {
                break;
            }
        }

        Ok(items)
    }
}
