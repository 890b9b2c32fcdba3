use anyhow::{Context, Result};
use aws_sdk_dynamodb::types::AttributeValue;
use serde::{de::DeserializeOwned, Serialize};
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_item};
use std::collections::HashMap;

/// Represents a DynamoDB item.
///
/// In DynamoDB, an item is a collection of attributes, each with a name and a value.
/// Every item in a table is uniquely identified by its primary key, which is
/// itself just the key attributes of the item. Keys passed to
/// [`DynamoDb::get_item`](crate::dynamodb::DynamoDb::get_item) are therefore
/// `Item`s holding only those attributes.
///
/// # Example
///
/// ```
/// use data_mesh_util::dynamodb::Item;
///
/// let key = Item::new().set_string("SubscriptionId", "b7c1d2");
/// assert_eq!(key.get_string("SubscriptionId"), Some(&"b7c1d2".to_string()));
/// ```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) attributes: HashMap<String, AttributeValue>,
}

impl Item {
    /// Creates a new empty `Item`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts any serde record into an item.
    pub fn from_record<T: Serialize>(record: &T) -> Result<Self> {
        let attributes = to_item(record).context("Failed to convert record to a DynamoDB item")?;
        Ok(Self { attributes })
    }

    /// Converts the item back into a serde record.
    pub fn into_record<T: DeserializeOwned>(self) -> Result<T> {
        from_item(self.attributes).context("Failed to read record from DynamoDB item")
    }

    /// Sets a string attribute.
    pub fn set_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.into(), AttributeValue::S(value.into()));
        self
    }

    /// Gets the value of an attribute as a string.
    ///
    /// Returns `None` if the attribute doesn't exist or is not a string.
    pub fn get_string(&self, key: &str) -> Option<&String> {
        self.attributes.get(key).and_then(|av| av.as_s().ok())
    }
}
