/// DynamoDB table configuration.
///
/// This struct represents a specific DynamoDB table and its key attributes.
/// Keys are always created as string attributes.
///
/// # Example
///
/// ```
/// use data_mesh_util::dynamodb::Table;
///
/// let table = Table::new("DataMeshSubscriptions", "SubscriptionId", None);
/// assert_eq!(table.partition_key(), "SubscriptionId");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Table<'a> {
    name: &'a str,
    partition_key: &'a str,
    sort_key: Option<&'a str>,
}

impl<'a> Table<'a> {
    /// Creates a new `Table` instance.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the DynamoDB table.
    /// * `partition_key` - The name of the partition key attribute.
    /// * `sort_key` - The name of the sort key attribute, if any.
    pub fn new(name: &'a str, partition_key: &'a str, sort_key: Option<&'a str>) -> Self {
        Self {
            name,
            partition_key,
            sort_key,
        }
    }

    /// Returns the name of the table.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Returns the partition key of the table.
    pub fn partition_key(&self) -> &str {
        self.partition_key
    }

    /// Returns the sort key of the table, if any.
    pub fn sort_key(&self) -> Option<&str> {
        self.sort_key
    }
}
