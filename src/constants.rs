//! Names shared by every account taking part in the mesh.

pub const DATA_MESH_MANAGER_ROLENAME: &str = "DataMeshManager";
pub const DATA_MESH_ADMIN_PRODUCER_ROLENAME: &str = "DataMeshAdminProducer";
pub const DATA_MESH_ADMIN_CONSUMER_ROLENAME: &str = "DataMeshAdminConsumer";

pub const DATA_MESH_MANAGER_POLICY: &str = "DataMeshManagerPolicy";
pub const DATA_MESH_PRODUCER_POLICY: &str = "DataMeshProducerPolicy";
pub const DATA_MESH_CONSUMER_POLICY: &str = "DataMeshConsumerPolicy";

pub const SUBSCRIPTIONS_TABLE_NAME: &str = "DataMeshSubscriptions";
pub const SUBSCRIPTION_ID_KEY: &str = "SubscriptionId";
