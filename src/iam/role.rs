use serde::{Deserialize, Serialize};

use crate::constants::{
    DATA_MESH_ADMIN_CONSUMER_ROLENAME, DATA_MESH_ADMIN_PRODUCER_ROLENAME,
    DATA_MESH_CONSUMER_POLICY, DATA_MESH_MANAGER_POLICY, DATA_MESH_MANAGER_ROLENAME,
    DATA_MESH_PRODUCER_POLICY,
};
use crate::iam::PolicyTemplate;

/// The three participant classes the mesh account hosts a role for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshRole {
    Manager,
    ProducerAdmin,
    ConsumerAdmin,
}

impl MeshRole {
    pub fn role_name(&self) -> &'static str {
        match self {
            MeshRole::Manager => DATA_MESH_MANAGER_ROLENAME,
            MeshRole::ProducerAdmin => DATA_MESH_ADMIN_PRODUCER_ROLENAME,
            MeshRole::ConsumerAdmin => DATA_MESH_ADMIN_CONSUMER_ROLENAME,
        }
    }

    pub fn role_description(&self) -> &'static str {
        match self {
            MeshRole::Manager => "Role to be used for the Data Mesh Manager function",
            MeshRole::ProducerAdmin => "Role to be used for all Data Mesh Producer Accounts",
            MeshRole::ConsumerAdmin => "Role to be used for all Data Mesh Consumer Accounts",
        }
    }

    pub fn policy_name(&self) -> &'static str {
        match self {
            MeshRole::Manager => DATA_MESH_MANAGER_POLICY,
            MeshRole::ProducerAdmin => DATA_MESH_PRODUCER_POLICY,
            MeshRole::ConsumerAdmin => DATA_MESH_CONSUMER_POLICY,
        }
    }

    pub fn policy_description(&self) -> &'static str {
        match self {
            MeshRole::Manager => "IAM Policy to bootstrap the Data Mesh Admin",
            MeshRole::ProducerAdmin => "IAM Policy enabling Accounts to become Data Producers",
            MeshRole::ConsumerAdmin => "IAM Policy enabling Accounts to become Data Consumers",
        }
    }

    pub fn template(&self) -> PolicyTemplate {
        match self {
            MeshRole::Manager => PolicyTemplate::DataMeshManager,
            MeshRole::ProducerAdmin => PolicyTemplate::Producer,
            MeshRole::ConsumerAdmin => PolicyTemplate::Consumer,
        }
    }

    pub fn user_name(&self) -> String {
        format!("{}User", self.role_name())
    }

    pub fn group_name(&self) -> String {
        format!("{}Group", self.role_name())
    }

    /// Name of the inline group policy that lets members assume the role.
    pub fn group_policy_name(&self) -> String {
        format!("Assume{}", self.role_name())
    }
}

/// Identity handles created for one mesh role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleTriple {
    pub role_arn: String,
    pub user_arn: String,
    pub group_arn: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_names() {
        assert_eq!(MeshRole::ProducerAdmin.role_name(), "DataMeshAdminProducer");
        assert_eq!(MeshRole::ProducerAdmin.user_name(), "DataMeshAdminProducerUser");
        assert_eq!(MeshRole::ConsumerAdmin.group_name(), "DataMeshAdminConsumerGroup");
        assert_eq!(MeshRole::Manager.group_policy_name(), "AssumeDataMeshManager");
        assert_eq!(MeshRole::Manager.template(), PolicyTemplate::DataMeshManager);
    }

    #[test]
    fn test_role_triple_field_names() {
        let triple = RoleTriple {
            role_arn: "arn:aws:iam::111111111111:role/DataMeshManager".into(),
            user_arn: "arn:aws:iam::111111111111:user/DataMeshManagerUser".into(),
            group_arn: "arn:aws:iam::111111111111:group/DataMeshManagerGroup".into(),
        };
        let value = serde_json::to_value(&triple).unwrap();
        assert_eq!(value["RoleArn"], triple.role_arn.as_str());
        assert_eq!(value["UserArn"], triple.user_arn.as_str());
        assert_eq!(value["GroupArn"], triple.group_arn.as_str());
    }
}
