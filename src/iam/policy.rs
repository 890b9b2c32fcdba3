//! IAM policy documents for the mesh roles.
//!
//! Permission policies are rendered from a [`PolicyTemplate`] and a
//! [`TemplateConfig`]; trust policies are built and extended here too so the
//! JSON handling stays out of the client.

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::account::AccountId;
use crate::config::MeshConfig;
use crate::constants::{
    DATA_MESH_ADMIN_CONSUMER_ROLENAME, DATA_MESH_ADMIN_PRODUCER_ROLENAME,
    DATA_MESH_MANAGER_ROLENAME, SUBSCRIPTIONS_TABLE_NAME,
};

const POLICY_VERSION: &str = "2012-10-17";
const ASSUME_ROLE_ACTION: &str = "sts:AssumeRole";

/// Values substituted into the policy templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateConfig {
    pub data_mesh_account_id: AccountId,
    pub producer_account_id: Option<AccountId>,
    pub consumer_account_id: Option<AccountId>,
}

impl TemplateConfig {
    /// Takes the producer and consumer accounts from the session config and
    /// pins the mesh account to the one just resolved.
    pub fn for_session(config: &MeshConfig, data_mesh_account_id: &AccountId) -> Self {
        Self {
            data_mesh_account_id: data_mesh_account_id.clone(),
            producer_account_id: config.producer_account_id.clone(),
            consumer_account_id: config.consumer_account_id.clone(),
        }
    }

    fn subscriptions_table_arn(&self) -> String {
        format!(
            "arn:aws:dynamodb:*:{}:table/{}",
            self.data_mesh_account_id, SUBSCRIPTIONS_TABLE_NAME
        )
    }

    fn mesh_role_arns(&self) -> Vec<String> {
        [
            DATA_MESH_MANAGER_ROLENAME,
            DATA_MESH_ADMIN_PRODUCER_ROLENAME,
            DATA_MESH_ADMIN_CONSUMER_ROLENAME,
        ]
        .iter()
        .map(|name| self.data_mesh_account_id.role_arn(name))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyTemplate {
    DataMeshManager,
    Producer,
    Consumer,
}

impl PolicyTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            PolicyTemplate::DataMeshManager => "data_mesh_setup_iam_policy",
            PolicyTemplate::Producer => "producer_policy",
            PolicyTemplate::Consumer => "consumer_policy",
        }
    }

    pub fn render(&self, config: &TemplateConfig) -> Value {
        let statements = match self {
            PolicyTemplate::DataMeshManager => manager_statements(config),
            PolicyTemplate::Producer => producer_statements(config),
            PolicyTemplate::Consumer => consumer_statements(config),
        };
        json!({
            "Version": POLICY_VERSION,
            "Statement": statements,
        })
    }
}

fn manager_statements(config: &TemplateConfig) -> Vec<Value> {
    vec![
        json!({
            "Sid": "CatalogAdministration",
            "Effect": "Allow",
            "Action": ["lakeformation:*", "glue:*", "ram:*"],
            "Resource": "*"
        }),
        json!({
            "Sid": "MeshRoleManagement",
            "Effect": "Allow",
            "Action": [
                "iam:GetRole",
                "iam:PassRole",
                "iam:UpdateAssumeRolePolicy",
                "iam:PutRolePolicy",
                "iam:GetRolePolicy"
            ],
            "Resource": config.mesh_role_arns()
        }),
        json!({
            "Sid": "SubscriptionTracking",
            "Effect": "Allow",
            "Action": "dynamodb:*",
            "Resource": [
                config.subscriptions_table_arn(),
                format!("{}/*", config.subscriptions_table_arn())
            ]
        }),
    ]
}

fn producer_statements(config: &TemplateConfig) -> Vec<Value> {
    let mut statements = vec![
        json!({
            "Sid": "ProductPublishing",
            "Effect": "Allow",
            "Action": [
                "glue:CreateDatabase",
                "glue:GetDatabase",
                "glue:GetDatabases",
                "glue:CreateTable",
                "glue:UpdateTable",
                "glue:GetTable",
                "glue:GetTables",
                "lakeformation:GrantPermissions",
                "lakeformation:RevokePermissions",
                "lakeformation:ListPermissions",
                "lakeformation:RegisterResource",
                "lakeformation:GetDataAccess"
            ],
            "Resource": "*"
        }),
        json!({
            "Sid": "SubscriptionReview",
            "Effect": "Allow",
            "Action": [
                "dynamodb:GetItem",
                "dynamodb:Query",
                "dynamodb:Scan",
                "dynamodb:UpdateItem"
            ],
            "Resource": config.subscriptions_table_arn()
        }),
    ];

    if let Some(producer) = &config.producer_account_id {
        statements.push(json!({
            "Sid": "ProducerCatalogAccess",
            "Effect": "Allow",
            "Action": ["glue:GetDatabase", "glue:GetTable", "glue:GetTables"],
            "Resource": [
                format!("arn:aws:glue:*:{}:catalog", producer),
                format!("arn:aws:glue:*:{}:database/*", producer),
                format!("arn:aws:glue:*:{}:table/*", producer)
            ]
        }));
    }
    statements
}

fn consumer_statements(config: &TemplateConfig) -> Vec<Value> {
    let mut statements = vec![
        json!({
            "Sid": "ProductDiscovery",
            "Effect": "Allow",
            "Action": [
                "glue:GetDatabase",
                "glue:GetDatabases",
                "glue:GetTable",
                "glue:GetTables",
                "lakeformation:ListPermissions",
                "lakeformation:GetResourceLFTags",
                "lakeformation:GetDataAccess"
            ],
            "Resource": "*"
        }),
        json!({
            "Sid": "SubscriptionRequests",
            "Effect": "Allow",
            "Action": ["dynamodb:PutItem", "dynamodb:GetItem", "dynamodb:Query", "dynamodb:Scan"],
            "Resource": config.subscriptions_table_arn()
        }),
    ];

    if let Some(consumer) = &config.consumer_account_id {
        statements.push(json!({
            "Sid": "ShareWithConsumer",
            "Effect": "Allow",
            "Action": ["ram:AssociateResourceShare", "ram:GetResourceShares"],
            "Resource": "*",
            "Condition": {
                "StringEquals": { "ram:Principal": consumer.as_str() }
            }
        }));
    }
    statements
}

/// Trust policy letting principals of `account` assume a role.
pub fn assume_role_policy(account: &AccountId) -> String {
    json!({
        "Version": POLICY_VERSION,
        "Statement": [trust_statement(account)]
    })
    .to_string()
}

/// Inline group policy allowing members to assume `role_arn`.
pub fn group_assume_role_policy(role_arn: &str) -> String {
    json!({
        "Version": POLICY_VERSION,
        "Statement": [{
            "Effect": "Allow",
            "Action": ASSUME_ROLE_ACTION,
            "Resource": role_arn
        }]
    })
    .to_string()
}

fn trust_statement(account: &AccountId) -> Value {
    json!({
        "Effect": "Allow",
        "Principal": { "AWS": account.root_arn() },
        "Action": ASSUME_ROLE_ACTION
    })
}

/// IAM returns policy documents URL-encoded; plain JSON passes through.
pub fn decode_policy_document(raw: &str) -> Result<String> {
    if raw.trim_start().starts_with('{') {
        return Ok(raw.to_string());
    }
    let decoded = urlencoding::decode(raw).context("Policy document is not valid URL encoding")?;
    Ok(decoded.into_owned())
}

/// Adds a trust statement for `account` to a trust policy.
///
/// Returns `None` when the account can already assume the role, so callers
/// can skip the update.
pub fn add_account_trust(document: &str, account: &AccountId) -> Result<Option<String>> {
    let mut policy: Value =
        serde_json::from_str(document).context("Trust policy is not valid JSON")?;

    if trusted_principals(&policy)
        .iter()
        .any(|p| principal_is_account(p, account))
    {
        return Ok(None);
    }

    let object = policy
        .as_object_mut()
        .context("Trust policy is not a JSON object")?;
    let mut statements = match object.remove("Statement") {
        None => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(single) => vec![single],
    };
    statements.push(trust_statement(account));
    object.insert("Statement".to_string(), Value::Array(statements));
    object
        .entry("Version")
        .or_insert_with(|| Value::String(POLICY_VERSION.to_string()));

    Ok(Some(policy.to_string()))
}

/// AWS principals allowed to call `sts:AssumeRole` by a trust policy.
pub fn trusted_principals(policy: &Value) -> Vec<String> {
    let statements: Vec<&Value> = match policy.get("Statement") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
        None => Vec::new(),
    };

    statements
        .into_iter()
        .filter(|s| s.get("Effect").and_then(Value::as_str) == Some("Allow"))
        .filter(|s| string_or_list(s.get("Action")).iter().any(|a| a == ASSUME_ROLE_ACTION))
        .flat_map(|s| string_or_list(s.get("Principal").and_then(|p| p.get("AWS"))))
        .collect()
}

fn principal_is_account(principal: &str, account: &AccountId) -> bool {
    principal == account.as_str() || principal == account.root_arn()
}

fn string_or_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
