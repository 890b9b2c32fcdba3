//! Session configuration.
//!
//! Everything the mesh operations need to know up front lives in
//! [`MeshConfig`]. Values come from the caller or from the environment
//! (optionally seeded by a `.env` file).

use crate::account::AccountId;
use crate::error::MeshError;
use anyhow::Result;
use std::env;
use std::str::FromStr;
use tracing::Level;

pub const REGION_ENV: &str = "AWS_REGION";
pub const LOG_LEVEL_ENV: &str = "DATA_MESH_LOG_LEVEL";
pub const MESH_ACCOUNT_ENV: &str = "DATA_MESH_ACCOUNT_ID";
pub const PRODUCER_ACCOUNT_ENV: &str = "DATA_MESH_PRODUCER_ACCOUNT_ID";
pub const CONSUMER_ACCOUNT_ENV: &str = "DATA_MESH_CONSUMER_ACCOUNT_ID";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshConfig {
    pub region: String,
    pub log_level: Level,
    /// Known up front only when operating against an existing mesh; the
    /// bootstrapper resolves it from the caller identity.
    pub data_mesh_account_id: Option<AccountId>,
    pub producer_account_id: Option<AccountId>,
    pub consumer_account_id: Option<AccountId>,
}

impl MeshConfig {
    /// Builds a config for `region`, which `AWS_REGION` overrides when set.
    pub fn new(region: Option<&str>) -> Result<Self> {
        let region = resolve_region(env::var(REGION_ENV).ok(), region.map(str::to_string))?;
        Ok(Self {
            region,
            log_level: Level::INFO,
            data_mesh_account_id: None,
            producer_account_id: None,
            consumer_account_id: None,
        })
    }

    /// Reads every recognised variable from the environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::new(None)?.with_overrides(|name| env::var(name).ok())
    }

    /// Applies the log level and account variables found by `lookup`.
    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let account = |name: &str| var(name).map(|v| v.parse::<AccountId>()).transpose();

        if let Some(level) = var(LOG_LEVEL_ENV) {
            self = self.with_log_level(parse_log_level(&level)?);
        }
        if let Some(mesh) = account(MESH_ACCOUNT_ENV)? {
            self = self.with_data_mesh_account(mesh);
        }
        if let Some(producer) = account(PRODUCER_ACCOUNT_ENV)? {
            self = self.with_producer_account(producer);
        }
        if let Some(consumer) = account(CONSUMER_ACCOUNT_ENV)? {
            self = self.with_consumer_account(consumer);
        }
        Ok(self)
    }

    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_data_mesh_account(mut self, account: AccountId) -> Self {
        self.data_mesh_account_id = Some(account);
        self
    }

    pub fn with_producer_account(mut self, account: AccountId) -> Self {
        self.producer_account_id = Some(account);
        self
    }

    pub fn with_consumer_account(mut self, account: AccountId) -> Self {
        self.consumer_account_id = Some(account);
        self
    }
}

/// The environment wins over the supplied region; neither is an error.
pub fn resolve_region(from_env: Option<String>, supplied: Option<String>) -> Result<String> {
    from_env
        .filter(|r| !r.trim().is_empty())
        .or(supplied.filter(|r| !r.trim().is_empty()))
        .map(|r| r.trim().to_string())
        .ok_or_else(|| MeshError::MissingRegion.into())
}

pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim()).map_err(|_| MeshError::InvalidLogLevel(level.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_environment_region_wins() {
        let region = resolve_region(Some("eu-west-1".into()), Some("us-east-1".into())).unwrap();
        assert_eq!(region, "eu-west-1");
    }

    #[test]
    fn test_supplied_region_used_without_environment() {
        let region = resolve_region(None, Some("ap-southeast-2".into())).unwrap();
        assert_eq!(region, "ap-southeast-2");

        let region = resolve_region(Some("  ".into()), Some("us-west-2".into())).unwrap();
        assert_eq!(region, "us-west-2");
    }

    #[test]
    fn test_missing_region_is_an_error() {
        let err = resolve_region(None, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MeshError>(),
            Some(MeshError::MissingRegion)
        ));
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("INFO").unwrap(), Level::INFO);
        let err = parse_log_level("chatty").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MeshError>(),
            Some(MeshError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn test_builder_methods() {
        let mesh: AccountId = "111111111111".parse().unwrap();
        let config = MeshConfig {
            region: "us-east-1".into(),
            log_level: Level::INFO,
            data_mesh_account_id: None,
            producer_account_id: None,
            consumer_account_id: None,
        }
        .with_log_level(Level::DEBUG)
        .with_data_mesh_account(mesh.clone());

        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.data_mesh_account_id, Some(mesh));
        assert!(config.producer_account_id.is_none());
    }

    fn base() -> MeshConfig {
        MeshConfig {
            region: "us-east-1".into(),
            log_level: Level::INFO,
            data_mesh_account_id: None,
            producer_account_id: None,
            consumer_account_id: None,
        }
    }

    #[test]
    fn test_overrides_fill_every_account() {
        let vars: HashMap<&str, &str> = [
            (LOG_LEVEL_ENV, "warn"),
            (MESH_ACCOUNT_ENV, "111111111111"),
            (PRODUCER_ACCOUNT_ENV, "222222222222"),
            (CONSUMER_ACCOUNT_ENV, " 333333333333 "),
        ]
        .into_iter()
        .collect();

        let config = base()
            .with_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.log_level, Level::WARN);
        assert_eq!(config.data_mesh_account_id.unwrap().as_str(), "111111111111");
        assert_eq!(config.producer_account_id.unwrap().as_str(), "222222222222");
        assert_eq!(config.consumer_account_id.unwrap().as_str(), "333333333333");
    }

    #[test]
    fn test_overrides_skip_blank_and_reject_malformed() {
        let config = base()
            .with_overrides(|name| (name == PRODUCER_ACCOUNT_ENV).then(|| "  ".to_string()))
            .unwrap();
        assert_eq!(config, base());

        let err = base()
            .with_overrides(|name| (name == CONSUMER_ACCOUNT_ENV).then(|| "consumer".to_string()))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MeshError>(),
            Some(MeshError::InvalidAccountId(_))
        ));
    }
}
