//! cosmoscale.toml settings parser.
//!
//! Collections can be listed inline under `[[accounts]]` or kept in a
//! separate JSON document (`run.accounts_file`) using PascalCase field
//! names (`DatabaseAccount`, `DatabaseList`, `CollectionList`, ...).
//! Both forms deserialize into the same types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::parse_duration;
use crate::types::{CapacityPolicy, ManagedCollection, ResourceId};

/// Errors raised while loading or validating settings. All of them are
/// fatal for the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid accounts file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub azure: AzureSettings,
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// Which Azure cloud the endpoints belong to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cloud {
    #[default]
    China,
    Public,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AzureSettings {
    #[serde(default)]
    pub cloud: Cloud,
    pub subscription: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for AzureSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureSettings")
            .field("cloud", &self.cloud)
            .field("subscription", &self.subscription)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    /// Collections evaluated in parallel. `1` runs them one after another.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Timeout applied to every external call.
    #[serde(default = "default_call_timeout")]
    pub call_timeout: String,
    /// Evaluate but never write capacity changes.
    #[serde(default)]
    pub dry_run: bool,
    /// Optional JSON document with additional accounts, resolved relative
    /// to the settings file.
    pub accounts_file: Option<PathBuf>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            call_timeout: default_call_timeout(),
            dry_run: false,
            accounts_file: None,
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_call_timeout() -> String {
    "30s".to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(alias = "DatabaseAccount")]
    pub database_account: String,
    #[serde(alias = "ResourceGroup")]
    pub resource_group: String,
    /// Base64 master key for the account.
    #[serde(alias = "PrimaryKey")]
    pub primary_key: String,
    #[serde(default, alias = "DatabaseList")]
    pub databases: Vec<DatabaseConfig>,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("database_account", &self.database_account)
            .field("resource_group", &self.resource_group)
            .field("primary_key", &"<redacted>")
            .field("databases", &self.databases)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Resource id used by the metrics API.
    #[serde(alias = "Key")]
    pub key: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "CollectionList")]
    pub collections: Vec<CollectionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Resource id used by the metrics API.
    #[serde(alias = "Key")]
    pub key: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "DefaultValue")]
    pub default_value: u64,
    #[serde(alias = "ThresholdRate")]
    pub threshold_rate: f64,
    #[serde(default, alias = "IncreaseRate")]
    pub increase_rate: f64,
}

impl Settings {
    /// Load, merge the optional accounts file, and validate.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = read(path)?;
        let mut settings: Settings = toml::from_str(&content)?;

        if let Some(accounts_file) = settings.run.accounts_file.clone() {
            let resolved = match path.parent() {
                Some(dir) if accounts_file.is_relative() => dir.join(&accounts_file),
                _ => accounts_file,
            };
            let extra = load_accounts_json(&resolved)?;
            settings.accounts.extend(extra);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Check the invariants every pass relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        require_non_empty("azure.subscription", &self.azure.subscription)?;
        require_non_empty("azure.tenant_id", &self.azure.tenant_id)?;
        require_non_empty("azure.client_id", &self.azure.client_id)?;
        require_non_empty("azure.client_secret", &self.azure.client_secret)?;

        if self.run.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "run.concurrency must be at least 1".to_string(),
            ));
        }
        self.call_timeout()?;

        let mut total = 0usize;
        for account in &self.accounts {
            require_non_empty("database_account", &account.database_account)?;
            require_non_empty("resource_group", &account.resource_group)?;
            require_non_empty("primary_key", &account.primary_key)?;

            for database in &account.databases {
                require_non_empty("database key", &database.key)?;
                require_non_empty("database name", &database.name)?;

                for collection in &database.collections {
                    let id = ResourceId::new(
                        &account.database_account,
                        &database.name,
                        &collection.name,
                    );
                    require_non_empty("collection key", &collection.key)?;
                    require_non_empty("collection name", &collection.name)?;
                    collection.policy().validate().map_err(|reason| {
                        ConfigError::Invalid(format!("{id}: {reason}"))
                    })?;
                    total += 1;
                }
            }
        }

        if total == 0 {
            return Err(ConfigError::Invalid(
                "no collections configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed `run.call_timeout`.
    pub fn call_timeout(&self) -> ConfigResult<Duration> {
        match parse_duration(&self.run.call_timeout) {
            Some(d) if !d.is_zero() => Ok(d),
            _ => Err(ConfigError::Invalid(format!(
                "run.call_timeout {:?} is not a positive duration",
                self.run.call_timeout
            ))),
        }
    }

    /// Flatten accounts → databases → collections, in file order.
    pub fn collections(&self) -> Vec<ManagedCollection> {
        let mut out = Vec::new();
        for account in &self.accounts {
            for database in &account.databases {
                for collection in &database.collections {
                    out.push(ManagedCollection {
                        id: ResourceId::new(
                            &account.database_account,
                            &database.name,
                            &collection.name,
                        ),
                        resource_group: account.resource_group.clone(),
                        database_key: database.key.clone(),
                        collection_key: collection.key.clone(),
                        policy: collection.policy(),
                    });
                }
            }
        }
        out
    }
}

impl CollectionConfig {
    pub fn policy(&self) -> CapacityPolicy {
        CapacityPolicy {
            threshold_rate: self.threshold_rate,
            increase_rate: self.increase_rate,
            default_value: self.default_value,
        }
    }
}

impl CapacityPolicy {
    /// Reject policies the decider cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        if !self.threshold_rate.is_finite() || self.threshold_rate <= 0.0 {
            return Err(format!(
                "threshold_rate must be > 0, got {}",
                self.threshold_rate
            ));
        }
        if !self.increase_rate.is_finite() || self.increase_rate < 0.0 {
            return Err(format!(
                "increase_rate must be >= 0, got {}",
                self.increase_rate
            ));
        }
        Ok(())
    }
}

/// Parse a JSON accounts document (a top-level array of accounts).
pub fn load_accounts_json(path: &Path) -> ConfigResult<Vec<AccountConfig>> {
    let content = read(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn read(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn require_non_empty(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must not be empty")));
    }
    Ok(())
}
