//! Storage configuration.
//!
//! The configuration is consumed as an already-parsed mapping. It is read once
//! when a [`StorageOrchestrator`](crate::StorageOrchestrator) is built and never
//! mutated afterwards.
//!
//! ```
//! use depot::{BackendType, StorageConfig};
//!
//! let config = StorageConfig::from_json_str(r#"{
//!     "default_storage_type": "remote",
//!     "server": {
//!         "local": { "root": "/srv/app", "base_url": "https://app.example.com" },
//!         "remote": {
//!             "files_leading_path": "uploads",
//!             "s3": { "bucket": "app-images", "region": "eu-west-1" }
//!         }
//!     }
//! }"#).unwrap();
//!
//! assert_eq!(config.default_storage_type, BackendType::Remote);
//! assert_eq!(config.server_config("remote").path_prefix.as_deref(), Some("uploads"));
//! assert!(config.server_config("backup").s3.is_none());
//! ```

use crate::orchestrator::SearchOrder;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Tag naming one storage backend.
///
/// Any string parses. Names other than `local`, `remote` and `backup` become
/// [`BackendType::Unknown`] and resolve to a no-op backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum BackendType {
    Local,
    Remote,
    Backup,
    Unknown(String),
}

impl BackendType {
    /// The known backend types, in broadcast order.
    pub const ALL: [BackendType; 3] = [BackendType::Local, BackendType::Remote, BackendType::Backup];

    pub fn as_str(&self) -> &str {
        match self {
            BackendType::Local => "local",
            BackendType::Remote => "remote",
            BackendType::Backup => "backup",
            BackendType::Unknown(name) => name,
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for BackendType {
    fn from(name: &str) -> Self {
        match name {
            "local" => BackendType::Local,
            "remote" => BackendType::Remote,
            "backup" => BackendType::Backup,
            other => BackendType::Unknown(other.to_string()),
        }
    }
}

impl From<String> for BackendType {
    fn from(name: String) -> Self {
        BackendType::from(name.as_str())
    }
}

impl FromStr for BackendType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(BackendType::from(s))
    }
}

/// Top-level storage configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
    /// Backend used by `store_file` when no backend list is given.
    #[serde(default = "default_storage_type")]
    pub default_storage_type: BackendType,

    /// Probe order for existence checks and URL resolution.
    #[serde(default)]
    pub search_order: SearchOrder,

    /// Which `server` group configures which backend.
    #[serde(default)]
    pub groups: ConfigGroups,

    /// Backend settings keyed by config-group name.
    #[serde(default)]
    pub server: HashMap<String, ServerConfig>,
}

fn default_storage_type() -> BackendType {
    BackendType::Local
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_storage_type: default_storage_type(),
            search_order: SearchOrder::default(),
            groups: ConfigGroups::default(),
            server: HashMap::new(),
        }
    }
}

impl StorageConfig {
    /// Create a configuration with the given default backend and no server groups.
    pub fn new(default_storage_type: BackendType) -> Self {
        Self {
            default_storage_type,
            ..Default::default()
        }
    }

    /// Deserialize from an already-parsed JSON mapping.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(Error::Config)
    }

    /// Deserialize from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::Config)
    }

    /// Add or replace a server group.
    pub fn with_server(mut self, group: impl Into<String>, config: ServerConfig) -> Self {
        self.server.insert(group.into(), config);
        self
    }

    /// Replace the default search order.
    pub fn with_search_order(mut self, order: SearchOrder) -> Self {
        self.search_order = order;
        self
    }

    /// Replace the config-group names.
    pub fn with_groups(mut self, groups: ConfigGroups) -> Self {
        self.groups = groups;
        self
    }

    /// Settings for `group`, or an empty configuration when the group is missing.
    pub fn server_config(&self, group: &str) -> ServerConfig {
        self.server.get(group).cloned().unwrap_or_default()
    }
}

/// Config-group names used to configure each backend.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigGroups {
    pub local: String,
    pub remote: String,
    pub backup: String,
}

impl Default for ConfigGroups {
    fn default() -> Self {
        Self {
            local: "local".to_string(),
            remote: "remote".to_string(),
            backup: "backup".to_string(),
        }
    }
}

/// Settings for one backend. Every field is optional; an empty group is valid.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Local root directory. Defaults to the working directory.
    pub root: Option<PathBuf>,

    /// Public base URL for local files.
    pub base_url: Option<String>,

    /// Prefix applied to every remote object key.
    #[serde(alias = "files_leading_path")]
    pub path_prefix: Option<String>,

    /// Base URL used for remote objects instead of the bucket URL (e.g. a CDN).
    pub public_url: Option<String>,

    /// Object-store client settings.
    pub s3: Option<S3Settings>,
}

impl ServerConfig {
    /// Settings for a local backend rooted at `root`.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Default::default()
        }
    }

    /// Settings for a remote backend on `bucket` under `path_prefix`.
    pub fn remote(bucket: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            path_prefix: Some(path_prefix.into()),
            s3: Some(S3Settings {
                bucket: bucket.into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = Some(public_url.into());
        self
    }
}

/// S3-compatible client settings for one remote group.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct S3Settings {
    pub bucket: String,
    pub region: Option<String>,
    /// Custom endpoint (MinIO, DigitalOcean Spaces, Wasabi, ...).
    pub endpoint: Option<String>,
    #[serde(alias = "use_path_style_endpoint")]
    pub force_path_style: bool,
    pub credentials: Option<Credentials>,
}

/// Static access credentials.
#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    pub key: String,
    pub secret: SecretString,
}
