//! Configuration type definitions

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ports::{ConnectPolicy, Credentials};
use crate::domain::value_objects::{NodeId, NodeSpec, DEFAULT_PORT};
use crate::error::ConfigError;
use crate::infrastructure::remote::SshOptions;

use super::loader::{self, ConfigWarning};

/// Connection settings shared by every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    /// Total connection attempts per session.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Per-attempt connection timeout.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Pause between failed attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Refuse hosts whose key is not already known.
    #[serde(default)]
    pub strict_host_key_checking: bool,

    /// Default private key for nodes without their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            connect_attempts: default_connect_attempts(),
            connect_timeout_secs: default_connect_timeout_secs(),
            retry_delay_ms: default_retry_delay_ms(),
            strict_host_key_checking: false,
            identity_file: None,
        }
    }
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl SshConfig {
    pub fn policy(&self) -> ConnectPolicy {
        ConnectPolicy {
            attempts: self.connect_attempts.max(1),
            timeout: Duration::from_secs(self.connect_timeout_secs),
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn ssh_options(&self) -> SshOptions {
        SshOptions {
            policy: self.policy(),
            accept_new_host_keys: !self.strict_host_key_checking,
        }
    }
}

/// One node to add at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub user: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub remote_root: String,
    /// Overrides `[ssh] identity_file` for this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
}

impl NodeConfig {
    pub fn id(&self) -> NodeId {
        NodeId::new(&self.user, &self.host, self.port)
    }

    /// Node key if set, else the fleet-wide one.
    pub fn credentials(&self, ssh: &SshConfig) -> Credentials {
        Credentials {
            identity_file: self
                .identity_file
                .clone()
                .or_else(|| ssh.identity_file.clone()),
        }
    }
}

impl From<NodeSpec> for NodeConfig {
    fn from(spec: NodeSpec) -> Self {
        Self {
            user: spec.id.user().to_string(),
            host: spec.id.host().to_string(),
            port: spec.id.port(),
            remote_root: spec.remote_root,
            identity_file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Local tree every node mirrors.
    pub local_root: PathBuf,

    /// Archive nodes are bootstrapped from.
    pub local_archive: PathBuf,

    #[serde(default)]
    pub ssh: SshConfig,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeConfig>,
}

impl Config {
    /// Load configuration from a TOML file, discarding warnings.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let (config, _warnings) = Self::load_with_warnings(path)?;
        Ok(config)
    }

    /// Load configuration and collect non-fatal warnings (e.g. unknown keys).
    pub fn load_with_warnings(path: &Path) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        loader::load_with_warnings(path)
    }

    /// Check the invariants the fleet relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.local_root.is_absolute() {
            return Err(ConfigError::NotAbsolute {
                field: "local_root",
                path: self.local_root.clone(),
            });
        }
        if !self.local_archive.is_absolute() {
            return Err(ConfigError::NotAbsolute {
                field: "local_archive",
                path: self.local_archive.clone(),
            });
        }
        Ok(())
    }

    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
