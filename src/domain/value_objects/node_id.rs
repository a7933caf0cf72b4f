//! Node identity value object
//!
//! A node is identified by the `(user, host, port)` triple used to reach it.
//! Two nodes with the same triple are the same node, whatever their remote root.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Default SSH port used when a node spec omits it.
pub const DEFAULT_PORT: u16 = 22;

/// Unique key of a node within a fleet.
///
/// Ordering is lexicographic on `(user, host, port)`; the fleet uses it as the
/// fixed fan-out order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId {
    user: String,
    host: String,
    port: u16,
}

impl NodeId {
    pub fn new(user: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            port,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `user@host`, the destination form understood by `ssh`.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// A node identity plus the remote directory it mirrors into.
///
/// Parsed from `user@host[:port]:/remote/root`, e.g. `deploy@10.0.0.5:2222:/srv/app`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub id: NodeId,
    pub remote_root: String,
}

/// Error when a node spec string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSpecError {
    /// No `user@` prefix.
    MissingUser,
    /// Host part is empty.
    MissingHost,
    /// No `:/remote/root` suffix.
    MissingRemoteRoot,
    /// Port is not a number in 1..=65535.
    InvalidPort(String),
}

impl fmt::Display for NodeSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeSpecError::MissingUser => write!(f, "missing 'user@' prefix"),
            NodeSpecError::MissingHost => write!(f, "missing host"),
            NodeSpecError::MissingRemoteRoot => write!(f, "missing ':<remote root>' suffix"),
            NodeSpecError::InvalidPort(port) => write!(f, "invalid port '{}'", port),
        }
    }
}

impl std::error::Error for NodeSpecError {}

impl FromStr for NodeSpec {
    type Err = NodeSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (user, rest) = s.split_once('@').ok_or(NodeSpecError::MissingUser)?;
        if user.is_empty() {
            return Err(NodeSpecError::MissingUser);
        }

        let (host, rest) = rest
            .split_once(':')
            .ok_or(NodeSpecError::MissingRemoteRoot)?;
        if host.is_empty() {
            return Err(NodeSpecError::MissingHost);
        }

        // `rest` is either `<port>:<root>` or `<root>`
        let (port, remote_root) = match rest.split_once(':') {
            Some((port, root)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                let port = port
                    .parse::<u16>()
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| NodeSpecError::InvalidPort(port.to_string()))?;
                (port, root)
            }
            _ => (DEFAULT_PORT, rest),
        };

        if remote_root.is_empty() {
            return Err(NodeSpecError::MissingRemoteRoot);
        }

        Ok(NodeSpec {
            id: NodeId::new(user, host, port),
            remote_root: remote_root.to_string(),
        })
    }
}
