//! TOML configuration for a node.
//!
//! Every field has a default, so a missing file or a partial file both work:
//!
//! ```toml
//! [network]
//! local_port = 5011
//! peer_port = 5013
//! bind_address = "auto"      # or an explicit local IP
//!
//! [timing]
//! publish_interval_ms = 10
//! limiter_poll_interval_ms = 10
//! limiter_settle_ms = 100
//! actuation_queue_depth = 32
//!
//! # node name -> IP address of that node's peer
//! [nodes]
//! exoskeleton1 = "192.168.17.52"
//! exoskeleton2 = "192.168.17.235"
//! ```
//!
//! A `[nodes]` table in the file replaces the default table entirely.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::enforce_boundary::LimiterTiming;
use crate::infrastructure::network::{route_local_ip, NodeIdentity, TransportError};

/// `bind_address` value that selects the interface routing to the peer.
pub const AUTO_BIND_ADDRESS: &str = "auto";

/// Error type for configuration loading and identity resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The node name is not in the `[nodes]` table.
    #[error("unknown node {0:?}; add it to the [nodes] table")]
    UnknownNode(String),

    /// A timing value that must be positive is zero.
    #[error("timing.{0} must be greater than zero")]
    ZeroTiming(&'static str),

    /// An address in the config is not a valid IP address.
    #[error("invalid IP address {value:?} for {field}")]
    InvalidAddress { field: String, value: String },

    /// `bind_address = "auto"` and no local interface routes to the peer.
    #[error(transparent)]
    Route(#[from] TransportError),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default = "default_nodes")]
    pub nodes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// UDP port this node listens on.
    #[serde(default = "default_local_port")]
    pub local_port: u16,
    /// UDP port the peer listens on.
    #[serde(default = "default_peer_port")]
    pub peer_port: u16,
    /// Local IP to bind, or `"auto"`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,
    #[serde(default = "default_limiter_poll_interval_ms")]
    pub limiter_poll_interval_ms: u64,
    #[serde(default = "default_limiter_settle_ms")]
    pub limiter_settle_ms: u64,
    /// Motion targets buffered between the receive loop and the actuators.
    #[serde(default = "default_actuation_queue_depth")]
    pub actuation_queue_depth: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_local_port() -> u16 {
    5011
}
fn default_peer_port() -> u16 {
    5013
}
fn default_bind_address() -> String {
    AUTO_BIND_ADDRESS.to_string()
}
fn default_publish_interval_ms() -> u64 {
    10
}
fn default_limiter_poll_interval_ms() -> u64 {
    10
}
fn default_limiter_settle_ms() -> u64 {
    100
}
fn default_actuation_queue_depth() -> usize {
    32
}
fn default_nodes() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("exoskeleton1".to_string(), "192.168.17.52".to_string()),
        ("exoskeleton2".to_string(), "192.168.17.235".to_string()),
    ])
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            timing: TimingConfig::default(),
            nodes: default_nodes(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            local_port: default_local_port(),
            peer_port: default_peer_port(),
            bind_address: default_bind_address(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            publish_interval_ms: default_publish_interval_ms(),
            limiter_poll_interval_ms: default_limiter_poll_interval_ms(),
            limiter_settle_ms: default_limiter_settle_ms(),
            actuation_queue_depth: default_actuation_queue_depth(),
        }
    }
}

impl TimingConfig {
    /// Rejects values the node cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroTiming`] naming the first zero field among
    /// the publish and poll intervals and the queue depth.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("publish_interval_ms", self.publish_interval_ms == 0),
            ("limiter_poll_interval_ms", self.limiter_poll_interval_ms == 0),
            ("actuation_queue_depth", self.actuation_queue_depth == 0),
        ];
        match fields.into_iter().find(|(_, zero)| *zero) {
            Some((field, _)) => Err(ConfigError::ZeroTiming(field)),
            None => Ok(()),
        }
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    pub fn limiter(&self) -> LimiterTiming {
        LimiterTiming {
            poll_interval: Duration::from_millis(self.limiter_poll_interval_ms),
            settle: Duration::from_millis(self.limiter_settle_ms),
        }
    }
}

// ── Loading and identity ──────────────────────────────────────────────────────

impl NodeConfig {
    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed and
    /// [`ConfigError::ZeroTiming`] if a timing value is zero.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.timing.validate()?;
        Ok(config)
    }

    /// Loads the config at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Resolves the local and peer endpoints of `node_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownNode`] for a name missing from `[nodes]`,
    /// [`ConfigError::InvalidAddress`] for an unparsable IP, and
    /// [`ConfigError::Route`] when `"auto"` finds no route to the peer.
    pub fn identity(&self, node_name: &str) -> Result<NodeIdentity, ConfigError> {
        let peer_text = self
            .nodes
            .get(node_name)
            .ok_or_else(|| ConfigError::UnknownNode(node_name.to_string()))?;
        let peer_ip = parse_ip(&format!("nodes.{node_name}"), peer_text)?;

        let bind = self.network.bind_address.trim();
        let local_ip = if bind.eq_ignore_ascii_case(AUTO_BIND_ADDRESS) {
            route_local_ip(peer_ip)?
        } else {
            parse_ip("network.bind_address", bind)?
        };

        Ok(NodeIdentity {
            node_name: node_name.to_string(),
            local: SocketAddr::new(local_ip, self.network.local_port),
            peer: SocketAddr::new(peer_ip, self.network.peer_port),
        })
    }
}

fn parse_ip(field: &str, value: &str) -> Result<IpAddr, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidAddress {
        field: field.to_string(),
        value: value.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
