//! Configuration module
//!
//! Handles CLI argument parsing, the TOML topology file, and validation.

pub mod cli;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Static cluster membership
    pub servers: Vec<ServerEntry>,
    /// Exchange tuning
    #[serde(default)]
    pub exchange: ExchangeConfig,
}

/// One cluster member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(rename = "serverId", alias = "server_id")]
    pub server_id: usize,
    pub host: String,
    /// Accepts `port = 8080` as well as `port = "8080"`
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
}

impl ServerEntry {
    /// `host:port` as written in the topology
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Exchange tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Fixed delay between starting the listener and broadcasting
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,
    /// Dial attempts per peer before giving up
    #[serde(default = "default_dial_attempts")]
    pub dial_attempts: u32,
    /// Sleep between dial attempts
    #[serde(default = "default_dial_backoff_ms")]
    pub dial_backoff_ms: u64,
    /// Interface the listener binds to
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    /// Bound on connection results waiting for the aggregator
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_warmup_ms() -> u64 {
    8000
}

fn default_dial_attempts() -> u32 {
    10
}

fn default_dial_backoff_ms() -> u64 {
    1000
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            warmup_ms: default_warmup_ms(),
            dial_attempts: default_dial_attempts(),
            dial_backoff_ms: default_dial_backoff_ms(),
            bind_host: default_bind_host(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl ExchangeConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn dial_backoff(&self) -> Duration {
        Duration::from_millis(self.dial_backoff_ms)
    }
}

impl Config {
    /// Number of nodes in the cluster
    pub fn node_count(&self) -> usize {
        self.servers.len()
    }

    /// Topology entry for a server id
    pub fn server(&self, server_id: usize) -> Option<&ServerEntry> {
        self.servers.iter().find(|s| s.server_id == server_id)
    }

    /// `(host, port)` for a server id
    pub fn address_of(&self, server_id: usize) -> Option<(&str, u16)> {
        self.server(server_id).map(|s| (s.host.as_str(), s.port))
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} servers [", self.servers.len())?;
        for (i, server) in self.servers.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", server.server_id, server.address())?;
        }
        write!(
            f,
            "], warmup={}ms, dial={}x{}ms",
            self.exchange.warmup_ms, self.exchange.dial_attempts, self.exchange.dial_backoff_ms
        )
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        Text(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(port) => Ok(port),
        PortValue::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port {:?}", text))),
    }
}
