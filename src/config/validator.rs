//! Configuration validation

use super::*;
use crate::error::ConfigError;
use crate::partition::routing_shift;
use anyhow::Result;
use std::collections::HashSet;

/// Validate complete configuration for the node running as `local_id`
pub fn validate_config(config: &Config, local_id: usize) -> Result<()> {
    validate_topology(&config.servers)?;
    validate_exchange(&config.exchange)?;

    if config.server(local_id).is_none() {
        return Err(ConfigError::UnknownServer(local_id).into());
    }

    Ok(())
}

/// Validate cluster membership
///
/// The node count must suit the partitioner and server ids must cover
/// exactly `[0, count)` so that every routing destination has an owner.
pub fn validate_topology(servers: &[ServerEntry]) -> Result<(), ConfigError> {
    let count = servers.len();
    routing_shift(count)?;

    let mut seen = HashSet::with_capacity(count);
    for server in servers {
        if server.server_id >= count {
            return Err(ConfigError::IdOutOfRange {
                id: server.server_id,
                count,
            });
        }
        if !seen.insert(server.server_id) {
            return Err(ConfigError::DuplicateServer(server.server_id));
        }
        if server.port == 0 {
            return Err(ConfigError::InvalidPort {
                id: server.server_id,
                port: server.port.to_string(),
            });
        }
    }

    Ok(())
}

/// Validate exchange tuning
pub fn validate_exchange(exchange: &ExchangeConfig) -> Result<()> {
    if exchange.dial_attempts == 0 {
        anyhow::bail!("dial_attempts must be at least 1");
    }
    if exchange.channel_capacity == 0 {
        anyhow::bail!("channel_capacity must be at least 1");
    }
    if exchange.bind_host.trim().is_empty() {
        anyhow::bail!("bind_host must not be empty");
    }

    Ok(())
}
