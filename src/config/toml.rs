//! TOML topology file parsing

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML topology file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML topology from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Config {
    if let Some(warmup_ms) = cli.warmup_ms {
        config.exchange.warmup_ms = warmup_ms;
    }
    if let Some(attempts) = cli.dial_attempts {
        config.exchange.dial_attempts = attempts;
    }
    if let Some(backoff_ms) = cli.dial_backoff_ms {
        config.exchange.dial_backoff_ms = backoff_ms;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const TWO_NODES: &str = r#"
        [[servers]]
        serverId = 0
        host = "localhost"
        port = "8080"

        [[servers]]
        server_id = 1
        host = "10.0.1.11"
        port = 8081
    "#;

    #[test]
    fn test_parse_servers() {
        let config = parse_toml_string(TWO_NODES).unwrap();

        assert_eq!(config.node_count(), 2);
        assert_eq!(config.address_of(0), Some(("localhost", 8080)));
        assert_eq!(config.address_of(1), Some(("10.0.1.11", 8081)));
        assert_eq!(config.address_of(2), None);
    }

    #[test]
    fn test_exchange_defaults() {
        let config = parse_toml_string(TWO_NODES).unwrap();

        assert_eq!(config.exchange.warmup_ms, 8000);
        assert_eq!(config.exchange.dial_attempts, 10);
        assert_eq!(config.exchange.dial_backoff_ms, 1000);
        assert_eq!(config.exchange.bind_host, "0.0.0.0");
    }

    #[test]
    fn test_exchange_section() {
        let text = format!("{}\n[exchange]\nwarmup_ms = 0\ndial_attempts = 3\n", TWO_NODES);
        let config = parse_toml_string(&text).unwrap();

        assert_eq!(config.exchange.warmup_ms, 0);
        assert_eq!(config.exchange.dial_attempts, 3);
        assert_eq!(config.exchange.dial_backoff_ms, 1000);
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let text = r#"
            [[servers]]
            serverId = 0
            host = "localhost"
            port = "http"
        "#;
        assert!(parse_toml_string(text).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let cli = Cli::parse_from([
            "netsort", "0", "in.dat", "out.dat", "cluster.toml",
            "--warmup-ms", "250", "--dial-backoff-ms", "20",
        ]);
        let config = merge_cli_with_config(&cli, parse_toml_string(TWO_NODES).unwrap());

        assert_eq!(config.exchange.warmup_ms, 250);
        assert_eq!(config.exchange.dial_backoff_ms, 20);
        assert_eq!(config.exchange.dial_attempts, 10);
    }
}
