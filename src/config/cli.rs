//! CLI argument parsing using clap

use clap::Parser;
use std::path::PathBuf;

/// netsort - distributed sort of 100-byte records across a static cluster
#[derive(Parser, Debug)]
#[command(name = "netsort")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// This node's server id (must appear in the topology file)
    #[arg(value_name = "SERVER_ID")]
    pub server_id: usize,

    /// Input shard of fixed-size records
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file for this node's sorted key range
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// TOML topology file listing every server
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Delay before broadcasting, in milliseconds (overrides [exchange].warmup_ms)
    #[arg(long)]
    pub warmup_ms: Option<u64>,

    /// Dial attempts per peer (overrides [exchange].dial_attempts)
    #[arg(long)]
    pub dial_attempts: Option<u32>,

    /// Sleep between dial attempts, in milliseconds (overrides [exchange].dial_backoff_ms)
    #[arg(long)]
    pub dial_backoff_ms: Option<u64>,

    /// Log filter (e.g. info, debug, netsort=trace); RUST_LOG wins when set
    #[arg(long, env = "NETSORT_LOG", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.dial_attempts == Some(0) {
            anyhow::bail!("dial_attempts must be at least 1");
        }
        if self.input == self.output {
            anyhow::bail!("input and output must be different files");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::parse_from(["netsort", "3", "in.dat", "out.dat", "cluster.toml"]);

        assert_eq!(cli.server_id, 3);
        assert_eq!(cli.input, PathBuf::from("in.dat"));
        assert_eq!(cli.output, PathBuf::from("out.dat"));
        assert_eq!(cli.config, PathBuf::from("cluster.toml"));
        assert!(cli.warmup_ms.is_none());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_server_id_must_be_integer() {
        assert!(Cli::try_parse_from(["netsort", "zero", "in", "out", "cfg"]).is_err());
    }

    #[test]
    fn test_missing_arguments() {
        assert!(Cli::try_parse_from(["netsort", "0", "in"]).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let cli = Cli::parse_from(["netsort", "0", "in", "out", "cfg", "--dial-attempts", "0"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_same_input_and_output() {
        let cli = Cli::parse_from(["netsort", "0", "data", "data", "cfg"]);
        assert!(cli.validate().is_err());
    }
}
