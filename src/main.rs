//! netsort CLI entry point

use anyhow::{Context, Result};
use netsort::config::{cli::Cli, toml, validator};
use netsort::node::SortNode;
use netsort::record::RecordFile;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    let cli = Cli::parse_args();
    init_tracing(&cli.log_level);

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Install the log subscriber; `RUST_LOG` overrides `--log-level`
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .compact()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let start = Instant::now();
    cli.validate()?;

    let config = toml::parse_toml_file(&cli.config)?;
    let config = toml::merge_cli_with_config(&cli, config);
    validator::validate_config(&config, cli.server_id)
        .context("Configuration validation failed")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        server_id = cli.server_id,
        input = %cli.input.display(),
        output = %cli.output.display(),
        "netsort starting"
    );
    info!(topology = %config, "configuration loaded");

    let node = SortNode::new(Arc::new(config), cli.server_id)?;
    let mut source = RecordFile::new(&cli.input);
    let mut sink = RecordFile::new(&cli.output);

    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;
    let summary = runtime.block_on(node.run(&mut source, &mut sink))?;

    for peer in summary.aggregation.peers() {
        info!(
            %peer,
            fin = summary.aggregation.fin_status[&peer],
            records = summary.aggregation.per_peer.get(&peer).copied().unwrap_or(0),
            "peer summary"
        );
    }
    info!(
        shard = summary.shard_records,
        kept = summary.kept_records,
        received = summary.received_records,
        written = summary.output_records,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "sorted data written to {}",
        cli.output.display()
    );

    Ok(())
}
