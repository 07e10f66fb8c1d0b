use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use kafka_offset_test::broker::KafkaBroker;
use kafka_offset_test::cli::Params;
use kafka_offset_test::logging::Logging;
use kafka_offset_test::signal::Shutdown;
use kafka_offset_test::{run, AppConfig, LoadOptions};

// cargo run -- --config ./prod.conf --loglevel debug --logpretty

#[tokio::main]
async fn main() -> Result<()> {
    let params = Params::parse();
    let service = std::env::args()
        .next()
        .unwrap_or_else(|| "offset-test".to_string());
    let logging = Logging::new(&service, params.loglevel, params.logpretty);

    logging.scope(start(params, logging.clone())).await
}

async fn start(params: Params, logging: Logging) -> Result<()> {
    info!(level = %logging.level(), "started");

    // Install before connecting so an early Ctrl-C still shuts down cleanly.
    let shutdown = Shutdown::install().context("installing signal handlers")?;

    let options = LoadOptions::new(params.config.map(PathBuf::from));
    let config = AppConfig::load(&options)
        .inspect_err(|e| error!(error = %e, "error reading configuration"))
        .context("loading configuration")?;

    let broker = KafkaBroker::default();
    let report = run(&broker, &config, shutdown.wait())
        .await
        .inspect_err(|e| error!(error = %e, "consumer failed"))
        .context("running consumer")?;

    println!("Consumed: {}", report.consumed);
    Ok(())
}
