// Person PoC - API server
// Run with: cargo run --bin server -- --flavor event-loop --port 8082

//! # Person API Server Binary
//!
//! Starts the person API on one of the two runtime flavors. The usual
//! comparison setup is three processes:
//!
//! ```text
//! server --port 8080                                  # upstream for the client routes
//! server --port 8081 --flavor thread-per-request      # "classic" server
//! server --port 8082 --flavor event-loop              # "reactive" server
//! bench                                               # hits 8081 and 8082
//! ```
//!
//! ## Rust Learning Notes:
//!
//! There is no `#[tokio::main]` here. The runtime *is* the thing being
//! compared, so `main` builds it explicitly from the chosen flavor and calls
//! `block_on` itself.

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use person_poc::{PersonServerBuilder, PocConfig, RuntimeFlavor};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "person-server")]
#[command(about = "Person API served on a thread-per-request or event-loop runtime")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./poc.toml when present)
    #[arg(long, env = "POC_CONFIG")]
    config: Option<PathBuf>,

    /// Runtime flavor: thread-per-request (threaded, mvc) or event-loop (reactive, flux)
    #[arg(long, env = "POC_FLAVOR", default_value = "event-loop")]
    flavor: RuntimeFlavor,

    /// Override the flavor's worker count
    #[arg(long)]
    workers: Option<usize>,

    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Simulated service delay in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Base URL of the upstream person server used by the client routes
    #[arg(long)]
    upstream: Option<String>,

    /// Concurrency cap of the search route
    #[arg(long)]
    search_max: Option<usize>,
}

fn main() -> Result<()> {
    // .env is optional
    if let Err(e) = dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    let cli = Cli::parse();

    let mut config = PocConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.service.delay_ms = delay_ms;
    }
    if let Some(upstream) = cli.upstream {
        config.client.base_url = upstream;
    }
    if let Some(max) = cli.search_max {
        config.controller.parallel_search_max = max;
    }
    config.validate().context("validating configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_thread_names(true)
        .init();

    let mut flavor = cli.flavor;
    if let Some(workers) = cli.workers {
        flavor = flavor.with_workers(workers);
    }

    info!("Starting person server on {}", flavor);

    PersonServerBuilder::new()
        .with_config(config)
        .with_flavor(flavor)
        .build()
        .run_blocking()
        .context("running server")?;

    Ok(())
}
