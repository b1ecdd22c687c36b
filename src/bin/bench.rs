//! Person PoC bench
//!
//! Fires the same calls at each target server and prints per-endpoint batch
//! latencies. Run the servers first (see the `server` binary).

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use person_poc::{BenchPlan, BenchRunner, PersonClient, PocConfig, Target};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "person-bench")]
#[command(about = "Compare blocking and non-blocking person routes across servers")]
#[command(version)]
struct Cli {
    /// Config file; only [client] and log_level are used
    #[arg(long, env = "POC_CONFIG")]
    config: Option<PathBuf>,

    /// Target as NAME=URL; repeat for several (defaults to 8082 and 8081 on localhost)
    #[arg(short, long = "target")]
    targets: Vec<Target>,

    /// Endpoint template under /persons; repeat for several
    #[arg(short, long = "endpoint")]
    endpoints: Vec<String>,

    /// Calls fired at once per endpoint
    #[arg(short, long, default_value_t = 1)]
    concurrent: usize,

    /// Exit non-zero if any call failed
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    let cli = Cli::parse();
    let config = PocConfig::load(cli.config.as_deref()).context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let mut plan = BenchPlan {
        concurrent: cli.concurrent,
        ..BenchPlan::default()
    };
    if !cli.targets.is_empty() {
        plan.targets = cli.targets;
    }
    if !cli.endpoints.is_empty() {
        plan.endpoints = cli.endpoints;
    }

    let client = PersonClient::from_settings(&config.client).context("building HTTP client")?;
    let runner = BenchRunner::new(plan)?.with_client(client);
    let summary = runner.run().await?;

    println!("{}", summary.render());

    let errors = summary.total_errors();
    if errors > 0 {
        warn!("{} call(s) failed", errors);
        if cli.strict {
            anyhow::bail!("{} call(s) failed", errors);
        }
    }
    Ok(())
}
