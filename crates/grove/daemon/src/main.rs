//! groved - the GROVE background orchestration daemon.
//!
//! Hosts the lifecycle orchestrator and triggers its tick on a fixed
//! interval. Runs against the in-memory store and the stub provider
//! adapters; a deployment swaps both behind the builder.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use grove_gateway::ProviderGateway;
use grove_orchestrator::{OrchestratorBuilder, OrchestratorConfig};
use grove_store::InMemoryResourceStore;

#[derive(Debug, Parser)]
#[command(name = "groved", about = "GROVE background orchestration daemon")]
struct Args {
    /// Seconds between scheduler ticks
    #[arg(long, env = "GROVE_TICK_INTERVAL_SECS", default_value_t = 60)]
    tick_interval_secs: u64,

    /// Upper bound on candidates examined per sweep per tick
    #[arg(long, env = "GROVE_SWEEP_CANDIDATE_CAP")]
    sweep_candidate_cap: Option<usize>,

    /// Disable inactivity-based stops
    #[arg(long, env = "GROVE_NO_INACTIVITY")]
    no_inactivity: bool,

    /// Default look-ahead window for stop previews, in minutes
    #[arg(long, env = "GROVE_PREVIEW_WINDOW_MINUTES", default_value_t = 15)]
    preview_window_minutes: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = OrchestratorConfig {
        inactivity_enabled: !args.no_inactivity,
        default_preview_window_minutes: args.preview_window_minutes,
        sweep_candidate_cap: args.sweep_candidate_cap,
    };

    let orchestrator = OrchestratorBuilder::new()
        .with_store(Arc::new(InMemoryResourceStore::new()))
        .with_gateway(Arc::new(ProviderGateway::with_all_stubs()))
        .with_config(config)
        .build()?;

    info!(
        tick_interval_secs = args.tick_interval_secs,
        "groved started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(args.tick_interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = orchestrator.tick(chrono::Utc::now()).await;
                debug!(
                    fired = report.total_fired(),
                    failed = report.total_failed(),
                    "Scheduler tick"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
