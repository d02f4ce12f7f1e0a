/*
 * Swapstake - approve, swap and stake pipeline
 * Main entry point for the application
 */

use anyhow::Context;
use clap::Parser;
use rust_decimal::Decimal;
use swapstake::{config::Config, service::{SwapStakeService, WorkflowRequest}};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Swap the input token for the output token, then stake the output token
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Amount of the input token to swap, in human units
    #[arg(default_value = "1")]
    swap_amount: Decimal,
    /// Amount of the output token to stake, in human units
    #[arg(default_value = "0.5")]
    stake_amount: Decimal,
    /// Pool slot id inside the staking contract
    #[arg(default_value_t = 1)]
    pool_id: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    info!("Starting swapstake");

    let config = Config::from_env()
        .map_err(|e| {
            error!("Failed to load configuration: {}", e);
            e
        })?;
    info!("Configuration loaded, signer {:?}", config.signer.address());

    let request = WorkflowRequest::new(cli.swap_amount, cli.stake_amount, cli.pool_id)?;
    let service = SwapStakeService::new(&config)
        .await
        .context("failed to connect to the RPC node")?;

    tokio::select! {
        outcome = service.run(&request) => {
            let report = outcome.map_err(|failure| {
                error!("An error occurred: {}", failure);
                if let Some(cause) = failure.error.chain_cause() {
                    error!("Caused by: {}", cause);
                }
                failure
            })?;
            info!(
                "Done: {} transactions confirmed in {}s",
                report.confirmations.len(),
                (report.finished_at - report.started_at).num_seconds()
            );
        }
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("interrupted while waiting for confirmation; submitted transactions may still be mined");
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swapstake=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
