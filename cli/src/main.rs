use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bookie_flow::{Confirm, FlowEventHandler, FlowOutcome, NetworkConfig, Workflow};
use bookie_relay::{RelayClient, RelayConfig};
use bookie_signer::{QuoteSigner, TypedDataSigner};
use bookie_types::{BookieError, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod args;
mod console;

use args::Cli;

fn required_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| BookieError::Config(format!("{} is not set", name)))
}

fn unix_now() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| BookieError::Other(format!("system clock before unix epoch: {}", e)))
}

async fn run(cli: Cli) -> Result<FlowOutcome> {
    let mut network = NetworkConfig::default();
    cli.network.apply(&mut network)?;
    let plan = cli.command.into_plan()?;

    let signer = QuoteSigner::from_private_key(&required_env("WALLET_PRIVATE_KEY")?)?;
    let relay_config = RelayConfig::new(&required_env("PEAZE_API_URL")?, &required_env("PEAZE_API_KEY")?);
    info!(wallet = %signer.address(), relay = %relay_config.base_url, chain_id = network.chain_id, "configuration loaded");

    let confirm: Arc<dyn Confirm> = if cli.yes {
        Arc::new(console::AutoConfirm)
    } else {
        Arc::new(console::ConsolePrompt)
    };
    let on_event: FlowEventHandler = Box::new(console::print_event);

    let workflow = Workflow::new(
        network,
        Arc::new(RelayClient::new(&relay_config)),
        Arc::new(signer),
        confirm,
        Some(on_event),
    );
    workflow.run(&plan, unix_now()?).await
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        console::report_error(&err);
        std::process::exit(1);
    }
}
