use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use chaingate::cli::{Cli, Commands};
use chaingate::client::GatewayClient;
use chaingate::config::load_configuration;
use chaingate::registry::Registry;

#[tokio::main]
async fn main() -> Result<()> {
    chaingate::log::init_logging();

    let cli = Cli::parse();

    let mut cfg =
        load_configuration(Path::new(&cli.config_file)).context("Could not load configuration")?;

    if let Some(api_key) = cli.api_key {
        cfg.api_key = api_key;
    }
    if let Some(network) = cli.network {
        cfg.network = network;
    }
    if let Some(endpoint) = cli.endpoint {
        cfg.endpoint = Some(endpoint);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        cfg.timeout_ms = timeout_ms;
    }
    if let Some(retries) = cli.retries {
        cfg.retry_attempts = retries;
    }
    if cli.debug {
        cfg.debug = true;
    }

    let registry = Registry::with_defaults().with_endpoints(cfg.endpoints.clone());
    let client = GatewayClient::new(registry, cfg.network, cfg.api_key.clone(), cfg.client_options())?;

    if let Some(endpoint_id) = &cfg.endpoint {
        client.set_endpoint(endpoint_id).await?;
    }

    let result = match cli.command {
        Commands::Account { address } => client.get_account_info(&address).await?,
        Commands::Balance { address } => client.get_balance(&address).await?,
        Commands::Transaction { signature } => client.get_transaction(&signature).await?,
        Commands::TokenAccounts { owner } => client.get_token_accounts(&owner).await?,
        Commands::Signatures { address, limit } => client.get_signatures_for_address(&address, limit).await?,
        Commands::Program { program_id } => client.get_program_data(&program_id).await?,
        Commands::Version => client.get_version().await?,
        Commands::NetworkStatus => client.get_network_status().await?,
        Commands::ClusterStatus => client.get_cluster_status().await?,
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
