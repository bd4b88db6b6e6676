use clap::{Parser, Subcommand};

use crate::registry::Network;

#[derive(Parser)]
#[command(name = "chaingate")]
#[command(about = "Query a blockchain RPC gateway", long_about = None)]
pub struct Cli {
    #[arg(long, env = "GATEWAY_API_KEY", help = "Bearer credential for the gateway")]
    pub api_key: Option<String>,
    #[arg(short, long, help = "Network to target: mainnet, devnet or testnet")]
    pub network: Option<Network>,
    #[arg(long, help = "Endpoint id to use instead of the network default")]
    pub endpoint: Option<String>,
    #[arg(long, help = "Per-attempt timeout in milliseconds")]
    pub timeout_ms: Option<u64>,
    #[arg(long, help = "Total delivery attempts per call")]
    pub retries: Option<u32>,
    #[arg(long, help = "Log every delivery attempt")]
    pub debug: bool,
    #[arg(short, long, default_value = "config.toml", help = "Path to the configuration file")]
    pub config_file: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Look up an account by address
    Account { address: String },
    /// Show the balance of an address
    Balance { address: String },
    /// Fetch a transaction by signature
    Transaction { signature: String },
    /// List token accounts owned by an address
    TokenAccounts { owner: String },
    /// List recent transaction signatures for an address
    Signatures {
        address: String,
        #[arg(short, long, help = "Maximum number of signatures to return")]
        limit: Option<u32>,
    },
    /// Fetch on-chain program data by program id
    Program { program_id: String },
    /// Show the gateway node version
    Version,
    /// Show the current network status
    NetworkStatus,
    /// Show the current cluster status
    ClusterStatus,
}
