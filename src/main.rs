//! Ledger CLI Application
//!
//! A command-line interface for creating and using a single-node ledger.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use utxo_ledger::cli::{self, AppConfig};

#[derive(Parser)]
#[command(name = "ledger")]
#[command(version = "0.1.0")]
#[command(about = "A single-node proof-of-work UTXO ledger", long_about = None)]
struct Cli {
    /// Data directory for the ledger store and wallet file
    #[arg(short, long, default_value = ".ledger_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new ledger
    Create {
        /// Address receiving the genesis reward
        miner: String,

        /// Data recorded in the genesis mining transaction
        #[arg(default_value = "genesis")]
        genesis_info: String,
    },

    /// Print blocks from the tip backwards
    Print {
        /// Number of blocks to show
        #[arg(default_value = "1")]
        count: usize,
    },

    /// Show the balance of an address
    Balance {
        address: String,
    },

    /// Send coins and mine the block holding the transfer
    Send {
        /// Sender's wallet address
        from: String,

        /// Recipient's address
        to: String,

        /// Amount to send
        amount: u64,

        /// Address receiving the mining reward
        miner: String,

        /// Data recorded in the mining transaction
        #[arg(default_value = "")]
        data: String,
    },

    /// Wallet operations
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Validate the stored chain
    Validate,
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Create a new wallet
    New {
        /// Optional label for the wallet
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List all wallets
    List,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    let config = AppConfig::new(&args.data_dir);

    match args.command {
        Commands::Create {
            miner,
            genesis_info,
        } => cli::cmd_create(&config, &miner, &genesis_info)?,
        Commands::Print { count } => cli::cmd_print(&config, count)?,
        Commands::Balance { address } => cli::cmd_balance(&config, &address)?,
        Commands::Send {
            from,
            to,
            amount,
            miner,
            data,
        } => cli::cmd_send(&config, &from, &to, amount, &miner, &data)?,
        Commands::Wallet { action } => match action {
            WalletCommands::New { label } => cli::cmd_wallet_new(&config, label.as_deref())?,
            WalletCommands::List => cli::cmd_wallet_list(&config)?,
        },
        Commands::Validate => cli::cmd_validate(&config)?,
    }

    Ok(())
}
