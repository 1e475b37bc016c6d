#![forbid(unsafe_code)]
//! Minimal wallet for the star registry: make keys and sign ownership challenges.

use clap::{Parser, Subcommand};
use colored::*;
use starchain::config::load_config;
use starchain::crypto::{verify_message, KeyPair, Network};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generates a new key pair and prints its address
    New {
        /// mainnet or testnet (defaults to wallet.network from config.toml)
        #[arg(long)]
        network: Option<Network>,
    },
    /// Prints the address of an existing secret key
    Address {
        /// Hex-encoded 32-byte secret key
        secret: String,
        #[arg(long)]
        network: Option<Network>,
    },
    /// Signs a challenge returned by /requestValidation
    Sign {
        /// Hex-encoded 32-byte secret key
        secret: String,
        /// The exact challenge string
        message: String,
    },
    /// Checks a signature against an address
    Verify {
        address: String,
        message: String,
        signature: String,
    },
}

fn resolve_network(network: Option<Network>) -> Result<Network, Box<dyn std::error::Error>> {
    match network {
        Some(n) => Ok(n),
        None => Ok(load_config()?.wallet.network),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::New { network } => {
            let network = resolve_network(network)?;
            let keypair = KeyPair::generate();
            println!("{}", "🔑 New wallet".bright_cyan().bold());
            println!("Network: {}", network.to_string().bright_white());
            println!("Address: {}", keypair.address(network).bright_green());
            println!("Secret:  {}", keypair.secret_hex().bright_yellow());
            println!("{}", "Keep the secret key private.".red());
        }
        Commands::Address { secret, network } => {
            let network = resolve_network(network)?;
            let keypair = KeyPair::from_secret_hex(&secret)?;
            println!("{}", keypair.address(network));
        }
        Commands::Sign { secret, message } => {
            let keypair = KeyPair::from_secret_hex(&secret)?;
            println!("{}", keypair.sign_message(&message));
        }
        Commands::Verify {
            address,
            message,
            signature,
        } => match verify_message(&address, &message, &signature) {
            Ok(()) => println!("{}", "✅ Signature is valid".bright_green()),
            Err(e) => {
                println!("{} {}", "❌".red(), e.to_string().red());
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
