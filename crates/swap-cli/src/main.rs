//! ResourceSwap Client Binary
//!
//! Command-line interface for minting resources, approving transfers, and
//! cancelling offers on a deployed ResourceSwap contract.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ethers::types::{Address, U256, U64};
use swap_chain::{EvmLedger, ResourceLedger};
use swap_cli::catalog::Catalog;
use swap_cli::ops::{Approval, Operations};
use swap_cli::ClientConfig;
use swap_guard::{format_seconds, Seconds};

#[derive(Parser)]
#[command(name = "swapctl")]
#[command(about = "ResourceSwap contract client")]
struct Args {
    #[command(flatten)]
    config: ClientConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a resource from the catalog
    Mint {
        /// Catalog entry to mint
        #[arg(long, env = "ANIMAL", default_value = "Singe")]
        resource: String,

        /// JSON catalog replacing the built-in one
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Approve an operator (the contract by default) for a token
    Approve {
        #[arg(long, env = "TOKEN", value_parser = parse_id)]
        token: U256,

        #[arg(long)]
        operator: Option<Address>,
    },
    /// Cancel one of your pending offers
    #[command(name = "cancel-offer")]
    CancelOffer {
        #[arg(long, env = "OFFER_ID", value_parser = parse_id)]
        offer: U256,
    },
    /// Show cooldown and lock status of the signing account
    Status,
    /// List mintable resources
    Catalog {
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

/// Decimal or `0x`-prefixed hexadecimal identifier
fn parse_id(s: &str) -> Result<U256, String> {
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| e.to_string()),
        None => U256::from_dec_str(s).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| format!("invalid identifier {s:?}: {e}"))
}

fn load_catalog(path: Option<&PathBuf>) -> Result<Catalog> {
    Ok(match path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin(),
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    if let Commands::Catalog { catalog } = &args.command {
        for entry in load_catalog(catalog.as_ref())?.entries() {
            println!(
                "{:<12} tier {} value {:>5}  {}",
                entry.name, entry.tier, entry.value, entry.uri
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    // Resolve the mint request before touching the network
    let mint_request = match &args.command {
        Commands::Mint { resource, catalog } => {
            Some(load_catalog(catalog.as_ref())?.request(resource)?)
        }
        _ => None,
    };

    let decoder = args.config.revert_decoder()?;
    let ledger = EvmLedger::connect(args.config.ledger_config()?).await?;
    let ops = Operations::new(&ledger, &decoder);

    println!("Contract: {:?}", ledger.contract_address());
    println!("Using account: {} {:?}", args.config.account, ledger.account());

    let outcome = match args.command {
        Commands::Mint { .. } => {
            let request = mint_request.context("mint request was not resolved")?;
            println!("Minting: {} URI: {}", request.name, request.metadata_uri);
            ops.mint(&request).await.map(|minted| {
                println!("Mint tx: {:?}", minted.confirmation.tx_hash);
                println!("Mint OK - block: {}", block_label(minted.confirmation.block));
                println!("Minted tokenId: {}", minted.token_id);
                println!("ownerOf(token): {:?}", minted.owner);
                println!("tokenURI(token): {}", minted.token_uri);
            })
        }
        Commands::Approve { token, operator } => {
            println!("Token: {token}");
            ops.approve(token, operator).await.map(|approval| match approval {
                Approval::AlreadyApproved(reason) => println!("{reason}"),
                Approval::Approved {
                    confirmation,
                    operator,
                    token_id,
                } => {
                    println!("Approve tx: {:?}", confirmation.tx_hash);
                    println!("Approved {operator:?} for token: {token_id}");
                }
            })
        }
        Commands::CancelOffer { offer } => {
            println!("Cancel offer: {offer}");
            ops.cancel_offer(offer).await.map(|cancelled| {
                println!("cancelOffer tx: {:?}", cancelled.confirmation.tx_hash);
                println!(
                    "Offer cancelled - block: {}",
                    block_label(cancelled.confirmation.block)
                );
                println!("Offer active now: {}", cancelled.active_after);
            })
        }
        Commands::Status => ops.status().await.map(|reading| {
            println!("block time: {}", reading.now);
            println!(
                "cooldown left: {} (COOLDOWN={})",
                format_seconds(reading.gate.cooldown_remaining),
                Seconds::from(reading.cooldown)
            );
            println!(
                "lock left: {} (LOCK_DURATION={})",
                format_seconds(reading.gate.lock_remaining),
                Seconds::from(reading.lock_duration)
            );
        }),
        Commands::Catalog { .. } => Ok(()),
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            println!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn block_label(block: Option<U64>) -> String {
    block.map_or_else(|| "pending".to_string(), |n| n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), U256::from(42u64));
        assert_eq!(parse_id("0x2a").unwrap(), U256::from(42u64));
        assert!(parse_id("forty-two").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["swapctl", "cancel-offer", "--offer", "3", "--account", "1"]);
        assert_eq!(args.config.account, 1);
        assert!(matches!(args.command, Commands::CancelOffer { offer } if offer == U256::from(3u64)));
    }
}
