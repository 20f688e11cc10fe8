//! Client configuration
//!
//! Connection and signer settings shared by every subcommand. Each flag can
//! also be set through the environment.

use std::path::{Path, PathBuf};

use clap::Args;
use ethers::abi::Abi;
use ethers::types::Address;
use serde_json::Value;
use swap_chain::{ChainError, DeploymentRecord, LedgerConfig, SignerSource};
use swap_guard::RevertDecoder;
use thiserror::Error;
use tracing::info;
use url::Url;

/// Mnemonic local development nodes derive their funded accounts from
pub const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("ABI artifact {path}: {source}")]
    Artifact {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ABI artifact {path} is invalid: {source}")]
    InvalidArtifact {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ClientConfig {
    /// JSON-RPC endpoint of the ledger node
    #[arg(long, env = "RPC_URL", default_value = "http://127.0.0.1:8545", global = true)]
    pub rpc_url: Url,

    /// Deployment record supplying the contract address
    #[arg(long, env = "DEPLOYMENT", default_value = "deployments/localhost.json", global = true)]
    pub deployment: PathBuf,

    /// Contract address, overriding the deployment record
    #[arg(long, env = "CONTRACT", global = true)]
    pub contract: Option<Address>,

    /// Index of the signer account derived from the mnemonic
    #[arg(long, env = "ACC", default_value_t = 0, global = true)]
    pub account: u32,

    #[arg(long, env = "MNEMONIC", default_value = DEV_MNEMONIC, hide_default_value = true, global = true)]
    pub mnemonic: String,

    /// Signer private key; takes precedence over the mnemonic
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true, global = true)]
    pub private_key: Option<String>,

    /// Compiled contract artifact whose ABI errors extend the revert decoder
    #[arg(long, env = "ABI_ARTIFACT", global = true)]
    pub abi: Option<PathBuf>,

    /// Confirmations to wait for after submitting a transaction
    #[arg(long, default_value_t = 1, global = true)]
    pub confirmations: usize,
}

impl ClientConfig {
    fn signer(&self) -> SignerSource {
        match &self.private_key {
            Some(key) => SignerSource::PrivateKey(key.clone()),
            None => SignerSource::Mnemonic {
                phrase: self.mnemonic.clone(),
                index: self.account,
            },
        }
    }

    /// Ledger settings, reading the deployment record unless an address was given
    pub fn ledger_config(&self) -> Result<LedgerConfig, ConfigError> {
        let (contract_address, expected_chain_id) = match self.contract {
            Some(address) => (address, None),
            None => {
                let record = DeploymentRecord::load(&self.deployment)?;
                info!(
                    "Using deployment {:?} from {} (deployed {})",
                    record.address,
                    self.deployment.display(),
                    record.deployed_at
                );
                (record.address, record.chain_id())
            }
        };

        Ok(LedgerConfig {
            rpc_url: self.rpc_url.clone(),
            contract_address,
            expected_chain_id,
            signer: self.signer(),
            confirmations: self.confirmations,
        })
    }

    pub fn revert_decoder(&self) -> Result<RevertDecoder, ConfigError> {
        match &self.abi {
            Some(path) => Ok(RevertDecoder::with_abi(&load_artifact_abi(path)?)),
            None => Ok(RevertDecoder::default()),
        }
    }
}

/// ABI from a compiled artifact (`{"abi": [...]}`) or a bare ABI array
pub fn load_artifact_abi(path: &Path) -> Result<Abi, ConfigError> {
    let display = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Artifact {
        path: display.clone(),
        source,
    })?;

    let invalid = |source| ConfigError::InvalidArtifact {
        path: display.clone(),
        source,
    };
    let mut document: Value = serde_json::from_str(&contents).map_err(invalid)?;
    let abi = match document.get_mut("abi") {
        Some(abi) => abi.take(),
        None => document,
    };
    serde_json::from_value(abi).map_err(invalid)
}
