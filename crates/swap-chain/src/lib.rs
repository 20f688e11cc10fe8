//! ResourceSwap Chain Client
//!
//! Typed access to the ResourceSwap contract on an EVM ledger. Exposes the
//! read and mutating surface the client needs behind one async trait, plus
//! the transaction executor and the error shapes produced by failed calls.

use ethers::types::{Address, TransactionReceipt, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bindings;
pub mod deployment;
pub mod executor;
pub mod remote;

#[cfg(feature = "evm")]
pub mod evm;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use deployment::DeploymentRecord;
pub use executor::TransactionExecutor;
pub use remote::RemoteError;

#[cfg(feature = "evm")]
pub use evm::{EvmLedger, LedgerConfig, SignerSource};

/// Unified ledger trait for the ResourceSwap contract
#[async_trait::async_trait]
pub trait ResourceLedger: Send + Sync {
    /// Address that signs mutating calls
    fn account(&self) -> Address;

    /// Address of the deployed contract
    fn contract_address(&self) -> Address;

    /// Timestamp of the latest block
    async fn latest_timestamp(&self) -> Result<u64, RemoteError>;

    async fn owner_of(&self, token_id: U256) -> Result<Address, RemoteError>;

    async fn get_approved(&self, token_id: U256) -> Result<Address, RemoteError>;

    async fn is_approved_for_all(
        &self,
        owner: Address,
        operator: Address,
    ) -> Result<bool, RemoteError>;

    async fn token_uri(&self, token_id: U256) -> Result<String, RemoteError>;

    /// Read an exchange offer by identifier
    async fn offer(&self, offer_id: U256) -> Result<OfferState, RemoteError>;

    async fn last_action_at(&self, account: Address) -> Result<u64, RemoteError>;

    async fn locked_until(&self, account: Address) -> Result<u64, RemoteError>;

    /// Contract-wide `COOLDOWN` constant in seconds
    async fn cooldown(&self) -> Result<u64, RemoteError>;

    /// Contract-wide `LOCK_DURATION` constant in seconds
    async fn lock_duration(&self) -> Result<u64, RemoteError>;

    /// Approve `operator` to transfer `token_id`, awaiting confirmation
    async fn approve(
        &self,
        operator: Address,
        token_id: U256,
    ) -> Result<TransactionReceipt, RemoteError>;

    /// Cancel a pending offer, awaiting confirmation
    async fn cancel_offer(&self, offer_id: U256) -> Result<TransactionReceipt, RemoteError>;

    /// Mint a new resource token, awaiting confirmation
    async fn mint_resource(&self, request: &MintRequest) -> Result<TransactionReceipt, RemoteError>;
}

/// Exchange offer as stored by the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferState {
    pub offerer: Address,
    pub active: bool,
}

/// Parameters of a `mintResource` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    pub name: String,
    pub category: String,
    pub tier: u8,
    pub value: u64,
    pub metadata_uri: String,
}

/// Clamp an on-chain uint256 into seconds
pub(crate) fn saturating_secs(value: U256) -> u64 {
    if value.bits() > 64 {
        u64::MAX
    } else {
        value.as_u64()
    }
}

/// Error types
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Deployment record {path} not found. Run the deploy step first")]
    DeploymentMissing { path: String },

    #[error("Deployment record {path} is invalid: {source}")]
    DeploymentInvalid {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Wallet error: {0}")]
    Wallet(#[from] ethers::signers::WalletError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturating_secs() {
        assert_eq!(saturating_secs(U256::from(120u64)), 120);
        assert_eq!(saturating_secs(U256::MAX), u64::MAX);
    }
}
