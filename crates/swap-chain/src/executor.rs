//! Transaction Executor
//!
//! Submits prepared contract calls, waits for inclusion, and recovers typed
//! results from the receipt's event log.

use ethers::abi::{Detokenize, RawLog};
use ethers::contract::{ContractCall, EthEvent};
use ethers::providers::Middleware;
use ethers::types::{TransactionReceipt, U64};
use tracing::{debug, info};

use crate::RemoteError;

/// Submits mutating calls and awaits their confirmation
#[derive(Debug, Clone, Copy)]
pub struct TransactionExecutor {
    confirmations: usize,
}

impl Default for TransactionExecutor {
    fn default() -> Self {
        Self::new(1)
    }
}

impl TransactionExecutor {
    pub fn new(confirmations: usize) -> Self {
        Self {
            confirmations: confirmations.max(1),
        }
    }

    pub fn confirmations(&self) -> usize {
        self.confirmations
    }

    /// Send the call and wait for its receipt.
    ///
    /// Errors are returned undecoded; a mined receipt with a failed status
    /// and a transaction dropped from the mempool both count as failures.
    pub async fn submit<M, D>(&self, call: ContractCall<M, D>) -> Result<TransactionReceipt, RemoteError>
    where
        M: Middleware,
        D: Detokenize,
    {
        let pending = call.send().await.map_err(|e| RemoteError::from_contract_error(&e))?;
        let tx_hash = *pending;
        info!("Submitted transaction {:?}", tx_hash);

        let receipt = pending
            .confirmations(self.confirmations)
            .await?
            .ok_or_else(|| RemoteError::dropped(tx_hash))?;

        if receipt.status == Some(U64::zero()) {
            return Err(RemoteError::reverted(&receipt));
        }

        debug!(
            "Transaction {:?} confirmed in block {:?}",
            receipt.transaction_hash, receipt.block_number
        );
        Ok(receipt)
    }
}

/// First log entry in the receipt that decodes as `E`.
///
/// Unrelated or malformed entries are skipped.
pub fn first_event<E: EthEvent>(receipt: &TransactionReceipt) -> Option<E> {
    receipt.logs.iter().find_map(|log| {
        let raw = RawLog {
            topics: log.topics.clone(),
            data: log.data.to_vec(),
        };
        E::decode_log(&raw).ok()
    })
}
