//! Operation flows
//!
//! Each operation runs one sequential chain against the ledger: preflight
//! reads, submission, confirmation, then the post-state reads that are
//! reported back. Any failure ends the operation; nothing is retried.

use ethers::types::{Address, TransactionReceipt, H256, U256, U64};
use swap_chain::bindings::TransferFilter;
use swap_chain::executor::first_event;
use swap_chain::{MintRequest, RemoteError, ResourceLedger};
use swap_guard::{PreflightGuard, Rejection, RevertDecoder, TimeGateReading, Verdict};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum OperationError {
    /// Refused locally, nothing was submitted
    #[error("{0}")]
    Rejected(Rejection),

    #[error("{action} failed: {diagnosis}")]
    Transaction {
        action: &'static str,
        diagnosis: String,
    },

    /// The transaction went through but its result could not be recovered
    #[error(
        "{action} confirmed in {tx_hash:?} but no {event} event was found; the result cannot be reported"
    )]
    EventMissing {
        action: &'static str,
        event: String,
        tx_hash: H256,
    },

    #[error("Reading {what} failed: {diagnosis}")]
    Read { what: &'static str, diagnosis: String },
}

impl From<Rejection> for OperationError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::ReadFailed { what, diagnosis } => OperationError::Read { what, diagnosis },
            other => OperationError::Rejected(other),
        }
    }
}

/// Confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: H256,
    pub block: Option<U64>,
}

impl From<&TransactionReceipt> for Confirmation {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            block: receipt.block_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Minted {
    pub confirmation: Confirmation,
    pub token_id: U256,
    pub owner: Address,
    pub token_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approval {
    AlreadyApproved(String),
    Approved {
        confirmation: Confirmation,
        operator: Address,
        token_id: U256,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancelled {
    pub confirmation: Confirmation,
    /// `active` flag re-read after confirmation
    pub active_after: bool,
}

/// Operations against one ledger, diagnosing failures with one decoder
pub struct Operations<'a, L: ?Sized> {
    ledger: &'a L,
    decoder: &'a RevertDecoder,
}

impl<'a, L: ResourceLedger + ?Sized> Operations<'a, L> {
    pub fn new(ledger: &'a L, decoder: &'a RevertDecoder) -> Self {
        Self { ledger, decoder }
    }

    fn guard(&self) -> PreflightGuard<'a, L> {
        PreflightGuard::new(self.ledger, self.decoder)
    }

    fn transaction_failed(&self, action: &'static str, err: &RemoteError) -> OperationError {
        OperationError::Transaction {
            action,
            diagnosis: self.decoder.decode(err),
        }
    }

    fn read_failed(&self, what: &'static str, err: &RemoteError) -> OperationError {
        OperationError::Read {
            what,
            diagnosis: self.decoder.decode(err),
        }
    }

    /// Cooldown and lock status of the signing account
    pub async fn status(&self) -> Result<TimeGateReading, OperationError> {
        Ok(self.guard().time_gate().await?)
    }

    pub async fn mint(&self, request: &MintRequest) -> Result<Minted, OperationError> {
        self.guard().check_mint().await?;

        info!("Minting {} ({})", request.name, request.metadata_uri);
        let receipt = self
            .ledger
            .mint_resource(request)
            .await
            .map_err(|e| self.transaction_failed("Mint", &e))?;
        let confirmation = Confirmation::from(&receipt);

        let transfer: TransferFilter =
            first_event(&receipt).ok_or_else(|| OperationError::EventMissing {
                action: "Mint",
                event: "Transfer".to_string(),
                tx_hash: receipt.transaction_hash,
            })?;
        let token_id = transfer.token_id;

        let owner = self
            .ledger
            .owner_of(token_id)
            .await
            .map_err(|e| self.read_failed("ownerOf", &e))?;
        let token_uri = self
            .ledger
            .token_uri(token_id)
            .await
            .map_err(|e| self.read_failed("tokenURI", &e))?;

        Ok(Minted {
            confirmation,
            token_id,
            owner,
            token_uri,
        })
    }

    /// Approve `operator` for a token; defaults to the contract itself
    pub async fn approve(
        &self,
        token_id: U256,
        operator: Option<Address>,
    ) -> Result<Approval, OperationError> {
        let operator = operator.unwrap_or_else(|| self.ledger.contract_address());

        if let Verdict::AlreadySatisfied(reason) =
            self.guard().check_approval(operator, token_id).await?
        {
            return Ok(Approval::AlreadyApproved(reason));
        }

        let receipt = self
            .ledger
            .approve(operator, token_id)
            .await
            .map_err(|e| self.transaction_failed("Approve", &e))?;

        Ok(Approval::Approved {
            confirmation: Confirmation::from(&receipt),
            operator,
            token_id,
        })
    }

    pub async fn cancel_offer(&self, offer_id: U256) -> Result<Cancelled, OperationError> {
        self.guard().check_cancel(offer_id).await?;

        let receipt = self
            .ledger
            .cancel_offer(offer_id)
            .await
            .map_err(|e| self.transaction_failed("cancelOffer", &e))?;

        let offer = self
            .ledger
            .offer(offer_id)
            .await
            .map_err(|e| self.read_failed("offers", &e))?;

        Ok(Cancelled {
            confirmation: Confirmation::from(&receipt),
            active_after: offer.active,
        })
    }
}
