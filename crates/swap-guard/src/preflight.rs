//! Preflight Guard
//!
//! Checks ownership, approval, offer state and time gates with read-only
//! calls before a mutating call is submitted. The contract stays the final
//! authority: state can change between the check and the submission.

use ethers::types::{Address, U256};
use swap_chain::ResourceLedger;
use thiserror::Error;
use tracing::debug;

use crate::revert::RevertDecoder;
use crate::timegate::{Seconds, TimeGateReading, TimeGateResolver};

/// Outcome of a passing check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Submit the call
    Proceed,
    /// Nothing to submit; the desired state already holds
    AlreadySatisfied(String),
}

/// Reason a call must not be submitted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error(
        "Account gated: lock {lock} remaining (LOCK_DURATION={lock_duration}), \
         cooldown {cooldown} remaining (COOLDOWN={cooldown_period})"
    )]
    TimeGated {
        lock: Seconds,
        cooldown: Seconds,
        lock_duration: Seconds,
        cooldown_period: Seconds,
    },

    #[error("Token {token_id} not found: {diagnosis}")]
    TokenNotFound { token_id: U256, diagnosis: String },

    #[error("Not owner of token {token_id}: owned by {owner:?}, caller is {caller:?}")]
    NotOwner {
        token_id: U256,
        owner: Address,
        caller: Address,
    },

    #[error("Offer {offer_id} not found: {diagnosis}")]
    OfferNotFound { offer_id: U256, diagnosis: String },

    #[error("Offer {offer_id} inactive (already cancelled or accepted)")]
    OfferInactive { offer_id: U256 },

    #[error("Not the offerer of offer {offer_id}. Expected offerer: {expected:?}")]
    NotOfferer {
        offer_id: U256,
        expected: Address,
        caller: Address,
    },

    #[error("Preflight read of {what} failed: {diagnosis}")]
    ReadFailed { what: &'static str, diagnosis: String },
}

/// Read-only invariant checks run before each mutating call
pub struct PreflightGuard<'a, L: ?Sized> {
    ledger: &'a L,
    decoder: &'a RevertDecoder,
}

impl<'a, L: ResourceLedger + ?Sized> PreflightGuard<'a, L> {
    pub fn new(ledger: &'a L, decoder: &'a RevertDecoder) -> Self {
        Self { ledger, decoder }
    }

    /// Current time gate of the signing account
    pub async fn time_gate(&self) -> Result<TimeGateReading, Rejection> {
        TimeGateResolver::new(self.ledger)
            .resolve(self.ledger.account())
            .await
            .map_err(|e| Rejection::ReadFailed {
                what: "time gate",
                diagnosis: self.decoder.decode(&e),
            })
    }

    /// Minting requires both the lock and the cooldown to have elapsed
    pub async fn check_mint(&self) -> Result<Verdict, Rejection> {
        let reading = self.time_gate().await?;
        debug!("Mint time gate for {:?}: {:?}", reading.account, reading.gate);

        if reading.gate.lock_remaining > 0 || reading.gate.cooldown_remaining > 0 {
            return Err(Rejection::TimeGated {
                lock: Seconds(reading.gate.lock_remaining),
                cooldown: Seconds(reading.gate.cooldown_remaining),
                lock_duration: reading.lock_duration.into(),
                cooldown_period: reading.cooldown.into(),
            });
        }
        Ok(Verdict::Proceed)
    }

    /// Approving requires ownership; an existing approval makes it a no-op
    pub async fn check_approval(
        &self,
        operator: Address,
        token_id: U256,
    ) -> Result<Verdict, Rejection> {
        let caller = self.ledger.account();
        let owner = self
            .ledger
            .owner_of(token_id)
            .await
            .map_err(|e| Rejection::TokenNotFound {
                token_id,
                diagnosis: self.decoder.decode(&e),
            })?;

        if owner != caller {
            return Err(Rejection::NotOwner {
                token_id,
                owner,
                caller,
            });
        }

        let approved = self
            .ledger
            .get_approved(token_id)
            .await
            .map_err(|e| self.read_failed("getApproved", &e))?;
        let approved_for_all = self
            .ledger
            .is_approved_for_all(owner, operator)
            .await
            .map_err(|e| self.read_failed("isApprovedForAll", &e))?;

        if approved == operator {
            return Ok(Verdict::AlreadySatisfied(format!(
                "Token {token_id} already approved for {operator:?}"
            )));
        }
        if approved_for_all {
            return Ok(Verdict::AlreadySatisfied(format!(
                "{operator:?} already approved for all tokens of {owner:?}"
            )));
        }
        Ok(Verdict::Proceed)
    }

    /// Cancelling requires an active offer made by the caller
    pub async fn check_cancel(&self, offer_id: U256) -> Result<Verdict, Rejection> {
        let caller = self.ledger.account();
        let offer = self
            .ledger
            .offer(offer_id)
            .await
            .map_err(|e| Rejection::OfferNotFound {
                offer_id,
                diagnosis: self.decoder.decode(&e),
            })?;

        if !offer.active {
            return Err(Rejection::OfferInactive { offer_id });
        }
        if offer.offerer != caller {
            return Err(Rejection::NotOfferer {
                offer_id,
                expected: offer.offerer,
                caller,
            });
        }
        Ok(Verdict::Proceed)
    }

    fn read_failed(&self, what: &'static str, err: &swap_chain::RemoteError) -> Rejection {
        Rejection::ReadFailed {
            what,
            diagnosis: self.decoder.decode(err),
        }
    }
}
