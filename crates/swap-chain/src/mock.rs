//! In-memory ledger for tests
//!
//! Holds the contract state a test needs and records every mutating call so
//! tests can assert whether anything was submitted.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use ethers::contract::EthEvent;
use ethers::types::{Address, Bytes, Log, TransactionReceipt, H256, U256, U64};

use crate::bindings::TransferFilter;
use crate::{MintRequest, OfferState, RemoteError, ResourceLedger};

/// Token ownership as the mock contract stores it
#[derive(Debug, Clone, Default)]
pub struct MockToken {
    pub owner: Address,
    pub approved: Address,
    pub uri: String,
}

#[derive(Debug, Clone, Default)]
pub struct MockState {
    pub account: Address,
    pub contract: Address,
    pub now: u64,
    pub cooldown: u64,
    pub lock_duration: u64,
    pub last_action_at: HashMap<Address, u64>,
    pub locked_until: HashMap<Address, u64>,
    pub tokens: HashMap<U256, MockToken>,
    pub operators: HashSet<(Address, Address)>,
    pub offers: HashMap<U256, OfferState>,
    pub next_token_id: u64,
    /// Returned by the next mutating call instead of a receipt
    pub submit_failure: Option<RemoteError>,
    /// Returned by every latest-block read when set
    pub block_failure: Option<RemoteError>,
    /// Mint receipts omit the Transfer event when set
    pub suppress_events: bool,
}

/// Mutating call seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Approve { operator: Address, token_id: U256 },
    CancelOffer(U256),
    Mint(MintRequest),
}

#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<MockState>,
    submissions: Mutex<Vec<Submission>>,
}

impl MockLedger {
    pub fn new(state: MockState) -> Self {
        Self {
            state: Mutex::new(state),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn state(&self) -> MockState {
        self.state.lock().unwrap().clone()
    }

    fn record(&self, submission: Submission) -> Result<(), RemoteError> {
        self.submissions.lock().unwrap().push(submission);
        match self.state.lock().unwrap().submit_failure.take() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn receipt(&self, logs: Vec<Log>) -> TransactionReceipt {
        let count = self.submissions.lock().unwrap().len() as u64;
        TransactionReceipt {
            transaction_hash: H256::from_low_u64_be(count),
            block_number: Some(U64::from(count)),
            status: Some(U64::one()),
            logs,
            ..Default::default()
        }
    }
}

fn not_found(what: &str) -> RemoteError {
    RemoteError::from_message(format!("execution reverted: {what}"))
}

/// ERC-721 Transfer log with all three arguments indexed
pub fn transfer_log(from: Address, to: Address, token_id: U256) -> Log {
    let mut id = [0u8; 32];
    token_id.to_big_endian(&mut id);
    Log {
        topics: vec![
            TransferFilter::signature(),
            H256::from(from),
            H256::from(to),
            H256::from(id),
        ],
        data: Bytes::default(),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl ResourceLedger for MockLedger {
    fn account(&self) -> Address {
        self.state.lock().unwrap().account
    }

    fn contract_address(&self) -> Address {
        self.state.lock().unwrap().contract
    }

    async fn latest_timestamp(&self) -> Result<u64, RemoteError> {
        let state = self.state.lock().unwrap();
        match &state.block_failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(state.now),
        }
    }

    async fn owner_of(&self, token_id: U256) -> Result<Address, RemoteError> {
        let state = self.state.lock().unwrap();
        state
            .tokens
            .get(&token_id)
            .map(|token| token.owner)
            .ok_or_else(|| not_found("nonexistent token"))
    }

    async fn get_approved(&self, token_id: U256) -> Result<Address, RemoteError> {
        let state = self.state.lock().unwrap();
        state
            .tokens
            .get(&token_id)
            .map(|token| token.approved)
            .ok_or_else(|| not_found("nonexistent token"))
    }

    async fn is_approved_for_all(
        &self,
        owner: Address,
        operator: Address,
    ) -> Result<bool, RemoteError> {
        Ok(self.state.lock().unwrap().operators.contains(&(owner, operator)))
    }

    async fn token_uri(&self, token_id: U256) -> Result<String, RemoteError> {
        let state = self.state.lock().unwrap();
        state
            .tokens
            .get(&token_id)
            .map(|token| token.uri.clone())
            .ok_or_else(|| not_found("nonexistent token"))
    }

    async fn offer(&self, offer_id: U256) -> Result<OfferState, RemoteError> {
        let state = self.state.lock().unwrap();
        state
            .offers
            .get(&offer_id)
            .copied()
            .ok_or_else(|| not_found("invalid offer"))
    }

    async fn last_action_at(&self, account: Address) -> Result<u64, RemoteError> {
        let state = self.state.lock().unwrap();
        Ok(state.last_action_at.get(&account).copied().unwrap_or_default())
    }

    async fn locked_until(&self, account: Address) -> Result<u64, RemoteError> {
        let state = self.state.lock().unwrap();
        Ok(state.locked_until.get(&account).copied().unwrap_or_default())
    }

    async fn cooldown(&self) -> Result<u64, RemoteError> {
        Ok(self.state.lock().unwrap().cooldown)
    }

    async fn lock_duration(&self) -> Result<u64, RemoteError> {
        Ok(self.state.lock().unwrap().lock_duration)
    }

    async fn approve(
        &self,
        operator: Address,
        token_id: U256,
    ) -> Result<TransactionReceipt, RemoteError> {
        self.record(Submission::Approve { operator, token_id })?;
        if let Some(token) = self.state.lock().unwrap().tokens.get_mut(&token_id) {
            token.approved = operator;
        }
        Ok(self.receipt(Vec::new()))
    }

    async fn cancel_offer(&self, offer_id: U256) -> Result<TransactionReceipt, RemoteError> {
        self.record(Submission::CancelOffer(offer_id))?;
        if let Some(offer) = self.state.lock().unwrap().offers.get_mut(&offer_id) {
            offer.active = false;
        }
        Ok(self.receipt(Vec::new()))
    }

    async fn mint_resource(&self, request: &MintRequest) -> Result<TransactionReceipt, RemoteError> {
        self.record(Submission::Mint(request.clone()))?;

        let (account, token_id, emit) = {
            let mut state = self.state.lock().unwrap();
            let token_id = U256::from(state.next_token_id);
            state.next_token_id += 1;
            let account = state.account;
            let now = state.now;
            state.tokens.insert(
                token_id,
                MockToken {
                    owner: account,
                    approved: Address::zero(),
                    uri: request.metadata_uri.clone(),
                },
            );
            state.last_action_at.insert(account, now);
            (account, token_id, !state.suppress_events)
        };

        let logs = if emit {
            vec![transfer_log(Address::zero(), account, token_id)]
        } else {
            Vec::new()
        };
        Ok(self.receipt(logs))
    }
}
