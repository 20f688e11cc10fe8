//! EVM ledger implementation
//!
//! Talks to the contract over HTTP JSON-RPC with a local signer.

use std::sync::Arc;

use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer},
    types::{Address, BlockNumber, TransactionReceipt, U256},
};
use tracing::{info, warn};
use url::Url;

use crate::bindings::ResourceSwap;
use crate::{
    saturating_secs, ChainError, MintRequest, OfferState, RemoteError, ResourceLedger,
    TransactionExecutor,
};

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Where the signing key comes from
#[derive(Debug, Clone)]
pub enum SignerSource {
    PrivateKey(String),
    /// BIP-39 phrase and account index, as local development nodes derive their accounts
    Mnemonic { phrase: String, index: u32 },
}

impl SignerSource {
    fn wallet(&self) -> Result<LocalWallet, ChainError> {
        match self {
            SignerSource::PrivateKey(key) => Ok(key.trim().parse::<LocalWallet>()?),
            SignerSource::Mnemonic { phrase, index } => Ok(MnemonicBuilder::<English>::default()
                .phrase(phrase.as_str())
                .index(*index)?
                .build()?),
        }
    }
}

/// Configuration for the EVM ledger
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: Url,
    pub contract_address: Address,
    /// Chain id the deployment record was written for
    pub expected_chain_id: Option<u64>,
    pub signer: SignerSource,
    pub confirmations: usize,
}

pub struct EvmLedger {
    client: Arc<SignerClient>,
    contract: ResourceSwap<SignerClient>,
    executor: TransactionExecutor,
}

impl EvmLedger {
    pub async fn connect(config: LedgerConfig) -> Result<Self, ChainError> {
        let provider = Provider::new(Http::new(config.rpc_url.clone()));
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?
            .as_u64();

        if let Some(expected) = config.expected_chain_id {
            if expected != chain_id {
                warn!(
                    "Deployment record targets chain {} but {} reports chain {}",
                    expected, config.rpc_url, chain_id
                );
            }
        }

        let wallet = config.signer.wallet()?.with_chain_id(chain_id);
        info!(
            "Connected to chain {} at {} as {:?}",
            chain_id,
            config.rpc_url,
            wallet.address()
        );

        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        let contract = ResourceSwap::new(config.contract_address, client.clone());

        Ok(Self {
            client,
            contract,
            executor: TransactionExecutor::new(config.confirmations),
        })
    }
}

#[async_trait::async_trait]
impl ResourceLedger for EvmLedger {
    fn account(&self) -> Address {
        self.client.address()
    }

    fn contract_address(&self) -> Address {
        self.contract.address()
    }

    async fn latest_timestamp(&self) -> Result<u64, RemoteError> {
        let block = self
            .client
            .get_block(BlockNumber::Latest)
            .await
            .map_err(|e| RemoteError::from_middleware_error(&e))?
            .ok_or_else(|| RemoteError::from_message("latest block unavailable"))?;
        Ok(saturating_secs(block.timestamp))
    }

    async fn owner_of(&self, token_id: U256) -> Result<Address, RemoteError> {
        Ok(self.contract.owner_of(token_id).call().await?)
    }

    async fn get_approved(&self, token_id: U256) -> Result<Address, RemoteError> {
        Ok(self.contract.get_approved(token_id).call().await?)
    }

    async fn is_approved_for_all(
        &self,
        owner: Address,
        operator: Address,
    ) -> Result<bool, RemoteError> {
        Ok(self.contract.is_approved_for_all(owner, operator).call().await?)
    }

    async fn token_uri(&self, token_id: U256) -> Result<String, RemoteError> {
        Ok(self.contract.token_uri(token_id).call().await?)
    }

    async fn offer(&self, offer_id: U256) -> Result<OfferState, RemoteError> {
        let (offerer, _offered, _requested, active) = self.contract.offers(offer_id).call().await?;
        Ok(OfferState { offerer, active })
    }

    async fn last_action_at(&self, account: Address) -> Result<u64, RemoteError> {
        let value = self.contract.last_action_at(account).call().await?;
        Ok(saturating_secs(value))
    }

    async fn locked_until(&self, account: Address) -> Result<u64, RemoteError> {
        let value = self.contract.locked_until(account).call().await?;
        Ok(saturating_secs(value))
    }

    async fn cooldown(&self) -> Result<u64, RemoteError> {
        Ok(saturating_secs(self.contract.cooldown().call().await?))
    }

    async fn lock_duration(&self) -> Result<u64, RemoteError> {
        Ok(saturating_secs(self.contract.lock_duration().call().await?))
    }

    async fn approve(
        &self,
        operator: Address,
        token_id: U256,
    ) -> Result<TransactionReceipt, RemoteError> {
        self.executor
            .submit(self.contract.approve(operator, token_id))
            .await
    }

    async fn cancel_offer(&self, offer_id: U256) -> Result<TransactionReceipt, RemoteError> {
        self.executor.submit(self.contract.cancel_offer(offer_id)).await
    }

    async fn mint_resource(&self, request: &MintRequest) -> Result<TransactionReceipt, RemoteError> {
        let call = self.contract.mint_resource(
            request.name.clone(),
            request.category.clone(),
            request.tier,
            U256::from(request.value),
            request.metadata_uri.clone(),
        );
        self.executor.submit(call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_mnemonic_signer_derives_dev_accounts() {
        let first = SignerSource::Mnemonic {
            phrase: DEV_MNEMONIC.to_string(),
            index: 0,
        }
        .wallet()
        .unwrap();
        assert_eq!(
            first.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse::<Address>().unwrap()
        );

        let second = SignerSource::Mnemonic {
            phrase: DEV_MNEMONIC.to_string(),
            index: 1,
        }
        .wallet()
        .unwrap();
        assert_eq!(
            second.address(),
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse::<Address>().unwrap()
        );
    }

    #[test]
    fn test_private_key_signer() {
        let wallet = SignerSource::PrivateKey(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
        )
        .wallet()
        .unwrap();
        assert_eq!(
            wallet.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse::<Address>().unwrap()
        );
    }

    #[test]
    fn test_invalid_private_key() {
        let err = SignerSource::PrivateKey("0x1234".to_string()).wallet();
        assert!(matches!(err, Err(ChainError::Wallet(_))));
    }
}
