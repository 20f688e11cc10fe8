//! Remote call failures
//!
//! Failures reach the client wrapped differently depending on where they
//! surfaced: a decoded revert from `eth_call`, a JSON-RPC error response from
//! gas estimation, or a transport error. They are normalized into a
//! JSON-shaped body so the diagnosis layer can probe fixed locations without
//! knowing which layer produced them.

use std::fmt;

use ethers::contract::ContractError;
use ethers::providers::{Middleware, MiddlewareError, ProviderError};
use ethers::types::{TransactionReceipt, H256};
use serde_json::{json, Value};

/// Opaque failure object returned by a failed remote call
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    body: Value,
}

impl RemoteError {
    /// Wrap an arbitrary error body
    pub fn from_json(body: Value) -> Self {
        Self { body }
    }

    pub fn from_message(message: impl Into<String>) -> Self {
        Self::from_json(json!({ "message": message.into() }))
    }

    /// Failure carrying raw revert data at the top level
    pub fn from_revert_data(data: &[u8]) -> Self {
        Self::from_json(json!({
            "shortMessage": "execution reverted",
            "data": format!("0x{}", hex::encode(data)),
        }))
    }

    /// Normalize any middleware error, keeping the JSON-RPC error response
    /// under `error` when the node returned one
    pub fn from_middleware_error<E: MiddlewareError>(err: &E) -> Self {
        let mut body = json!({ "message": err.to_string() });
        if let Some(response) = err.as_error_response() {
            body["reason"] = Value::String(response.message.clone());
            body["error"] = json!({
                "code": response.code,
                "message": response.message,
                "data": response.data,
            });
        }
        Self::from_json(body)
    }

    pub fn from_contract_error<M: Middleware>(err: &ContractError<M>) -> Self {
        match err {
            ContractError::Revert(data) => {
                let mut remote = Self::from_revert_data(data);
                remote.body["message"] = Value::String(err.to_string());
                remote
            }
            ContractError::MiddlewareError { e } => Self::from_middleware_error(e),
            ContractError::ProviderError { e } => Self::from_middleware_error(e),
            other => Self::from_message(other.to_string()),
        }
    }

    /// Transaction left the mempool without being mined
    pub fn dropped(tx_hash: H256) -> Self {
        Self::from_json(json!({
            "shortMessage": format!("transaction {tx_hash:?} dropped from mempool"),
            "transactionHash": format!("{tx_hash:?}"),
        }))
    }

    /// Transaction was mined with a failed status
    pub fn reverted(receipt: &TransactionReceipt) -> Self {
        Self::from_json(json!({
            "shortMessage": format!(
                "transaction {:?} reverted on-chain",
                receipt.transaction_hash
            ),
            "transactionHash": format!("{:?}", receipt.transaction_hash),
            "blockNumber": receipt.block_number.map(|n| n.as_u64()),
        }))
    }

    /// Raw error body
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// String value at a JSON pointer, if present
    pub fn str_at(&self, pointer: &str) -> Option<&str> {
        self.body.pointer(pointer).and_then(Value::as_str)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = ["/shortMessage", "/message"]
            .iter()
            .find_map(|pointer| self.str_at(pointer))
            .unwrap_or("remote call failed");
        f.write_str(text)
    }
}

impl std::error::Error for RemoteError {}

impl<M: Middleware> From<ContractError<M>> for RemoteError {
    fn from(err: ContractError<M>) -> Self {
        Self::from_contract_error(&err)
    }
}

impl From<ProviderError> for RemoteError {
    fn from(err: ProviderError) -> Self {
        Self::from_middleware_error(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::JsonRpcError;

    #[test]
    fn test_revert_data_is_hex_prefixed() {
        let err = RemoteError::from_revert_data(&[0x08, 0xc3, 0x79, 0xa0]);
        assert_eq!(err.str_at("/data"), Some("0x08c379a0"));
        assert_eq!(err.to_string(), "execution reverted");
    }

    #[test]
    fn test_json_rpc_response_is_nested_under_error() {
        let provider_err = ProviderError::JsonRpcClientError(Box::new(
            ethers::providers::HttpClientError::JsonRpcError(JsonRpcError {
                code: 3,
                message: "execution reverted: Not owner".to_string(),
                data: Some(Value::String("0x08c379a0".to_string())),
            }),
        ));

        let err = RemoteError::from(provider_err);
        assert_eq!(err.str_at("/error/data"), Some("0x08c379a0"));
        assert_eq!(err.str_at("/reason"), Some("execution reverted: Not owner"));
        assert_eq!(err.body()["error"]["code"], 3);
    }

    #[test]
    fn test_failed_transactions_name_their_hash() {
        let tx_hash = H256::repeat_byte(0xab);
        let dropped = RemoteError::dropped(tx_hash);
        assert!(dropped.to_string().contains(&format!("{tx_hash:?}")));

        let receipt = TransactionReceipt {
            transaction_hash: tx_hash,
            status: Some(0u64.into()),
            ..Default::default()
        };
        let reverted = RemoteError::reverted(&receipt);
        assert_eq!(
            reverted.str_at("/shortMessage"),
            Some(format!("transaction {tx_hash:?} reverted on-chain").as_str())
        );
    }

    #[test]
    fn test_display_falls_back() {
        let err = RemoteError::from_json(json!({}));
        assert_eq!(err.to_string(), "remote call failed");

        let err = RemoteError::from_message("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
