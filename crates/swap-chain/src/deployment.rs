//! Deployment record written by the deploy step

use std::path::Path;

use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::ChainError;

/// Where and when the contract was deployed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub address: Address,
    /// Stored as a decimal string
    pub chain_id: String,
    pub deployed_at: String,
}

impl DeploymentRecord {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ChainError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ChainError::DeploymentMissing { path: display });
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents)
            .map_err(|source| ChainError::DeploymentInvalid { path: display, source })
    }

    /// Numeric chain id, if the record holds a valid one
    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id.trim().parse().ok()
    }
}
