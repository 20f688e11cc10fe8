//! Mintable resource catalog
//!
//! Immutable lookup table of what can be minted. Names are validated against
//! it while parsing arguments, before any ledger connection is made.

use std::path::Path;

use serde::{Deserialize, Serialize};
use swap_chain::MintRequest;
use thiserror::Error;

/// IPFS directory holding the metadata documents
pub const METADATA_CID: &str = "bafybeidxmkohxp4mdrcg7iv6z37fxxp75zl5fg6zuqgutv6jjmozd2lztq";

pub const DEFAULT_CATEGORY: &str = "animal";

/// One mintable resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub tier: u8,
    pub value: u64,
    pub uri: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl CatalogEntry {
    fn builtin(name: &str, tier: u8, value: u64) -> Self {
        Self {
            name: name.to_string(),
            category: default_category(),
            tier,
            value,
            uri: format!("ipfs://{METADATA_CID}/{name}.json"),
        }
    }

    pub fn to_request(&self) -> MintRequest {
        MintRequest {
            name: self.name.clone(),
            category: self.category.clone(),
            tier: self.tier,
            value: self.value,
            metadata_uri: self.uri.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Unknown resource {name:?}; available: {available}")]
    Unknown { name: String, available: String },

    #[error("Catalog file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog file is invalid: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("Catalog is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                CatalogEntry::builtin("Singe", 1, 900),
                CatalogEntry::builtin("Lapin", 2, 700),
                CatalogEntry::builtin("Perroquet", 2, 650),
                CatalogEntry::builtin("Crocodile", 3, 500),
                CatalogEntry::builtin("Cerf", 3, 450),
                CatalogEntry::builtin("Hibou", 3, 420),
                CatalogEntry::builtin("Suricate", 4, 300),
                CatalogEntry::builtin("Mouton", 4, 250),
            ],
        }
    }

    /// Load a catalog from a JSON array of entries
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&contents)?;
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Mint request for a catalog entry
    pub fn request(&self, name: &str) -> Result<MintRequest, CatalogError> {
        self.get(name)
            .map(CatalogEntry::to_request)
            .ok_or_else(|| CatalogError::Unknown {
                name: name.to_string(),
                available: self
                    .entries
                    .iter()
                    .map(|entry| entry.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_request() {
        let request = Catalog::builtin().request("Crocodile").unwrap();
        assert_eq!(request.category, "animal");
        assert_eq!(request.tier, 3);
        assert_eq!(request.value, 500);
        assert_eq!(
            request.metadata_uri,
            format!("ipfs://{METADATA_CID}/Crocodile.json")
        );
    }

    #[test]
    fn test_unknown_name_lists_available() {
        let err = Catalog::builtin().request("Dragon").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Dragon"));
        assert!(message.contains("Singe, Lapin"));
    }

    #[test]
    fn test_names_are_exact() {
        assert!(Catalog::builtin().get("singe").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "Gem", "category": "mineral", "tier": 1, "value": 10, "uri": "ipfs://x/Gem.json"}},
               {{"name": "Fox", "tier": 2, "value": 20, "uri": "ipfs://x/Fox.json"}}]"#
        )
        .unwrap();

        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.entries().len(), 2);
        assert_eq!(catalog.request("Gem").unwrap().category, "mineral");
        assert_eq!(catalog.request("Fox").unwrap().category, "animal");
    }

    #[test]
    fn test_empty_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        assert!(matches!(Catalog::load(file.path()), Err(CatalogError::Empty)));
    }
}
