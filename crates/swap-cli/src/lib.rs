//! ResourceSwap Client Library
//!
//! Mint, approve, and cancel-offer flows for the ResourceSwap contract, with
//! the catalog and configuration the `swapctl` binary is driven by.

pub mod catalog;
pub mod config;
pub mod ops;

pub use catalog::{Catalog, CatalogEntry};
pub use config::ClientConfig;
pub use ops::{OperationError, Operations};
