//! ResourceSwap Transaction Safety
//!
//! Everything the client decides locally before and after talking to the
//! contract: whether a call may be submitted, and what a failed call meant.

pub mod preflight;
pub mod revert;
pub mod timegate;

pub use preflight::{PreflightGuard, Rejection, Verdict};
pub use revert::{CustomError, RevertDecoder, UNKNOWN_ERROR};
pub use timegate::{format_seconds, Seconds, TimeGate, TimeGateReading, TimeGateResolver};
