// Error taxonomy for the ledger engine

use crate::core::Hash256;
use std::fmt;

/// Every failure mode the engine can report. Variants are never collapsed
/// into each other so callers can match on the exact condition.
#[derive(Debug)]
pub enum LedgerError {
    /// The underlying store could not be opened, locked, or written.
    StoreUnavailable(String),
    /// `init` was called on a store that already has a tip.
    AlreadyInitialized,
    /// An operation that needs a chain was called before `init`.
    NotInitialized,
    /// Spend selection scanned every unspent output and came up short.
    InsufficientFunds {
        address: String,
        requested: u64,
        available: u64,
    },
    /// Transfer batch with mismatched or zero-length argument lists.
    EmptyTransferSet,
    /// A block hash already exists in the store with different contents.
    /// Unreachable under content addressing; fatal if observed.
    DuplicateBlock(Hash256),
    /// A `prev_hash` link points at a block the store does not have.
    BlockNotFound(Hash256),
    /// An address failed boundary validation.
    InvalidAddress(String),
    /// A stored record could not be decoded.
    Codec(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedgerError::StoreUnavailable(msg) => write!(f, "store unavailable: {}", msg),
            LedgerError::AlreadyInitialized => write!(f, "ledger is already initialized"),
            LedgerError::NotInitialized => write!(f, "ledger is not initialized"),
            LedgerError::InsufficientFunds {
                address,
                requested,
                available,
            } => write!(
                f,
                "insufficient funds for {}: requested {}, available {}",
                address, requested, available
            ),
            LedgerError::EmptyTransferSet => {
                write!(f, "transfer lists must be non-empty and of equal length")
            }
            LedgerError::DuplicateBlock(hash) => {
                write!(f, "block {} already stored with different contents", hash)
            }
            LedgerError::BlockNotFound(hash) => write!(f, "block {} not found", hash),
            LedgerError::InvalidAddress(msg) => write!(f, "invalid address: {}", msg),
            LedgerError::Codec(msg) => write!(f, "undecodable record: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::StoreUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Codec(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, LedgerError>;
