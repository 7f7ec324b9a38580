//! Error types for the game core.

use crate::types::{Cell, LatLng};
use thiserror::Error;

/// Failures of the backing key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store refused a write because it is full.
    #[error("Store quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },

    /// Backing file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing file holds something other than a string map.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Top-level error type for game operations.
#[derive(Error, Debug)]
pub enum GameError {
    /// `collect` on a cache with no coins. Not fatal.
    #[error("Cache at {cell} is empty")]
    EmptyCache { cell: Cell },

    /// A coin with this id is already in the target cache.
    #[error("Coin {id} is already in this cache")]
    DuplicateCoin { id: String },

    /// A coin id that does not read as `{i}:{j}#{serial}`.
    #[error("Invalid coin id: {0:?}")]
    InvalidCoinId(String),

    /// A persisted record exists but cannot be decoded.
    #[error("Corrupt record '{key}': {reason}")]
    CorruptRecord { key: String, reason: String },

    /// The store failed; in-memory state is still authoritative.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// No live cache at this cell.
    #[error("No cache at {cell}")]
    NoCache { cell: Cell },

    /// The inventory does not hold this coin.
    #[error("Coin {id} is not in the inventory")]
    CoinNotHeld { id: String },

    /// Nothing to deposit.
    #[error("The inventory is empty")]
    EmptyInventory,

    /// A position that cannot be placed on the cell grid.
    #[error("Invalid position {position}: {reason}")]
    InvalidPosition { position: LatLng, reason: String },

    /// The cell is outside the visibility window.
    #[error("Cell {cell} is out of reach")]
    OutOfReach { cell: Cell },

    /// A full reset could not be completed and was rolled back.
    #[error("Reset failed: {reason}")]
    ResetFailed { reason: String },
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, GameError>;
