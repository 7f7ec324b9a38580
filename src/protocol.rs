//! Events handed to the presentation layer, and the persisted key table.
//!
//! ## Design rules
//!
//! 1. Every event is `Serialize + Deserialize` with snake_case JSON.
//! 2. Events carry cells and counts only; the presentation layer reads
//!    coins from the live [`crate::cache::Cache`] when it needs them.
//! 3. Every operation returns the full list of events it caused, in order.

use crate::types::{Cell, LatLng};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Window events
// ---------------------------------------------------------------------------

/// A cache became live because its cell entered the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheActivated {
    pub cell: Cell,
    pub coin_count: usize,
    /// True when restored from a save rather than freshly generated.
    pub restored: bool,
}

/// A cache was persisted and dropped because its cell left the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDeactivated {
    pub cell: Cell,
    /// False when the write failed and the cache is held in memory.
    pub persisted: bool,
}

// ---------------------------------------------------------------------------
// Game events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    PlayerMoved {
        position: LatLng,
        cell: Cell,
    },
    /// Every window cell that entered or left, with or without a cache.
    WindowChanged {
        entered: Vec<Cell>,
        left: Vec<Cell>,
    },
    CacheActivated(CacheActivated),
    CacheDeactivated(CacheDeactivated),
    CacheMutated {
        cell: Cell,
        coin_count: usize,
    },
    InventoryChanged {
        coin_count: usize,
    },
    Reset,
}

// ---------------------------------------------------------------------------
// Persisted keys
// ---------------------------------------------------------------------------

/// Keys used in the key-value store.
pub mod keys {
    use crate::types::Cell;

    pub const PLAYER_POSITION: &str = "playerPosition";
    pub const PLAYER_COINS: &str = "playerCoins";
    pub const COLLECTED_COINS: &str = "collectedCoins";

    pub const CACHE_PREFIX: &str = "cache-";

    /// The fixed player keys, cleared together with the caches on reset.
    pub const PLAYER_KEYS: [&str; 3] = [PLAYER_POSITION, PLAYER_COINS, COLLECTED_COINS];

    pub fn cache_key(cell: &Cell) -> String {
        format!("{}{}-{}", CACHE_PREFIX, cell.i, cell.j)
    }

    pub fn is_cache_key(key: &str) -> bool {
        key.starts_with(CACHE_PREFIX)
    }

    pub fn is_game_key(key: &str) -> bool {
        is_cache_key(key) || PLAYER_KEYS.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_keep_signs() {
        assert_eq!(keys::cache_key(&Cell::new(3, -2)), "cache-3--2");
        assert_eq!(keys::cache_key(&Cell::new(-1, 0)), "cache--1-0");
    }

    #[test]
    fn game_key_classification() {
        assert!(keys::is_game_key("cache-0-0"));
        assert!(keys::is_game_key("playerCoins"));
        assert!(!keys::is_game_key("settings"));
    }

    #[test]
    fn events_are_tagged_snake_case() {
        let event = GameEvent::CacheMutated {
            cell: Cell::new(1, 2),
            coin_count: 4,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "cache_mutated");
        assert_eq!(json["coin_count"], 4);
    }
}
