//! Save manager: binds the memento codec to a [`KeyValueStore`].
//!
//! Reads never fail: an absent, unreadable or corrupt record is logged and
//! reported as "no saved state". Writes surface [`GameError::Persistence`]
//! so the caller can tell the player; the in-memory state stays as it was.

use crate::cache::Cache;
use crate::error::{GameError, Result};
use crate::memento;
use crate::protocol::keys;
use crate::store::KeyValueStore;
use crate::types::{Cell, Coin, LatLng};
use log::{info, warn};

/// Player record as saved under the fixed keys.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub position: LatLng,
    /// Last saved coin counter; informational, the inventory is authoritative.
    pub coin_count: usize,
}

pub struct SaveManager<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SaveManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read '{}': {}", key, e);
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Caches
    // -----------------------------------------------------------------------

    pub fn save_cache(&mut self, cache: &Cache) -> Result<()> {
        let key = keys::cache_key(&cache.cell());
        self.store.set(&key, &memento::encode_cache(cache))?;
        Ok(())
    }

    pub fn load_cache(&self, cell: Cell) -> Option<Cache> {
        let record = self.read(&keys::cache_key(&cell))?;
        match memento::decode_cache(&record, cell) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("Ignoring saved cache: {}", e);
                None
            }
        }
    }

    pub fn has_cache(&self, cell: Cell) -> bool {
        self.read(&keys::cache_key(&cell)).is_some()
    }

    pub fn clear_cache(&mut self, cell: Cell) -> Result<()> {
        self.store.delete(&keys::cache_key(&cell))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Player
    // -----------------------------------------------------------------------

    pub fn save_player_state(&mut self, position: LatLng, coin_count: usize) -> Result<()> {
        self.store
            .set(keys::PLAYER_POSITION, &memento::encode_position(position))?;
        self.store
            .set(keys::PLAYER_COINS, &memento::encode_coin_count(coin_count))?;
        Ok(())
    }

    /// Both keys must be present and valid, otherwise `None`.
    pub fn load_player_state(&self) -> Option<PlayerRecord> {
        let position = self.read(keys::PLAYER_POSITION)?;
        let coins = self.read(keys::PLAYER_COINS)?;

        let decoded = memento::decode_position(&position)
            .and_then(|position| Ok((position, memento::decode_coin_count(&coins)?)));
        match decoded {
            Ok((position, coin_count)) => Some(PlayerRecord {
                position,
                coin_count,
            }),
            Err(e) => {
                warn!("Ignoring saved player state: {}", e);
                None
            }
        }
    }

    pub fn save_inventory(&mut self, coins: &[Coin]) -> Result<()> {
        self.store
            .set(keys::COLLECTED_COINS, &memento::encode_inventory(coins))?;
        Ok(())
    }

    pub fn load_inventory(&self) -> Option<Vec<Coin>> {
        let record = self.read(keys::COLLECTED_COINS)?;
        match memento::decode_inventory(&record) {
            Ok(coins) => Some(coins),
            Err(e) => {
                warn!("Ignoring saved inventory: {}", e);
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------------

    /// Delete every cache record and the player keys, all or nothing.
    ///
    /// Values are captured before anything is deleted; if a delete fails,
    /// the keys already removed are written back and `ResetFailed` is
    /// returned. Returns the number of keys removed.
    pub fn clear_all(&mut self) -> Result<usize> {
        let all_keys = self.store.list_keys().map_err(|e| GameError::ResetFailed {
            reason: format!("cannot list keys: {e}"),
        })?;

        let mut snapshot = Vec::new();
        for key in all_keys.into_iter().filter(|k| keys::is_game_key(k)) {
            match self.store.get(&key) {
                Ok(Some(value)) => snapshot.push((key, value)),
                Ok(None) => {}
                Err(e) => {
                    return Err(GameError::ResetFailed {
                        reason: format!("cannot read '{key}': {e}"),
                    })
                }
            }
        }

        for (n, (key, _)) in snapshot.iter().enumerate() {
            if let Err(e) = self.store.delete(key) {
                warn!("Reset failed at '{}': {}; rolling back", key, e);
                self.restore(&snapshot[..n]);
                return Err(GameError::ResetFailed {
                    reason: format!("cannot delete '{key}': {e}"),
                });
            }
        }

        info!("Cleared {} saved records", snapshot.len());
        Ok(snapshot.len())
    }

    fn restore(&mut self, entries: &[(String, String)]) {
        for (key, value) in entries {
            if let Err(e) = self.store.set(key, value) {
                warn!("Rollback could not restore '{}': {}", key, e);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manager() -> SaveManager<MemoryStore> {
        SaveManager::new(MemoryStore::new())
    }

    #[test]
    fn absent_records_are_none() {
        let saves = manager();
        assert!(saves.load_cache(Cell::new(0, 0)).is_none());
        assert!(saves.load_player_state().is_none());
        assert!(saves.load_inventory().is_none());
    }

    #[test]
    fn corrupt_cache_record_is_none() {
        let mut saves = manager();
        saves.store_mut().set("cache-0-0", "{oops").unwrap();
        assert!(saves.has_cache(Cell::new(0, 0)));
        assert!(saves.load_cache(Cell::new(0, 0)).is_none());
    }

    #[test]
    fn player_state_needs_both_keys() {
        let mut saves = manager();
        saves
            .store_mut()
            .set(keys::PLAYER_POSITION, r#"{"lat":1.0,"lng":2.0}"#)
            .unwrap();
        assert!(saves.load_player_state().is_none());

        saves.save_player_state(LatLng::new(1.0, 2.0), 4).unwrap();
        let record = saves.load_player_state().unwrap();
        assert_eq!(record.position, LatLng::new(1.0, 2.0));
        assert_eq!(record.coin_count, 4);
    }

    #[test]
    fn clear_all_leaves_foreign_keys() {
        let mut saves = manager();
        saves.save_cache(&Cache::new(Cell::new(1, 1), 2)).unwrap();
        saves.save_inventory(&[]).unwrap();
        saves.save_player_state(LatLng::new(0.0, 0.0), 0).unwrap();
        saves.store_mut().set("settings", "dark").unwrap();

        assert_eq!(saves.clear_all().unwrap(), 4);
        assert_eq!(saves.store().list_keys().unwrap(), vec!["settings".to_string()]);
    }
}
