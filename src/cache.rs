//! `Cache` – the coin collection living on one cell.

use crate::error::{GameError, Result};
use crate::types::{Cell, Coin};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cache {
    cell: Cell,
    /// Bottom of the stack first; `collect` takes from the end.
    coins: Vec<Coin>,
    remaining_coins: u32,
}

impl Cache {
    /// A freshly generated cache: serials `0..count`, all minted here.
    pub fn new(cell: Cell, count: u32) -> Self {
        let coins = (0..count).map(|serial| Coin::new(cell, serial)).collect();
        Self {
            cell,
            coins,
            remaining_coins: count,
        }
    }

    /// Rebuild from restored coins. Later duplicates of an id are dropped.
    pub fn from_coins(cell: Cell, coins: impl IntoIterator<Item = Coin>) -> Self {
        let mut cache = Self {
            cell,
            coins: Vec::new(),
            remaining_coins: 0,
        };
        for coin in coins {
            if !cache.contains(&coin) {
                cache.coins.push(coin);
            }
        }
        cache.sync_remaining();
        cache
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn coin_count(&self) -> usize {
        self.coins.len()
    }

    pub fn remaining_coins(&self) -> u32 {
        self.remaining_coins
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn contains(&self, coin: &Coin) -> bool {
        self.coins.contains(coin)
    }

    /// Take the most recently added coin.
    pub fn collect(&mut self) -> Result<Coin> {
        let coin = self
            .coins
            .pop()
            .ok_or(GameError::EmptyCache { cell: self.cell })?;
        self.sync_remaining();
        Ok(coin)
    }

    /// Put `coin` on top. Any coin is accepted regardless of origin, but
    /// the same id never sits in one cache twice.
    pub fn deposit(&mut self, coin: Coin) -> Result<()> {
        if self.contains(&coin) {
            return Err(GameError::DuplicateCoin { id: coin.id() });
        }
        self.coins.push(coin);
        self.sync_remaining();
        Ok(())
    }

    fn sync_remaining(&mut self) {
        self.remaining_coins = self.coins.len() as u32;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
