//! CacheWindow – visibility window, cache activation/deactivation.
//!
//! Every update recomputes the full square of cells around the player and
//! diffs it against the previous one. Leaving cells are persisted and
//! dropped first, then entering cells are loaded or generated.

use crate::board::Board;
use crate::cache::Cache;
use crate::error::{GameError, Result};
use crate::luck::CacheGenerator;
use crate::persistence::SaveManager;
use crate::protocol::{CacheActivated, CacheDeactivated};
use crate::store::KeyValueStore;
use crate::types::{Cell, GameConfig, LatLng, WorldStats};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Update result
// ---------------------------------------------------------------------------

/// Everything a single [`CacheWindow::update`] changed.
#[derive(Debug, Default)]
pub struct WindowEvents {
    /// The update counter that produced this set of events.
    pub update: u64,
    /// Window cells added this update, sorted.
    pub entered: Vec<Cell>,
    /// Window cells removed this update, sorted.
    pub left: Vec<Cell>,
    /// Caches that became live.
    pub activated: Vec<CacheActivated>,
    /// Caches that were evicted.
    pub deactivated: Vec<CacheDeactivated>,
    /// Evictions whose write failed.
    pub persist_failures: Vec<(Cell, GameError)>,
}

/// Where a cell stands relative to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    /// Holds a live cache.
    Active,
    /// Could hold a cache but none is in memory.
    Dormant,
    /// The generator never puts a cache here.
    Empty,
}

pub struct CacheWindow {
    radius: i32,
    max_known_cells: usize,
    board: Board,
    generator: CacheGenerator,
    center: Option<Cell>,
    active_cells: HashSet<Cell>,
    caches: HashMap<Cell, Cache>,
    /// Evicted caches whose write failed; authoritative until saved.
    unsaved: HashMap<Cell, Cache>,
    update_count: u64,
}

impl CacheWindow {
    pub fn new(config: &GameConfig) -> Self {
        Self::with_generator(config, CacheGenerator::from_config(config))
    }

    pub fn with_generator(config: &GameConfig, generator: CacheGenerator) -> Self {
        Self {
            radius: config.neighborhood_size.max(0),
            max_known_cells: config.max_known_cells,
            board: Board::new(config.tile_width),
            generator,
            center: None,
            active_cells: HashSet::new(),
            caches: HashMap::new(),
            unsaved: HashMap::new(),
            update_count: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Main update
    // -----------------------------------------------------------------------

    /// Move the window to `position`.
    ///
    /// A failed eviction write does not abort the update: the cache is
    /// held in memory and the failure is listed in
    /// [`WindowEvents::persist_failures`].
    pub fn update<S: KeyValueStore>(
        &mut self,
        position: LatLng,
        saves: &mut SaveManager<S>,
    ) -> WindowEvents {
        self.update_count += 1;

        let center = *self.board.cell_at(position);
        let desired: HashSet<Cell> = self
            .board
            .cells_near(position, self.radius)
            .iter()
            .map(|cell| **cell)
            .collect();

        let mut events = WindowEvents {
            update: self.update_count,
            ..Default::default()
        };

        let mut left: Vec<Cell> = self.active_cells.difference(&desired).copied().collect();
        left.sort();
        for cell in &left {
            if let Some(ev) = self.deactivate_cell(cell, saves, &mut events.persist_failures) {
                events.deactivated.push(ev);
            }
        }

        let mut entered: Vec<Cell> = desired.difference(&self.active_cells).copied().collect();
        entered.sort();
        for cell in &entered {
            if let Some(ev) = self.activate_cell(*cell, saves) {
                events.activated.push(ev);
            }
        }

        events.left = left;
        events.entered = entered;
        self.center = Some(center);

        if self.board.known_cells() > self.max_known_cells {
            self.board.forget_distant_cells(&center, self.radius);
        }

        events
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn generator(&self) -> &CacheGenerator {
        &self.generator
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Cell containing the player at the last update.
    pub fn center(&self) -> Option<Cell> {
        self.center
    }

    /// Inside the window (with or without a cache).
    pub fn is_active(&self, cell: &Cell) -> bool {
        self.active_cells.contains(cell)
    }

    pub fn active_cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self.active_cells.iter().copied().collect();
        cells.sort();
        cells
    }

    pub fn cache(&self, cell: &Cell) -> Option<&Cache> {
        self.caches.get(cell)
    }

    pub fn cache_mut(&mut self, cell: &Cell) -> Option<&mut Cache> {
        self.caches.get_mut(cell)
    }

    /// Live caches ordered by cell.
    pub fn active_caches(&self) -> Vec<&Cache> {
        let mut caches: Vec<&Cache> = self.caches.values().collect();
        caches.sort_by_key(|c| c.cell());
        caches
    }

    pub fn cell_state(&self, cell: &Cell) -> CellState {
        if self.caches.contains_key(cell) {
            CellState::Active
        } else if self.unsaved.contains_key(cell) || self.generator.spawn_decision(cell) {
            CellState::Dormant
        } else {
            CellState::Empty
        }
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats {
            active_cells: self.active_cells.len(),
            active_caches: self.caches.len(),
            coins_in_window: self.caches.values().map(Cache::coin_count).sum(),
            unsaved_caches: self.unsaved.len(),
            total_updates: self.update_count,
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write one live cache to the store.
    pub fn persist<S: KeyValueStore>(&self, cell: &Cell, saves: &mut SaveManager<S>) -> Result<()> {
        let cache = self.caches.get(cell).ok_or(GameError::NoCache { cell: *cell })?;
        saves.save_cache(cache)
    }

    /// Write every live and held cache. Keeps going past failures and
    /// returns the first one.
    pub fn flush<S: KeyValueStore>(&mut self, saves: &mut SaveManager<S>) -> Result<usize> {
        let mut written = 0;
        let mut first_error = None;

        for cache in self.caches.values() {
            match saves.save_cache(cache) {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!("Failed to save cache {}: {}", cache.cell(), e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        let held: Vec<Cell> = self.unsaved.keys().copied().collect();
        for cell in held {
            let result = match self.unsaved.get(&cell) {
                Some(cache) => saves.save_cache(cache),
                None => continue,
            };
            match result {
                Ok(()) => {
                    self.unsaved.remove(&cell);
                    written += 1;
                }
                Err(e) => {
                    warn!("Failed to save held cache {}: {}", cell, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// Drop all in-memory state without writing anything.
    pub fn clear(&mut self) {
        self.active_cells.clear();
        self.caches.clear();
        self.unsaved.clear();
        self.center = None;
    }

    // -----------------------------------------------------------------------
    // Cell transitions
    // -----------------------------------------------------------------------

    fn activate_cell<S: KeyValueStore>(
        &mut self,
        cell: Cell,
        saves: &SaveManager<S>,
    ) -> Option<CacheActivated> {
        if !self.active_cells.insert(cell) {
            return None;
        }

        let (cache, restored) = if let Some(cache) = self.unsaved.remove(&cell) {
            (cache, true)
        } else if let Some(cache) = saves.load_cache(cell) {
            (cache, true)
        } else if self.generator.spawn_decision(&cell) {
            (Cache::new(cell, self.generator.initial_coin_count(&cell)), false)
        } else {
            return None;
        };

        debug!(
            "Activated cache {} ({} coins, restored={})",
            cell,
            cache.coin_count(),
            restored
        );
        let coin_count = cache.coin_count();
        self.caches.insert(cell, cache);

        Some(CacheActivated {
            cell,
            coin_count,
            restored,
        })
    }

    fn deactivate_cell<S: KeyValueStore>(
        &mut self,
        cell: &Cell,
        saves: &mut SaveManager<S>,
        failures: &mut Vec<(Cell, GameError)>,
    ) -> Option<CacheDeactivated> {
        self.active_cells.remove(cell);
        let cache = self.caches.remove(cell)?;

        let persisted = match saves.save_cache(&cache) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist cache {} on eviction: {}", cell, e);
                failures.push((*cell, e));
                self.unsaved.insert(*cell, cache);
                false
            }
        };

        debug!("Deactivated cache {} (persisted={})", cell, persisted);
        Some(CacheDeactivated {
            cell: *cell,
            persisted,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
