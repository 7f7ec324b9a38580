//! `Game` – the player's session and the operations a UI binds to.
//!
//! A `Game` owns the session state (position + inventory), the visibility
//! window and the save manager. Every operation runs to completion and
//! returns a [`Turn`]: the events it caused, plus any store writes that
//! failed along the way. A failed write never rolls back the turn; the
//! in-memory state stays authoritative for the session.

use crate::cache::Cache;
use crate::error::{GameError, Result};
use crate::persistence::SaveManager;
use crate::protocol::GameEvent;
use crate::service::CacheWindow;
use crate::store::KeyValueStore;
use crate::types::{Cell, Coin, Direction, GameConfig, LatLng};
use log::{info, warn};

// ---------------------------------------------------------------------------
// Session & turn
// ---------------------------------------------------------------------------

/// Everything about the player that is not stored in a cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub position: LatLng,
    /// Oldest first; plain `deposit` hands back the last one.
    pub inventory: Vec<Coin>,
}

impl Session {
    pub fn new(position: LatLng) -> Self {
        Self {
            position,
            inventory: Vec::new(),
        }
    }

    pub fn coin_count(&self) -> usize {
        self.inventory.len()
    }
}

/// Result of one player action.
#[derive(Debug)]
pub struct Turn<T = ()> {
    pub value: T,
    pub events: Vec<GameEvent>,
    pub persist_errors: Vec<GameError>,
}

impl<T> Turn<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            events: Vec::new(),
            persist_errors: Vec::new(),
        }
    }

    /// True when every write of this turn reached the store.
    pub fn is_persisted(&self) -> bool {
        self.persist_errors.is_empty()
    }

    fn record(&mut self, result: Result<()>) {
        if let Err(e) = result {
            warn!("Write failed: {}", e);
            self.persist_errors.push(e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    Collected(Coin),
    /// The cache had nothing left; nothing changed.
    Empty,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

pub struct Game<S: KeyValueStore> {
    config: GameConfig,
    window: CacheWindow,
    saves: SaveManager<S>,
    session: Session,
}

impl<S: KeyValueStore> Game<S> {
    /// Restore the session from `store`, or start fresh at `config.start`.
    /// The window is empty until [`Game::start`] or the first move.
    pub fn open(config: GameConfig, store: S) -> Self {
        let window = CacheWindow::new(&config);
        Self::with_window(config, window, store)
    }

    /// Like [`Game::open`] with a prepared window (custom generator).
    pub fn with_window(config: GameConfig, window: CacheWindow, store: S) -> Self {
        let saves = SaveManager::new(store);

        let position = match saves.load_player_state() {
            Some(record) => match window.board().locate(record.position) {
                Ok(_) => record.position,
                Err(e) => {
                    warn!("Ignoring saved position: {}", e);
                    config.start
                }
            },
            None => config.start,
        };
        let inventory = saves.load_inventory().unwrap_or_default();

        if let Some(record) = saves.load_player_state() {
            if record.coin_count != inventory.len() {
                warn!(
                    "Saved coin counter {} disagrees with {} saved coins; using the coins",
                    record.coin_count,
                    inventory.len()
                );
            }
        }

        info!(
            "Session opened at {} holding {} coins",
            position,
            inventory.len()
        );

        Self {
            config,
            window,
            saves,
            session: Session {
                position,
                inventory,
            },
        }
    }

    /// Populate the window around the current position.
    pub fn start(&mut self) -> Result<Turn> {
        self.move_to(self.session.position)
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn position(&self) -> LatLng {
        self.session.position
    }

    pub fn inventory(&self) -> &[Coin] {
        &self.session.inventory
    }

    pub fn coin_count(&self) -> usize {
        self.session.coin_count()
    }

    pub fn current_cell(&self) -> Cell {
        *self.window.board().cell_at(self.session.position)
    }

    pub fn window(&self) -> &CacheWindow {
        &self.window
    }

    pub fn saves(&self) -> &SaveManager<S> {
        &self.saves
    }

    pub fn cache(&self, cell: &Cell) -> Option<&Cache> {
        self.window.cache(cell)
    }

    pub fn into_store(self) -> S {
        self.saves.into_inner()
    }

    // -----------------------------------------------------------------------
    // Movement
    // -----------------------------------------------------------------------

    /// Move the player and recompute the window.
    ///
    /// A position off the cell grid (non-finite or too far out) is refused
    /// with `InvalidPosition` before anything changes.
    pub fn move_to(&mut self, position: LatLng) -> Result<Turn> {
        self.window.board().locate(position)?;

        let mut turn = Turn::new(());
        self.session.position = position;

        let window = self.window.update(position, &mut self.saves);

        turn.events.push(GameEvent::PlayerMoved {
            position,
            cell: self.current_cell(),
        });
        if !window.entered.is_empty() || !window.left.is_empty() {
            turn.events.push(GameEvent::WindowChanged {
                entered: window.entered,
                left: window.left,
            });
        }
        turn.events
            .extend(window.deactivated.into_iter().map(GameEvent::CacheDeactivated));
        turn.events
            .extend(window.activated.into_iter().map(GameEvent::CacheActivated));
        turn.persist_errors
            .extend(window.persist_failures.into_iter().map(|(_, e)| e));

        let result = self.save_player();
        turn.record(result);
        Ok(turn)
    }

    /// Move one tile.
    pub fn step(&mut self, direction: Direction) -> Result<Turn> {
        let (di, dj) = direction.delta();
        let target = self
            .session
            .position
            .offset_tiles(di, dj, self.config.tile_width);
        self.move_to(target)
    }

    // -----------------------------------------------------------------------
    // Coins
    // -----------------------------------------------------------------------

    /// Move the top coin of the cache at `cell` into the inventory.
    ///
    /// An empty cache is not an error: the turn reports
    /// [`CollectOutcome::Empty`] and nothing changes.
    pub fn collect(&mut self, cell: Cell) -> Result<Turn<CollectOutcome>> {
        let cache = self.reachable_cache(cell)?;

        let coin = match cache.collect() {
            Ok(coin) => coin,
            Err(GameError::EmptyCache { .. }) => return Ok(Turn::new(CollectOutcome::Empty)),
            Err(e) => return Err(e),
        };
        let remaining = cache.coin_count();
        self.session.inventory.push(coin);

        let mut turn = Turn::new(CollectOutcome::Collected(coin));
        self.finish_transfer(&mut turn, cell, remaining);
        Ok(turn)
    }

    /// Deposit the most recently collected coin into the cache at `cell`.
    pub fn deposit(&mut self, cell: Cell) -> Result<Turn<Coin>> {
        let coin = *self
            .session
            .inventory
            .last()
            .ok_or(GameError::EmptyInventory)?;
        self.deposit_held(cell, coin)
    }

    /// Deposit a specific held coin, by id, into the cache at `cell`.
    pub fn deposit_coin(&mut self, cell: Cell, coin_id: &str) -> Result<Turn<Coin>> {
        let coin: Coin = coin_id.parse()?;
        self.deposit_held(cell, coin)
    }

    fn deposit_held(&mut self, cell: Cell, coin: Coin) -> Result<Turn<Coin>> {
        let index = self
            .session
            .inventory
            .iter()
            .rposition(|held| *held == coin)
            .ok_or_else(|| GameError::CoinNotHeld { id: coin.id() })?;

        let cache = self.reachable_cache(cell)?;
        cache.deposit(coin)?;
        let remaining = cache.coin_count();
        self.session.inventory.remove(index);

        let mut turn = Turn::new(coin);
        self.finish_transfer(&mut turn, cell, remaining);
        Ok(turn)
    }

    fn reachable_cache(&mut self, cell: Cell) -> Result<&mut Cache> {
        if !self.window.is_active(&cell) {
            return Err(GameError::OutOfReach { cell });
        }
        self.window
            .cache_mut(&cell)
            .ok_or(GameError::NoCache { cell })
    }

    fn finish_transfer<T>(&mut self, turn: &mut Turn<T>, cell: Cell, remaining: usize) {
        turn.events.push(GameEvent::CacheMutated {
            cell,
            coin_count: remaining,
        });
        turn.events.push(GameEvent::InventoryChanged {
            coin_count: self.session.coin_count(),
        });

        let result = self.window.persist(&cell, &mut self.saves);
        turn.record(result);
        let result = self.saves.save_inventory(&self.session.inventory);
        turn.record(result);
        let result = self.save_player();
        turn.record(result);
    }

    // -----------------------------------------------------------------------
    // Save / reset
    // -----------------------------------------------------------------------

    /// Write every live cache, the inventory and the player record.
    ///
    /// Every write is attempted; the first failure is returned at the end.
    /// On success the count is the number of records written.
    pub fn flush(&mut self) -> Result<usize> {
        let mut first_error = None;

        let mut written = match self.window.flush(&mut self.saves) {
            Ok(n) => n,
            Err(e) => {
                first_error = Some(e);
                0
            }
        };
        // `collectedCoins`, then `playerPosition` and `playerCoins`.
        for (records, result) in [
            (1, self.saves.save_inventory(&self.session.inventory)),
            (2, self.save_player()),
        ] {
            match result {
                Ok(()) => written += records,
                Err(e) => {
                    warn!("Flush write failed: {}", e);
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

    /// Wipe all saved state and start over at `config.start`.
    ///
    /// If the store cannot be wiped completely it is rolled back, memory is
    /// left untouched and `ResetFailed` is returned.
    pub fn reset(&mut self) -> Result<Turn> {
        self.window.board().locate(self.config.start)?;
        let cleared = self.saves.clear_all()?;
        info!("Reset: {} records cleared", cleared);

        self.window.clear();
        self.session = Session::new(self.config.start);

        let mut turn = self.move_to(self.config.start)?;
        turn.events.insert(0, GameEvent::Reset);
        turn.events.insert(1, GameEvent::InventoryChanged { coin_count: 0 });
        Ok(turn)
    }

    fn save_player(&mut self) -> Result<()> {
        self.saves
            .save_player_state(self.session.position, self.session.coin_count())
    }
}
