//! Geocoin World
//!
//! A grid-of-cells collectible game core: every cell may hold a cache of
//! individually numbered coins, generated deterministically from the cell's
//! coordinates, and the player moves coins between caches and an inventory.
//!
//! ## Architecture
//!
//! ```text
//! Game  (game.rs)                  ← session state, player actions
//!   ├── CacheWindow  (service.rs)  ← visibility window, cache lifecycle
//!   │     ├── Board  (board.rs)          ← canonical cells
//!   │     ├── CacheGenerator  (luck.rs)  ← seeded md5 luck
//!   │     └── Cache  (cache.rs)          ← coins on one cell
//!   └── SaveManager  (persistence.rs)
//!         ├── memento.rs                 ← JSON records
//!         └── KeyValueStore  (store.rs)  ← memory / file backends
//! ```
//!
//! Every action returns the [`protocol::GameEvent`]s it caused so a
//! presentation layer can mirror the world without callbacks.

pub mod board;
pub mod cache;
pub mod error;
pub mod game;
pub mod luck;
pub mod memento;
pub mod persistence;
pub mod protocol;
pub mod service;
pub mod store;
pub mod types;

// Convenience re-exports
pub use board::Board;
pub use cache::Cache;
pub use error::{GameError, Result, StoreError};
pub use game::{CollectOutcome, Game, Session, Turn};
pub use luck::{CacheGenerator, GeneratorConfig, Luck, Md5Luck};
pub use persistence::{PlayerRecord, SaveManager};
pub use protocol::GameEvent;
pub use service::{CacheWindow, CellState, WindowEvents};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::{Cell, CellBounds, Coin, Direction, GameConfig, LatLng, WorldStats};
