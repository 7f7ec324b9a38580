//! Core world types shared across all modules.

use crate::error::GameError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Geographic position
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Shift by whole tiles (`di` rows north, `dj` columns east).
    pub fn offset_tiles(self, di: i32, dj: i32, tile_width: f64) -> Self {
        Self::new(
            self.lat + f64::from(di) * tile_width,
            self.lng + f64::from(dj) * tile_width,
        )
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// One-tile player steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// `(di, dj)` in cell indices.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (1, 0),
            Self::South => (-1, 0),
            Self::East => (0, 1),
            Self::West => (0, -1),
        }
    }
}

// ---------------------------------------------------------------------------
// Grid cells
// ---------------------------------------------------------------------------

/// A grid tile. Plain value; canonical shared instances come from
/// [`crate::board::Board`].
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Cell {
    pub i: i32,
    pub j: i32,
}

impl Cell {
    pub fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Chebyshev distance in cells, saturating at `i32::MAX`.
    pub fn distance(&self, other: &Cell) -> i32 {
        let d = self.i.abs_diff(other.i).max(self.j.abs_diff(other.j));
        i32::try_from(d).unwrap_or(i32::MAX)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.i, self.j)
    }
}

/// South-west / north-east corners of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl CellBounds {
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat < self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng < self.north_east.lng
    }
}

// ---------------------------------------------------------------------------
// Coins
// ---------------------------------------------------------------------------

/// A coin is its origin cell plus its serial in that cell's initial batch.
/// Identity is `"{i}:{j}#{serial}"`; the derived `Eq`/`Hash` agree with it.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub cell: Cell,
    pub serial: u32,
}

impl Coin {
    pub fn new(cell: Cell, serial: u32) -> Self {
        Self { cell, serial }
    }

    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}#{}", self.cell.i, self.cell.j, self.serial)
    }
}

impl FromStr for Coin {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GameError::InvalidCoinId(s.to_string());

        let (cell_part, serial_part) = s.split_once('#').ok_or_else(invalid)?;
        let (i, j) = cell_part.split_once(':').ok_or_else(invalid)?;

        let i = i.parse::<i32>().map_err(|_| invalid())?;
        let j = j.parse::<i32>().map_err(|_| invalid())?;
        let serial = serial_part.parse::<u32>().map_err(|_| invalid())?;

        // Only the exact form `id()` produces: no signs, no padding.
        let coin = Coin::new(Cell::new(i, j), serial);
        if coin.to_string() != s {
            return Err(invalid());
        }
        Ok(coin)
    }
}

// ---------------------------------------------------------------------------
// Stats & config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorldStats {
    /// Cells inside the current window (with or without a cache).
    pub active_cells: usize,
    /// Cells inside the window that hold a live cache.
    pub active_caches: usize,
    /// Coins across all live caches.
    pub coins_in_window: usize,
    /// Evicted caches whose write failed and are still held in memory.
    pub unsaved_caches: usize,
    /// Completed window recomputes.
    pub total_updates: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Side of a grid cell in degrees.
    pub tile_width: f64,
    /// Visibility radius in cells (Chebyshev).
    pub neighborhood_size: i32,
    /// Chance that a cell hosts a cache.
    pub spawn_probability: f64,
    /// Upper bound for a cache's initial coin count.
    pub max_initial_coins: u32,
    /// Seed mixed into every luck draw.
    pub seed: String,
    /// Where a brand-new player starts.
    pub start: LatLng,
    /// Size at which the canonical cell table is pruned to the window.
    pub max_known_cells: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_width: 1e-4,
            neighborhood_size: 8,
            spawn_probability: 0.1,
            max_initial_coins: 100,
            seed: "geocoin".into(),
            start: LatLng::new(36.98949379578401, -122.06277128548504),
            max_known_cells: 10_000,
        }
    }
}
