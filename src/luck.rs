//! Deterministic generation: which cells host a cache and how many coins
//! it starts with.

use crate::types::{Cell, GameConfig};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A pure string -> [0, 1) function. Same key, same value, in every process.
pub trait Luck {
    fn luck(&self, key: &str) -> f64;
}

// ---------------------------------------------------------------------------
// md5-backed luck
// ---------------------------------------------------------------------------

/// Hashes `"{seed}{key}"` with md5 and reads the first eight digest bytes
/// as a big-endian fraction of 2^64.
#[derive(Debug, Clone)]
pub struct Md5Luck {
    pub seed: String,
}

impl Md5Luck {
    pub fn new(seed: impl Into<String>) -> Self {
        Self { seed: seed.into() }
    }
}

impl Luck for Md5Luck {
    fn luck(&self, key: &str) -> f64 {
        let digest = md5::compute(format!("{}{}", self.seed, key));

        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.0[..8]);
        // Top 53 bits keep the result strictly below 1.0 after the cast.
        let bits = u64::from_be_bytes(head) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }
}

// ---------------------------------------------------------------------------
// Cache generator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorConfig {
    pub spawn_probability: f64,
    pub max_initial_coins: u32,
}

impl From<&GameConfig> for GeneratorConfig {
    fn from(config: &GameConfig) -> Self {
        Self {
            spawn_probability: config.spawn_probability,
            max_initial_coins: config.max_initial_coins,
        }
    }
}

pub struct CacheGenerator {
    luck: Box<dyn Luck>,
    config: GeneratorConfig,
}

impl CacheGenerator {
    pub fn new(luck: Box<dyn Luck>, config: GeneratorConfig) -> Self {
        Self { luck, config }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(Box::new(Md5Luck::new(config.seed.clone())), config.into())
    }

    pub fn spawn_decision(&self, cell: &Cell) -> bool {
        self.luck.luck(&format!("{},{}", cell.i, cell.j)) < self.config.spawn_probability
    }

    /// Always within `1..=max_initial_coins`.
    pub fn initial_coin_count(&self, cell: &Cell) -> u32 {
        let max = self.config.max_initial_coins.max(1);
        let draw = self.luck.luck(&format!("{},{},initialValue", cell.i, cell.j));
        let count = 1 + (draw * f64::from(max)).floor() as u32;
        count.clamp(1, max)
    }
}
