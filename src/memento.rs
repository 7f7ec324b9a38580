//! Memento codec: flat JSON snapshots of caches, the inventory and the
//! player's position.
//!
//! ## Record layout
//!
//! | Entity          | JSON                                                        |
//! |-----------------|-------------------------------------------------------------|
//! | cache           | `{"coins":[{"cell":{"i":3,"j":-2},"serial":0}],"remainingCoins":1}` |
//! | inventory       | `[{"cell":{"i":3,"j":-2},"serial":0}]`                      |
//! | player position | `{"lat":36.98,"lng":-122.06}`                               |
//! | coin count      | `"12"` (bare decimal)                                       |
//!
//! Coin entries are also accepted in id form (`"3:-2#0"`) when decoding.
//! One bad entry is skipped with a warning; a record whose shape is wrong
//! as a whole is [`GameError::CorruptRecord`].

use crate::cache::Cache;
use crate::error::{GameError, Result};
use crate::protocol::keys;
use crate::types::{Cell, Coin, LatLng};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct CacheRecord<'a> {
    coins: &'a [Coin],
    #[serde(rename = "remainingCoins")]
    remaining_coins: u32,
}

fn corrupt(key: &str, reason: impl Into<String>) -> GameError {
    GameError::CorruptRecord {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    // Plain structs of integers and strings always serialise.
    serde_json::to_string(value).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Coins
// ---------------------------------------------------------------------------

fn decode_coin(entry: &Value) -> Result<Coin> {
    match entry {
        Value::String(id) => id.parse(),
        other => serde_json::from_value::<Coin>(other.clone())
            .map_err(|_| GameError::InvalidCoinId(other.to_string())),
    }
}

/// Decode every well-formed entry, skipping the rest.
fn decode_coin_list(key: &str, entries: &[Value]) -> Vec<Coin> {
    entries
        .iter()
        .filter_map(|entry| match decode_coin(entry) {
            Ok(coin) => Some(coin),
            Err(e) => {
                warn!("Skipping coin entry in '{}': {}", key, e);
                None
            }
        })
        .collect()
}

fn parse(key: &str, record: &str) -> Result<Value> {
    serde_json::from_str(record).map_err(|e| corrupt(key, e.to_string()))
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

pub fn encode_cache(cache: &Cache) -> String {
    to_json(&CacheRecord {
        coins: cache.coins(),
        remaining_coins: cache.remaining_coins(),
    })
}

/// Rebuild the cache owned by `cell`. Coins keep their own origin cells.
pub fn decode_cache(record: &str, cell: Cell) -> Result<Cache> {
    let key = keys::cache_key(&cell);
    let value = parse(&key, record)?;

    let entries = match &value {
        Value::Object(map) => match map.get("coins") {
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err(corrupt(&key, "'coins' is not a list")),
            None => return Err(corrupt(&key, "missing 'coins'")),
        },
        // Bare id lists are the older layout.
        Value::Array(entries) => entries,
        _ => return Err(corrupt(&key, "expected an object")),
    };

    let cache = Cache::from_coins(cell, decode_coin_list(&key, entries));

    if let Some(stored) = value.get("remainingCoins").and_then(Value::as_u64) {
        if stored != u64::from(cache.remaining_coins()) {
            debug!(
                "'{}' recorded {} remaining coins, restored {}",
                key,
                stored,
                cache.remaining_coins()
            );
        }
    }

    Ok(cache)
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

pub fn encode_inventory(coins: &[Coin]) -> String {
    to_json(coins)
}

pub fn decode_inventory(record: &str) -> Result<Vec<Coin>> {
    let key = keys::COLLECTED_COINS;
    match parse(key, record)? {
        Value::Array(entries) => {
            let mut coins: Vec<Coin> = Vec::with_capacity(entries.len());
            for coin in decode_coin_list(key, &entries) {
                if coins.contains(&coin) {
                    warn!("Dropping repeated coin {} in '{}'", coin, key);
                } else {
                    coins.push(coin);
                }
            }
            Ok(coins)
        }
        _ => Err(corrupt(key, "expected a list")),
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

pub fn encode_position(position: LatLng) -> String {
    to_json(&position)
}

pub fn decode_position(record: &str) -> Result<LatLng> {
    let key = keys::PLAYER_POSITION;
    let position: LatLng =
        serde_json::from_str(record).map_err(|e| corrupt(key, e.to_string()))?;
    if !position.lat.is_finite() || !position.lng.is_finite() {
        return Err(corrupt(key, "non-finite coordinate"));
    }
    Ok(position)
}

pub fn encode_coin_count(count: usize) -> String {
    count.to_string()
}

pub fn decode_coin_count(record: &str) -> Result<usize> {
    record
        .trim()
        .parse()
        .map_err(|_| corrupt(keys::PLAYER_COINS, format!("not a count: {record:?}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
