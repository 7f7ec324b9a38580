//! Property-based tests for coin conservation and identity.
//!
//! Random walks of moves, collects and deposits must never create or
//! destroy a coin: every coin ever generated is, at all times, in exactly
//! one live cache, one saved cache record, or the inventory.

use proptest::prelude::*;

use geocoin_world::cache::Cache;
use geocoin_world::game::Game;
use geocoin_world::memento;
use geocoin_world::protocol::{keys, GameEvent};
use geocoin_world::store::{KeyValueStore, MemoryStore};
use geocoin_world::types::{Cell, Coin, Direction, GameConfig, LatLng};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Step(Direction),
    Collect(i32, i32),
    Deposit(i32, i32),
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::North),
        Just(Direction::South),
        Just(Direction::East),
        Just(Direction::West),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_direction().prop_map(Op::Step),
        (-1..=1i32, -1..=1i32).prop_map(|(di, dj)| Op::Collect(di, dj)),
        (-1..=1i32, -1..=1i32).prop_map(|(di, dj)| Op::Deposit(di, dj)),
    ]
}

fn config() -> GameConfig {
    GameConfig {
        tile_width: 1.0,
        neighborhood_size: 1,
        spawn_probability: 0.5,
        max_initial_coins: 4,
        seed: "conservation".into(),
        start: LatLng::new(0.5, 0.5),
        ..Default::default()
    }
}

/// Every coin currently in existence, wherever it lives.
fn census(game: &Game<MemoryStore>) -> Vec<Coin> {
    let mut coins: Vec<Coin> = game.inventory().to_vec();
    for cache in game.window().active_caches() {
        coins.extend_from_slice(cache.coins());
    }

    let store = game.saves().store();
    for key in store.list_keys().unwrap() {
        if !keys::is_cache_key(&key) {
            continue;
        }
        let record = store.get(&key).unwrap().unwrap();
        let cell = cell_from_key(&key);
        // Live caches supersede their saved records.
        if game.window().cache(&cell).is_some() {
            continue;
        }
        let cache: Cache = memento::decode_cache(&record, cell).unwrap();
        coins.extend_from_slice(cache.coins());
    }
    coins
}

/// Record freshly generated caches; a cell is never generated twice.
fn note_minted(minted: &mut HashMap<Cell, usize>, events: &[GameEvent]) {
    for event in events {
        if let GameEvent::CacheActivated(a) = event {
            if !a.restored {
                let previous = minted.insert(a.cell, a.coin_count);
                assert!(previous.is_none(), "{} generated twice", a.cell);
            }
        }
    }
}

fn cell_from_key(key: &str) -> Cell {
    // "cache-{i}-{j}" where both may be negative.
    let rest = &key[keys::CACHE_PREFIX.len()..];
    let split = rest[1..].find('-').map(|n| n + 1).unwrap();
    Cell::new(rest[..split].parse().unwrap(), rest[split + 1..].parse().unwrap())
}

// ---------------------------------------------------------------------------
// Property: coins are neither created nor destroyed
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn coins_are_conserved(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut game = Game::open(config(), MemoryStore::new());
        let mut minted: HashMap<Cell, usize> = HashMap::new();

        note_minted(&mut minted, &game.start().unwrap().events);

        for op in ops {
            let here = game.current_cell();
            match op {
                Op::Step(direction) => {
                    note_minted(&mut minted, &game.step(direction).unwrap().events)
                }
                Op::Collect(di, dj) => {
                    let _ = game.collect(Cell::new(here.i + di, here.j + dj));
                }
                Op::Deposit(di, dj) => {
                    let _ = game.deposit(Cell::new(here.i + di, here.j + dj));
                }
            }

            let coins = census(&game);
            let expected: usize = minted.values().sum();
            prop_assert_eq!(coins.len(), expected);

            let mut ids: Vec<String> = coins.iter().map(Coin::id).collect();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), coins.len(), "a coin exists twice");
        }
    }
}

// ---------------------------------------------------------------------------
// Property: coin ids round-trip through their string form
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn coin_ids_round_trip(i in any::<i32>(), j in any::<i32>(), serial in any::<u32>()) {
        let coin = Coin::new(Cell::new(i, j), serial);
        let parsed: Coin = coin.id().parse().unwrap();
        prop_assert_eq!(parsed, coin);
    }
}
