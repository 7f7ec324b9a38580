//! geocoin-world binary
//!
//! A line-driven player over a JSON save file. Reads commands from stdin,
//! prints what changed.
//!
//! ## Configuration (defaults → TOML file → env → flags)
//!
//! | Key / env                          | Default       | Description                      |
//! |------------------------------------|---------------|----------------------------------|
//! | `GEOCOIN_SAVE_FILE`                | `geocoin.json`| Save file                        |
//! | `GEOCOIN_CONFIG`                   | *(none)*      | Optional TOML config file        |
//! | `GEOCOIN_SEED`                     | `geocoin`     | Luck seed                        |
//! | `GEOCOIN_TILE_WIDTH`               | `0.0001`      | Cell side in degrees             |
//! | `GEOCOIN_NEIGHBORHOOD_SIZE`        | `8`           | Visibility radius in cells       |
//! | `GEOCOIN_SPAWN_PROBABILITY`        | `0.1`         | Chance a cell hosts a cache      |
//! | `GEOCOIN_MAX_INITIAL_COINS`        | `100`         | Largest starting cache           |
//!
//! ## Commands
//!
//! `n` `s` `e` `w`, `goto <lat> <lng>`, `look`, `inv`,
//! `collect <i> <j>`, `deposit <i> <j> [coin-id]`, `stats`, `save`,
//! `reset`, `quit`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use geocoin_world::{
    CollectOutcome, Direction, FileStore, Game, GameConfig, GameEvent, KeyValueStore, LatLng,
    Turn,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "geocoin-world", about = "Geocoin World", version)]
struct Args {
    /// Save file (created on first write)
    #[arg(long, env = "GEOCOIN_SAVE_FILE", default_value = "geocoin.json")]
    save_file: PathBuf,

    /// Optional TOML config file
    #[arg(long, env = "GEOCOIN_CONFIG")]
    config: Option<PathBuf>,

    /// Override the luck seed
    #[arg(long)]
    seed: Option<String>,

    /// Override the visibility radius (cells)
    #[arg(long)]
    radius: Option<i32>,

    /// Print every event as a JSON line
    #[arg(long)]
    events: bool,
}

fn load_config(args: &Args) -> Result<GameConfig> {
    let mut builder = config::Config::builder()
        .add_source(config::Config::try_from(&GameConfig::default())?);
    if let Some(path) = &args.config {
        builder = builder.add_source(config::File::from(path.as_path()));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("GEOCOIN")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let mut game_config: GameConfig = builder
        .build()
        .context("building configuration")?
        .try_deserialize()
        .context("reading configuration")?;

    if let Some(seed) = &args.seed {
        game_config.seed = seed.clone();
    }
    if let Some(radius) = args.radius {
        game_config.neighborhood_size = radius;
    }
    Ok(game_config)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("geocoin_world=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let game_config = load_config(&args)?;

    tracing::info!(
        save_file = %args.save_file.display(),
        seed = %game_config.seed,
        radius = game_config.neighborhood_size,
        "Starting geocoin-world"
    );

    let store = FileStore::open(&args.save_file)
        .with_context(|| format!("opening {}", args.save_file.display()))?;
    let mut game = Game::open(game_config, store);
    let turn = game.start().context("placing the player")?;
    report(&args, &turn);
    print_status(&game);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        match run_command(&args, &mut game, &words) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("error: {e:#}"),
        }
        io::stdout().flush()?;
    }

    game.flush().context("final save")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Returns `false` on `quit`.
fn run_command<S: KeyValueStore>(args: &Args, game: &mut Game<S>, words: &[&str]) -> Result<bool> {
    let Some((&command, rest)) = words.split_first() else {
        return Ok(true);
    };

    match command {
        "n" | "s" | "e" | "w" => {
            let direction = match command {
                "n" => Direction::North,
                "s" => Direction::South,
                "e" => Direction::East,
                _ => Direction::West,
            };
            let turn = game.step(direction)?;
            report(args, &turn);
            print_status(game);
        }
        "goto" => {
            let [lat, lng] = rest else {
                bail!("usage: goto <lat> <lng>");
            };
            let turn = game.move_to(LatLng::new(lat.parse()?, lng.parse()?))?;
            report(args, &turn);
            print_status(game);
        }
        "look" => {
            let here = game.current_cell();
            for cache in game.window().active_caches() {
                println!(
                    "  cache {:>12}  {:>3} coins  {} away",
                    cache.cell().to_string(),
                    cache.coin_count(),
                    cache.cell().distance(&here)
                );
            }
        }
        "inv" => {
            for coin in game.inventory() {
                println!("  {coin}");
            }
            println!("{} coins", game.coin_count());
        }
        "collect" => {
            let cell = parse_cell(rest)?;
            let turn = game.collect(cell)?;
            match turn.value {
                CollectOutcome::Collected(coin) => println!("collected {coin}"),
                CollectOutcome::Empty => println!("cache {cell} is empty"),
            }
            report(args, &turn);
        }
        "deposit" => {
            let cell = parse_cell(rest.get(..2).unwrap_or(rest))?;
            let turn = match rest.get(2) {
                Some(id) => game.deposit_coin(cell, id)?,
                None => game.deposit(cell)?,
            };
            println!("deposited {}", turn.value);
            report(args, &turn);
        }
        "stats" => println!("{}", serde_json::to_string_pretty(&game.window().stats())?),
        "save" => println!("{} records written", game.flush()?),
        "reset" => {
            let turn = game.reset()?;
            report(args, &turn);
            print_status(game);
        }
        "quit" | "q" => return Ok(false),
        other => println!("unknown command: {other}"),
    }
    Ok(true)
}

fn parse_cell(words: &[&str]) -> Result<geocoin_world::Cell> {
    let [i, j] = words else {
        bail!("expected <i> <j>");
    };
    Ok(geocoin_world::Cell::new(i.parse()?, j.parse()?))
}

fn report<T>(args: &Args, turn: &Turn<T>) {
    for event in &turn.events {
        if args.events {
            if let Ok(json) = serde_json::to_string(event) {
                println!("{json}");
            }
        } else if let GameEvent::CacheActivated(a) = event {
            tracing::debug!(cell = %a.cell, coins = a.coin_count, "cache in view");
        }
    }
    for e in &turn.persist_errors {
        println!("warning: not saved: {e}");
    }
}

fn print_status<S: KeyValueStore>(game: &Game<S>) {
    let stats = game.window().stats();
    println!(
        "at {} cell {} | {} coins held | {} caches in view",
        game.position(),
        game.current_cell(),
        game.coin_count(),
        stats.active_caches
    );
}
