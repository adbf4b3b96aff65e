//! Bot swarm - opens many bot sessions against a game server and exits once
//! every bot's game has ended.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use swarm::{runtime, Config, LoadoutCatalog};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn usage_and_exit() -> ! {
    eprintln!(
        "bot-swarm (load client)\n\n\
USAGE:\n  bot-swarm [--config PATH] [--bots N] [--address URL] [--region REGION]\n\n\
ENV:\n  SWARM_CONFIG  optional; default swarm.toml (created with defaults if missing)\n  RUST_LOG      optional; default info\n"
    );
    std::process::exit(2);
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    bots: Option<u32>,
    address: Option<String>,
    region: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                args.config = Some(v.into());
            }
            "--bots" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                args.bots = Some(v.parse().unwrap_or_else(|_| usage_and_exit()));
            }
            "--address" => {
                args.address = Some(it.next().unwrap_or_else(|| usage_and_exit()));
            }
            "--region" => {
                args.region = Some(it.next().unwrap_or_else(|| usage_and_exit()));
            }
            "-h" | "--help" => usage_and_exit(),
            _ => usage_and_exit(),
        }
    }
    args
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Bot Swarm v{}", env!("CARGO_PKG_VERSION"));

    let args = parse_args();

    // Load configuration, then apply command line overrides
    let path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_from(&path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    if let Some(bots) = args.bots {
        config.swarm.bot_count = bots;
    }
    if let Some(address) = args.address {
        config.matchmaking.address = address;
    }
    if let Some(region) = args.region {
        config.matchmaking.region = region;
    }

    info!("Loaded configuration");
    info!("  Address: {}", config.matchmaking.address);
    info!("  Region: {} (game mode {})", config.matchmaking.region, config.matchmaking.game_mode_idx);
    info!("  Bots: {} every {}ms", config.swarm.bot_count, config.swarm.join_delay_ms);
    info!("  Tick: {}ms", config.swarm.tick_interval_ms);

    let catalog = LoadoutCatalog::build(&config.catalog.defs(), &config.catalog.unlocks())
        .context("building loadout catalog")?;

    let summary = runtime::run(config, Arc::new(catalog)).await?;
    info!(
        "Swarm finished: {} of {} bots won",
        summary.won, summary.spawned
    );

    Ok(())
}
