//! statdraft command line front end.
//!
//! `statdraft setup` stores the configuration of the next game, `statdraft play`
//! runs a draft in the terminal.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use statdraft::api::PokeApiClient;
use statdraft::config::{log_level, validate_player_name, AppConfig, PlayerSetup, DEFAULT_PLAYER_NAME};
use statdraft::draft::{
    CandidatePool, DraftBuilder, DraftEngine, DraftError, GameConfig, Limit, Phase, PresentationEvent, Scorecard,
};
use statdraft::leaderboard::{LeaderboardClient, RankingView, SheetsLeaderboard, Standings};
use statdraft::prefetch::{SpriteCache, SpritePrefetcher};
use statdraft::storage::{today_utc, LocalStore, SqliteStore};
use statdraft::types::{display_label, StatKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "statdraft", about = "Draft six base stats from random creatures")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Configure the next game
    Setup(SetupArgs),
    /// Play a draft
    Play(PlayArgs),
}

#[derive(Args)]
struct SetupArgs {
    /// Player name (at most 12 characters)
    #[arg(long)]
    name: Option<String>,
    /// Skips per game (-1 or "unlimited" for no limit)
    #[arg(long, default_value = "1", allow_hyphen_values = true)]
    skips: Limit,
    #[arg(long, default_value = "1", allow_hyphen_values = true)]
    legendaries: Limit,
    #[arg(long, default_value = "1", allow_hyphen_values = true)]
    ultra_beasts: Limit,
    #[arg(long, default_value = "1", allow_hyphen_values = true)]
    megas: Limit,
    /// Enable rare variants
    #[arg(long)]
    variants: bool,
    /// Variants get a random stat bonus
    #[arg(long)]
    variant_boost: bool,
}

#[derive(Args)]
struct PlayArgs {
    /// Seed for a reproducible draft
    #[arg(long)]
    seed: Option<u64>,
    /// Do not prefetch placeholder sprites
    #[arg(long)]
    no_prefetch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_max_level(log_level()).init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let store = SqliteStore::new(&config.database_path).await?;

    match cli.command {
        Command::Setup(args) => setup(&config, &store, args).await,
        Command::Play(args) => play(&config, &store, args).await,
    }
}

async fn setup(config: &AppConfig, store: &SqliteStore, args: SetupArgs) -> Result<()> {
    let remembered = store.player_name(chrono::Utc::now()).await?;
    let player_name = args
        .name
        .or(remembered)
        .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string());

    let game = PlayerSetup {
        player_name,
        skip_limit: args.skips,
        legendary_limit: args.legendaries,
        ultrabeast_limit: args.ultra_beasts,
        mega_limit: args.megas,
        variant_enabled: args.variants,
        variant_boost_enabled: args.variant_boost,
    }
    .into_game_config()?;

    store.remember_player(&game.player_name, chrono::Utc::now()).await?;
    store.stash_config(&game).await?;

    println!("Next game for {}:", game.player_name);
    println!(
        "  skips {}  legendaries {}  ultra beasts {}  megas {}  variants {}{}",
        game.limits.skip_limit,
        game.limits.legendary_limit,
        game.limits.ultrabeast_limit,
        game.limits.mega_limit,
        if game.limits.variant_enabled { "on" } else { "off" },
        if game.limits.variant_boost_enabled { " (boosted)" } else { "" },
    );

    let leaderboard = leaderboard_client(config)?;
    let standings = Standings::load(leaderboard.as_ref(), store, today_utc()).await?;
    print_standings(&standings);
    Ok(())
}

async fn play(config: &AppConfig, store: &SqliteStore, args: PlayArgs) -> Result<()> {
    let game = match store.take_config().await? {
        Some(game) => game,
        None => {
            let mut game = GameConfig::default();
            if let Some(name) = store.player_name(chrono::Utc::now()).await? {
                game.player_name = validate_player_name(&name)?;
            }
            game
        }
    };
    info!("Starting draft for {}", game.player_name);

    let client = Arc::new(PokeApiClient::new(config)?);
    let sprites = SpriteCache::new();
    let mut builder = DraftBuilder::new()
        .with_config(config.clone())
        .with_limits(game.limits)
        .with_backend(client.clone())
        .with_sprite_cache(sprites.clone());
    if let Some(seed) = args.seed {
        builder = builder.with_seed(seed);
    }

    if !args.no_prefetch {
        println!("Loading sprites...");
        let loaded = SpritePrefetcher::new(client, sprites, config.prefetch_batch_size)
            .warm_up(&CandidatePool::standard())
            .await;
        info!("{} placeholder sprites ready", loaded);
    }

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(events_rx));
    let mut engine = builder.with_events(events_tx).build()?;

    let scorecard = run_draft(&mut engine).await;
    drop(engine);
    // the printer ends once the engine and its tasks dropped their senders
    let _ = tokio::time::timeout(Duration::from_secs(1), printer).await;

    match scorecard? {
        Some(scorecard) => finish(config, store, &game, &scorecard).await,
        None => {
            println!("Draft abandoned.");
            Ok(())
        }
    }
}

/// Read commands until the draft completes. `None` when the player quits.
async fn run_draft(engine: &mut DraftEngine) -> Result<Option<Scorecard>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    engine.start().await.context("Failed to draw the first creature")?;

    loop {
        engine.wait_ready().await?;
        if let Some(scorecard) = engine.session().scorecard() {
            return Ok(Some(scorecard));
        }
        print_prompt(engine);

        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        let input = line.trim().to_ascii_lowercase();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            return Ok(None);
        }

        let result = dispatch(engine, &input).await;
        match result {
            Ok(()) => {}
            Err(DraftError::Rejected(rejection)) => println!("  ! {}", rejection),
            Err(e) => return Err(e.into()),
        }
    }
}

async fn dispatch(engine: &mut DraftEngine, input: &str) -> Result<(), DraftError> {
    if let Ok(index) = input.parse::<usize>() {
        let index = index.saturating_sub(1);
        return match engine.session().phase() {
            Phase::ChoosingMega { .. } => engine.choose_mega(index).map(|_| ()).map_err(Into::into),
            _ => engine.choose_form(index).await.map(|_| ()),
        };
    }

    match input {
        "skip" | "s" => engine.skip().await.map(|_| ()),
        "mega" | "m" => engine.mega_evolve().map(|_| ()).map_err(Into::into),
        other => match other.parse::<StatKey>() {
            Ok(stat) => engine.assign(stat).await.map(|_| ()),
            Err(e) => {
                println!("  ? {} (stats: hp atk def spa spd spe, or skip / mega / quit)", e);
                Ok(())
            }
        },
    }
}

fn print_prompt(engine: &DraftEngine) {
    let session = engine.session();
    match session.phase() {
        Phase::ChoosingForm { .. } => println!("Pick a form by number:"),
        Phase::ChoosingMega { .. } => println!("Pick a mega by number:"),
        _ => {
            let open: Vec<&str> = session.slots().open_stats().iter().map(|s| s.as_str()).collect();
            let skips = session
                .skips_left()
                .map_or_else(|| "∞".to_string(), |n| n.to_string());
            let mega = if session.mega_available() { ", mega" } else { "" };
            println!("Assign to [{}] (skips left {}{})", open.join(" "), skips, mega);
        }
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<PresentationEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            PresentationEvent::Placeholder { .. } => {}
            PresentationEvent::Status { message, .. } => println!("  ... {}", message),
            PresentationEvent::Settled { candidate, .. } | PresentationEvent::CandidateChanged { candidate } => {
                let mut tags = Vec::new();
                if let Some(rarity) = candidate.rarity {
                    tags.push(rarity.as_str().to_string());
                }
                if candidate.is_variant {
                    tags.push("shiny".to_string());
                }
                let tags = if tags.is_empty() { String::new() } else { format!(" [{}]", tags.join(", ")) };
                println!("\n{}{}  ({})", candidate.display_name(), tags, candidate.sprite);
                for (stat, value) in candidate.stats.iter() {
                    println!("  {:<16} {:>3}", stat.as_str(), value);
                }
            }
            PresentationEvent::FormChoice { options } => print_options("Forms", &options),
            PresentationEvent::MegaAvailable { options } => {
                println!("  Mega available: {}", options.iter().map(|o| display_label(o)).collect::<Vec<_>>().join(", "));
            }
            PresentationEvent::MegaChoice { options } => print_options("Megas", &options),
            PresentationEvent::Assigned { stat, name, value, bonus } => {
                if bonus > 0 {
                    println!("  {} -> {} = {} (+{} shiny bonus)", display_label(&name), stat, value, bonus);
                } else {
                    println!("  {} -> {} = {}", display_label(&name), stat, value);
                }
            }
            PresentationEvent::Skipped { skips_left } => match skips_left {
                Some(left) => println!("  skipped ({} left)", left),
                None => println!("  skipped"),
            },
            PresentationEvent::Completed { .. } => println!("\nDraft complete!"),
        }
    }
}

fn print_options(title: &str, options: &[String]) {
    println!("  {}:", title);
    for (i, option) in options.iter().enumerate() {
        println!("    {}. {}", i + 1, display_label(option));
    }
}

async fn finish(config: &AppConfig, store: &SqliteStore, game: &GameConfig, scorecard: &Scorecard) -> Result<()> {
    for line in &scorecard.lines {
        println!(
            "  {:<16} {:<24} {:>3}{}",
            line.stat.as_str(),
            display_label(&line.name),
            line.value,
            if line.is_variant { " *" } else { "" }
        );
    }
    println!("  TOTAL {}", scorecard.total);

    store
        .record_score(&game.player_name, scorecard.total, today_utc())
        .await
        .context("Failed to record the local score")?;

    let leaderboard = leaderboard_client(config)?;
    if let Some(leaderboard) = &leaderboard {
        match leaderboard.submit_score(&game.player_name, scorecard.total, game).await {
            Ok(message) => println!("{}", message),
            Err(e) => {
                warn!("Global submission failed: {}", e);
                println!("{}", e);
            }
        }
    }

    let standings = Standings::load(leaderboard.as_ref(), store, today_utc()).await?;
    print_standings(&standings);
    Ok(())
}

fn leaderboard_client(config: &AppConfig) -> Result<Option<LeaderboardClient>> {
    Ok(SheetsLeaderboard::from_config(config)?.map(|service| {
        LeaderboardClient::new(
            Arc::new(service),
            Duration::from_secs(config.ranking_refresh_seconds),
        )
    }))
}

fn print_standings(standings: &Standings) {
    println!("\nToday");
    if standings.daily.is_empty() {
        println!("  no scores yet");
    }
    for (i, entry) in standings.daily.iter().enumerate() {
        println!("  {:>2}. {:<12} {}", i + 1, entry.name, entry.score);
    }

    match &standings.overall {
        RankingView::Global(entries) => {
            println!("\nGlobal ranking");
            for (i, entry) in entries.iter().enumerate() {
                println!("  {:>2}. {:<12} {}", i + 1, entry.name, entry.score);
            }
        }
        RankingView::Local(entries) => {
            println!("\nAll time (local)");
            for (i, entry) in entries.iter().enumerate() {
                println!("  {:>2}. {:<12} {} ({})", i + 1, entry.name, entry.score, entry.date);
            }
        }
    }
}
