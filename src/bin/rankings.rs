//! Show the local daily ranking and the global ranking.
//!
//! Falls back to the local all-time ranking when no global leaderboard is configured
//! or it cannot be reached. `--watch` keeps refreshing the global ranking.

use anyhow::Result;
use clap::Parser;
use statdraft::config::{log_level, AppConfig};
use statdraft::leaderboard::{LeaderboardClient, RankingEntry, RankingView, SheetsLeaderboard, Standings};
use statdraft::storage::{today_utc, ScoreEntry, SqliteStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser)]
#[command(name = "rankings", about = "Show daily and global rankings")]
struct Cli {
    /// Keep refreshing the global ranking
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(log_level()).init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let store = SqliteStore::new(&config.database_path).await?;

    let leaderboard = SheetsLeaderboard::from_config(&config)?.map(|service| {
        LeaderboardClient::new(
            Arc::new(service),
            Duration::from_secs(config.ranking_refresh_seconds),
        )
    });
    if leaderboard.is_none() {
        info!("No global leaderboard configured");
    }

    let standings = Standings::load(leaderboard.as_ref(), &store, today_utc()).await?;
    print_local("Today", &standings.daily);
    match &standings.overall {
        RankingView::Global(entries) => print_global(entries),
        RankingView::Local(entries) => print_local("All time", entries),
    }

    let Some(leaderboard) = leaderboard else {
        return Ok(());
    };

    if cli.watch {
        let (tx, mut rx) = mpsc::channel(4);
        let refresh = leaderboard.spawn_refresh(tx);
        loop {
            tokio::select! {
                update = rx.recv() => match update {
                    Some(entries) if !entries.is_empty() => print_global(&entries),
                    Some(_) => info!("Global ranking unavailable, keeping the last view"),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        refresh.abort();
    }

    Ok(())
}

fn print_global(entries: &[RankingEntry]) {
    println!("\nGlobal ranking");
    for (i, entry) in entries.iter().enumerate() {
        println!("  {:>2}. {:<12} {}", i + 1, entry.name, entry.score);
    }
}

fn print_local(title: &str, entries: &[ScoreEntry]) {
    println!("\n{} (local)", title);
    if entries.is_empty() {
        println!("  no scores yet");
    }
    for (i, entry) in entries.iter().enumerate() {
        println!("  {:>2}. {:<12} {} ({})", i + 1, entry.name, entry.score, entry.date);
    }
}
