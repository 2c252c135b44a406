//! Application configuration and player setup.
//!
//! [`AppConfig`] holds the infrastructure knobs (endpoints, caches, timings) and can be
//! overridden from `STATDRAFT_*` environment variables. [`PlayerSetup`] is the
//! configuration screen: it validates what the player typed and turns it into the
//! [`GameConfig`] handed to the draft engine.

use crate::draft::types::{GameConfig, Limit, SessionLimits};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{warn, Level};

/// Name used when the player does not provide one.
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Maximum player name length, in characters.
pub const MAX_PLAYER_NAME_LEN: usize = 12;

/// Infrastructure configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Creature API base URL
    pub api_base_url: String,
    /// Leaderboard service endpoint; global rankings are disabled when unset
    pub leaderboard_url: Option<String>,
    /// SQLite file for local rankings, player name and session handoff
    pub database_path: String,
    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
    /// Creature/species cache TTL in seconds
    pub cache_ttl_seconds: u64,
    /// Maximum cached creature/species records
    pub max_cache_entries: u64,
    /// API requests per second
    pub rate_limit_requests_per_second: u32,
    /// Outcomes considered when adapting the API quota
    pub rate_limit_window: usize,
    /// Draw attempts before a generation gives up; `None` retries forever
    pub max_draw_attempts: Option<u32>,
    /// Sprite prefetch batch size
    pub prefetch_batch_size: usize,
    /// Leaderboard read attempts
    pub leaderboard_retry_attempts: usize,
    /// Global ranking refresh interval in seconds
    pub ranking_refresh_seconds: u64,
    /// Interval between placeholder frames during a reveal (ms)
    pub reveal_frame_ms: u64,
    /// Extra spin after the draw resolved (ms)
    pub reveal_hold_ms: u64,
    /// Pause before the final fade (ms)
    pub reveal_settle_ms: u64,
    /// Fade-out before the final sprite (ms)
    pub reveal_fade_ms: u64,
    /// Pause between a skip and the next draw (ms)
    pub skip_pause_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://pokeapi.co/api/v2".to_string(),
            leaderboard_url: None,
            database_path: "./statdraft.db".to_string(),
            request_timeout_seconds: 10,
            cache_ttl_seconds: 3600,
            max_cache_entries: 2000,
            rate_limit_requests_per_second: 20,
            rate_limit_window: 100,
            max_draw_attempts: Some(1000),
            prefetch_batch_size: 50,
            leaderboard_retry_attempts: 3,
            ranking_refresh_seconds: 30,
            reveal_frame_ms: 300,
            reveal_hold_ms: 1500,
            reveal_settle_ms: 100,
            reveal_fade_ms: 200,
            skip_pause_ms: 500,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by any `STATDRAFT_*` variables that are set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("STATDRAFT_API_URL") {
            config.api_base_url = url;
        }
        if let Some(url) = lookup("STATDRAFT_LEADERBOARD_URL") {
            config.leaderboard_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(path) = lookup("STATDRAFT_DB") {
            config.database_path = path;
        }
        if let Some(attempts) = lookup("STATDRAFT_MAX_DRAW_ATTEMPTS") {
            config.max_draw_attempts = match attempts.trim() {
                "unlimited" | "none" => None,
                other => match other.parse::<u32>() {
                    Ok(max) if max > 0 => Some(max),
                    _ => {
                        warn!("Ignoring invalid value {:?} for STATDRAFT_MAX_DRAW_ATTEMPTS", other);
                        config.max_draw_attempts
                    }
                },
            };
        }

        override_parsed(&lookup, "STATDRAFT_TIMEOUT_SECS", &mut config.request_timeout_seconds);
        override_parsed(&lookup, "STATDRAFT_CACHE_TTL_SECS", &mut config.cache_ttl_seconds);
        override_parsed(&lookup, "STATDRAFT_RATE_LIMIT", &mut config.rate_limit_requests_per_second);
        override_parsed(&lookup, "STATDRAFT_PREFETCH_BATCH", &mut config.prefetch_batch_size);
        override_parsed(&lookup, "STATDRAFT_RANKING_REFRESH_SECS", &mut config.ranking_refresh_seconds);
        override_parsed(&lookup, "STATDRAFT_REVEAL_HOLD_MS", &mut config.reveal_hold_ms);

        config
    }
}

/// Log level from `STATDRAFT_LOG`, INFO by default.
pub fn log_level() -> Level {
    std::env::var("STATDRAFT_LOG")
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(Level::INFO)
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    if let Some(raw) = lookup(key) {
        *slot = parse_or_keep(key, &raw, *slot);
    }
}

fn parse_or_keep<T: FromStr>(key: &str, raw: &str, current: T) -> T {
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!("Ignoring invalid value {:?} for {}", raw, key);
            current
        }
    }
}

/// Rejected player setup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("please enter your name")]
    EmptyName,
    #[error("the name must be at most {max} characters")]
    NameTooLong { max: usize },
}

/// Values collected by the configuration screen.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSetup {
    pub player_name: String,
    pub skip_limit: Limit,
    pub legendary_limit: Limit,
    pub ultrabeast_limit: Limit,
    pub mega_limit: Limit,
    pub variant_enabled: bool,
    pub variant_boost_enabled: bool,
}

impl PlayerSetup {
    /// Validate the form and produce the session handoff payload.
    pub fn into_game_config(self) -> Result<GameConfig, SetupError> {
        let player_name = validate_player_name(&self.player_name)?;
        Ok(GameConfig {
            player_name,
            limits: SessionLimits {
                skip_limit: self.skip_limit,
                legendary_limit: self.legendary_limit,
                ultrabeast_limit: self.ultrabeast_limit,
                mega_limit: self.mega_limit,
                variant_enabled: self.variant_enabled,
                // the boost option only exists while variants are on
                variant_boost_enabled: self.variant_enabled && self.variant_boost_enabled,
            },
        })
    }
}

/// Trim and validate a player name.
pub fn validate_player_name(raw: &str) -> Result<String, SetupError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(SetupError::EmptyName);
    }
    if name.chars().count() > MAX_PLAYER_NAME_LEN {
        return Err(SetupError::NameTooLong {
            max: MAX_PLAYER_NAME_LEN,
        });
    }
    Ok(name.to_string())
}
