//! statdraft - a stat-drafting minigame on top of PokeAPI.
//!
//! Random fully evolved creatures are drawn one by one and the player assigns each to
//! one of six stat slots; the slot takes that creature's base value for the stat. The
//! crate provides the draft engine, a cached and rate-limited API client, a sprite
//! prefetcher, the global leaderboard client and SQLite-backed local rankings.

pub mod types;
pub mod config;
pub mod api;
pub mod draft;
pub mod prefetch;
pub mod leaderboard;
pub mod storage;

// Re-export main types for convenience
pub use config::{AppConfig, PlayerSetup};
pub use draft::{DraftBuilder, DraftEngine, DraftSession, GameConfig, SessionLimits};
pub use types::{Candidate, RarityTag, StatKey, StatVector};
