//! Session configuration, counters, errors and events of the draft engine.

use crate::draft::slots::Scorecard;
use crate::types::{Candidate, RarityTag, StatKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A per-session allowance. Stored and sent as an integer where `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Limit {
    Finite(u32),
    Unlimited,
}

impl Limit {
    /// Whether one more use is allowed after `used` uses.
    pub fn allows(self, used: u32) -> bool {
        match self {
            Limit::Finite(max) => used < max,
            Limit::Unlimited => true,
        }
    }

    /// Uses left, or `None` when unlimited.
    pub fn remaining(self, used: u32) -> Option<u32> {
        match self {
            Limit::Finite(max) => Some(max.saturating_sub(used)),
            Limit::Unlimited => None,
        }
    }
}

impl TryFrom<i64> for Limit {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Limit::Unlimited),
            n => u32::try_from(n)
                .map(Limit::Finite)
                .map_err(|_| format!("invalid limit {}, expected -1 or a non-negative integer", n)),
        }
    }
}

impl From<Limit> for i64 {
    fn from(limit: Limit) -> Self {
        match limit {
            Limit::Finite(n) => n as i64,
            Limit::Unlimited => -1,
        }
    }
}

impl FromStr for Limit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unlimited" | "inf" | "∞" => Ok(Limit::Unlimited),
            other => other
                .parse::<i64>()
                .map_err(|_| format!("invalid limit: {}", s))
                .and_then(Limit::try_from),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Finite(n) => write!(f, "{}", n),
            Limit::Unlimited => f.write_str("∞"),
        }
    }
}

/// Limits captured once when a draft starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLimits {
    pub skip_limit: Limit,
    pub legendary_limit: Limit,
    pub ultrabeast_limit: Limit,
    pub mega_limit: Limit,
    #[serde(rename = "shinyEnabled", alias = "variantEnabled")]
    pub variant_enabled: bool,
    #[serde(rename = "shinyBoost", alias = "variantBoostEnabled")]
    pub variant_boost_enabled: bool,
}

impl SessionLimits {
    /// The only ruleset accepted by the global leaderboard.
    pub fn canonical() -> Self {
        Self {
            skip_limit: Limit::Finite(1),
            legendary_limit: Limit::Finite(1),
            ultrabeast_limit: Limit::Unlimited,
            mega_limit: Limit::Finite(1),
            variant_enabled: false,
            variant_boost_enabled: false,
        }
    }

    /// Limit that applies to a rarity tag.
    pub fn rarity_limit(&self, tag: RarityTag) -> Limit {
        match tag {
            RarityTag::Legendary => self.legendary_limit,
            RarityTag::UltraBeast => self.ultrabeast_limit,
        }
    }

    /// Whether a candidate with `tag` may still be accepted.
    pub fn admits(&self, counters: &SessionCounters, tag: RarityTag) -> bool {
        self.rarity_limit(tag).allows(counters.rarity_used(tag))
    }

    /// Variant bonus only applies when both options are on.
    pub fn variant_boost_active(&self) -> bool {
        self.variant_enabled && self.variant_boost_enabled
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            skip_limit: Limit::Finite(1),
            legendary_limit: Limit::Finite(1),
            ultrabeast_limit: Limit::Finite(1),
            mega_limit: Limit::Finite(1),
            variant_enabled: false,
            variant_boost_enabled: false,
        }
    }
}

/// Player name plus limits; what the setup screen hands to the draft engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(rename = "playerName")]
    pub player_name: String,
    #[serde(flatten)]
    pub limits: SessionLimits,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_name: crate::config::DEFAULT_PLAYER_NAME.to_string(),
            limits: SessionLimits::default(),
        }
    }
}

/// Monotonic usage counters of one draft session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounters {
    pub skip_used: u32,
    pub mega_used: u32,
    pub legendary_used: u32,
    pub ultrabeast_used: u32,
}

impl SessionCounters {
    pub fn rarity_used(&self, tag: RarityTag) -> u32 {
        match tag {
            RarityTag::Legendary => self.legendary_used,
            RarityTag::UltraBeast => self.ultrabeast_used,
        }
    }

    pub(crate) fn record_rarity(&mut self, tag: RarityTag) {
        match tag {
            RarityTag::Legendary => self.legendary_used += 1,
            RarityTag::UltraBeast => self.ultrabeast_used += 1,
        }
    }
}

/// Player command refused by the session. Refusals never change state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("no creature is on display")]
    NoCandidate,
    #[error("wait for the current reveal to finish")]
    Busy,
    #[error("pick one of the offered options first")]
    ChoiceRequired,
    #[error("the {0} slot is already filled")]
    SlotFilled(StatKey),
    #[error("no skips left")]
    SkipsExhausted,
    #[error("no power-up is available for this creature")]
    MegaUnavailable,
    #[error("no power-ups left")]
    MegaLimitReached,
    #[error("option {index} does not exist ({available} offered)")]
    InvalidChoice { index: usize, available: usize },
    #[error("there is nothing to choose")]
    NotChoosing,
    #[error("the draft is already complete")]
    SessionComplete,
}

/// Failure of a draft operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("candidate pool exhausted after {attempts} draw attempts")]
    PoolExhausted { attempts: u32 },
    #[error("candidate pool is empty")]
    EmptyPool,
    #[error("generation was superseded")]
    Cancelled,
    #[error(transparent)]
    Rejected(#[from] Rejection),
}

/// Result of a checkpoint call made with an outdated generation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("generation {token} superseded by {current}")]
pub struct StaleGeneration {
    pub token: u64,
    pub current: u64,
}

/// What a front end should show. Events of superseded generations are never sent.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    /// Transient status line ("already drawn", "legendary skipped", ...)
    Status { token: u64, message: String },
    /// Placeholder frame during a reveal
    Placeholder { token: u64, sprite: String },
    /// The reveal settled on the real candidate
    Settled { token: u64, candidate: Candidate },
    /// More than one form exists; the player has to pick one
    FormChoice { options: Vec<String> },
    /// A power-up can be used on the displayed candidate
    MegaAvailable { options: Vec<String> },
    /// Several power-ups exist; the player has to pick one
    MegaChoice { options: Vec<String> },
    /// The displayed candidate was replaced by a form or power-up
    CandidateChanged { candidate: Candidate },
    Assigned { stat: StatKey, name: String, value: u32, bonus: u32 },
    Skipped { skips_left: Option<u32> },
    Completed { scorecard: Scorecard },
}
