//! Core types shared by the draft engine, the API layer and the front ends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six stat slots a draft has to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatKey {
    /// Hit points
    Hp,
    /// Physical attack
    Attack,
    /// Physical defense
    Defense,
    /// Special attack
    SpecialAttack,
    /// Special defense
    SpecialDefense,
    /// Speed
    Speed,
}

impl StatKey {
    /// All stat keys in slot order.
    pub const ALL: [StatKey; 6] = [
        StatKey::Hp,
        StatKey::Attack,
        StatKey::Defense,
        StatKey::SpecialAttack,
        StatKey::SpecialDefense,
        StatKey::Speed,
    ];

    /// Returns the name used by the creature API for this stat.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKey::Hp => "hp",
            StatKey::Attack => "attack",
            StatKey::Defense => "defense",
            StatKey::SpecialAttack => "special-attack",
            StatKey::SpecialDefense => "special-defense",
            StatKey::Speed => "speed",
        }
    }

    /// Parses an API stat name.
    pub fn from_api_name(name: &str) -> Option<StatKey> {
        StatKey::ALL.into_iter().find(|key| key.as_str() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        if let Some(key) = StatKey::from_api_name(&normalized) {
            return Ok(key);
        }
        match normalized.as_str() {
            "atk" => Ok(StatKey::Attack),
            "def" => Ok(StatKey::Defense),
            "spa" | "spatk" | "sp-atk" => Ok(StatKey::SpecialAttack),
            "spd" | "spdef" | "sp-def" => Ok(StatKey::SpecialDefense),
            "spe" => Ok(StatKey::Speed),
            _ => Err(format!("unknown stat: {}", s)),
        }
    }
}

/// Base stat values indexed by [`StatKey`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatVector {
    values: [u32; 6],
}

impl StatVector {
    /// Build a vector from values in [`StatKey::ALL`] order.
    pub fn new(values: [u32; 6]) -> Self {
        Self { values }
    }

    /// Get the value for a stat.
    pub fn get(&self, key: StatKey) -> u32 {
        self.values[key.index()]
    }

    /// Set the value for a stat.
    pub fn set(&mut self, key: StatKey, value: u32) {
        self.values[key.index()] = value;
    }

    /// Iterate `(key, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (StatKey, u32)> + '_ {
        StatKey::ALL.into_iter().map(|key| (key, self.get(key)))
    }

    /// Sum of all six values.
    pub fn total(&self) -> u32 {
        self.values.iter().sum()
    }
}

/// Rarity classification that limits how often a creature may be drawn.
///
/// A candidate carries `Option<RarityTag>`, so it can never hold more than one tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RarityTag {
    /// Legendary or mythical species
    Legendary,
    /// Member of the fixed ultra-beast list
    UltraBeast,
}

impl RarityTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RarityTag::Legendary => "legendary",
            RarityTag::UltraBeast => "ultra-beast",
        }
    }
}

/// A drawn creature as shown to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Pool name the candidate was drawn as; unaffected by form or mega substitution
    pub identity: String,
    /// Currently displayed name
    pub name: String,
    /// Currently displayed sprite URL
    pub sprite: String,
    /// Rarity tag, if any
    pub rarity: Option<RarityTag>,
    /// Rare cosmetic variant flag
    pub is_variant: bool,
    /// Species reference for rarity, form and mega lookups
    pub species: String,
    /// Base stats of the displayed creature
    pub stats: StatVector,
}

impl Candidate {
    /// Display label, e.g. `GIRATINA ORIGIN`.
    pub fn display_name(&self) -> String {
        display_label(&self.name)
    }
}

/// Upper-cased label with dashes turned into spaces.
pub fn display_label(name: &str) -> String {
    name.replace('-', " ").to_uppercase()
}
