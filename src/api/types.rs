//! Wire types for the creature API and the records the engine works with.

use crate::types::{StatKey, StatVector};
use serde::{Deserialize, Serialize};

/// Raw sprite URL used when a creature has no sprite in any known slot.
pub const RAW_SPRITE_BASE: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// `{name, url}` reference as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

/// `GET /pokemon/{name}` response (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct PokemonDto {
    pub id: u32,
    pub name: String,
    pub sprites: SpritesDto,
    pub species: NamedResource,
    pub stats: Vec<StatEntryDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpritesDto {
    pub front_default: Option<String>,
    pub front_shiny: Option<String>,
    #[serde(default)]
    pub other: Option<OtherSpritesDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtherSpritesDto {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: Option<ArtworkDto>,
    #[serde(default)]
    pub home: Option<ArtworkDto>,
    #[serde(default)]
    pub showdown: Option<ArtworkDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtworkDto {
    pub front_default: Option<String>,
    pub front_shiny: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatEntryDto {
    pub base_stat: u32,
    pub stat: NamedResource,
}

/// `GET /pokemon-species/{name}` response (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesDto {
    #[serde(default)]
    pub is_legendary: bool,
    #[serde(default)]
    pub is_mythical: bool,
    #[serde(default)]
    pub varieties: Vec<VarietyDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VarietyDto {
    pub is_default: bool,
    pub pokemon: NamedResource,
}

/// Sprite URLs known for a creature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpriteSet {
    /// Default front sprite; creatures without one are never shown
    pub front_default: Option<String>,
    /// Variant (shiny) front sprite
    pub front_variant: Option<String>,
    /// Artwork, home and showdown sprites in preference order
    pub fallbacks: Vec<String>,
}

impl SpriteSet {
    /// Sprite for a creature that must always be displayable (power-ups).
    pub fn best_available(&self, id: u32) -> String {
        self.front_default
            .iter()
            .chain(self.front_variant.iter())
            .chain(self.fallbacks.iter())
            .next()
            .cloned()
            .unwrap_or_else(|| format!("{}/{}.png", RAW_SPRITE_BASE, id))
    }

    /// Sprite for a drawn creature, preferring the variant sprite when rolled.
    pub fn for_variant(&self, is_variant: bool) -> Option<String> {
        if is_variant {
            if let Some(variant) = &self.front_variant {
                return Some(variant.clone());
            }
        }
        self.front_default.clone()
    }
}

/// Creature data needed by the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureRecord {
    pub id: u32,
    pub name: String,
    pub sprites: SpriteSet,
    /// Species reference (URL from the API, or a bare name)
    pub species: String,
    pub stats: StatVector,
}

/// Species data: rarity flags and the list of varieties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    pub is_legendary: bool,
    pub is_mythical: bool,
    pub varieties: Vec<Variety>,
}

impl SpeciesRecord {
    /// Legendary and mythical species share the legendary tag.
    pub fn is_legendary_tier(&self) -> bool {
        self.is_legendary || self.is_mythical
    }
}

/// One expression of a species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variety {
    pub name: String,
    pub is_default: bool,
}

impl From<PokemonDto> for CreatureRecord {
    fn from(dto: PokemonDto) -> Self {
        let mut stats = StatVector::default();
        for entry in &dto.stats {
            if let Some(key) = StatKey::from_api_name(&entry.stat.name) {
                stats.set(key, entry.base_stat);
            }
        }

        let mut fallbacks = Vec::new();
        if let Some(other) = dto.sprites.other {
            if let Some(artwork) = other.official_artwork {
                fallbacks.extend(artwork.front_default);
                fallbacks.extend(artwork.front_shiny);
            }
            if let Some(home) = other.home {
                fallbacks.extend(home.front_default);
            }
            if let Some(showdown) = other.showdown {
                fallbacks.extend(showdown.front_default);
            }
        }

        CreatureRecord {
            id: dto.id,
            name: dto.name,
            sprites: SpriteSet {
                front_default: dto.sprites.front_default,
                front_variant: dto.sprites.front_shiny,
                fallbacks,
            },
            species: dto.species.url,
            stats,
        }
    }
}

impl From<SpeciesDto> for SpeciesRecord {
    fn from(dto: SpeciesDto) -> Self {
        SpeciesRecord {
            is_legendary: dto.is_legendary,
            is_mythical: dto.is_mythical,
            varieties: dto
                .varieties
                .into_iter()
                .map(|v| Variety {
                    name: v.pokemon.name,
                    is_default: v.is_default,
                })
                .collect(),
        }
    }
}
