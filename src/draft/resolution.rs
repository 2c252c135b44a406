//! Alternate form and power-up (mega) lookup.

use crate::api::{CreatureRecord, CreatureSource, Variety};
use crate::draft::token::GenerationHandle;
use crate::draft::types::DraftError;
use crate::types::Candidate;
use std::sync::Arc;
use tracing::{debug, instrument};

const NON_FORM_MARKERS: &[&str] = &["-mega", "-gmax", "-totem", "-eternamax"];
const NON_MEGA_MARKERS: &[&str] = &["gmax", "eternamax"];

fn is_form(variety: &Variety) -> bool {
    !NON_FORM_MARKERS.iter().any(|marker| variety.name.contains(marker))
}

fn is_mega(variety: &Variety) -> bool {
    !variety.is_default
        && variety.name.contains("mega")
        && !NON_MEGA_MARKERS.iter().any(|marker| variety.name.contains(marker))
}

/// Looks up forms and power-ups for a displayed candidate.
pub struct FormResolver {
    source: Arc<dyn CreatureSource>,
}

impl FormResolver {
    pub fn new(source: Arc<dyn CreatureSource>) -> Self {
        Self { source }
    }

    /// Selectable forms of the candidate's species, the default form included.
    ///
    /// Each form keeps the base identity, rarity and variant flag. Forms that fail to
    /// load or have no default sprite are dropped; a failed species lookup yields none.
    #[instrument(skip_all, fields(candidate = %base.name))]
    pub async fn forms_for(
        &self,
        base: &Candidate,
        handle: &GenerationHandle,
    ) -> Result<Vec<Candidate>, DraftError> {
        let names = self.variety_names(base, handle, is_form).await?;

        let mut forms = Vec::with_capacity(names.len());
        for name in names {
            let record = self.fetch(&name, handle).await?;
            let Some(record) = record else { continue };
            let Some(sprite) = record.sprites.for_variant(base.is_variant) else {
                debug!("Form {} has no sprite, dropped", name);
                continue;
            };
            forms.push(substitute(base, record, sprite));
        }

        debug!("{} form(s) available", forms.len());
        Ok(forms)
    }

    /// Power-ups available for the candidate. A failed lookup means none.
    #[instrument(skip_all, fields(candidate = %current.name))]
    pub async fn megas_for(
        &self,
        current: &Candidate,
        handle: &GenerationHandle,
    ) -> Result<Vec<Candidate>, DraftError> {
        let names = self.variety_names(current, handle, is_mega).await?;

        let mut megas = Vec::with_capacity(names.len());
        for name in names {
            if let Some(record) = self.fetch(&name, handle).await? {
                let sprite = record.sprites.best_available(record.id);
                megas.push(substitute(current, record, sprite));
            }
        }

        debug!("{} power-up(s) available", megas.len());
        Ok(megas)
    }

    async fn variety_names(
        &self,
        candidate: &Candidate,
        handle: &GenerationHandle,
        keep: fn(&Variety) -> bool,
    ) -> Result<Vec<String>, DraftError> {
        let species = self.source.species(&candidate.species).await;
        handle.check()?;

        match species {
            Ok(species) => Ok(species
                .varieties
                .iter()
                .filter(|variety| keep(variety))
                .map(|variety| variety.name.clone())
                .collect()),
            Err(e) => {
                debug!("Species lookup for {} failed: {}", candidate.name, e);
                Ok(Vec::new())
            }
        }
    }

    async fn fetch(
        &self,
        name: &str,
        handle: &GenerationHandle,
    ) -> Result<Option<CreatureRecord>, DraftError> {
        let record = self.source.creature(name).await;
        handle.check()?;
        Ok(record
            .map_err(|e| debug!("Lookup of {} failed: {}", name, e))
            .ok())
    }
}

/// Replace what is displayed while keeping what was drawn.
fn substitute(base: &Candidate, record: CreatureRecord, sprite: String) -> Candidate {
    Candidate {
        identity: base.identity.clone(),
        name: record.name,
        sprite,
        rarity: base.rarity,
        is_variant: base.is_variant,
        species: record.species,
        stats: record.stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{creature, InMemorySource};
    use crate::api::SpeciesRecord;
    use crate::draft::token::GenerationCounter;
    use crate::types::{RarityTag, StatKey};

    fn variety(name: &str, is_default: bool) -> Variety {
        Variety {
            name: name.to_string(),
            is_default,
        }
    }

    fn charizard_source() -> InMemorySource {
        let mut mega_x = creature("charizard-mega-x", [78, 130, 111, 130, 85, 100]);
        mega_x.species = "charizard".to_string();
        mega_x.sprites.front_default = None;
        mega_x.sprites.front_variant = None;
        mega_x.id = 10034;
        let mut gmax = creature("charizard-gmax", [78, 84, 78, 109, 85, 100]);
        gmax.species = "charizard".to_string();

        InMemorySource::new()
            .with_creature(creature("charizard", [78, 84, 78, 109, 85, 100]))
            .with_creature(mega_x)
            .with_creature(gmax)
            .with_species(
                "charizard",
                SpeciesRecord {
                    varieties: vec![
                        variety("charizard", true),
                        variety("charizard-mega-x", false),
                        variety("charizard-mega-y", false),
                        variety("charizard-gmax", false),
                    ],
                    ..SpeciesRecord::default()
                },
            )
    }

    fn drawn(record: CreatureRecord) -> Candidate {
        Candidate {
            identity: record.name.clone(),
            name: record.name.clone(),
            sprite: record.sprites.front_default.clone().unwrap_or_default(),
            rarity: Some(RarityTag::Legendary),
            is_variant: true,
            species: record.species.clone(),
            stats: record.stats,
        }
    }

    #[test]
    fn test_variety_filters() {
        assert!(is_form(&variety("giratina-origin", false)));
        assert!(!is_form(&variety("charizard-mega-x", false)));
        assert!(!is_form(&variety("eternatus-eternamax", false)));
        assert!(is_mega(&variety("meganium-mega", false)));
        assert!(!is_mega(&variety("meganium", true)));
        assert!(!is_mega(&variety("venusaur-gmax", false)));
    }

    #[tokio::test]
    async fn test_forms_skip_megas_and_gmax() {
        let resolver = FormResolver::new(Arc::new(charizard_source()));
        let handle = GenerationCounter::new().advance();
        let base = drawn(creature("charizard", [78, 84, 78, 109, 85, 100]));

        let forms = resolver.forms_for(&base, &handle).await.unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].name, "charizard");
        assert_eq!(forms[0].sprite, "https://sprites.test/shiny/charizard.png");
    }

    #[tokio::test]
    async fn test_megas_keep_identity_and_use_sprite_fallback() {
        let resolver = FormResolver::new(Arc::new(charizard_source()));
        let handle = GenerationCounter::new().advance();
        let base = drawn(creature("charizard", [78, 84, 78, 109, 85, 100]));

        // mega-y is listed but unknown to the source, so only mega-x remains
        let megas = resolver.megas_for(&base, &handle).await.unwrap();
        assert_eq!(megas.len(), 1);

        let mega = &megas[0];
        assert_eq!(mega.identity, "charizard");
        assert_eq!(mega.rarity, Some(RarityTag::Legendary));
        assert!(mega.is_variant);
        assert_eq!(mega.stats.get(StatKey::Attack), 130);
        assert!(mega.sprite.ends_with("/10034.png"));
    }

    #[tokio::test]
    async fn test_failed_species_lookup_means_nothing() {
        let resolver = FormResolver::new(Arc::new(InMemorySource::new()));
        let handle = GenerationCounter::new().advance();
        let base = drawn(creature("ghost", [1, 1, 1, 1, 1, 1]));

        assert!(resolver.forms_for(&base, &handle).await.unwrap().is_empty());
        assert!(resolver.megas_for(&base, &handle).await.unwrap().is_empty());
    }
}
