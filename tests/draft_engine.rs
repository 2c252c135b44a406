//! End-to-end draft tests against the in-memory creature source.

use statdraft::api::memory::{creature, InMemorySource};
use statdraft::api::{SpeciesRecord, Variety};
use statdraft::draft::{
    CandidatePool, DraftBuilder, DraftEngine, DraftError, Limit, Next, Phase, PresentationEvent,
    Rejection, RevealTiming, SessionLimits,
};
use statdraft::prefetch::{SpriteCache, SpritePair};
use statdraft::types::{RarityTag, StatKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn build(
    source: InMemorySource,
    pool: CandidatePool,
    limits: SessionLimits,
) -> (DraftEngine, mpsc::UnboundedReceiver<PresentationEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = DraftBuilder::new()
        .with_backend(Arc::new(source))
        .with_pool(pool)
        .with_limits(limits)
        .with_timing(RevealTiming::instant())
        .with_skip_pause(Duration::ZERO)
        .with_max_draw_attempts(Some(200))
        .with_seed(42)
        .with_events(tx)
        .build()
        .expect("Failed to build engine");
    (engine, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<PresentationEvent>) -> Vec<PresentationEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn token_of(event: &PresentationEvent) -> Option<u64> {
    match event {
        PresentationEvent::Status { token, .. }
        | PresentationEvent::Placeholder { token, .. }
        | PresentationEvent::Settled { token, .. } => Some(*token),
        _ => None,
    }
}

fn legendary() -> SpeciesRecord {
    SpeciesRecord {
        is_legendary: true,
        ..SpeciesRecord::default()
    }
}

fn variety(name: &str, is_default: bool) -> Variety {
    Variety {
        name: name.to_string(),
        is_default,
    }
}

const NAMES: [&str; 7] = ["lapras", "snorlax", "gengar", "dragonite", "alakazam", "machamp", "golem"];

fn seven_creatures() -> InMemorySource {
    NAMES
        .iter()
        .enumerate()
        .fold(InMemorySource::new(), |source, (i, name)| {
            let base = 50 + i as u32 * 10;
            source.with_creature(creature(name, [base, base + 1, base + 2, base + 3, base + 4, base + 5]))
        })
}

#[tokio::test]
async fn test_full_draft_sums_assigned_values() {
    let (mut engine, mut rx) = build(seven_creatures(), CandidatePool::new(NAMES, &[]), SessionLimits::default());
    engine.start().await.unwrap();

    let mut expected = 0;
    let mut completed = None;
    for stat in StatKey::ALL {
        engine.wait_ready().await.unwrap();
        let candidate = engine.session().current_candidate().unwrap().clone();
        let assignment = engine.assign(stat).await.unwrap();

        assert_eq!(assignment.value, candidate.stats.get(stat));
        expected += assignment.value;
        if let Next::Complete(scorecard) = assignment.next {
            completed = Some(scorecard);
        }
    }

    let scorecard = completed.expect("draft should be complete");
    assert_eq!(scorecard.total, expected);
    assert!(engine.session().is_complete());
    assert_eq!(engine.session().seen().len(), 6);

    let events = drain(&mut rx);
    assert!(matches!(events.last(), Some(PresentationEvent::Completed { .. })));
    let settled = events
        .iter()
        .filter(|e| matches!(e, PresentationEvent::Settled { .. }))
        .count();
    assert_eq!(settled, 6);

    // further commands are refused
    assert_eq!(
        engine.assign(StatKey::Hp).await.unwrap_err(),
        DraftError::Rejected(Rejection::SessionComplete)
    );
}

#[tokio::test]
async fn test_superseded_generation_is_silent() {
    let source = InMemorySource::new()
        .with_creature(creature("lugia", [106, 90, 130, 90, 154, 110]))
        .with_species("lugia", legendary())
        .with_delay("lugia", Duration::from_millis(150));
    let sprites = SpriteCache::new();
    sprites
        .extend([SpritePair {
            default: "https://sprites.test/placeholder.png".to_string(),
            variant: None,
        }])
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut engine = DraftBuilder::new()
        .with_backend(Arc::new(source))
        .with_pool(CandidatePool::new(["lugia"], &[]))
        .with_sprite_cache(sprites)
        .with_timing(RevealTiming {
            frame: Duration::from_millis(10),
            ..RevealTiming::instant()
        })
        .with_seed(1)
        .with_events(tx)
        .build()
        .unwrap();

    let first = engine.start_generation().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = engine.start_generation().unwrap();
    engine.wait_ready().await.unwrap();

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| token_of(e) == Some(first)), "first generation should have animated");
    let handover = events
        .iter()
        .position(|e| token_of(e) == Some(second))
        .expect("second generation emitted nothing");
    assert!(events[handover..].iter().all(|e| token_of(e) != Some(first)));

    // only one of the two draws was accepted
    assert_eq!(engine.session().counters().legendary_used, 1);
    assert_eq!(engine.session().seen().len(), 1);
    assert_eq!(engine.session().current_candidate().unwrap().rarity, Some(RarityTag::Legendary));
}

#[tokio::test]
async fn test_zero_limits_gate_rarities_and_skips() {
    let source = InMemorySource::new()
        .with_creature(creature("mewtwo", [106, 110, 90, 154, 90, 130]))
        .with_species("mewtwo", legendary())
        .with_creature(creature("kartana", [59, 181, 131, 59, 31, 109]))
        .with_creature(creature("lapras", [130, 85, 80, 85, 95, 60]));
    let limits = SessionLimits {
        skip_limit: Limit::Finite(0),
        legendary_limit: Limit::Finite(0),
        ultrabeast_limit: Limit::Finite(0),
        ..SessionLimits::default()
    };
    let pool = CandidatePool::new(["mewtwo", "kartana", "lapras"], &["kartana"]);
    let (mut engine, _rx) = build(source, pool, limits);

    engine.start().await.unwrap();
    let candidate = engine.session().current_candidate().unwrap();
    assert_eq!(candidate.identity, "lapras");
    assert_eq!(candidate.rarity, None);
    assert_eq!(engine.session().counters().legendary_used, 0);
    assert_eq!(engine.session().counters().ultrabeast_used, 0);

    assert_eq!(
        engine.skip().await.unwrap_err(),
        DraftError::Rejected(Rejection::SkipsExhausted)
    );
    assert_eq!(engine.session().counters().skip_used, 0);
}

#[tokio::test]
async fn test_three_forms_block_until_chosen_and_megas_follow_the_form() {
    let mut alpha = creature("testmon-alpha", [80, 120, 80, 60, 80, 100]);
    alpha.species = "alpha-line".to_string();
    let mut alpha_mega = creature("testmon-alpha-mega", [80, 160, 100, 60, 90, 130]);
    alpha_mega.species = "alpha-line".to_string();
    let mut beta = creature("testmon-beta", [80, 60, 120, 80, 120, 60]);
    beta.species = "beta-line".to_string();

    let source = InMemorySource::new()
        .with_creature(creature("testmon", [80, 80, 80, 80, 80, 80]))
        .with_creature(alpha)
        .with_creature(alpha_mega)
        .with_creature(beta)
        .with_species(
            "testmon",
            SpeciesRecord {
                varieties: vec![
                    variety("testmon", true),
                    variety("testmon-alpha", false),
                    variety("testmon-beta", false),
                ],
                ..SpeciesRecord::default()
            },
        )
        .with_species(
            "alpha-line",
            SpeciesRecord {
                varieties: vec![variety("testmon-alpha", true), variety("testmon-alpha-mega", false)],
                ..SpeciesRecord::default()
            },
        );
    let (mut engine, mut rx) = build(source, CandidatePool::new(["testmon"], &[]), SessionLimits::default());

    engine.start().await.unwrap();
    assert!(matches!(engine.session().phase(), Phase::ChoosingForm { forms, .. } if forms.len() == 3));
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, PresentationEvent::FormChoice { options } if options.len() == 3)));

    assert_eq!(
        engine.assign(StatKey::Attack).await.unwrap_err(),
        DraftError::Rejected(Rejection::ChoiceRequired)
    );
    assert_eq!(
        engine.skip().await.unwrap_err(),
        DraftError::Rejected(Rejection::ChoiceRequired)
    );
    assert_eq!(engine.mega_evolve().unwrap_err(), Rejection::ChoiceRequired);

    let chosen = engine.choose_form(1).await.unwrap();
    assert_eq!(chosen.name, "testmon-alpha");
    assert_eq!(chosen.identity, "testmon");
    assert!(engine.session().mega_available());

    engine.mega_evolve().unwrap();
    let current = engine.session().current_candidate().unwrap();
    assert_eq!(current.name, "testmon-alpha-mega");
    assert_eq!(current.identity, "testmon");
    assert_eq!(engine.session().counters().mega_used, 1);

    let assignment = engine.assign(StatKey::Attack).await.unwrap();
    assert_eq!(assignment.value, 160);
}

#[tokio::test]
async fn test_exhausted_pool_is_reported() {
    let source = InMemorySource::new().with_creature(creature("lapras", [130, 85, 80, 85, 95, 60]));
    let (mut engine, _rx) = build(source, CandidatePool::new(["lapras"], &[]), SessionLimits::default());

    engine.start().await.unwrap();
    engine.assign(StatKey::Hp).await.unwrap();

    // lapras was already drawn and nothing else exists
    assert_eq!(
        engine.wait_ready().await.unwrap_err(),
        DraftError::PoolExhausted { attempts: 200 }
    );
}

#[tokio::test]
async fn test_broken_sprite_restarts_generation() {
    let source = InMemorySource::new()
        .with_creature(creature("missingno", [33, 136, 0, 6, 6, 29]))
        .with_creature(creature("lapras", [130, 85, 80, 85, 95, 60]))
        .with_broken_asset("https://sprites.test/missingno.png");
    let (mut engine, _rx) = build(
        source,
        CandidatePool::new(["missingno", "lapras"], &[]),
        SessionLimits::default(),
    );

    engine.start().await.unwrap();
    assert_eq!(engine.session().current_candidate().unwrap().name, "lapras");
    assert!(!engine.session().seen().contains("missingno"));
}

#[tokio::test]
async fn test_skip_starts_next_generation() {
    let (mut engine, mut rx) = build(seven_creatures(), CandidatePool::new(NAMES, &[]), SessionLimits::default());
    engine.start().await.unwrap();
    let skipped = engine.session().current_candidate().unwrap().identity.clone();

    let outcome = engine.skip().await.unwrap();
    assert_eq!(outcome.skips_left, Some(0));
    engine.wait_ready().await.unwrap();

    let next = engine.session().current_candidate().unwrap();
    assert_ne!(next.identity, skipped);
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, PresentationEvent::Skipped { skips_left: Some(0) })));
}
