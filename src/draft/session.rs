//! Draft session state machine.
//!
//! [`DraftSession`] owns every piece of mutable draft state: limits, counters, slots,
//! the seen-set and the current phase. All mutation is synchronous and goes through
//! `&mut self`. Asynchronous work gets an immutable [`GateSnapshot`] via
//! [`DraftSession::begin_generation`] and reports back through the token-checked
//! checkpoint methods, which refuse stale tokens without touching state.

use crate::draft::generator::GateSnapshot;
use crate::draft::slots::{Scorecard, SlotEntry, SlotTable};
use crate::draft::token::{GenerationCounter, GenerationHandle};
use crate::draft::types::{Rejection, SessionCounters, SessionLimits, StaleGeneration};
use crate::types::{Candidate, StatKey};
use nonempty::NonEmpty;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use tracing::{debug, info};

/// Range of the bonus added to a variant's stat when the boost is on.
pub const VARIANT_BONUS: RangeInclusive<u32> = 5..=15;

/// Where the session currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Nothing displayed and nothing in flight
    Idle,
    /// A generation is drawing and revealing a candidate
    Generating { token: u64 },
    /// A candidate is shown; form or power-up lookup is still running
    Resolving { candidate: Candidate },
    /// Several forms exist and the player must pick one
    ChoosingForm { base: Candidate, forms: NonEmpty<Candidate> },
    /// The candidate can be assigned, skipped or powered up
    Ready { candidate: Candidate, megas: Vec<Candidate> },
    /// Several power-ups exist and the player must pick one
    ChoosingMega { candidate: Candidate, options: NonEmpty<Candidate> },
    /// Every slot is filled
    Complete,
}

/// Everything an asynchronous generation needs from the session.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub handle: GenerationHandle,
    pub gate: GateSnapshot,
    /// Seed for the generation's own RNG
    pub seed: u64,
}

/// What happens after a successful assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    Generate,
    Complete(Scorecard),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub stat: StatKey,
    pub name: String,
    pub value: u32,
    pub bonus: u32,
    pub next: Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipOutcome {
    /// `None` when skips are unlimited
    pub skips_left: Option<u32>,
}

/// Result of checking forms for a freshly accepted candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStep {
    /// At most one form; power-ups can be offered right away
    Single,
    /// The player has to pick one of these names
    Choose(Vec<String>),
}

/// Result of a power-up request.
#[derive(Debug, Clone, PartialEq)]
pub enum MegaStep {
    /// The only option was applied
    Applied(Candidate),
    /// The player has to pick one of these names
    Choose(Vec<String>),
}

/// One player's draft.
#[derive(Debug)]
pub struct DraftSession {
    limits: SessionLimits,
    counters: SessionCounters,
    slots: SlotTable,
    seen: HashSet<String>,
    phase: Phase,
    generations: GenerationCounter,
    rng: StdRng,
}

impl DraftSession {
    pub fn new(limits: SessionLimits, seed: u64) -> Self {
        Self {
            limits,
            counters: SessionCounters::default(),
            slots: SlotTable::new(),
            seen: HashSet::new(),
            phase: Phase::Idle,
            generations: GenerationCounter::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn limits(&self) -> &SessionLimits {
        &self.limits
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Identities accepted so far.
    pub fn seen(&self) -> &HashSet<String> {
        &self.seen
    }

    pub fn current_token(&self) -> u64 {
        self.generations.current()
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    /// Candidate on display, if any.
    pub fn current_candidate(&self) -> Option<&Candidate> {
        match &self.phase {
            Phase::Resolving { candidate }
            | Phase::Ready { candidate, .. }
            | Phase::ChoosingMega { candidate, .. } => Some(candidate),
            Phase::ChoosingForm { base, .. } => Some(base),
            Phase::Idle | Phase::Generating { .. } | Phase::Complete => None,
        }
    }

    /// Whether a power-up could be used right now.
    pub fn mega_available(&self) -> bool {
        matches!(&self.phase, Phase::Ready { megas, .. } if !megas.is_empty())
            && self.limits.mega_limit.allows(self.counters.mega_used)
    }

    pub fn skips_left(&self) -> Option<u32> {
        self.limits.skip_limit.remaining(self.counters.skip_used)
    }

    pub fn scorecard(&self) -> Option<Scorecard> {
        self.slots.scorecard()
    }

    /// Start a new generation, superseding whatever was in flight or on display.
    pub fn begin_generation(&mut self) -> Result<GenerationTicket, Rejection> {
        if self.is_complete() {
            return Err(Rejection::SessionComplete);
        }

        let handle = self.generations.advance();
        self.phase = Phase::Generating {
            token: handle.token(),
        };
        debug!("Generation {} started", handle.token());

        Ok(GenerationTicket {
            gate: GateSnapshot::new(self.limits, self.counters, self.seen.clone()),
            seed: self.rng.gen(),
            handle,
        })
    }

    /// Accept a drawn candidate: mark it seen and count its rarity.
    pub fn complete_generation(
        &mut self,
        token: u64,
        candidate: Candidate,
    ) -> Result<(), StaleGeneration> {
        self.expect_generating(token)?;

        // a snapshot that no longer matches the session is as good as stale
        let still_admitted = !self.seen.contains(&candidate.identity)
            && candidate
                .rarity
                .map_or(true, |tag| self.limits.admits(&self.counters, tag));
        if !still_admitted {
            return Err(self.stale(token));
        }

        self.seen.insert(candidate.identity.clone());
        if let Some(tag) = candidate.rarity {
            self.counters.record_rarity(tag);
        }
        info!("Accepted {} (generation {})", candidate.name, token);
        self.phase = Phase::Resolving { candidate };
        Ok(())
    }

    /// Apply the form lookup of the current generation.
    pub fn resolve_forms(
        &mut self,
        token: u64,
        forms: Vec<Candidate>,
    ) -> Result<FormStep, StaleGeneration> {
        self.expect_current(token)?;
        let base = match &self.phase {
            Phase::Resolving { candidate } => candidate.clone(),
            _ => return Err(self.stale(token)),
        };

        match NonEmpty::from_vec(forms) {
            Some(forms) if forms.len() > 1 => {
                let names = forms.iter().map(|form| form.name.clone()).collect();
                self.phase = Phase::ChoosingForm { base, forms };
                Ok(FormStep::Choose(names))
            }
            _ => Ok(FormStep::Single),
        }
    }

    /// Replace the displayed candidate with one of the offered forms.
    ///
    /// The session stays busy until [`DraftSession::offer_megas`] is called for the
    /// chosen form.
    pub fn choose_form(&mut self, index: usize) -> Result<Candidate, Rejection> {
        let Phase::ChoosingForm { forms, .. } = &self.phase else {
            return Err(self.not_choosing());
        };
        let chosen = forms.get(index).cloned().ok_or(Rejection::InvalidChoice {
            index,
            available: forms.len(),
        })?;

        debug!("Form {} chosen", chosen.name);
        self.phase = Phase::Resolving {
            candidate: chosen.clone(),
        };
        Ok(chosen)
    }

    /// Attach the power-up lookup to the displayed candidate; returns whether a
    /// power-up can be used.
    pub fn offer_megas(
        &mut self,
        token: u64,
        megas: Vec<Candidate>,
    ) -> Result<bool, StaleGeneration> {
        self.expect_current(token)?;
        let candidate = match &self.phase {
            Phase::Resolving { candidate } => candidate.clone(),
            _ => return Err(self.stale(token)),
        };

        self.phase = Phase::Ready { candidate, megas };
        Ok(self.mega_available())
    }

    /// Use a power-up on the displayed candidate.
    pub fn mega_evolve(&mut self) -> Result<MegaStep, Rejection> {
        let Phase::Ready { candidate, megas } = &self.phase else {
            return Err(self.not_ready());
        };
        if !self.limits.mega_limit.allows(self.counters.mega_used) {
            return Err(Rejection::MegaLimitReached);
        }
        let (candidate, megas) = (candidate.clone(), megas.clone());

        match NonEmpty::from_vec(megas) {
            None => Err(Rejection::MegaUnavailable),
            Some(options) if options.len() == 1 => Ok(MegaStep::Applied(self.apply_mega(options.head))),
            Some(options) => {
                let names = options.iter().map(|mega| mega.name.clone()).collect();
                self.phase = Phase::ChoosingMega { candidate, options };
                Ok(MegaStep::Choose(names))
            }
        }
    }

    /// Apply one of several offered power-ups.
    pub fn choose_mega(&mut self, index: usize) -> Result<Candidate, Rejection> {
        let Phase::ChoosingMega { options, .. } = &self.phase else {
            return Err(self.not_choosing());
        };
        let chosen = options.get(index).cloned().ok_or(Rejection::InvalidChoice {
            index,
            available: options.len(),
        })?;
        Ok(self.apply_mega(chosen))
    }

    fn apply_mega(&mut self, mega: Candidate) -> Candidate {
        self.counters.mega_used += 1;
        info!("Power-up {} applied ({} used)", mega.name, self.counters.mega_used);
        self.phase = Phase::Ready {
            candidate: mega.clone(),
            megas: Vec::new(),
        };
        mega
    }

    /// Put the displayed candidate into a slot.
    pub fn assign(&mut self, stat: StatKey) -> Result<Assignment, Rejection> {
        let Phase::Ready { candidate, .. } = &self.phase else {
            return Err(self.not_ready());
        };
        if self.slots.is_filled(stat) {
            return Err(Rejection::SlotFilled(stat));
        }

        let bonus = if candidate.is_variant && self.limits.variant_boost_active() {
            self.rng.gen_range(VARIANT_BONUS)
        } else {
            0
        };
        let entry = SlotEntry::new(candidate.clone(), stat, bonus);
        let filled = self.slots.fill(stat, entry)?;
        let (name, value) = (filled.candidate.name.clone(), filled.value());
        info!("{} assigned to {} for {}", name, stat, value);

        let next = match self.slots.scorecard() {
            Some(scorecard) => {
                info!("Draft complete, total {}", scorecard.total);
                self.phase = Phase::Complete;
                Next::Complete(scorecard)
            }
            None => {
                self.phase = Phase::Idle;
                Next::Generate
            }
        };

        Ok(Assignment {
            stat,
            name,
            value,
            bonus,
            next,
        })
    }

    /// Discard the displayed candidate.
    pub fn skip(&mut self) -> Result<SkipOutcome, Rejection> {
        let Phase::Ready { candidate, .. } = &self.phase else {
            return Err(self.not_ready());
        };
        if !self.limits.skip_limit.allows(self.counters.skip_used) {
            return Err(Rejection::SkipsExhausted);
        }

        debug!("Skipped {}", candidate.name);
        self.counters.skip_used += 1;
        self.phase = Phase::Idle;
        Ok(SkipOutcome {
            skips_left: self.skips_left(),
        })
    }

    fn not_ready(&self) -> Rejection {
        match &self.phase {
            Phase::Complete => Rejection::SessionComplete,
            Phase::Idle => Rejection::NoCandidate,
            Phase::ChoosingForm { .. } | Phase::ChoosingMega { .. } => Rejection::ChoiceRequired,
            Phase::Generating { .. } | Phase::Resolving { .. } | Phase::Ready { .. } => Rejection::Busy,
        }
    }

    fn not_choosing(&self) -> Rejection {
        match &self.phase {
            Phase::Complete => Rejection::SessionComplete,
            _ => Rejection::NotChoosing,
        }
    }

    fn stale(&self, token: u64) -> StaleGeneration {
        StaleGeneration {
            token,
            current: self.generations.current(),
        }
    }

    fn expect_current(&self, token: u64) -> Result<(), StaleGeneration> {
        if token == self.generations.current() {
            Ok(())
        } else {
            Err(self.stale(token))
        }
    }

    fn expect_generating(&self, token: u64) -> Result<(), StaleGeneration> {
        self.expect_current(token)?;
        match self.phase {
            Phase::Generating { token: active } if active == token => Ok(()),
            _ => Err(self.stale(token)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::types::Limit;
    use crate::types::{RarityTag, StatVector};

    fn candidate(name: &str, rarity: Option<RarityTag>) -> Candidate {
        Candidate {
            identity: name.to_string(),
            name: name.to_string(),
            sprite: format!("https://sprites.test/{}.png", name),
            rarity,
            is_variant: false,
            species: name.to_string(),
            stats: StatVector::new([100, 90, 80, 70, 60, 50]),
        }
    }

    fn ready(session: &mut DraftSession, c: Candidate, megas: Vec<Candidate>) -> u64 {
        let token = session.begin_generation().unwrap().handle.token();
        session.complete_generation(token, c).unwrap();
        assert_eq!(session.resolve_forms(token, Vec::new()).unwrap(), FormStep::Single);
        session.offer_megas(token, megas).unwrap();
        token
    }

    #[test]
    fn test_assign_fills_slot_and_requests_next() {
        let mut session = DraftSession::new(SessionLimits::default(), 1);
        ready(&mut session, candidate("lapras", None), Vec::new());

        let assignment = session.assign(StatKey::Hp).unwrap();
        assert_eq!(assignment.value, 100);
        assert_eq!(assignment.bonus, 0);
        assert_eq!(assignment.next, Next::Generate);
        assert_eq!(session.phase(), &Phase::Idle);

        // nothing on display any more
        assert_eq!(session.assign(StatKey::Attack), Err(Rejection::NoCandidate));
    }

    #[test]
    fn test_filled_slot_is_rejected_without_side_effects() {
        let mut session = DraftSession::new(SessionLimits::default(), 1);
        ready(&mut session, candidate("lapras", None), Vec::new());
        session.assign(StatKey::Hp).unwrap();

        ready(&mut session, candidate("snorlax", None), Vec::new());
        assert_eq!(session.assign(StatKey::Hp), Err(Rejection::SlotFilled(StatKey::Hp)));
        assert_eq!(session.slots().get(StatKey::Hp).unwrap().candidate.name, "lapras");
        assert!(session.assign(StatKey::Speed).is_ok());
    }

    #[test]
    fn test_busy_rejections() {
        let mut session = DraftSession::new(SessionLimits::default(), 1);
        let ticket = session.begin_generation().unwrap();
        assert_eq!(session.assign(StatKey::Hp), Err(Rejection::Busy));
        assert_eq!(session.skip(), Err(Rejection::Busy));
        assert_eq!(session.mega_evolve(), Err(Rejection::Busy));

        session
            .complete_generation(ticket.handle.token(), candidate("lapras", None))
            .unwrap();
        assert_eq!(session.assign(StatKey::Hp), Err(Rejection::Busy));
        assert_eq!(session.counters().skip_used, 0);
    }

    #[test]
    fn test_stale_checkpoints_do_not_mutate() {
        let mut session = DraftSession::new(SessionLimits::default(), 1);
        let old = session.begin_generation().unwrap().handle.token();
        let new = session.begin_generation().unwrap().handle.token();

        let err = session
            .complete_generation(old, candidate("mewtwo", Some(RarityTag::Legendary)))
            .unwrap_err();
        assert_eq!(err, StaleGeneration { token: old, current: new });
        assert!(session.seen().is_empty());
        assert_eq!(session.counters().legendary_used, 0);
        assert_eq!(session.phase(), &Phase::Generating { token: new });

        assert!(session.offer_megas(old, Vec::new()).is_err());
        assert_eq!(session.phase(), &Phase::Generating { token: new });
    }

    #[test]
    fn test_rarity_counted_once_and_gate_rechecked() {
        let mut session = DraftSession::new(SessionLimits::default(), 1);
        ready(&mut session, candidate("mewtwo", Some(RarityTag::Legendary)), Vec::new());
        assert_eq!(session.counters().legendary_used, 1);
        session.assign(StatKey::SpecialAttack).unwrap();

        // a second legendary would break the limit of one
        let token = session.begin_generation().unwrap().handle.token();
        assert!(session
            .complete_generation(token, candidate("lugia", Some(RarityTag::Legendary)))
            .is_err());
        assert_eq!(session.counters().legendary_used, 1);

        // an already drawn identity is refused too
        assert!(session.complete_generation(token, candidate("mewtwo", None)).is_err());
    }

    #[test]
    fn test_skip_limits() {
        let limits = SessionLimits {
            skip_limit: Limit::Finite(1),
            ..SessionLimits::default()
        };
        let mut session = DraftSession::new(limits, 1);
        ready(&mut session, candidate("lapras", None), Vec::new());
        assert_eq!(session.skip().unwrap().skips_left, Some(0));
        assert_eq!(session.skip(), Err(Rejection::NoCandidate));

        ready(&mut session, candidate("snorlax", None), Vec::new());
        assert_eq!(session.skip(), Err(Rejection::SkipsExhausted));
        assert_eq!(session.counters().skip_used, 1);
        assert_eq!(session.current_candidate().unwrap().name, "snorlax");
    }

    #[test]
    fn test_form_choice_blocks_until_chosen() {
        let mut session = DraftSession::new(SessionLimits::default(), 1);
        let token = session.begin_generation().unwrap().handle.token();
        let base = candidate("giratina-altered", Some(RarityTag::Legendary));
        session.complete_generation(token, base.clone()).unwrap();

        let mut origin = candidate("giratina-origin", Some(RarityTag::Legendary));
        origin.identity = base.identity.clone();
        let step = session
            .resolve_forms(token, vec![base.clone(), origin.clone()])
            .unwrap();
        assert_eq!(
            step,
            FormStep::Choose(vec!["giratina-altered".to_string(), "giratina-origin".to_string()])
        );

        assert_eq!(session.assign(StatKey::Hp), Err(Rejection::ChoiceRequired));
        assert_eq!(session.skip(), Err(Rejection::ChoiceRequired));
        assert_eq!(session.mega_evolve(), Err(Rejection::ChoiceRequired));
        assert_eq!(
            session.choose_form(2),
            Err(Rejection::InvalidChoice { index: 2, available: 2 })
        );

        let chosen = session.choose_form(1).unwrap();
        assert_eq!(chosen.name, "giratina-origin");
        assert_eq!(session.assign(StatKey::Hp), Err(Rejection::Busy));

        session.offer_megas(token, Vec::new()).unwrap();
        assert_eq!(session.assign(StatKey::Hp).unwrap().name, "giratina-origin");
        assert_eq!(session.counters().legendary_used, 1);
    }

    #[test]
    fn test_single_mega_applies_and_counts_once() {
        let mut session = DraftSession::new(SessionLimits::default(), 1);
        let mut mega = candidate("charizard-mega-y", None);
        mega.identity = "charizard".to_string();
        ready(&mut session, candidate("charizard", None), vec![mega]);
        assert!(session.mega_available());

        match session.mega_evolve().unwrap() {
            MegaStep::Applied(applied) => {
                assert_eq!(applied.name, "charizard-mega-y");
                assert_eq!(applied.identity, "charizard");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.counters().mega_used, 1);
        assert!(!session.mega_available());
        assert_eq!(session.mega_evolve(), Err(Rejection::MegaLimitReached));
    }

    #[test]
    fn test_several_megas_require_choice() {
        let limits = SessionLimits {
            mega_limit: Limit::Unlimited,
            ..SessionLimits::default()
        };
        let mut session = DraftSession::new(limits, 1);
        let megas = vec![candidate("charizard-mega-x", None), candidate("charizard-mega-y", None)];
        ready(&mut session, candidate("charizard", None), megas);

        assert_eq!(
            session.mega_evolve().unwrap(),
            MegaStep::Choose(vec!["charizard-mega-x".to_string(), "charizard-mega-y".to_string()])
        );
        assert_eq!(session.counters().mega_used, 0);
        assert_eq!(session.assign(StatKey::Hp), Err(Rejection::ChoiceRequired));

        assert_eq!(session.choose_mega(0).unwrap().name, "charizard-mega-x");
        assert_eq!(session.counters().mega_used, 1);
        assert_eq!(session.mega_evolve(), Err(Rejection::MegaUnavailable));
    }

    #[test]
    fn test_zero_mega_limit() {
        let limits = SessionLimits {
            mega_limit: Limit::Finite(0),
            ..SessionLimits::default()
        };
        let mut session = DraftSession::new(limits, 1);
        ready(&mut session, candidate("charizard", None), vec![candidate("charizard-mega-x", None)]);
        assert!(!session.mega_available());
        assert_eq!(session.mega_evolve(), Err(Rejection::MegaLimitReached));
    }

    #[test]
    fn test_variant_bonus_is_stored() {
        let limits = SessionLimits {
            variant_enabled: true,
            variant_boost_enabled: true,
            ..SessionLimits::default()
        };
        let mut session = DraftSession::new(limits, 9);
        let mut shiny = candidate("lapras", None);
        shiny.is_variant = true;
        ready(&mut session, shiny, Vec::new());

        let assignment = session.assign(StatKey::Hp).unwrap();
        assert!(VARIANT_BONUS.contains(&assignment.bonus));
        assert_eq!(assignment.value, 100 + assignment.bonus);
        assert_eq!(session.slots().get(StatKey::Hp).unwrap().value(), assignment.value);
    }

    #[test]
    fn test_completion() {
        let mut session = DraftSession::new(SessionLimits::default(), 1);
        let names = ["a", "b", "c", "d", "e", "f"];
        let mut total = 0;
        for (name, stat) in names.iter().zip(StatKey::ALL) {
            ready(&mut session, candidate(name, None), Vec::new());
            let assignment = session.assign(stat).unwrap();
            total += assignment.value;
            if stat == StatKey::Speed {
                match assignment.next {
                    Next::Complete(scorecard) => assert_eq!(scorecard.total, total),
                    Next::Generate => panic!("draft should be complete"),
                }
            }
        }

        assert!(session.is_complete());
        assert_eq!(total, 450);
        assert_eq!(session.begin_generation().unwrap_err(), Rejection::SessionComplete);
        assert_eq!(session.assign(StatKey::Hp), Err(Rejection::SessionComplete));
    }
}
