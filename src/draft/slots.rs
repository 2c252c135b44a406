//! Slot assignment table and scoring.

use crate::draft::types::Rejection;
use crate::types::{Candidate, StatKey};
use serde::Serialize;

/// A filled slot. The variant bonus is rolled once at assignment and stored here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotEntry {
    pub candidate: Candidate,
    pub base_value: u32,
    pub bonus: u32,
}

impl SlotEntry {
    pub fn new(candidate: Candidate, stat: StatKey, bonus: u32) -> Self {
        let base_value = candidate.stats.get(stat);
        Self {
            candidate,
            base_value,
            bonus,
        }
    }

    /// Value that counts towards the score.
    pub fn value(&self) -> u32 {
        self.base_value + self.bonus
    }
}

/// The six stat slots. A filled slot is never cleared or overwritten.
#[derive(Debug, Clone, Default)]
pub struct SlotTable {
    slots: [Option<SlotEntry>; 6],
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stat: StatKey) -> Option<&SlotEntry> {
        self.slots[Self::index(stat)].as_ref()
    }

    pub fn is_filled(&self, stat: StatKey) -> bool {
        self.get(stat).is_some()
    }

    /// Fill an empty slot.
    pub fn fill(&mut self, stat: StatKey, entry: SlotEntry) -> Result<&SlotEntry, Rejection> {
        let slot = &mut self.slots[Self::index(stat)];
        if slot.is_some() {
            return Err(Rejection::SlotFilled(stat));
        }
        Ok(slot.insert(entry))
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.filled_count() == StatKey::ALL.len()
    }

    /// Stats still waiting for a creature, in slot order.
    pub fn open_stats(&self) -> Vec<StatKey> {
        StatKey::ALL
            .into_iter()
            .filter(|stat| !self.is_filled(*stat))
            .collect()
    }

    /// Final result; `None` until every slot is filled.
    pub fn scorecard(&self) -> Option<Scorecard> {
        if !self.is_complete() {
            return None;
        }

        let lines: Vec<ScoreLine> = StatKey::ALL
            .into_iter()
            .filter_map(|stat| {
                self.get(stat).map(|entry| ScoreLine {
                    stat,
                    name: entry.candidate.name.clone(),
                    value: entry.value(),
                    is_variant: entry.candidate.is_variant,
                })
            })
            .collect();
        let total = lines.iter().map(|line| line.value).sum();

        Some(Scorecard { lines, total })
    }

    fn index(stat: StatKey) -> usize {
        stat as usize
    }
}

/// One row of the result screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreLine {
    pub stat: StatKey,
    pub name: String,
    pub value: u32,
    pub is_variant: bool,
}

/// Per-slot values and their sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scorecard {
    pub lines: Vec<ScoreLine>,
    pub total: u32,
}
