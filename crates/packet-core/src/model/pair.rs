use core::cmp::Ordering;
use core::fmt;

use crate::error::PacketError;
use crate::model::category::Category;
use crate::model::question::{Question, QuestionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairId(pub u32);

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{:04}", self.0)
    }
}

/// Hands out pair ids in creation order.
#[derive(Debug, Default)]
pub struct PairIdAllocator {
    next: u32,
}

impl PairIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> PairId {
        let id = PairId(self.next);
        self.next += 1;
        id
    }
}

/// Sortable position of a pair in the merged packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketSlot {
    pub round: u32,
    pub order: f64,
}

impl PacketSlot {
    pub fn cmp_key(&self, other: &PacketSlot) -> Ordering {
        self.round
            .cmp(&other.round)
            .then_with(|| self.order.total_cmp(&other.order))
    }
}

/// A toss-up bound to a bonus of the same category.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    id: PairId,
    tossup: Question,
    bonus: Question,
    forced: bool,
    difficulty: f64,
    round: Option<u32>,
    slot: Option<PacketSlot>,
}

impl Pair {
    pub fn new(id: PairId, tossup: Question, bonus: Question, forced: bool) -> Result<Self, PacketError> {
        if tossup.kind() != QuestionType::TossUp || bonus.kind() != QuestionType::Bonus {
            return Err(PacketError::consistency(
                format!("pair {id}"),
                format!(
                    "expected a Toss-up and a Bonus but found {} ({}) and {} ({})",
                    tossup.kind(),
                    tossup.id(),
                    bonus.kind(),
                    bonus.id()
                ),
            ));
        }

        if !tossup.is_compatible_with(&bonus) {
            return Err(PacketError::consistency(
                format!("pair {id}"),
                format!(
                    "{} is {}/{} but {} is {}/{}",
                    tossup.id(),
                    tossup.category(),
                    tossup.subcategory().unwrap_or("-"),
                    bonus.id(),
                    bonus.category(),
                    bonus.subcategory().unwrap_or("-"),
                ),
            ));
        }

        let difficulty = (tossup.difficulty() + bonus.difficulty()) / 2.0;
        Ok(Self {
            id,
            tossup,
            bonus,
            forced,
            difficulty,
            round: None,
            slot: None,
        })
    }

    pub fn id(&self) -> PairId {
        self.id
    }

    pub fn category(&self) -> Category {
        self.tossup.category()
    }

    pub fn tossup(&self) -> &Question {
        &self.tossup
    }

    pub fn bonus(&self) -> &Question {
        &self.bonus
    }

    pub fn members(&self) -> [&Question; 2] {
        [&self.tossup, &self.bonus]
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    /// Composite difficulty shared by both members; used only for sorting.
    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: f64) {
        self.difficulty = difficulty;
    }

    pub fn round(&self) -> Option<u32> {
        self.round
    }

    pub fn set_round(&mut self, round: u32) {
        self.round = Some(round);
    }

    pub fn slot(&self) -> Option<PacketSlot> {
        self.slot
    }

    pub fn set_slot(&mut self, slot: PacketSlot) {
        self.slot = Some(slot);
    }
}
