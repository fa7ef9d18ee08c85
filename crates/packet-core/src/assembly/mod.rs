//! The assembly pipeline: Select, Pair, Normalize, Assign rounds, Assign
//! packet order, Arrange.
//!
//! Every random draw comes from the single generator owned by
//! [`PacketAssembler`], so a seed reproduces the whole packet.

pub mod arrange;
pub mod difficulty;
pub mod order;
pub mod pairing;
pub mod rounds;
pub mod select;

use std::collections::BTreeMap;
use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{Level, event};

use crate::error::{PacketError, SchemaError};
use crate::model::category::CategoryMap;
use crate::model::pair::{Pair, PairIdAllocator};
use crate::model::question::Question;
use crate::model::round::{Round, RoundKind, RoundLayout};
use crate::snapshot::AssignmentRow;

use self::arrange::Arranger;
use self::difficulty::Jitter;
use self::order::{ORDER_STRIDE, assign_packet_order, interleave};
use self::pairing::{ForcedPairs, pair_free, pair_round_buckets};
use self::rounds::{assign_by_difficulty, validate_preassigned};
use self::select::select;

/// How round membership is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Trim each category, pair by difficulty, slice into rounds.
    SortAndSlice,
    /// Trust the round column and only validate it.
    PassThrough,
}

impl Strategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Strategy::SortAndSlice => "sort-and-slice",
            Strategy::PassThrough => "pass-through",
        }
    }

    /// Pass-through when every question carries a round, sort-and-slice when
    /// none does. A partial round column is rejected.
    pub fn detect(questions: &[Question]) -> Result<Self, SchemaError> {
        let assigned = questions.iter().filter(|q| q.round().is_some()).count();
        if assigned == 0 {
            return Ok(Strategy::SortAndSlice);
        }
        match questions.iter().find(|q| q.round().is_none()) {
            None => Ok(Strategy::PassThrough),
            Some(blank) => Err(SchemaError::MixedRoundColumn {
                row: blank.id(),
                assigned,
            }),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables for one assembly run.
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Pairs per round for each category.
    pub quotas: CategoryMap<usize>,
    pub layout: RoundLayout,
    pub arranger: Arranger,
    pub jitter: Jitter,
    pub seed: u64,
}

impl AssemblyConfig {
    pub fn new(quotas: CategoryMap<usize>, round_count: u32) -> Self {
        Self {
            quotas,
            layout: RoundLayout::new(round_count),
            arranger: Arranger::default(),
            jitter: Jitter::None,
            seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn validate(&self) -> Result<(), PacketError> {
        if self.layout.round_count == 0 {
            return Err(PacketError::config("rounds.count", "must be at least 1"));
        }
        if self.layout.tiebreak_offset < self.layout.round_count {
            return Err(PacketError::config(
                "rounds.tiebreak_offset",
                format!(
                    "{} overlaps the {} regular rounds",
                    self.layout.tiebreak_offset, self.layout.round_count
                ),
            ));
        }
        if self.quotas.total() == 0 {
            return Err(PacketError::config("quotas", "at least one category needs a non-zero quota"));
        }
        for (category, &quota) in self.quotas.iter() {
            if quota > ORDER_STRIDE as usize {
                return Err(PacketError::config(
                    format!("quotas.{category}"),
                    format!("{quota} exceeds the per-round limit of {ORDER_STRIDE}"),
                ));
            }
        }
        if self.arranger.max_attempts == 0 {
            return Err(PacketError::config("arrangement.max_attempts", "must be at least 1"));
        }
        if self.arranger.chunk_size == Some(0) {
            return Err(PacketError::config("arrangement.chunk_size", "must be at least 1"));
        }
        Ok(())
    }
}

/// Finished packet: ordered rounds plus the questions trimmed away.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketSet {
    rounds: Vec<Round>,
    tiebreaks: Vec<Round>,
    removed: Vec<Question>,
    strategy: Strategy,
}

impl PacketSet {
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn tiebreaks(&self) -> &[Round] {
        &self.tiebreaks
    }

    pub fn removed(&self) -> &[Question] {
        &self.removed
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Regular rounds, then tiebreaks.
    pub fn all_rounds(&self) -> impl Iterator<Item = &Round> {
        self.rounds.iter().chain(self.tiebreaks.iter())
    }

    pub fn removed_counts(&self) -> CategoryMap<usize> {
        let mut counts = CategoryMap::default();
        for question in &self.removed {
            counts[question.category()] += 1;
        }
        counts
    }

    /// One row per input question: placed questions in packet order, then
    /// removed ones.
    pub fn table_rows(&self) -> Vec<AssignmentRow> {
        let mut rows = Vec::new();
        for round in self.all_rounds() {
            for (position, (pair, question)) in round.questions().enumerate() {
                rows.push(AssignmentRow::placed(round, position + 1, pair, question));
            }
        }
        rows.extend(self.removed.iter().map(AssignmentRow::removed));
        rows
    }
}

/// Drives one seeded assembly run.
#[derive(Debug, Clone)]
pub struct PacketAssembler {
    config: AssemblyConfig,
    rng: StdRng,
}

impl PacketAssembler {
    pub fn new(config: AssemblyConfig) -> Result<Self, PacketError> {
        config.validate()?;
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
        })
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    pub fn assemble(&mut self, questions: Vec<Question>) -> Result<PacketSet, PacketError> {
        let strategy = Strategy::detect(&questions)?;
        let forced = ForcedPairs::detect(&questions)?;
        let mut ids = PairIdAllocator::new();

        event!(
            target: "packet_core::assembly",
            Level::DEBUG,
            strategy = strategy.as_str(),
            questions = questions.len() as u32,
            forced_pairs = forced.len() as u32,
        );

        let (pairs, removed) = match strategy {
            Strategy::SortAndSlice => self.sort_and_slice(questions, &forced, &mut ids)?,
            Strategy::PassThrough => (self.pass_through(questions, &forced, &mut ids)?, Vec::new()),
        };

        let mut by_round: BTreeMap<u32, CategoryMap<Vec<Pair>>> = BTreeMap::new();
        for pair in interleave(pairs)? {
            let round = pair.round().ok_or_else(|| {
                PacketError::consistency(format!("pair {}", pair.id()), "no round assigned")
            })?;
            by_round.entry(round).or_default().push(pair.category(), pair);
        }

        let mut rounds = Vec::new();
        let mut tiebreaks = Vec::new();
        for (number, streams) in by_round {
            let kind = self.config.layout.classify(number).ok_or_else(|| {
                PacketError::consistency(format!("round {number}"), "outside the round layout")
            })?;
            let arrangement = self.config.arranger.arrange(number, streams, &mut self.rng)?;
            let round = Round::new(number, kind, arrangement.entries, arrangement.attempts);
            match kind {
                RoundKind::Regular => rounds.push(round),
                RoundKind::Tiebreak(_) => tiebreaks.push(round),
            }
        }

        event!(
            target: "packet_core::assembly",
            Level::INFO,
            strategy = strategy.as_str(),
            rounds = rounds.len() as u32,
            tiebreaks = tiebreaks.len() as u32,
            removed = removed.len() as u32,
        );

        Ok(PacketSet {
            rounds,
            tiebreaks,
            removed,
            strategy,
        })
    }

    fn sort_and_slice(
        &mut self,
        questions: Vec<Question>,
        forced: &ForcedPairs,
        ids: &mut PairIdAllocator,
    ) -> Result<(Vec<Pair>, Vec<Question>), PacketError> {
        let round_count = self.config.layout.round_count;
        let mut pools: CategoryMap<Vec<Question>> = CategoryMap::default();
        for question in questions {
            pools.push(question.category(), question);
        }

        let mut placed = Vec::new();
        let mut removed = Vec::new();
        for (category, pool) in pools.into_entries() {
            let quota = self.config.quotas[category];
            let required = quota * round_count as usize;
            let selection = select(category, pool, forced, required, &mut self.rng)?;
            removed.extend(selection.removed);

            let mut pairs = pair_free(category, selection.kept, forced, ids, self.config.jitter, &mut self.rng)?;
            assign_by_difficulty(category, &mut pairs, quota, round_count)?;
            assign_packet_order(&mut pairs, &mut self.rng)?;
            placed.extend(pairs);
        }
        Ok((placed, removed))
    }

    fn pass_through(
        &mut self,
        questions: Vec<Question>,
        forced: &ForcedPairs,
        ids: &mut PairIdAllocator,
    ) -> Result<Vec<Pair>, PacketError> {
        let mut by_round: BTreeMap<u32, Vec<Question>> = BTreeMap::new();
        for question in questions {
            if let Some(round) = question.round() {
                by_round.entry(round).or_default().push(question);
            }
        }

        let mut paired: BTreeMap<u32, CategoryMap<Vec<Pair>>> = BTreeMap::new();
        for (round, members) in by_round {
            let streams = pair_round_buckets(round, members, forced, ids, self.config.jitter, &mut self.rng)?;
            paired.insert(round, streams);
        }
        validate_preassigned(&paired, &self.config.layout, &self.config.quotas)?;

        let mut placed = Vec::new();
        for streams in paired.into_values() {
            for (_, mut pairs) in streams.into_entries() {
                assign_packet_order(&mut pairs, &mut self.rng)?;
                placed.extend(pairs);
            }
        }
        Ok(placed)
    }
}
