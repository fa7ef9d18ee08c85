use crate::model::category::{Category, CategoryMap};
use crate::model::pair::Pair;
use crate::model::question::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundKind {
    Regular,
    /// 1-based tiebreak index.
    Tiebreak(u32),
}

/// Which round numbers exist: regular rounds `1..=round_count`, then
/// tiebreak `k` at `tiebreak_offset + k` for `k` in `1..=tiebreak_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundLayout {
    pub round_count: u32,
    pub tiebreak_count: u32,
    pub tiebreak_offset: u32,
}

impl RoundLayout {
    pub const DEFAULT_TIEBREAK_OFFSET: u32 = 20;
    pub const DEFAULT_TIEBREAK_COUNT: u32 = 10;

    pub fn new(round_count: u32) -> Self {
        Self {
            round_count,
            tiebreak_count: Self::DEFAULT_TIEBREAK_COUNT,
            tiebreak_offset: Self::DEFAULT_TIEBREAK_OFFSET,
        }
    }

    pub fn classify(&self, number: u32) -> Option<RoundKind> {
        if (1..=self.round_count).contains(&number) {
            return Some(RoundKind::Regular);
        }
        let first_tiebreak = self.tiebreak_offset.saturating_add(1);
        let last_tiebreak = self.tiebreak_offset.saturating_add(self.tiebreak_count);
        if self.tiebreak_count > 0 && (first_tiebreak..=last_tiebreak).contains(&number) {
            return Some(RoundKind::Tiebreak(number - self.tiebreak_offset));
        }
        None
    }

    pub fn regular_rounds(&self) -> impl Iterator<Item = u32> {
        1..=self.round_count
    }
}

/// One finalized round: pairs in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    number: u32,
    kind: RoundKind,
    pairs: Vec<Pair>,
    attempts: usize,
}

impl Round {
    pub fn new(number: u32, kind: RoundKind, pairs: Vec<Pair>, attempts: usize) -> Self {
        Self {
            number,
            kind,
            pairs,
            attempts,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn kind(&self) -> RoundKind {
        self.kind
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Shuffle attempts the arranger spent on this round.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn categories(&self) -> Vec<Category> {
        self.pairs.iter().map(Pair::category).collect()
    }

    pub fn category_counts(&self) -> CategoryMap<usize> {
        let mut counts = CategoryMap::default();
        for pair in &self.pairs {
            counts[pair.category()] += 1;
        }
        counts
    }

    /// Questions in reading order, each toss-up directly before its bonus.
    pub fn questions(&self) -> impl Iterator<Item = (&Pair, &Question)> {
        self.pairs
            .iter()
            .flat_map(|pair| pair.members().into_iter().map(move |q| (pair, q)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_places_tiebreaks_above_twenty() {
        let layout = RoundLayout::new(13);
        assert_eq!(layout.classify(1), Some(RoundKind::Regular));
        assert_eq!(layout.classify(13), Some(RoundKind::Regular));
        assert_eq!(layout.classify(14), None);
        assert_eq!(layout.classify(20), None);
        assert_eq!(layout.classify(21), Some(RoundKind::Tiebreak(1)));
        assert_eq!(layout.classify(30), Some(RoundKind::Tiebreak(10)));
        assert_eq!(layout.classify(31), None);
        assert_eq!(layout.classify(0), None);
    }

    #[test]
    fn layout_without_tiebreaks_only_knows_regular_rounds() {
        let layout = RoundLayout {
            round_count: 2,
            tiebreak_count: 0,
            tiebreak_offset: 20,
        };
        assert_eq!(layout.classify(21), None);
        assert_eq!(layout.regular_rounds().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn offset_nineteen_makes_round_twenty_the_first_tiebreak() {
        let layout = RoundLayout {
            tiebreak_offset: 19,
            ..RoundLayout::new(13)
        };
        assert_eq!(layout.classify(19), None);
        assert_eq!(layout.classify(20), Some(RoundKind::Tiebreak(1)));
        assert_eq!(layout.classify(29), Some(RoundKind::Tiebreak(10)));
        assert_eq!(layout.classify(30), None);
    }
}
