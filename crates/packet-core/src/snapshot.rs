use serde::{Deserialize, Serialize};

use crate::assembly::PacketSet;
use crate::model::pair::Pair;
use crate::model::question::{Question, Status};
use crate::model::round::{Round, RoundKind};

/// One question's final placement, as persisted for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRow {
    pub round: Option<u32>,
    pub tiebreak: Option<u32>,
    /// 1-based question position within the round.
    pub position: Option<usize>,
    pub pair: Option<String>,
    pub order_key: Option<f64>,
    pub category: String,
    pub subcategory: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    pub source_row: usize,
    pub difficulty: f64,
    pub composite_difficulty: Option<f64>,
    pub quality: f64,
    pub forced: bool,
    pub status: String,
}

impl AssignmentRow {
    pub fn placed(round: &Round, position: usize, pair: &Pair, question: &Question) -> Self {
        let tiebreak = match round.kind() {
            RoundKind::Regular => None,
            RoundKind::Tiebreak(index) => Some(index),
        };
        Self {
            round: Some(round.number()),
            tiebreak,
            position: Some(position),
            pair: Some(pair.id().to_string()),
            order_key: pair.slot().map(|slot| slot.order),
            composite_difficulty: Some(pair.difficulty()),
            forced: pair.is_forced(),
            status: Status::Active.as_str().to_string(),
            ..Self::unplaced(question)
        }
    }

    pub fn removed(question: &Question) -> Self {
        Self {
            status: Status::Removed.as_str().to_string(),
            ..Self::unplaced(question)
        }
    }

    fn unplaced(question: &Question) -> Self {
        Self {
            round: None,
            tiebreak: None,
            position: None,
            pair: None,
            order_key: None,
            category: question.category().as_str().to_string(),
            subcategory: question.subcategory().map(str::to_string),
            kind: question.kind().as_str().to_string(),
            format: question.format().as_str().to_string(),
            source_row: question.id().0,
            difficulty: question.difficulty(),
            composite_difficulty: None,
            quality: question.quality(),
            forced: false,
            status: Status::Active.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketSnapshot {
    pub seed: u64,
    pub strategy: String,
    pub round_count: usize,
    pub tiebreak_count: usize,
    pub removed: usize,
    pub rows: Vec<AssignmentRow>,
}

impl PacketSnapshot {
    pub fn capture(packets: &PacketSet, seed: u64) -> Self {
        PacketSnapshot {
            seed,
            strategy: packets.strategy().as_str().to_string(),
            round_count: packets.rounds().len(),
            tiebreak_count: packets.tiebreaks().len(),
            removed: packets.removed().len(),
            rows: packets.table_rows(),
        }
    }

    pub fn to_json(packets: &PacketSet, seed: u64) -> serde_json::Result<String> {
        let snapshot = Self::capture(packets, seed);
        serde_json::to_string_pretty(&snapshot)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::Category;
    use crate::model::pair::PairId;
    use crate::model::question::{QuestionId, QuestionType};

    fn question(id: usize, kind: QuestionType) -> Question {
        Question::new(QuestionId(id), Category::Energy, kind)
            .with_subcategory("Nuclear")
            .with_ratings(2.0, 4.0)
    }

    #[test]
    fn placed_row_carries_pair_and_round() {
        let mut pair = Pair::new(
            PairId(12),
            question(1, QuestionType::TossUp),
            question(2, QuestionType::Bonus),
            false,
        )
        .expect("pair");
        pair.set_round(21);
        let round = Round::new(21, RoundKind::Tiebreak(1), vec![pair.clone()], 1);

        let row = AssignmentRow::placed(&round, 2, &pair, pair.bonus());
        assert_eq!(row.round, Some(21));
        assert_eq!(row.tiebreak, Some(1));
        assert_eq!(row.pair.as_deref(), Some("P0012"));
        assert_eq!(row.kind, "Bonus");
        assert_eq!(row.subcategory.as_deref(), Some("Nuclear"));
        assert_eq!(row.status, "active");
    }

    #[test]
    fn removed_row_has_no_placement() {
        let row = AssignmentRow::removed(&question(5, QuestionType::TossUp));
        assert_eq!(row.round, None);
        assert_eq!(row.pair, None);
        assert_eq!(row.source_row, 5);
        assert_eq!(row.status, "removed");

        let json = serde_json::to_string(&row).expect("json");
        assert!(json.contains("\"type\":\"Toss-up\""));
    }
}
