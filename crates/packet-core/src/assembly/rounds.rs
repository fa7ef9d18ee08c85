//! Round assignment: sort-and-slice for trimmed pools, validation for
//! pre-assigned rounds.

use std::collections::BTreeMap;

use tracing::{Level, event};

use crate::error::PacketError;
use crate::model::category::{Category, CategoryMap};
use crate::model::pair::Pair;
use crate::model::round::{RoundKind, RoundLayout};

/// Sort one category's pairs by composite difficulty and deal them into
/// consecutive rounds of `per_round` pairs each.
pub fn assign_by_difficulty(
    category: Category,
    pairs: &mut [Pair],
    per_round: usize,
    round_count: u32,
) -> Result<(), PacketError> {
    let expected = per_round * round_count as usize;
    if pairs.len() != expected {
        return Err(PacketError::consistency(
            format!("{category} round assignment"),
            format!(
                "{} pairs cannot fill {round_count} rounds of {per_round}",
                pairs.len()
            ),
        ));
    }

    pairs.sort_by(|a, b| {
        a.difficulty()
            .total_cmp(&b.difficulty())
            .then_with(|| a.id().cmp(&b.id()))
    });

    if per_round == 0 {
        return Ok(());
    }

    for (group, chunk) in pairs.chunks_mut(per_round).enumerate() {
        let round = group as u32 + 1;
        for pair in chunk {
            pair.set_round(round);
        }
    }

    event!(
        target: "packet_core::rounds",
        Level::DEBUG,
        category = category.as_str(),
        pairs = pairs.len() as u32,
        per_round = per_round as u32,
    );

    Ok(())
}

/// Check pre-assigned rounds against the layout and quotas.
///
/// Every regular round must exist and carry exactly its quota per category.
/// Tiebreak rounds are exempt from quotas but take at most one pair per
/// category. Any other round number is rejected.
pub fn validate_preassigned(
    rounds: &BTreeMap<u32, CategoryMap<Vec<Pair>>>,
    layout: &RoundLayout,
    quotas: &CategoryMap<usize>,
) -> Result<(), PacketError> {
    for (&number, streams) in rounds {
        match layout.classify(number) {
            Some(RoundKind::Regular) => {
                for (category, pairs) in streams.iter() {
                    let quota = quotas[category];
                    if pairs.len() != quota {
                        return Err(PacketError::consistency(
                            format!("round {number}"),
                            format!("{category} has {} pairs but the quota is {quota}", pairs.len()),
                        ));
                    }
                }
            }
            Some(RoundKind::Tiebreak(index)) => {
                for (category, pairs) in streams.iter() {
                    if pairs.len() > 1 {
                        return Err(PacketError::consistency(
                            format!("tiebreak {index} (round {number})"),
                            format!("{category} has {} pairs; at most one is allowed", pairs.len()),
                        ));
                    }
                }
            }
            None => {
                return Err(PacketError::consistency(
                    format!("round {number}"),
                    format!(
                        "not a regular round (1-{}) or a tiebreak round ({}-{})",
                        layout.round_count,
                        layout.tiebreak_offset + 1,
                        layout.tiebreak_offset + layout.tiebreak_count
                    ),
                ));
            }
        }
    }

    for number in layout.regular_rounds() {
        if !rounds.contains_key(&number) && quotas.total() > 0 {
            return Err(PacketError::consistency(
                format!("round {number}"),
                "no questions are assigned to this round",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::pair::PairId;
    use crate::model::question::{Question, QuestionId, QuestionType};

    fn pair(id: u32, category: Category, difficulty: f64) -> Pair {
        let tossup = Question::new(QuestionId(id as usize * 2), category, QuestionType::TossUp)
            .with_ratings(difficulty, 3.0);
        let bonus = Question::new(QuestionId(id as usize * 2 + 1), category, QuestionType::Bonus)
            .with_ratings(difficulty, 3.0);
        Pair::new(PairId(id), tossup, bonus, false).expect("pair")
    }

    fn quotas(value: usize) -> CategoryMap<usize> {
        CategoryMap::from_fn(|_| value)
    }

    #[test]
    fn easiest_pairs_land_in_round_one() {
        let mut pairs = vec![
            pair(0, Category::Math, 4.0),
            pair(1, Category::Math, 1.0),
            pair(2, Category::Math, 3.0),
            pair(3, Category::Math, 2.0),
        ];
        assign_by_difficulty(Category::Math, &mut pairs, 2, 2).expect("assign");

        let rounds: Vec<(u32, Option<u32>)> = pairs.iter().map(|p| (p.id().0, p.round())).collect();
        assert_eq!(rounds, vec![(1, Some(1)), (3, Some(1)), (2, Some(2)), (0, Some(2))]);
    }

    #[test]
    fn wrong_pair_count_is_rejected() {
        let mut pairs = vec![pair(0, Category::Math, 1.0)];
        assert!(assign_by_difficulty(Category::Math, &mut pairs, 1, 2).is_err());
    }

    fn full_round(number: u32, start_id: u32) -> CategoryMap<Vec<Pair>> {
        CategoryMap::from_fn(|category| {
            let mut p = pair(start_id + category.index() as u32, category, 1.0);
            p.set_round(number);
            vec![p]
        })
    }

    #[test]
    fn complete_preassigned_rounds_validate() {
        let mut rounds = BTreeMap::new();
        rounds.insert(1, full_round(1, 0));
        rounds.insert(2, full_round(2, 10));
        let layout = RoundLayout::new(2);
        validate_preassigned(&rounds, &layout, &quotas(1)).expect("valid");
    }

    #[test]
    fn quota_mismatch_is_a_consistency_error() {
        let mut rounds = BTreeMap::new();
        let mut round_one = full_round(1, 0);
        round_one[Category::Physics].clear();
        rounds.insert(1, round_one);
        let err = validate_preassigned(&rounds, &RoundLayout::new(1), &quotas(1))
            .expect_err("missing physics");
        assert!(matches!(err, PacketError::Consistency { context, .. } if context == "round 1"));
    }

    #[test]
    fn missing_regular_round_is_rejected() {
        let mut rounds = BTreeMap::new();
        rounds.insert(1, full_round(1, 0));
        assert!(validate_preassigned(&rounds, &RoundLayout::new(2), &quotas(1)).is_err());
    }

    #[test]
    fn tiebreaks_skip_quota_but_cap_each_category() {
        let mut rounds = BTreeMap::new();
        rounds.insert(1, full_round(1, 0));
        let mut tiebreak: CategoryMap<Vec<Pair>> = CategoryMap::default();
        tiebreak.push(Category::Math, pair(50, Category::Math, 1.0));
        rounds.insert(21, tiebreak.clone());
        validate_preassigned(&rounds, &RoundLayout::new(1), &quotas(1)).expect("valid tiebreak");

        tiebreak.push(Category::Math, pair(51, Category::Math, 1.0));
        rounds.insert(21, tiebreak);
        assert!(validate_preassigned(&rounds, &RoundLayout::new(1), &quotas(1)).is_err());
    }

    #[test]
    fn stray_round_numbers_are_rejected() {
        let mut rounds = BTreeMap::new();
        rounds.insert(1, full_round(1, 0));
        rounds.insert(15, CategoryMap::default());
        let err = validate_preassigned(&rounds, &RoundLayout::new(1), &quotas(1))
            .expect_err("round 15 is undefined");
        assert!(matches!(err, PacketError::Consistency { context, .. } if context == "round 15"));
    }
}
