//! Toss-up/bonus pairing.
//!
//! Two modes: free pairing over an already trimmed category pool (forced
//! pairs first, then cheapest-with-cheapest), and bucketed pairing for a
//! round whose membership was fixed upstream.

use std::collections::{BTreeMap, HashMap, HashSet};

use rand::RngCore;
use tracing::{Level, event};

use crate::assembly::difficulty::{Jitter, normalize_pair, single_difficulty};
use crate::error::{PacketError, SchemaError};
use crate::model::category::{Category, CategoryMap};
use crate::model::pair::{Pair, PairIdAllocator};
use crate::model::question::{Question, QuestionId, QuestionType};

/// Partner lookup for records bound by a shared pairing hint.
#[derive(Debug, Clone, Default)]
pub struct ForcedPairs {
    partners: HashMap<QuestionId, QuestionId>,
}

impl ForcedPairs {
    /// Scan the whole pool. A token seen once is ignored; seen twice it must
    /// bind a compatible toss-up and bonus; any higher count is rejected.
    pub fn detect(questions: &[Question]) -> Result<Self, SchemaError> {
        let mut by_token: BTreeMap<&str, Vec<&Question>> = BTreeMap::new();
        for question in questions {
            if let Some(token) = question.pairing_hint() {
                by_token.entry(token).or_default().push(question);
            }
        }

        let mut partners = HashMap::new();
        for (token, members) in by_token {
            match members.as_slice() {
                [_] => {}
                [a, b] => {
                    if a.kind() == b.kind() {
                        return Err(SchemaError::PairingHint {
                            token: token.to_string(),
                            message: format!(
                                "{} and {} are both {} questions",
                                a.id(),
                                b.id(),
                                a.kind()
                            ),
                        });
                    }
                    if !a.is_compatible_with(b) {
                        return Err(SchemaError::PairingHint {
                            token: token.to_string(),
                            message: format!(
                                "{} ({}/{}) and {} ({}/{}) cannot share a pair",
                                a.id(),
                                a.category(),
                                a.subcategory().unwrap_or("-"),
                                b.id(),
                                b.category(),
                                b.subcategory().unwrap_or("-"),
                            ),
                        });
                    }
                    partners.insert(a.id(), b.id());
                    partners.insert(b.id(), a.id());
                }
                many => {
                    return Err(SchemaError::PairingHint {
                        token: token.to_string(),
                        message: format!("shared by {} records, expected exactly two", many.len()),
                    });
                }
            }
        }

        Ok(Self { partners })
    }

    pub fn partner(&self, id: QuestionId) -> Option<QuestionId> {
        self.partners.get(&id).copied()
    }

    pub fn is_forced(&self, id: QuestionId) -> bool {
        self.partners.contains_key(&id)
    }

    /// Number of forced pairs (not members).
    pub fn len(&self) -> usize {
        self.partners.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}

/// Pair a trimmed single-category pool.
///
/// Forced pairs are bound first; the remaining toss-ups and bonuses are each
/// sorted by (perturbed) difficulty and zipped position for position, per
/// sub-category for Energy. Every resulting pair gets its composite
/// difficulty from `jitter`.
pub fn pair_free<R: RngCore>(
    category: Category,
    questions: Vec<Question>,
    forced: &ForcedPairs,
    ids: &mut PairIdAllocator,
    jitter: Jitter,
    rng: &mut R,
) -> Result<Vec<Pair>, PacketError> {
    let present: HashSet<QuestionId> = questions.iter().map(Question::id).collect();
    let mut by_id: HashMap<QuestionId, Question> = HashMap::new();
    let mut tossups = Vec::new();
    let mut bonuses = Vec::new();
    let mut forced_tossups = Vec::new();

    for question in questions {
        let partner_present = forced
            .partner(question.id())
            .is_some_and(|partner| present.contains(&partner));
        match (question.kind(), partner_present) {
            (QuestionType::TossUp, true) => forced_tossups.push(question),
            (QuestionType::Bonus, true) => {
                by_id.insert(question.id(), question);
            }
            (QuestionType::TossUp, false) => tossups.push(question),
            (QuestionType::Bonus, false) => bonuses.push(question),
        }
    }

    let mut pairs = Vec::with_capacity(forced_tossups.len() + tossups.len());
    for tossup in forced_tossups {
        let partner = forced
            .partner(tossup.id())
            .and_then(|id| by_id.remove(&id))
            .ok_or_else(|| {
                PacketError::consistency(
                    format!("{category} forced pairs"),
                    format!("partner of {} is missing from the pool", tossup.id()),
                )
            })?;
        pairs.push(Pair::new(ids.next_id(), tossup, partner, true)?);
    }

    let forced_count = pairs.len();
    for (group, (group_tossups, group_bonuses)) in group_by_subcategory(category, tossups, bonuses) {
        if group_tossups.len() != group_bonuses.len() {
            let scope = match group {
                Some(subcategory) => format!("{category}/{subcategory} pairing"),
                None => format!("{category} pairing"),
            };
            return Err(PacketError::consistency(
                scope,
                format!(
                    "{} unpaired toss-ups but {} unpaired bonuses",
                    group_tossups.len(),
                    group_bonuses.len()
                ),
            ));
        }
        let group_tossups = sort_by_difficulty(group_tossups, jitter, rng);
        let group_bonuses = sort_by_difficulty(group_bonuses, jitter, rng);
        for (tossup, bonus) in group_tossups.into_iter().zip(group_bonuses) {
            pairs.push(Pair::new(ids.next_id(), tossup, bonus, false)?);
        }
    }

    for pair in &mut pairs {
        normalize_pair(pair, jitter, rng);
    }

    event!(
        target: "packet_core::pairing",
        Level::DEBUG,
        category = category.as_str(),
        forced = forced_count as u32,
        free = (pairs.len() - forced_count) as u32,
    );

    Ok(pairs)
}

type SubcategoryGroups = BTreeMap<Option<String>, (Vec<Question>, Vec<Question>)>;

/// Categories that pair within a sub-category are split per sub-category;
/// every other category forms a single group.
fn group_by_subcategory(category: Category, tossups: Vec<Question>, bonuses: Vec<Question>) -> SubcategoryGroups {
    let key = |question: &Question| {
        if category.requires_subcategory() {
            question.subcategory().map(str::to_string)
        } else {
            None
        }
    };
    let mut groups = SubcategoryGroups::new();
    for question in tossups {
        groups.entry(key(&question)).or_default().0.push(question);
    }
    for question in bonuses {
        groups.entry(key(&question)).or_default().1.push(question);
    }
    groups
}

fn sort_by_difficulty<R: RngCore>(questions: Vec<Question>, jitter: Jitter, rng: &mut R) -> Vec<Question> {
    let mut keyed: Vec<(f64, Question)> = questions
        .into_iter()
        .map(|q| (single_difficulty(&q, jitter, rng), q))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id().cmp(&b.1.id())));
    keyed.into_iter().map(|(_, q)| q).collect()
}

/// Pair one pre-assigned round by zipping per-category toss-up and bonus lists.
///
/// Forced pairs are bound first and must sit in the same round. The rest of
/// each category keeps source order, Energy additionally sorted by
/// sub-category so that matching sub-categories line up.
pub fn pair_round_buckets<R: RngCore>(
    round: u32,
    questions: Vec<Question>,
    forced: &ForcedPairs,
    ids: &mut PairIdAllocator,
    jitter: Jitter,
    rng: &mut R,
) -> Result<CategoryMap<Vec<Pair>>, PacketError> {
    let present: HashSet<QuestionId> = questions.iter().map(Question::id).collect();
    let mut tossups: CategoryMap<Vec<Question>> = CategoryMap::default();
    let mut bonuses: CategoryMap<Vec<Question>> = CategoryMap::default();
    let mut forced_tossups = Vec::new();
    let mut held: HashMap<QuestionId, Question> = HashMap::new();

    for question in questions {
        if let Some(partner) = forced.partner(question.id()) {
            if !present.contains(&partner) {
                return Err(PacketError::consistency(
                    format!("round {round} {}", question.category()),
                    format!(
                        "{} is pair-bound to {partner}, which is assigned to a different round",
                        question.id()
                    ),
                ));
            }
            match question.kind() {
                QuestionType::TossUp => forced_tossups.push(question),
                QuestionType::Bonus => {
                    held.insert(question.id(), question);
                }
            }
            continue;
        }
        match question.kind() {
            QuestionType::TossUp => tossups.push(question.category(), question),
            QuestionType::Bonus => bonuses.push(question.category(), question),
        }
    }

    let mut paired: CategoryMap<Vec<Pair>> = CategoryMap::default();
    for tossup in forced_tossups {
        let category = tossup.category();
        let bonus = forced
            .partner(tossup.id())
            .and_then(|id| held.remove(&id))
            .ok_or_else(|| {
                PacketError::consistency(
                    format!("round {round} {category}"),
                    format!("partner of {} is missing", tossup.id()),
                )
            })?;
        let mut pair = Pair::new(ids.next_id(), tossup, bonus, true)?;
        normalize_pair(&mut pair, jitter, rng);
        pair.set_round(round);
        paired.push(category, pair);
    }

    for category in Category::ALL {
        let mut category_tossups = std::mem::take(&mut tossups[category]);
        let mut category_bonuses = std::mem::take(&mut bonuses[category]);

        if category_tossups.len() != category_bonuses.len() {
            return Err(PacketError::consistency(
                format!("round {round} {category}"),
                format!(
                    "{} toss-ups but {} bonuses; toss-up and bonus lists must be parallel",
                    category_tossups.len(),
                    category_bonuses.len()
                ),
            ));
        }

        if category.requires_subcategory() {
            category_tossups.sort_by(|a, b| a.subcategory().cmp(&b.subcategory()));
            category_bonuses.sort_by(|a, b| a.subcategory().cmp(&b.subcategory()));
        }

        for (tossup, bonus) in category_tossups.into_iter().zip(category_bonuses) {
            let mut pair = Pair::new(ids.next_id(), tossup, bonus, false)?;
            normalize_pair(&mut pair, jitter, rng);
            pair.set_round(round);
            paired.push(category, pair);
        }
    }

    Ok(paired)
}
