//! Trimming an oversized category pool down to exactly what the rounds need.

use std::collections::{BTreeSet, HashMap};

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{Level, event};

use crate::assembly::pairing::ForcedPairs;
use crate::error::PacketError;
use crate::model::category::Category;
use crate::model::question::{Question, QuestionId, QuestionType, Status};

#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Survivors in source order.
    pub kept: Vec<Question>,
    /// Discarded questions in removal order.
    pub removed: Vec<Question>,
}

/// Discard lowest-quality questions until each type has exactly `required`
/// members.
///
/// The type with more remaining members is trimmed first (toss-ups on a
/// tie). A forced pair is removed as a unit and consumes one slot from each
/// type, so it is only a candidate while the opposite type still has
/// surplus. Ties on quality are broken uniformly at random.
///
/// For a category paired within sub-categories, every sub-category is first
/// brought to equal toss-up and bonus counts, then whole toss-up/bonus units
/// are dropped from the same sub-category.
pub fn select<R: Rng>(
    category: Category,
    questions: Vec<Question>,
    forced: &ForcedPairs,
    required: usize,
    rng: &mut R,
) -> Result<Selection, PacketError> {
    for kind in QuestionType::BOTH {
        let available = questions.iter().filter(|q| q.kind() == kind).count();
        if available < required {
            return Err(PacketError::Quantity {
                category,
                kind,
                required,
                available,
            });
        }
    }

    let mut trim = Trim::new(category, &questions, forced);
    if category.requires_subcategory() {
        trim_within_subcategories(&mut trim, required, rng)?;
    } else {
        trim_by_type(&mut trim, required, rng)?;
    }
    let Trim {
        partners,
        status,
        order: removal_order,
        ..
    } = trim;

    for (idx, question) in questions.iter().enumerate() {
        if status[idx] != Status::Active {
            continue;
        }
        if let Some(partner) = partners[idx] {
            if status[partner] != Status::Active {
                return Err(PacketError::consistency(
                    format!("{category} selection"),
                    format!("{} survived without its forced partner", question.id()),
                ));
            }
        }
    }

    let mut slots: Vec<Option<Question>> = questions.into_iter().map(Some).collect();
    let removed = removal_order
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect();
    let kept = slots.into_iter().flatten().collect();

    Ok(Selection { kept, removed })
}

/// Selection state over one category pool.
struct Trim<'a> {
    category: Category,
    questions: &'a [Question],
    partners: Vec<Option<usize>>,
    status: Vec<Status>,
    order: Vec<usize>,
}

impl<'a> Trim<'a> {
    fn new(category: Category, questions: &'a [Question], forced: &ForcedPairs) -> Self {
        let index_of: HashMap<QuestionId, usize> = questions
            .iter()
            .enumerate()
            .map(|(idx, q)| (q.id(), idx))
            .collect();
        let partners = questions
            .iter()
            .map(|q| forced.partner(q.id()).and_then(|id| index_of.get(&id).copied()))
            .collect();
        Self {
            category,
            questions,
            partners,
            status: vec![Status::Active; questions.len()],
            order: Vec::new(),
        }
    }

    fn candidates(&self, keep: impl Fn(usize) -> bool) -> Vec<usize> {
        (0..self.questions.len())
            .filter(|&idx| self.status[idx] == Status::Active && keep(idx))
            .collect()
    }

    fn count(&self, keep: impl Fn(usize) -> bool) -> usize {
        self.candidates(keep).len()
    }

    fn count_kind(&self, kind: QuestionType) -> usize {
        self.count(|idx| self.questions[idx].kind() == kind)
    }

    fn is_free(&self, idx: usize) -> bool {
        self.partners[idx].is_none()
    }

    /// Remove `idx` and its forced partner. Returns whether a partner left too.
    fn remove(&mut self, idx: usize) -> bool {
        self.status[idx] = Status::Removed;
        self.order.push(idx);

        let mut partner_removed = false;
        if let Some(partner) = self.partners[idx] {
            if self.status[partner] == Status::Active {
                self.status[partner] = Status::Removed;
                self.order.push(partner);
                partner_removed = true;
            }
        }

        event!(
            target: "packet_core::select",
            Level::DEBUG,
            category = self.category.as_str(),
            removed = %self.questions[idx].id(),
            quality = self.questions[idx].quality(),
            forced = !self.is_free(idx),
        );
        partner_removed
    }

    fn stuck(&self, scope: String, kind: QuestionType) -> PacketError {
        PacketError::consistency(
            scope,
            format!("no removable {kind} question while {} remain", self.count_kind(kind)),
        )
    }
}

fn trim_by_type<R: Rng>(trim: &mut Trim<'_>, required: usize, rng: &mut R) -> Result<(), PacketError> {
    loop {
        let tossups = trim.count_kind(QuestionType::TossUp);
        let bonuses = trim.count_kind(QuestionType::Bonus);
        if tossups + bonuses <= 2 * required {
            return Ok(());
        }

        let (larger, other_remaining) = if bonuses > tossups {
            (QuestionType::Bonus, tossups)
        } else {
            (QuestionType::TossUp, bonuses)
        };
        let allow_forced = other_remaining > required;

        let candidates = trim.candidates(|idx| {
            trim.questions[idx].kind() == larger && (allow_forced || trim.is_free(idx))
        });
        let choice = lowest_quality(trim.questions, &candidates, rng)
            .ok_or_else(|| trim.stuck(format!("{} selection", trim.category), larger))?;
        trim.remove(choice);
    }
}

fn trim_within_subcategories<R: Rng>(
    trim: &mut Trim<'_>,
    required: usize,
    rng: &mut R,
) -> Result<(), PacketError> {
    let questions = trim.questions;
    let category = trim.category;
    let groups: BTreeSet<Option<&str>> = questions.iter().map(Question::subcategory).collect();

    let pairable: usize = groups
        .iter()
        .map(|&group| {
            let in_group = |kind: QuestionType| {
                questions
                    .iter()
                    .filter(|q| q.subcategory() == group && q.kind() == kind)
                    .count()
            };
            in_group(QuestionType::TossUp).min(in_group(QuestionType::Bonus))
        })
        .sum();
    if pairable < required {
        return Err(PacketError::consistency(
            format!("{category} selection"),
            format!("only {pairable} toss-up/bonus pairs share a sub-category, {required} needed"),
        ));
    }

    // Surplus inside a sub-category can never be paired, so it goes first.
    for &group in &groups {
        loop {
            let in_group = |kind: QuestionType| {
                move |idx: usize| questions[idx].subcategory() == group && questions[idx].kind() == kind
            };
            let tossups = trim.count(in_group(QuestionType::TossUp));
            let bonuses = trim.count(in_group(QuestionType::Bonus));
            if tossups == bonuses {
                break;
            }
            let larger = if bonuses > tossups {
                QuestionType::Bonus
            } else {
                QuestionType::TossUp
            };
            let is_larger = in_group(larger);
            let candidates = trim.candidates(|idx| is_larger(idx) && trim.is_free(idx));
            let choice = lowest_quality(questions, &candidates, rng).ok_or_else(|| {
                trim.stuck(format!("{category}/{} selection", group.unwrap_or("-")), larger)
            })?;
            trim.remove(choice);
        }
    }

    // Every sub-category is balanced; drop one toss-up and one bonus at a time.
    while trim.count_kind(QuestionType::TossUp) > required {
        let candidates = trim.candidates(|idx| questions[idx].kind() == QuestionType::TossUp);
        let choice = lowest_quality(questions, &candidates, rng)
            .ok_or_else(|| trim.stuck(format!("{category} selection"), QuestionType::TossUp))?;
        if trim.remove(choice) {
            continue;
        }

        let group = questions[choice].subcategory();
        let bonuses = trim.candidates(|idx| {
            questions[idx].subcategory() == group
                && questions[idx].kind() == QuestionType::Bonus
                && trim.is_free(idx)
        });
        let bonus = lowest_quality(questions, &bonuses, rng).ok_or_else(|| {
            trim.stuck(
                format!("{category}/{} selection", group.unwrap_or("-")),
                QuestionType::Bonus,
            )
        })?;
        trim.remove(bonus);
    }
    Ok(())
}

fn lowest_quality<R: Rng>(questions: &[Question], candidates: &[usize], rng: &mut R) -> Option<usize> {
    let min = candidates
        .iter()
        .map(|&idx| questions[idx].quality())
        .min_by(|a, b| a.total_cmp(b))?;
    let tied: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&idx| questions[idx].quality().total_cmp(&min).is_eq())
        .collect();
    tied.choose(rng).copied()
}
