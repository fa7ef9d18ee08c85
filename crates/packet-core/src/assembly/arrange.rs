//! Intra-round arrangement.
//!
//! A round's category streams are zipped position by position: chunk `i`
//! holds the `i`-th pair of every stream that still has one. Each chunk is
//! shuffled locally, and the result is valid when no two neighbouring entries
//! share a category. An explicit chunk size instead cuts the zipped sequence
//! into fixed-width chunks. Shuffling is retried a bounded number of times,
//! then a deterministic swap repair runs before the round is declared
//! infeasible.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::PacketError;
use crate::model::category::{Category, CategoryMap};
use crate::model::pair::Pair;
use crate::model::question::Question;

/// Anything the arranger can order by category.
pub trait Categorized {
    fn category(&self) -> Category;
}

impl Categorized for Category {
    fn category(&self) -> Category {
        *self
    }
}

impl Categorized for Pair {
    fn category(&self) -> Category {
        Pair::category(self)
    }
}

impl Categorized for Question {
    fn category(&self) -> Category {
        Question::category(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrangeState {
    Unshuffled,
    ShuffledValid,
    ShuffledInvalid,
}

impl ArrangeState {
    fn after_check(repeat: bool) -> Self {
        if repeat {
            ArrangeState::ShuffledInvalid
        } else {
            ArrangeState::ShuffledValid
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arranger {
    /// Fixed chunk width; `None` keeps one chunk per zip position.
    pub chunk_size: Option<usize>,
    pub max_attempts: usize,
    pub warn_after: usize,
}

impl Default for Arranger {
    fn default() -> Self {
        Self {
            chunk_size: None,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            warn_after: Self::DEFAULT_WARN_AFTER,
        }
    }
}

/// Final order for one round.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrangement<T> {
    pub entries: Vec<T>,
    /// Length of each chunk, in order.
    pub chunk_lens: Vec<usize>,
    /// Shuffle passes performed, at least one.
    pub attempts: usize,
    /// Whether the swap repair produced the result.
    pub repaired: bool,
}

impl<T> Arrangement<T> {
    pub fn chunks(&self) -> impl Iterator<Item = &[T]> {
        let mut start = 0;
        self.chunk_lens.iter().map(move |&len| {
            let chunk = &self.entries[start..start + len];
            start += len;
            chunk
        })
    }
}

impl Arranger {
    pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;
    pub const DEFAULT_WARN_AFTER: usize = 50;

    pub fn arrange<T: Categorized, R: Rng + ?Sized>(
        &self,
        round: u32,
        streams: CategoryMap<Vec<T>>,
        rng: &mut R,
    ) -> Result<Arrangement<T>, PacketError> {
        let mut chunks = match self.chunk_size {
            None => positional_chunks(streams),
            Some(size) => into_chunks(zip_longest(streams), size.max(1)),
        };

        let mut state = ArrangeState::Unshuffled;
        let mut attempts = 0;
        while state != ArrangeState::ShuffledValid && attempts < self.max_attempts.max(1) {
            for chunk in chunks.iter_mut() {
                chunk.shuffle(rng);
            }
            attempts += 1;
            state = ArrangeState::after_check(has_adjacent_repeat(&chunks));
        }

        if attempts > self.warn_after {
            tracing::warn!(
                round,
                attempts,
                chunks = chunks.len(),
                "arrangement needed many reshuffles"
            );
        }

        let mut repaired = false;
        if state == ArrangeState::ShuffledInvalid {
            repair_boundaries(&mut chunks);
            state = ArrangeState::after_check(has_adjacent_repeat(&chunks));
            repaired = state == ArrangeState::ShuffledValid;
            if !repaired {
                return Err(PacketError::Infeasible { round, attempts });
            }
            tracing::warn!(round, attempts, "arrangement settled by boundary swaps");
        }

        let chunk_lens = chunks.iter().map(Vec::len).collect();
        Ok(Arrangement {
            entries: chunks.into_iter().flatten().collect(),
            chunk_lens,
            attempts,
            repaired,
        })
    }
}

/// Position `i` of every stream in category order, one chunk per position,
/// skipping streams that have run out.
pub fn positional_chunks<T>(streams: CategoryMap<Vec<T>>) -> Vec<Vec<T>> {
    let mut iters: Vec<std::vec::IntoIter<T>> = streams
        .into_entries()
        .map(|(_, items)| items.into_iter())
        .collect();
    let mut chunks = Vec::new();
    loop {
        let chunk: Vec<T> = iters.iter_mut().filter_map(Iterator::next).collect();
        if chunk.is_empty() {
            return chunks;
        }
        chunks.push(chunk);
    }
}

/// The positional chunks laid end to end.
pub fn zip_longest<T>(streams: CategoryMap<Vec<T>>) -> Vec<T> {
    positional_chunks(streams).into_iter().flatten().collect()
}

fn into_chunks<T>(sequence: Vec<T>, chunk_size: usize) -> Vec<Vec<T>> {
    let mut chunks = Vec::new();
    let mut current = Vec::with_capacity(chunk_size);
    for item in sequence {
        current.push(item);
        if current.len() == chunk_size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(chunk_size)));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// True when some chunk ends on the category the next chunk starts with.
pub fn has_boundary_repeat<T: Categorized>(chunks: &[Vec<T>]) -> bool {
    chunks.windows(2).any(|pair| match (pair[0].last(), pair[1].first()) {
        (Some(tail), Some(head)) => tail.category() == head.category(),
        _ => false,
    })
}

/// True when two neighbouring entries share a category, inside a chunk or
/// across a boundary.
pub fn has_adjacent_repeat<T: Categorized>(chunks: &[Vec<T>]) -> bool {
    let inside = chunks
        .iter()
        .any(|chunk| chunk.windows(2).any(|w| w[0].category() == w[1].category()));
    inside || has_boundary_repeat(chunks)
}

fn repair_boundaries<T: Categorized>(chunks: &mut [Vec<T>]) {
    for boundary in 0..chunks.len().saturating_sub(1) {
        if !boundary_repeats(chunks, boundary) {
            continue;
        }
        if !swap_head(chunks, boundary + 1) {
            swap_tail(chunks, boundary);
        }
    }
}

fn boundary_repeats<T: Categorized>(chunks: &[Vec<T>], boundary: usize) -> bool {
    match (chunks[boundary].last(), chunks[boundary + 1].first()) {
        (Some(tail), Some(head)) => tail.category() == head.category(),
        _ => false,
    }
}

fn tail_category<T: Categorized>(chunks: &[Vec<T>], idx: usize) -> Option<Category> {
    chunks.get(idx).and_then(|chunk| chunk.last()).map(Categorized::category)
}

fn head_category<T: Categorized>(chunks: &[Vec<T>], idx: usize) -> Option<Category> {
    chunks.get(idx).and_then(|chunk| chunk.first()).map(Categorized::category)
}

/// Bring another member of chunk `idx` to its front so it no longer matches
/// the previous chunk's tail, without breaking the following boundary.
fn swap_head<T: Categorized>(chunks: &mut [Vec<T>], idx: usize) -> bool {
    let previous_tail = idx.checked_sub(1).and_then(|prev| tail_category(chunks, prev));
    let next_head = head_category(chunks, idx + 1);
    let len = chunks[idx].len();
    for candidate in 1..len {
        let new_head = chunks[idx][candidate].category();
        let new_tail = if candidate == len - 1 {
            chunks[idx][0].category()
        } else {
            chunks[idx][len - 1].category()
        };
        if Some(new_head) != previous_tail && Some(new_tail) != next_head {
            chunks[idx].swap(0, candidate);
            return true;
        }
    }
    false
}

/// Mirror of [`swap_head`]: replace the tail of chunk `idx`.
fn swap_tail<T: Categorized>(chunks: &mut [Vec<T>], idx: usize) -> bool {
    let previous_tail = idx.checked_sub(1).and_then(|prev| tail_category(chunks, prev));
    let next_head = head_category(chunks, idx + 1);
    let len = chunks[idx].len();
    for candidate in 0..len.saturating_sub(1) {
        let new_tail = chunks[idx][candidate].category();
        let new_head = if candidate == 0 {
            chunks[idx][len - 1].category()
        } else {
            chunks[idx][0].category()
        };
        if Some(new_tail) != next_head && Some(new_head) != previous_tail {
            chunks[idx].swap(candidate, len - 1);
            return true;
        }
    }
    false
}
