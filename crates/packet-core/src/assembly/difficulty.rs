//! Composite difficulty for pairs and sort keys for unpaired questions.
//!
//! The perturbed value only drives sorting; it never replaces the raw
//! rating stored on a question.

use rand::{Rng, RngCore};

use crate::model::pair::Pair;
use crate::model::question::Question;

/// Perturbation applied to a difficulty before it is used as a sort key.
#[derive(Debug, Clone, Copy, Default)]
pub enum Jitter {
    #[default]
    None,
    /// Adds a value drawn uniformly from `[-amplitude, amplitude)`.
    Uniform { amplitude: f64 },
    /// Caller-supplied perturbation drawing from the shared generator.
    Custom(fn(f64, &mut dyn RngCore) -> f64),
}

impl Jitter {
    pub fn uniform(amplitude: f64) -> Self {
        if amplitude > 0.0 {
            Jitter::Uniform { amplitude }
        } else {
            Jitter::None
        }
    }

    pub fn apply<R: RngCore>(&self, value: f64, rng: &mut R) -> f64 {
        match *self {
            Jitter::None => value,
            Jitter::Uniform { amplitude } if amplitude > 0.0 => {
                value + rng.gen_range(-amplitude..amplitude)
            }
            Jitter::Uniform { .. } => value,
            Jitter::Custom(perturb) => perturb(value, rng),
        }
    }
}

/// Sort key for a question that is not (yet) part of a pair.
pub fn single_difficulty<R: RngCore>(question: &Question, jitter: Jitter, rng: &mut R) -> f64 {
    jitter.apply(question.difficulty(), rng)
}

/// Mean of the two raw ratings, perturbed once.
pub fn composite_difficulty<R: RngCore>(
    tossup: &Question,
    bonus: &Question,
    jitter: Jitter,
    rng: &mut R,
) -> f64 {
    let mean = (tossup.difficulty() + bonus.difficulty()) / 2.0;
    jitter.apply(mean, rng)
}

/// Recompute the pair's shared difficulty from its members.
pub fn normalize_pair<R: RngCore>(pair: &mut Pair, jitter: Jitter, rng: &mut R) {
    let value = composite_difficulty(pair.tossup(), pair.bonus(), jitter, rng);
    pair.set_difficulty(value);
}
