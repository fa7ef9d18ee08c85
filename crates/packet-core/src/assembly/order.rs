//! Packet order keys and the merge of per-category streams into one
//! sequence.

use std::collections::HashMap;

use rand::Rng;

use crate::error::PacketError;
use crate::model::pair::{Pair, PacketSlot};

/// Key space reserved per round; a round holds at most this many positions
/// per category.
pub const ORDER_STRIDE: u32 = 10;

/// `10 * (round - 1) + position + u` with `u` uniform in `[0, 1)`.
pub fn order_key<R: Rng + ?Sized>(round: u32, position: usize, rng: &mut R) -> f64 {
    let base = f64::from(ORDER_STRIDE) * f64::from(round.saturating_sub(1));
    base + position as f64 + rng.gen_range(0.0..1.0)
}

/// Give every pair of one category stream its packet slot.
///
/// Positions count up per round in stream order. Both members of a pair share
/// the pair's slot.
pub fn assign_packet_order<R: Rng + ?Sized>(pairs: &mut [Pair], rng: &mut R) -> Result<(), PacketError> {
    let mut next_position: HashMap<u32, usize> = HashMap::new();
    for pair in pairs.iter_mut() {
        let round = pair.round().ok_or_else(|| {
            PacketError::consistency(
                format!("pair {}", pair.id()),
                "packet order requested before a round was assigned",
            )
        })?;
        let position = next_position.entry(round).or_insert(0);
        if *position >= ORDER_STRIDE as usize {
            return Err(PacketError::consistency(
                format!("round {round} {}", pair.category()),
                format!("more than {ORDER_STRIDE} pairs in one category"),
            ));
        }
        let order = order_key(round, *position, rng);
        *position += 1;
        pair.set_slot(PacketSlot { round, order });
    }
    Ok(())
}

/// Stable merge of independently ordered streams by slot, then pair id.
pub fn interleave(mut pairs: Vec<Pair>) -> Result<Vec<Pair>, PacketError> {
    if let Some(unslotted) = pairs.iter().find(|pair| pair.slot().is_none()) {
        return Err(PacketError::consistency(
            format!("pair {}", unslotted.id()),
            "no packet slot assigned",
        ));
    }
    pairs.sort_by(|a, b| match (a.slot(), b.slot()) {
        (Some(left), Some(right)) => left.cmp_key(&right).then_with(|| a.id().cmp(&b.id())),
        _ => a.id().cmp(&b.id()),
    });
    Ok(pairs)
}
