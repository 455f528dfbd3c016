//! Shuffle permutations for the play order
//!
//! Fisher-Yates over catalog indices, with an optional pinned entry so the
//! active track keeps its slot while everything around it moves.

use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

/// A catalog index that must stay at a given order position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pinned {
    /// Catalog index of the active track
    pub index: usize,

    /// Position it must occupy in the new order
    pub position: usize,
}

/// Random permutation of `0..len` with `pinned` held in place
pub fn shuffled_order(len: usize, pinned: Option<Pinned>) -> Vec<usize> {
    shuffled_order_with(&mut thread_rng(), len, pinned)
}

/// Same as [`shuffled_order`] with a caller-supplied RNG
///
/// A pin whose index is out of range is ignored; a position past the end is
/// clamped to the last slot.
pub fn shuffled_order_with<R: Rng + ?Sized>(
    rng: &mut R,
    len: usize,
    pinned: Option<Pinned>,
) -> Vec<usize> {
    let pinned = pinned.filter(|p| p.index < len);

    let mut order: Vec<usize> = (0..len)
        .filter(|&i| pinned.map_or(true, |p| p.index != i))
        .collect();
    order.shuffle(rng);

    if let Some(p) = pinned {
        let position = p.position.min(order.len());
        order.insert(position, p.index);
    }

    order
}
