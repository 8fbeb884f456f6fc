//! Candidate-pair generation.
//!
//! Every implementation follows the same contract:
//! - pairs are canonical (`first < second`) and returned as an ordered set,
//! - touching bounds count as overlapping,
//! - items whose bounds are unavailable are skipped silently,
//! - no overlapping pair is ever missed; extra pairs are allowed and filtered downstream.

mod spatial_hash;
mod sweep_and_prune;

pub use spatial_hash::*;
pub use sweep_and_prune::*;

use std::collections::BTreeSet;

use crate::models::{Aabb, CollisionItem, CollisionPair};

/// Broad-phase interface over an arbitrary item collection and a bounds accessor.
pub trait BroadPhase3D<T: CollisionItem> {
    fn find_potential_pairs(
        &self,
        items: &[T],
        bounds_of: &dyn Fn(&T) -> Option<Aabb>,
    ) -> BTreeSet<CollisionPair<T>>;
}

/// `O(n^2)` all-pairs reference used to validate the faster implementations.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceBroadPhase;

impl<T: CollisionItem> BroadPhase3D<T> for BruteForceBroadPhase {
    fn find_potential_pairs(
        &self,
        items: &[T],
        bounds_of: &dyn Fn(&T) -> Option<Aabb>,
    ) -> BTreeSet<CollisionPair<T>> {
        let bounded: Vec<(T, Aabb)> = items
            .iter()
            .filter_map(|item| bounds_of(item).map(|b| (*item, b)))
            .collect();
        let mut pairs = BTreeSet::new();
        for (i, (a, a_bounds)) in bounded.iter().enumerate() {
            for (b, b_bounds) in bounded.iter().skip(i + 1) {
                if a_bounds.intersects(b_bounds) {
                    if let Some(pair) = CollisionPair::new(*a, *b) {
                        pairs.insert(pair);
                    }
                }
            }
        }
        pairs
    }
}
