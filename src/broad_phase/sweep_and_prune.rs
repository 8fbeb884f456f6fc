use std::collections::BTreeSet;

use crate::broad_phase::BroadPhase3D;
use crate::models::{Aabb, CollisionItem, CollisionPair};

/// Sort-and-sweep along X with exact Y/Z overlap checks.
///
/// Reports exactly the pairs whose bounds overlap (inclusive), in canonical order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepAndPrune3D;

impl SweepAndPrune3D {
    pub fn new() -> Self {
        Self
    }
}

impl<T: CollisionItem> BroadPhase3D<T> for SweepAndPrune3D {
    fn find_potential_pairs(
        &self,
        items: &[T],
        bounds_of: &dyn Fn(&T) -> Option<Aabb>,
    ) -> BTreeSet<CollisionPair<T>> {
        let mut sorted: Vec<(T, Aabb)> = items
            .iter()
            .filter_map(|item| bounds_of(item).map(|b| (*item, b)))
            .collect();
        // ties on min-x fall back to item order so the sweep is deterministic
        sorted.sort_by(|(a, a_bounds), (b, b_bounds)| {
            a_bounds.min_x().total_cmp(&b_bounds.min_x()).then_with(|| a.cmp(b))
        });

        let mut pairs = BTreeSet::new();
        let mut active: Vec<(T, Aabb)> = Vec::new();
        for (item, bounds) in &sorted {
            active.retain(|(_, other)| other.max_x() >= bounds.min_x());
            for (other_item, other) in &active {
                let overlaps_yz = other.min_y() <= bounds.max_y()
                    && other.max_y() >= bounds.min_y()
                    && other.min_z() <= bounds.max_z()
                    && other.max_z() >= bounds.min_z();
                if overlaps_yz {
                    if let Some(pair) = CollisionPair::new(*item, *other_item) {
                        pairs.insert(pair);
                    }
                }
            }
            active.push((*item, *bounds));
        }
        pairs
    }
}
