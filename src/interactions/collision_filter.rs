use std::collections::BTreeSet;

use crate::models::{CollisionItem, CollisionPair, FilteredCollisionPair};

/// Whether contact with a body produces a physical response or only events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollisionKind {
    #[default]
    Solid,
    Trigger,
}

/// Layer/mask classification of a collidable item.
///
/// Two items interact when each one's layer bits appear in the other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionFilter {
    pub layer: u32,
    pub mask: u32,
    pub kind: CollisionKind,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self { layer: 1, mask: u32::MAX, kind: CollisionKind::Solid }
    }
}

impl CollisionFilter {
    pub const ALL_LAYERS: u32 = u32::MAX;

    pub fn new(layer: u32, mask: u32, kind: CollisionKind) -> Self {
        Self { layer, mask, kind }
    }

    pub fn solid(layer: u32, mask: u32) -> Self {
        Self::new(layer, mask, CollisionKind::Solid)
    }

    pub fn trigger(layer: u32, mask: u32) -> Self {
        Self::new(layer, mask, CollisionKind::Trigger)
    }

    pub fn is_trigger(&self) -> bool {
        self.kind == CollisionKind::Trigger
    }

    pub fn can_interact(&self, other: &CollisionFilter) -> bool {
        (self.layer & other.mask) != 0 && (other.layer & self.mask) != 0
    }

    /// Response is enabled only between two solid items.
    pub fn response_enabled(&self, other: &CollisionFilter) -> bool {
        !self.is_trigger() && !other.is_trigger()
    }
}

/// Classifies a single pair, `None` when the filters reject it.
pub fn filter_pair<T: CollisionItem>(
    pair: CollisionPair<T>,
    filter_of: &dyn Fn(&T) -> Option<CollisionFilter>,
) -> Option<FilteredCollisionPair<T>> {
    let a = filter_of(&pair.first())?;
    let b = filter_of(&pair.second())?;
    if !a.can_interact(&b) {
        return None;
    }
    Some(FilteredCollisionPair { pair, response_enabled: a.response_enabled(&b) })
}

/// Turns broad-phase candidates into filtered pairs. Items without a filter are dropped.
pub fn filter_pairs<T: CollisionItem>(
    pairs: &BTreeSet<CollisionPair<T>>,
    filter_of: &dyn Fn(&T) -> Option<CollisionFilter>,
) -> Vec<FilteredCollisionPair<T>> {
    pairs.iter().filter_map(|pair| filter_pair(*pair, filter_of)).collect()
}
