use std::hash::Hash;

/// Unordered pair of two distinct items, stored in canonical order (`first < second`).
///
/// Equality and hashing are symmetric because construction sorts the pair, so the pair
/// doubles as the identity key of the manifold cache and the previous-contact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair<T> {
    first: T,
    second: T,
}

impl<T: Ord + Copy> CollisionPair<T> {
    /// Builds the canonical pair, or `None` when both items are the same.
    pub fn new(a: T, b: T) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { first: a, second: b }),
            std::cmp::Ordering::Greater => Some(Self { first: b, second: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn first(&self) -> T {
        self.first
    }

    pub fn second(&self) -> T {
        self.second
    }

    pub fn contains(&self, item: T) -> bool {
        self.first == item || self.second == item
    }

    /// The other member of the pair, if `item` is one of them.
    pub fn other(&self, item: T) -> Option<T> {
        if self.first == item {
            Some(self.second)
        } else if self.second == item {
            Some(self.first)
        } else {
            None
        }
    }
}

/// A broad-phase pair that passed layer/mask filtering.
///
/// `response_enabled == false` marks trigger semantics: events fire but no correction is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilteredCollisionPair<T> {
    pub pair: CollisionPair<T>,
    pub response_enabled: bool,
}

/// Bound required of item identifiers flowing through the collision pipeline.
pub trait CollisionItem: Copy + Ord + Hash {}

impl<T: Copy + Ord + Hash> CollisionItem for T {}
