use std::collections::HashMap;

use log::trace;

use crate::models::{CollisionItem, CollisionPair, ContactManifold3D, WarmStartImpulse};

/// A cached contact with the frame it was last refreshed in.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifoldCacheEntry {
    pub manifold: ContactManifold3D,
    pub last_updated_frame: u64,
    pub warm_start: WarmStartImpulse,
}

/// Frame-indexed per-pair contact cache.
///
/// Entries live in a slab: the pair key maps to a stable slot index and freed slots are
/// reused, so no entry ever refers to another.
#[derive(Debug, Clone)]
pub struct ManifoldCache3D<T> {
    slots: Vec<Option<ManifoldCacheEntry>>,
    index: HashMap<CollisionPair<T>, usize>,
    free: Vec<usize>,
    frame_index: u64,
}

impl<T: CollisionItem> Default for ManifoldCache3D<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CollisionItem> ManifoldCache3D<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new(), index: HashMap::new(), free: Vec::new(), frame_index: 0 }
    }

    /// Advances the frame counter. Call once per tick before any `put`.
    pub fn next_frame(&mut self) -> u64 {
        self.frame_index += 1;
        self.frame_index
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Stores the manifold for this frame, keeping any warm start already recorded for the pair.
    pub fn put(&mut self, pair: CollisionPair<T>, manifold: ContactManifold3D) {
        let frame = self.frame_index;
        if let Some(&slot) = self.index.get(&pair) {
            if let Some(entry) = self.slots[slot].as_mut() {
                entry.manifold = manifold;
                entry.last_updated_frame = frame;
                return;
            }
        }

        let entry = ManifoldCacheEntry { manifold, last_updated_frame: frame, warm_start: WarmStartImpulse::ZERO };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        self.index.insert(pair, slot);
    }

    pub fn get(&self, pair: &CollisionPair<T>) -> Option<&ManifoldCacheEntry> {
        self.index.get(pair).and_then(|&slot| self.slots[slot].as_ref())
    }

    pub fn contains(&self, pair: &CollisionPair<T>) -> bool {
        self.index.contains_key(pair)
    }

    /// Warm start recorded for the pair, zero when the pair is unknown.
    pub fn warm_start(&self, pair: &CollisionPair<T>) -> WarmStartImpulse {
        self.get(pair).map(|entry| entry.warm_start).unwrap_or(WarmStartImpulse::ZERO)
    }

    /// Records a warm start for a cached pair. Unknown pairs are ignored.
    pub fn set_warm_start(&mut self, pair: &CollisionPair<T>, impulse: WarmStartImpulse) {
        if let Some(&slot) = self.index.get(pair) {
            if let Some(entry) = self.slots[slot].as_mut() {
                entry.warm_start = impulse;
            }
        }
    }

    pub fn remove(&mut self, pair: &CollisionPair<T>) -> Option<ManifoldCacheEntry> {
        let slot = self.index.remove(pair)?;
        self.free.push(slot);
        self.slots[slot].take()
    }

    /// Evicts pairs not refreshed within `max_frames_without_update` frames.
    ///
    /// # Returns
    /// The number of evicted entries.
    pub fn prune_stale(&mut self, max_frames_without_update: u64) -> usize {
        let frame = self.frame_index;
        let slots = &self.slots;
        let stale: Vec<CollisionPair<T>> = self
            .index
            .iter()
            .filter(|(_, &slot)| {
                slots[slot]
                    .as_ref()
                    .map_or(true, |entry| frame.saturating_sub(entry.last_updated_frame) > max_frames_without_update)
            })
            .map(|(pair, _)| *pair)
            .collect();

        for pair in &stale {
            self.remove(pair);
        }
        if !stale.is_empty() {
            trace!("manifold cache pruned {} stale entries at frame {}", stale.len(), frame);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.free.clear();
    }

    /// Cached pairs in canonical order.
    pub fn pairs(&self) -> Vec<CollisionPair<T>> {
        let mut pairs: Vec<CollisionPair<T>> = self.index.keys().copied().collect();
        pairs.sort();
        pairs
    }
}
