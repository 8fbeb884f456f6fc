use std::collections::{BTreeSet, HashMap};

use log::trace;

use crate::broad_phase::BroadPhase3D;
use crate::models::{Aabb, CollisionItem, CollisionPair};
use crate::utils::PhysicsError;

type CellKey = (i64, i64, i64);

/// Uniform grid broad phase.
///
/// Each item is inserted into every cell its bounds touch and any two items sharing a cell
/// form a candidate pair. Items sharing a cell without overlapping are reported too.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialHash3D {
    cell_size: f64,
}

impl SpatialHash3D {
    /// # Errors
    /// `InvalidArgument` unless `cell_size` is finite and strictly positive.
    pub fn new(cell_size: f64) -> Result<Self, PhysicsError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(PhysicsError::invalid_argument(format!(
                "cell size must be finite and > 0, got {}", cell_size
            )));
        }
        Ok(Self { cell_size })
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    fn cell_index(&self, value: f64) -> i64 {
        (value / self.cell_size).floor() as i64
    }

    fn cell_range(&self, bounds: &Aabb) -> (CellKey, CellKey) {
        let (min, max) = (bounds.min(), bounds.max());
        (
            (self.cell_index(min.0), self.cell_index(min.1), self.cell_index(min.2)),
            (self.cell_index(max.0), self.cell_index(max.1), self.cell_index(max.2)),
        )
    }
}

impl<T: CollisionItem> BroadPhase3D<T> for SpatialHash3D {
    fn find_potential_pairs(
        &self,
        items: &[T],
        bounds_of: &dyn Fn(&T) -> Option<Aabb>,
    ) -> BTreeSet<CollisionPair<T>> {
        let mut cells: HashMap<CellKey, Vec<T>> = HashMap::new();
        for item in items {
            let Some(bounds) = bounds_of(item) else {
                continue;
            };
            let (lo, hi) = self.cell_range(&bounds);
            for x in lo.0..=hi.0 {
                for y in lo.1..=hi.1 {
                    for z in lo.2..=hi.2 {
                        cells.entry((x, y, z)).or_default().push(*item);
                    }
                }
            }
        }

        let mut pairs = BTreeSet::new();
        for occupants in cells.values() {
            for (i, a) in occupants.iter().enumerate() {
                for b in &occupants[i + 1..] {
                    if let Some(pair) = CollisionPair::new(*a, *b) {
                        pairs.insert(pair);
                    }
                }
            }
        }
        trace!("spatial hash: {} occupied cells, {} candidate pairs", cells.len(), pairs.len());
        pairs
    }
}
