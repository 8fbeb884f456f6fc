use std::collections::BTreeMap;

use log::{debug, trace};

use crate::broad_phase::{BroadPhase3D, SweepAndPrune3D};
use crate::constraints::Constraint3D;
use crate::interactions::{filter_pairs, CollisionFilter, ContactGenerator3D, ContactSolver3D, ManifoldCache3D, RigidBodyAdapter3D};
use crate::models::{Aabb, CollisionItem, CollisionPair, ContactManifold3D, WarmStartImpulse};
use crate::utils::{add_scaled, ensure_finite, ensure_finite_vector, ensure_time_step, PhysicsError, Vector3};

pub const DEFAULT_SOLVER_ITERATIONS: usize = 4;
pub const DEFAULT_CONSTRAINT_ITERATIONS: usize = 4;
pub const DEFAULT_MANIFOLD_RETENTION_FRAMES: u64 = 2;
pub const DEFAULT_WORLD_GRAVITY: Vector3 = (0.0, -9.81, 0.0);

/// Everything the world needs to know about the items it tracks.
pub trait CollisionScene<T> {
    /// World-space bounds, `None` to leave the item out of this frame.
    fn bounds(&self, item: &T) -> Option<Aabb>;

    /// Layer/mask filter, `None` drops every pair involving the item.
    fn filter(&self, _item: &T) -> Option<CollisionFilter> {
        Some(CollisionFilter::default())
    }

    /// Narrow phase for a broad-phase candidate. Defaults to the AABB contact generator.
    fn contact(&self, a: &T, b: &T) -> Option<ContactManifold3D> {
        let bounds_a = self.bounds(a)?;
        let bounds_b = self.bounds(b)?;
        ContactGenerator3D::generate(&bounds_a, &bounds_b)
    }
}

/// Closure-backed scene for callers that only have a bounds accessor and a filter lookup.
pub struct AabbScene<B, F> {
    bounds_of: B,
    filter_of: F,
}

fn default_filter<T>(_item: &T) -> Option<CollisionFilter> {
    Some(CollisionFilter::default())
}

impl<T, B> AabbScene<B, fn(&T) -> Option<CollisionFilter>>
where
    B: Fn(&T) -> Option<Aabb>,
{
    /// Scene where every item uses the default solid filter.
    pub fn with_default_filter(bounds_of: B) -> Self {
        Self { bounds_of, filter_of: default_filter::<T> }
    }
}

impl<B, F> AabbScene<B, F> {
    pub fn new(bounds_of: B, filter_of: F) -> Self {
        Self { bounds_of, filter_of }
    }
}

impl<T, B, F> CollisionScene<T> for AabbScene<B, F>
where
    B: Fn(&T) -> Option<Aabb>,
    F: Fn(&T) -> Option<CollisionFilter>,
{
    fn bounds(&self, item: &T) -> Option<Aabb> {
        (self.bounds_of)(item)
    }

    fn filter(&self, item: &T) -> Option<CollisionFilter> {
        (self.filter_of)(item)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollisionEventType {
    Enter,
    Stay,
    Exit,
}

/// One pair's contact lifecycle for one frame.
///
/// Exit events carry the manifold and response flag from the last frame the pair touched.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent<T> {
    pub pair: CollisionPair<T>,
    pub event_type: CollisionEventType,
    pub response_enabled: bool,
    pub manifold: ContactManifold3D,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionWorldConfig {
    pub solver_iterations: usize,
    pub constraint_iterations: usize,
    pub manifold_retention_frames: u64,
    pub gravity: Vector3,
    pub position_correction_percent: f64,
    pub position_correction_slop: f64,
}

impl Default for CollisionWorldConfig {
    fn default() -> Self {
        Self {
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
            constraint_iterations: DEFAULT_CONSTRAINT_ITERATIONS,
            manifold_retention_frames: DEFAULT_MANIFOLD_RETENTION_FRAMES,
            gravity: DEFAULT_WORLD_GRAVITY,
            position_correction_percent: crate::interactions::DEFAULT_POSITION_CORRECTION_PERCENT,
            position_correction_slop: crate::interactions::DEFAULT_POSITION_CORRECTION_SLOP,
        }
    }
}

impl CollisionWorldConfig {
    /// Builds a validated configuration, taking defaults for every `None`.
    pub fn new(
        solver_iterations: Option<usize>,
        constraint_iterations: Option<usize>,
        manifold_retention_frames: Option<u64>,
        gravity: Option<Vector3>,
    ) -> Result<Self, PhysicsError> {
        let default = Self::default();
        let config = Self {
            solver_iterations: solver_iterations.unwrap_or(default.solver_iterations),
            constraint_iterations: constraint_iterations.unwrap_or(default.constraint_iterations),
            manifold_retention_frames: manifold_retention_frames.unwrap_or(default.manifold_retention_frames),
            gravity: gravity.unwrap_or(default.gravity),
            ..default
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        if self.solver_iterations == 0 {
            return Err(PhysicsError::invalid_argument("solver iterations must be >= 1"));
        }
        if self.constraint_iterations == 0 {
            return Err(PhysicsError::invalid_argument("constraint iterations must be >= 1"));
        }
        ensure_finite_vector(self.gravity, "gravity")?;
        ensure_finite(self.position_correction_percent, "position correction percent")?;
        ContactSolver3D::new(self.position_correction_percent, self.position_correction_slop)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct FrameContact {
    response_enabled: bool,
    manifold: ContactManifold3D,
}

/// Per-frame collision pipeline with contact lifecycle tracking.
///
/// Each update runs broad phase, filtering, narrow phase, the manifold cache refresh and
/// event classification; the responding variants then resolve solid contacts through the
/// sequential-impulse solver. The world remembers the previous frame's contacts so it can
/// report exits, which makes it stateful across calls: callers must serialise updates.
pub struct CollisionWorld3D<T: CollisionItem> {
    broad_phase: Box<dyn BroadPhase3D<T> + Send>,
    solver: ContactSolver3D,
    config: CollisionWorldConfig,
    manifold_cache: ManifoldCache3D<T>,
    previous_frame: BTreeMap<CollisionPair<T>, FrameContact>,
    constraints: Vec<Box<dyn Constraint3D<T>>>,
}

impl<T: CollisionItem + Send + 'static> Default for CollisionWorld3D<T> {
    fn default() -> Self {
        Self::new(Box::new(SweepAndPrune3D::new()))
    }
}

impl<T: CollisionItem> CollisionWorld3D<T> {
    pub fn new(broad_phase: Box<dyn BroadPhase3D<T> + Send>) -> Self {
        Self {
            broad_phase,
            solver: ContactSolver3D::default(),
            config: CollisionWorldConfig::default(),
            manifold_cache: ManifoldCache3D::new(),
            previous_frame: BTreeMap::new(),
            constraints: Vec::new(),
        }
    }

    /// # Errors
    /// `InvalidArgument` if the configuration fails validation.
    pub fn with_config(broad_phase: Box<dyn BroadPhase3D<T> + Send>, config: CollisionWorldConfig) -> Result<Self, PhysicsError> {
        let mut world = Self::new(broad_phase);
        world.set_config(config)?;
        Ok(world)
    }

    pub fn config(&self) -> &CollisionWorldConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CollisionWorldConfig) -> Result<(), PhysicsError> {
        config.validate()?;
        self.solver = ContactSolver3D::new(config.position_correction_percent, config.position_correction_slop)?;
        self.config = config;
        Ok(())
    }

    pub fn set_gravity(&mut self, gravity: Vector3) -> Result<(), PhysicsError> {
        self.config.gravity = ensure_finite_vector(gravity, "gravity")?;
        Ok(())
    }

    pub fn manifold_cache(&self) -> &ManifoldCache3D<T> {
        &self.manifold_cache
    }

    pub fn add_constraint(&mut self, constraint: Box<dyn Constraint3D<T>>) -> usize {
        self.constraints.push(constraint);
        self.constraints.len() - 1
    }

    pub fn remove_constraint(&mut self, index: usize) -> Option<Box<dyn Constraint3D<T>>> {
        (index < self.constraints.len()).then(|| self.constraints.remove(index))
    }

    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Forgets every tracked contact, warm start and constraint.
    pub fn reset(&mut self) {
        self.manifold_cache.clear();
        self.previous_frame.clear();
        self.constraints.clear();
    }

    /// Detection only: returns this frame's ENTER and STAY events in pair order, followed
    /// by the EXIT events.
    pub fn update(&mut self, items: &[T], scene: &dyn CollisionScene<T>) -> Vec<CollisionEvent<T>> {
        self.manifold_cache.next_frame();

        let candidates = self.broad_phase.find_potential_pairs(items, &|item: &T| scene.bounds(item));
        let filtered = filter_pairs(&candidates, &|item: &T| scene.filter(item));

        let mut current_frame = BTreeMap::new();
        for filtered_pair in filtered {
            let pair = filtered_pair.pair;
            let Some(manifold) = scene.contact(&pair.first(), &pair.second()) else {
                continue;
            };
            self.manifold_cache.put(pair, manifold.clone());
            current_frame.insert(pair, FrameContact { response_enabled: filtered_pair.response_enabled, manifold });
        }

        let mut events = Vec::with_capacity(current_frame.len());
        for (pair, contact) in &current_frame {
            let event_type = if self.previous_frame.contains_key(pair) {
                CollisionEventType::Stay
            } else {
                CollisionEventType::Enter
            };
            events.push(CollisionEvent {
                pair: *pair,
                event_type,
                response_enabled: contact.response_enabled,
                manifold: contact.manifold.clone(),
            });
        }
        for (pair, prior) in &self.previous_frame {
            if !current_frame.contains_key(pair) {
                events.push(CollisionEvent {
                    pair: *pair,
                    event_type: CollisionEventType::Exit,
                    response_enabled: prior.response_enabled,
                    manifold: prior.manifold.clone(),
                });
            }
        }

        self.previous_frame = current_frame;
        self.manifold_cache.prune_stale(self.config.manifold_retention_frames);
        trace!(
            "collision frame {}: {} candidates, {} events",
            self.manifold_cache.frame_index(),
            candidates.len(),
            events.len()
        );
        events
    }

    /// Detection followed by contact resolution of every solid ENTER/STAY contact.
    pub fn update_and_respond(
        &mut self,
        items: &[T],
        scene: &dyn CollisionScene<T>,
        bodies: &mut dyn RigidBodyAdapter3D<T>,
    ) -> Vec<CollisionEvent<T>> {
        let events = self.update(items, scene);
        self.respond(&events, bodies);
        events
    }

    /// One semi-implicit step: gravity into velocities, constraints, detection and response,
    /// then positions from velocities.
    ///
    /// # Errors
    /// `InvalidTimeStep` if `dt` is not finite and positive.
    pub fn step<S>(&mut self, items: &[T], simulation: &mut S, dt: f64) -> Result<Vec<CollisionEvent<T>>, PhysicsError>
    where
        S: CollisionScene<T> + RigidBodyAdapter3D<T>,
    {
        ensure_time_step(dt)?;
        let gravity = self.config.gravity;
        for &body in items {
            if simulation.inverse_mass(body) <= 0.0 {
                continue;
            }
            let v = simulation.velocity(body);
            simulation.set_velocity(body, add_scaled(v, gravity, dt));
        }

        for _ in 0..self.config.constraint_iterations {
            for constraint in &self.constraints {
                constraint.solve(&mut *simulation, dt);
            }
        }

        let events = self.update(items, &*simulation);
        self.respond(&events, &mut *simulation);

        for &body in items {
            if simulation.inverse_mass(body) <= 0.0 {
                continue;
            }
            let p = simulation.position(body);
            let v = simulation.velocity(body);
            simulation.set_position(body, add_scaled(p, v, dt));
        }
        Ok(events)
    }

    /// Position correction first, then velocity passes seeded once from the cached warm start.
    /// The accumulated impulse of the final pass becomes next frame's warm start.
    fn respond(&mut self, events: &[CollisionEvent<T>], bodies: &mut dyn RigidBodyAdapter3D<T>) {
        let active: Vec<&CollisionEvent<T>> = events
            .iter()
            .filter(|event| event.response_enabled && event.event_type != CollisionEventType::Exit)
            .collect();
        if active.is_empty() {
            return;
        }

        // the manifold depth is not refreshed between passes, so positions are corrected once
        for event in &active {
            self.solver.solve_position(bodies, event.pair.first(), event.pair.second(), &event.manifold);
        }

        let iterations = self.config.solver_iterations;

        let mut accumulated: Vec<WarmStartImpulse> = Vec::with_capacity(active.len());
        for event in &active {
            let warm_start = self.manifold_cache.warm_start(&event.pair);
            self.solver.apply_warm_start(bodies, event.pair.first(), event.pair.second(), &event.manifold, warm_start);
            accumulated.push(warm_start);
        }
        for _ in 0..iterations {
            for (event, impulse) in active.iter().zip(accumulated.iter_mut()) {
                *impulse = self.solver.solve_velocity(
                    bodies,
                    event.pair.first(),
                    event.pair.second(),
                    &event.manifold,
                    *impulse,
                );
            }
        }
        for (event, impulse) in active.iter().zip(&accumulated) {
            self.manifold_cache.set_warm_start(&event.pair, *impulse);
        }
        debug!("resolved {} contacts over {} solver passes", active.len(), iterations);
    }
}
