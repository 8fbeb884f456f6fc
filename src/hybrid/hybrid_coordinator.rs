use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use crate::backends::{
    PhysicsBodyHandle, PhysicsBodyState, PhysicsWorld, ReferenceFrameBridge, DEFAULT_FIXED_STEP_SECONDS,
};
use crate::hybrid::{ConflictPolicy, HybridBodyLink, HybridOwnership, StateHandoffMode};
use crate::utils::{distance_between, ensure_finite, ensure_time_step, PhysicsError};
use crate::world::{FixedStepAccumulator, FixedStepResult, SimulationClock, DEFAULT_MAX_SUB_STEPS};

pub type HybridLinkId = u64;

/// How the coordinator reacts when the worlds lack the expected capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CapabilityPolicy {
    /// Refuse to build the coordinator.
    Strict,
    /// Build it anyway and record the mismatch in the capability report.
    #[default]
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridCoordinatorConfig {
    pub capability_policy: CapabilityPolicy,
    /// Tick length used by [`HybridPhysicsCoordinator::advance`].
    pub fixed_step_seconds: f64,
    pub max_sub_steps: usize,
    /// Initial scale applied to real time by the coordinator's clock.
    pub time_scale: f64,
}

impl Default for HybridCoordinatorConfig {
    fn default() -> Self {
        Self {
            capability_policy: CapabilityPolicy::Lenient,
            fixed_step_seconds: DEFAULT_FIXED_STEP_SECONDS,
            max_sub_steps: DEFAULT_MAX_SUB_STEPS,
            time_scale: 1.0,
        }
    }
}

impl HybridCoordinatorConfig {
    pub fn new(
        capability_policy: Option<CapabilityPolicy>,
        fixed_step_seconds: Option<f64>,
        max_sub_steps: Option<usize>,
        time_scale: Option<f64>,
    ) -> Result<Self, PhysicsError> {
        let default = Self::default();
        let config = Self {
            capability_policy: capability_policy.unwrap_or(default.capability_policy),
            fixed_step_seconds: fixed_step_seconds.unwrap_or(default.fixed_step_seconds),
            max_sub_steps: max_sub_steps.unwrap_or(default.max_sub_steps),
            time_scale: time_scale.unwrap_or(default.time_scale),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        FixedStepAccumulator::new(self.fixed_step_seconds, self.max_sub_steps)?;
        SimulationClock::new(0.0, self.time_scale, false)?;
        Ok(())
    }
}

/// Result of the capability gate run when the coordinator is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HybridCapabilityReport {
    pub policy: CapabilityPolicy,
    pub general_rigid_bodies: bool,
    pub orbital_n_body: bool,
    pub passed: bool,
    pub message: String,
}

/// Both worlds' body states after one coordinated tick, plus render metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridSnapshot {
    pub simulation_time: f64,
    pub interpolation_alpha: f64,
    pub extrapolation_seconds: f64,
    pub general_states: BTreeMap<PhysicsBodyHandle, PhysicsBodyState>,
    pub orbital_states: BTreeMap<PhysicsBodyHandle, PhysicsBodyState>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridStepTelemetry {
    pub simulation_time: f64,
    pub step_seconds: f64,
    pub orbital_step: Duration,
    pub general_step: Duration,
    pub handoff: Duration,
    pub link_count: usize,
    pub handoff_count: usize,
    pub rejected_handoffs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridLinkDiagnostics {
    pub link_id: HybridLinkId,
    pub link: HybridBodyLink,
    pub enabled: bool,
    pub rejected_count: u64,
    pub last_position_error: f64,
    pub last_linear_velocity_error: f64,
    pub last_angular_velocity_error: f64,
    /// Simulation time of the last applied hand-off.
    pub last_handoff_time: Option<f64>,
}

/// Read side of the coordinator's published snapshot, safe to move to a render thread.
#[derive(Debug, Clone)]
pub struct HybridSnapshotReader {
    slot: Arc<Mutex<Option<Arc<HybridSnapshot>>>>,
}

impl HybridSnapshotReader {
    pub fn latest(&self) -> Option<Arc<HybridSnapshot>> {
        self.slot.lock().clone()
    }
}

#[derive(Debug, Clone, Copy)]
struct LinkRuntime {
    link: HybridBodyLink,
    enabled: bool,
    rejected_count: u64,
    position_error: f64,
    linear_velocity_error: f64,
    angular_velocity_error: f64,
    last_handoff_time: Option<f64>,
}

impl LinkRuntime {
    fn new(link: HybridBodyLink) -> Self {
        Self {
            link,
            enabled: true,
            rejected_count: 0,
            position_error: 0.0,
            linear_velocity_error: 0.0,
            angular_velocity_error: 0.0,
            last_handoff_time: None,
        }
    }

    fn exceeds_thresholds(&self) -> bool {
        self.link.conflict_policy == ConflictPolicy::RejectOnDivergence
            && (self.position_error > self.link.max_position_divergence
                || self.linear_velocity_error > self.link.max_linear_velocity_divergence
                || self.angular_velocity_error > self.link.max_angular_velocity_divergence)
    }
}

/// Runs a general rigid-body world and an orbital world on one timeline.
///
/// Each tick steps the orbital world, then the general world, by the same dt, copies
/// state across every enabled link from the owning world into the other, and publishes
/// a [`HybridSnapshot`].
pub struct HybridPhysicsCoordinator {
    general: Box<dyn PhysicsWorld>,
    orbital: Box<dyn PhysicsWorld>,
    config: HybridCoordinatorConfig,
    capability_report: HybridCapabilityReport,
    links: BTreeMap<HybridLinkId, LinkRuntime>,
    next_link_id: HybridLinkId,
    clock: SimulationClock,
    accumulator: FixedStepAccumulator,
    simulation_time: f64,
    snapshot: Arc<Mutex<Option<Arc<HybridSnapshot>>>>,
    telemetry: Option<HybridStepTelemetry>,
}

impl HybridPhysicsCoordinator {
    /// # Errors
    /// `InvalidArgument` for a bad config; `Unsupported` when the strict capability gate
    /// fails (the general world must simulate rigid bodies, the orbital one n-body gravity).
    pub fn new(
        general: Box<dyn PhysicsWorld>,
        orbital: Box<dyn PhysicsWorld>,
        config: HybridCoordinatorConfig,
    ) -> Result<Self, PhysicsError> {
        config.validate()?;
        let capability_report = capability_gate(config.capability_policy, general.as_ref(), orbital.as_ref())?;
        info!(
            "hybrid coordinator over '{}' and '{}': {}",
            general.backend_id(),
            orbital.backend_id(),
            capability_report.message
        );
        Ok(Self {
            general,
            orbital,
            config,
            capability_report,
            links: BTreeMap::new(),
            next_link_id: 1,
            clock: SimulationClock::new(0.0, config.time_scale, false)?,
            accumulator: FixedStepAccumulator::new(config.fixed_step_seconds, config.max_sub_steps)?,
            simulation_time: 0.0,
            snapshot: Arc::new(Mutex::new(None)),
            telemetry: None,
        })
    }

    pub fn config(&self) -> &HybridCoordinatorConfig {
        &self.config
    }

    pub fn capability_report(&self) -> &HybridCapabilityReport {
        &self.capability_report
    }

    pub fn general_world(&self) -> &dyn PhysicsWorld {
        self.general.as_ref()
    }

    pub fn general_world_mut(&mut self) -> &mut dyn PhysicsWorld {
        self.general.as_mut()
    }

    pub fn orbital_world(&self) -> &dyn PhysicsWorld {
        self.orbital.as_ref()
    }

    pub fn orbital_world_mut(&mut self) -> &mut dyn PhysicsWorld {
        self.orbital.as_mut()
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Pause, resume or rescale the time fed to [`Self::advance`].
    pub fn clock_mut(&mut self) -> &mut SimulationClock {
        &mut self.clock
    }

    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    fn check_link_bodies(&self, link: &HybridBodyLink) -> Result<(), PhysicsError> {
        link.validate()?;
        if !self.general.body_handles()?.contains(&link.general_body) {
            return Err(PhysicsError::InvalidHandle(format!(
                "{:?} is not present in the general world",
                link.general_body
            )));
        }
        if !self.orbital.body_handles()?.contains(&link.orbital_body) {
            return Err(PhysicsError::InvalidHandle(format!(
                "{:?} is not present in the orbital world",
                link.orbital_body
            )));
        }
        Ok(())
    }

    /// # Errors
    /// `InvalidHandle` when either body is missing from its world.
    pub fn register_link(&mut self, link: HybridBodyLink) -> Result<HybridLinkId, PhysicsError> {
        self.check_link_bodies(&link)?;
        let id = self.next_link_id;
        self.next_link_id += 1;
        self.links.insert(id, LinkRuntime::new(link));
        debug!("registered hybrid link {} ({:?} owns)", id, link.ownership);
        Ok(id)
    }

    /// Replaces a link's definition, keeping its diagnostics. Returns `false` for an unknown id.
    pub fn update_link(&mut self, id: HybridLinkId, replacement: HybridBodyLink) -> Result<bool, PhysicsError> {
        if !self.links.contains_key(&id) {
            return Ok(false);
        }
        self.check_link_bodies(&replacement)?;
        if let Some(runtime) = self.links.get_mut(&id) {
            runtime.link = replacement;
        }
        Ok(true)
    }

    pub fn remove_link(&mut self, id: HybridLinkId) -> bool {
        self.links.remove(&id).is_some()
    }

    pub fn set_link_enabled(&mut self, id: HybridLinkId, enabled: bool) -> bool {
        match self.links.get_mut(&id) {
            Some(runtime) => {
                runtime.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_link_enabled(&self, id: HybridLinkId) -> bool {
        self.links.get(&id).is_some_and(|runtime| runtime.enabled)
    }

    /// Drops every link touching `handle`, in either world. Returns how many were removed.
    pub fn remove_links_for_body(&mut self, handle: PhysicsBodyHandle) -> usize {
        let before = self.links.len();
        self.links.retain(|_, runtime| !runtime.link.involves(handle));
        before - self.links.len()
    }

    pub fn clear_links(&mut self) {
        self.links.clear();
    }

    pub fn links(&self) -> Vec<(HybridLinkId, HybridBodyLink)> {
        self.links.iter().map(|(&id, runtime)| (id, runtime.link)).collect()
    }

    pub fn diagnostics(&self, id: HybridLinkId) -> Option<HybridLinkDiagnostics> {
        self.links.get(&id).map(|runtime| link_diagnostics(id, runtime))
    }

    pub fn all_diagnostics(&self) -> Vec<HybridLinkDiagnostics> {
        self.links.iter().map(|(&id, runtime)| link_diagnostics(id, runtime)).collect()
    }

    /// Timings and counters of the most recent tick.
    pub fn telemetry(&self) -> Option<HybridStepTelemetry> {
        self.telemetry
    }

    pub fn latest_snapshot(&self) -> Option<Arc<HybridSnapshot>> {
        self.snapshot.lock().clone()
    }

    pub fn snapshot_reader(&self) -> HybridSnapshotReader {
        HybridSnapshotReader { slot: Arc::clone(&self.snapshot) }
    }

    /// Runs one tick of `dt` seconds and publishes its snapshot with alpha 0 and an
    /// extrapolation window of `dt`.
    ///
    /// # Errors
    /// `InvalidTimeStep` for a bad `dt`; any world error aborts the tick.
    pub fn step(&mut self, dt: f64) -> Result<Arc<HybridSnapshot>, PhysicsError> {
        self.tick(dt, 0.0, dt)
    }

    /// Feeds real time through the clock and the fixed-step accumulator, ticking as many
    /// times as whole fixed steps are available, then stamps the latest snapshot with the
    /// interpolation alpha and the leftover time.
    pub fn advance(&mut self, real_dt: f64) -> Result<FixedStepResult, PhysicsError> {
        let scaled = self.clock.advance(real_dt)?;
        let mut accumulator = self.accumulator.clone();
        let result = accumulator.advance(scaled, |dt| self.tick(dt, 0.0, dt).map(|_| ()));
        self.accumulator = accumulator;
        let result = result?;
        self.set_render_metadata(result.interpolation_alpha, result.remainder)?;
        Ok(result)
    }

    /// Restamps the latest snapshot. Returns `None` before the first tick.
    ///
    /// # Errors
    /// `InvalidArgument` unless `alpha` is in `[0, 1]` and `extrapolation_seconds` is finite and >= 0.
    pub fn set_render_metadata(
        &mut self,
        alpha: f64,
        extrapolation_seconds: f64,
    ) -> Result<Option<Arc<HybridSnapshot>>, PhysicsError> {
        validate_render_metadata(alpha, extrapolation_seconds)?;
        let mut slot = self.snapshot.lock();
        let Some(current) = slot.as_ref() else {
            return Ok(None);
        };
        let updated = Arc::new(HybridSnapshot {
            interpolation_alpha: alpha,
            extrapolation_seconds,
            ..HybridSnapshot::clone(current)
        });
        *slot = Some(Arc::clone(&updated));
        Ok(Some(updated))
    }

    pub fn close(&mut self) {
        self.general.close();
        self.orbital.close();
        self.links.clear();
    }

    fn tick(&mut self, dt: f64, alpha: f64, extrapolation_seconds: f64) -> Result<Arc<HybridSnapshot>, PhysicsError> {
        ensure_time_step(dt)?;
        validate_render_metadata(alpha, extrapolation_seconds)?;

        let orbital_start = Instant::now();
        self.orbital.step(dt)?;
        let general_start = Instant::now();
        self.general.step(dt)?;
        let handoff_start = Instant::now();

        let handoff_time = self.simulation_time + dt;
        let mut handoff_count = 0;
        let mut rejected = 0;
        let ids: Vec<HybridLinkId> =
            self.links.iter().filter(|(_, runtime)| runtime.enabled).map(|(&id, _)| id).collect();
        for id in ids {
            handoff_count += 1;
            if !self.apply_handoff(id, handoff_time)? {
                rejected += 1;
            }
        }
        let handoff_end = Instant::now();

        self.simulation_time = handoff_time;
        let snapshot = Arc::new(self.capture_snapshot(alpha, extrapolation_seconds)?);
        *self.snapshot.lock() = Some(Arc::clone(&snapshot));
        self.telemetry = Some(HybridStepTelemetry {
            simulation_time: self.simulation_time,
            step_seconds: dt,
            orbital_step: general_start - orbital_start,
            general_step: handoff_start - general_start,
            handoff: handoff_end - handoff_start,
            link_count: self.links.len(),
            handoff_count,
            rejected_handoffs: rejected,
        });
        trace!("hybrid tick to {}s: {} hand-offs, {} rejected", self.simulation_time, handoff_count, rejected);
        Ok(snapshot)
    }

    /// Copies the owner's state onto the follower. Returns `false` when the conflict
    /// policy rejected the hand-off.
    fn apply_handoff(&mut self, id: HybridLinkId, time: f64) -> Result<bool, PhysicsError> {
        let Some(runtime) = self.links.get(&id).copied() else {
            return Ok(false);
        };
        let link = runtime.link;
        let (owner_world, owner_body, follower_world, follower_body) = match link.ownership {
            HybridOwnership::General => {
                (self.general.as_ref(), link.general_body, self.orbital.as_mut(), link.orbital_body)
            }
            HybridOwnership::Orbital => {
                (self.orbital.as_ref(), link.orbital_body, self.general.as_mut(), link.general_body)
            }
        };
        let follower = follower_world.body_state(follower_body)?;
        let owner = ReferenceFrameBridge::transform(
            &owner_world.body_state(owner_body)?,
            follower.reference_frame,
            time,
        )?;

        let mut updated = runtime;
        updated.position_error = distance_between(owner.position, follower.position);
        updated.linear_velocity_error = distance_between(owner.linear_velocity, follower.linear_velocity);
        updated.angular_velocity_error = distance_between(owner.angular_velocity, follower.angular_velocity);

        let accepted = !updated.exceeds_thresholds();
        if accepted {
            follower_world.set_body_state(follower_body, &merge_state(&owner, &follower, link.handoff_mode))?;
            updated.last_handoff_time = Some(time);
        } else {
            updated.rejected_count += 1;
            debug!(
                "hybrid link {} rejected hand-off: position error {:.3} m, velocity error {:.3} m/s",
                id, updated.position_error, updated.linear_velocity_error
            );
        }
        self.links.insert(id, updated);
        Ok(accepted)
    }

    fn capture_snapshot(&self, alpha: f64, extrapolation_seconds: f64) -> Result<HybridSnapshot, PhysicsError> {
        Ok(HybridSnapshot {
            simulation_time: self.simulation_time,
            interpolation_alpha: alpha,
            extrapolation_seconds,
            general_states: world_states(self.general.as_ref())?,
            orbital_states: world_states(self.orbital.as_ref())?,
        })
    }
}

fn capability_gate(
    policy: CapabilityPolicy,
    general: &dyn PhysicsWorld,
    orbital: &dyn PhysicsWorld,
) -> Result<HybridCapabilityReport, PhysicsError> {
    let general_rigid_bodies = general.capabilities().rigid_bodies;
    let orbital_n_body = orbital.capabilities().n_body;
    let passed = general_rigid_bodies && orbital_n_body;
    let message = if passed {
        "capability gate passed".to_string()
    } else {
        format!(
            "expected rigid bodies on '{}' and n-body gravity on '{}'",
            general.backend_id(),
            orbital.backend_id()
        )
    };
    match policy {
        CapabilityPolicy::Strict if !passed => {
            Err(PhysicsError::unsupported(format!("hybrid strict capability gate failed: {}", message)))
        }
        _ => {
            if !passed {
                warn!("hybrid capability gate failed, continuing leniently: {}", message);
            }
            Ok(HybridCapabilityReport { policy, general_rigid_bodies, orbital_n_body, passed, message })
        }
    }
}

fn merge_state(owner: &PhysicsBodyState, follower: &PhysicsBodyState, mode: StateHandoffMode) -> PhysicsBodyState {
    let merged = PhysicsBodyState {
        position: owner.position,
        linear_velocity: owner.linear_velocity,
        reference_frame: follower.reference_frame,
        timestamp: owner.timestamp,
        ..*owner
    };
    match mode {
        StateHandoffMode::FullState => merged,
        StateHandoffMode::PositionVelocityOnly => PhysicsBodyState {
            orientation: follower.orientation,
            angular_velocity: follower.angular_velocity,
            ..merged
        },
    }
}

fn world_states(world: &dyn PhysicsWorld) -> Result<BTreeMap<PhysicsBodyHandle, PhysicsBodyState>, PhysicsError> {
    world
        .body_handles()?
        .into_iter()
        .map(|handle| Ok((handle, world.body_state(handle)?)))
        .collect()
}

fn link_diagnostics(id: HybridLinkId, runtime: &LinkRuntime) -> HybridLinkDiagnostics {
    HybridLinkDiagnostics {
        link_id: id,
        link: runtime.link,
        enabled: runtime.enabled,
        rejected_count: runtime.rejected_count,
        last_position_error: runtime.position_error,
        last_linear_velocity_error: runtime.linear_velocity_error,
        last_angular_velocity_error: runtime.angular_velocity_error,
        last_handoff_time: runtime.last_handoff_time,
    }
}

fn validate_render_metadata(alpha: f64, extrapolation_seconds: f64) -> Result<(), PhysicsError> {
    if !(0.0..=1.0).contains(&ensure_finite(alpha, "interpolation alpha")?) {
        return Err(PhysicsError::invalid_argument(format!("interpolation alpha must be in [0, 1], got {}", alpha)));
    }
    if ensure_finite(extrapolation_seconds, "extrapolation seconds")? < 0.0 {
        return Err(PhysicsError::invalid_argument("extrapolation seconds must be >= 0"));
    }
    Ok(())
}
