use parking_lot::Mutex;

use crate::models::Quaternion;
use crate::utils::{ensure_finite, ensure_finite_vector, lerp_vectors, PhysicsError, Vector3, ZERO_VECTOR};

/// Published pose of one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSample {
    pub position: Vector3,
    pub orientation: Quaternion,
    pub simulation_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pose {
    position: Vector3,
    orientation: Quaternion,
}

impl Default for Pose {
    fn default() -> Self {
        Self { position: ZERO_VECTOR, orientation: Quaternion::identity() }
    }
}

#[derive(Debug)]
struct Buffers {
    write: Vec<Pose>,
    current: Vec<Pose>,
    previous: Vec<Pose>,
    current_time: f64,
    previous_time: f64,
    version: u64,
}

/// Fixed-capacity pose buffer shared between a simulation writer and render readers.
///
/// The writer fills the write buffer with [`set_transform`](Self::set_transform) and makes
/// it visible atomically with [`publish`](Self::publish); readers only ever see complete
/// published snapshots. The snapshot before the latest one is kept for interpolation.
#[derive(Debug)]
pub struct TransformStore {
    capacity: usize,
    buffers: Mutex<Buffers>,
}

impl TransformStore {
    /// # Errors
    /// `InvalidArgument` when `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, PhysicsError> {
        if capacity == 0 {
            return Err(PhysicsError::invalid_argument("transform store capacity must be > 0"));
        }
        let poses = vec![Pose::default(); capacity];
        Ok(Self {
            capacity,
            buffers: Mutex::new(Buffers {
                write: poses.clone(),
                current: poses.clone(),
                previous: poses,
                current_time: 0.0,
                previous_time: 0.0,
                version: 0,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_transform(&self, index: usize, position: Vector3, orientation: Quaternion) -> Result<(), PhysicsError> {
        self.check_index(index)?;
        ensure_finite_vector(position, "position")?;
        if !orientation.is_finite() {
            return Err(PhysicsError::invalid_argument(format!("orientation must be finite, got {:?}", orientation)));
        }
        self.buffers.lock().write[index] = Pose { position, orientation };
        Ok(())
    }

    /// Makes the write buffer the current snapshot and shifts the old one to previous.
    ///
    /// # Returns
    /// The new snapshot version.
    pub fn publish(&self, simulation_time: f64) -> Result<u64, PhysicsError> {
        ensure_finite(simulation_time, "simulation time")?;
        let mut buffers = self.buffers.lock();
        let buffers = &mut *buffers;
        std::mem::swap(&mut buffers.previous, &mut buffers.current);
        buffers.current.copy_from_slice(&buffers.write);
        buffers.previous_time = buffers.current_time;
        buffers.current_time = simulation_time;
        buffers.version += 1;
        Ok(buffers.version)
    }

    pub fn sample(&self, index: usize) -> Result<TransformSample, PhysicsError> {
        self.check_index(index)?;
        let buffers = self.buffers.lock();
        let pose = buffers.current[index];
        Ok(TransformSample { position: pose.position, orientation: pose.orientation, simulation_time: buffers.current_time })
    }

    /// Blends the previous and current snapshots: `alpha = 0` is the previous pose,
    /// `alpha = 1` the current one. Alpha is clamped to `[0, 1]`.
    pub fn sample_interpolated(&self, index: usize, alpha: f64) -> Result<TransformSample, PhysicsError> {
        self.check_index(index)?;
        let alpha = ensure_finite(alpha, "interpolation alpha")?.clamp(0.0, 1.0);
        let buffers = self.buffers.lock();
        let from = buffers.previous[index];
        let to = buffers.current[index];
        Ok(TransformSample {
            position: lerp_vectors(from.position, to.position, alpha),
            orientation: from.orientation.slerp(&to.orientation, alpha),
            simulation_time: buffers.previous_time + (buffers.current_time - buffers.previous_time) * alpha,
        })
    }

    pub fn published_time(&self) -> f64 {
        self.buffers.lock().current_time
    }

    /// Number of publishes so far.
    pub fn version(&self) -> u64 {
        self.buffers.lock().version
    }

    fn check_index(&self, index: usize) -> Result<(), PhysicsError> {
        if index < self.capacity {
            Ok(())
        } else {
            Err(PhysicsError::invalid_argument(format!(
                "transform index {} out of range for capacity {}",
                index, self.capacity
            )))
        }
    }
}
