use thiserror::Error;

/// Represents errors that can occur across the collision pipeline and the physics backends.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// A scalar, vector or configuration value is non-finite or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A handle does not belong to the world it was passed to, or no longer exists.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
    /// A time step that is zero, negative or non-finite.
    #[error("invalid time step: {0}")]
    InvalidTimeStep(f64),
    /// Propagation was requested to a time earlier than the last propagated time.
    #[error("non-monotonic time: requested {requested}s but already propagated to {last}s")]
    NonMonotonicTime { requested: f64, last: f64 },
    /// The backend cannot represent the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// The native shared library could not be located, loaded or initialised.
    #[error("native library '{library}' unavailable: {reason}")]
    NativeLibraryUnavailable { library: String, reason: String },
    /// A native call returned a failure status or a null handle.
    #[error("native call '{operation}' failed with status {status}")]
    NativeCallFailed { operation: &'static str, status: i32 },
    /// The world was closed and can no longer be used.
    #[error("world is closed")]
    WorldClosed,
    /// A general error for calculations that produce invalid results.
    #[error("calculation error: {0}")]
    CalculationError(String),
}

impl PhysicsError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        PhysicsError::InvalidArgument(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        PhysicsError::Unsupported(message.into())
    }

    /// True for every error caused by the caller's input, including temporal violations.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            PhysicsError::InvalidArgument(_)
                | PhysicsError::InvalidHandle(_)
                | PhysicsError::InvalidTimeStep(_)
                | PhysicsError::NonMonotonicTime { .. }
        )
    }
}

/// Rejects NaN and infinities with a message naming the offending parameter.
pub fn ensure_finite(value: f64, name: &str) -> Result<f64, PhysicsError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidArgument(format!("{} must be finite, got {}", name, value)))
    }
}

pub fn ensure_finite_vector(v: (f64, f64, f64), name: &str) -> Result<(f64, f64, f64), PhysicsError> {
    if v.0.is_finite() && v.1.is_finite() && v.2.is_finite() {
        Ok(v)
    } else {
        Err(PhysicsError::InvalidArgument(format!("{} must be finite, got {:?}", name, v)))
    }
}

/// Validates a simulation time step: strictly positive and finite.
pub fn ensure_time_step(dt: f64) -> Result<f64, PhysicsError> {
    if dt.is_finite() && dt > 0.0 {
        Ok(dt)
    } else {
        Err(PhysicsError::InvalidTimeStep(dt))
    }
}
