// ==============================================================================
// error.rs — ERROR TYPES (VEHICLE CONTROLLER + SERVER CONFIG)
// ------------------------------------------------------------------------------
// VehicleError covers programmer/configuration mistakes against the controller
// (bad wheel index, invalid wheel config, bad axes, bad dt, missing chassis).
// A raycast miss is NOT an error; it is the airborne branch of the solver.
//
// ConfigError covers loading the server configuration from disk.
// ==============================================================================

use rapier3d::prelude::{Real, RigidBodyHandle};
use thiserror::Error;

/// Errors raised by the raycast vehicle controller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VehicleError {
    #[error("wheel index {index} out of range (vehicle has {count} wheels)")]
    WheelIndexOutOfRange { index: usize, count: usize },

    #[error("invalid wheel config: {field}: {message}")]
    InvalidWheelConfig {
        field: &'static str,
        message: String,
    },

    #[error("invalid chassis axes (right={right}, forward={forward}, up={up}): indices must be distinct and < 3")]
    InvalidChassisAxes {
        right: usize,
        forward: usize,
        up: usize,
    },

    #[error("chassis body {0:?} not found in the physics world")]
    ChassisNotFound(RigidBodyHandle),

    #[error("invalid time step {0} (must be finite and > 0)")]
    InvalidTimeStep(Real),
}

impl VehicleError {
    pub(crate) fn invalid_wheel(field: &'static str, message: impl Into<String>) -> Self {
        VehicleError::InvalidWheelConfig {
            field,
            message: message.into(),
        }
    }
}

/// Errors raised while loading the server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("vehicle preset rejected: {0}")]
    Vehicle(#[from] VehicleError),
}
