// ==============================================================================
// drivetrain.rs — DRIVER INPUT SNAPSHOT + WHICH WHEELS STEER / DRIVE / BRAKE
// ------------------------------------------------------------------------------
// DriverInput is the normalized per-tick command from a client:
//   throttle ∈ [-1, 1], steer ∈ [-1, 1], brake ∈ [0, 1]
// DrivetrainLayout turns it into per-wheel steering angle, engine force and
// brake force. Anything out of range is clamped, NaN counts as zero.
// ==============================================================================

use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverInput {
    pub throttle: Real,
    pub steer: Real,
    pub brake: Real,
}

fn clamp_or_zero(value: Real, min: Real, max: Real) -> Real {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        0.0
    }
}

impl DriverInput {
    pub fn new(throttle: Real, steer: Real, brake: Real) -> Self {
        Self {
            throttle,
            steer,
            brake,
        }
    }

    pub fn sanitized(&self) -> Self {
        Self {
            throttle: clamp_or_zero(self.throttle, -1.0, 1.0),
            steer: clamp_or_zero(self.steer, -1.0, 1.0),
            brake: clamp_or_zero(self.brake, 0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivetrainLayout {
    pub steered: Vec<usize>,
    pub driven: Vec<usize>,
    pub braked: Vec<usize>,
    pub max_engine_force: Real,   // N at full throttle
    pub max_brake_force: Real,    // N at full brake
    pub max_steering_angle: Real, // rad at full lock
}

impl Default for DrivetrainLayout {
    // front wheels steer, rear wheels drive, all four brake
    fn default() -> Self {
        Self {
            steered: vec![0, 1],
            driven: vec![2, 3],
            braked: vec![0, 1, 2, 3],
            max_engine_force: 80.0,
            max_brake_force: 80.0,
            max_steering_angle: 0.5,
        }
    }
}

/// Per-wheel values produced by [`DrivetrainLayout::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelCommand {
    pub steering: Real,
    pub engine_force: Real,
    pub brake: Real,
}

impl DrivetrainLayout {
    /// Highest wheel index referenced by the layout, if any.
    pub fn max_wheel_index(&self) -> Option<usize> {
        self.steered
            .iter()
            .chain(&self.driven)
            .chain(&self.braked)
            .copied()
            .max()
    }

    /// Wheels not listed in a role get zero for that role.
    pub fn resolve(&self, input: &DriverInput, num_wheels: usize) -> Vec<WheelCommand> {
        let input = input.sanitized();
        let mut commands = vec![WheelCommand::default(); num_wheels];

        for &i in &self.steered {
            if let Some(cmd) = commands.get_mut(i) {
                cmd.steering = input.steer * self.max_steering_angle;
            }
        }
        for &i in &self.driven {
            if let Some(cmd) = commands.get_mut(i) {
                cmd.engine_force = input.throttle * self.max_engine_force;
            }
        }
        for &i in &self.braked {
            if let Some(cmd) = commands.get_mut(i) {
                cmd.brake = input.brake * self.max_brake_force;
            }
        }

        commands
    }
}
