// ==============================================================================
// types.rs — WHEEL MODEL (CONFIG + RUNTIME STATE) AND CHASSIS AXES
// ------------------------------------------------------------------------------
// WheelConfig: immutable per-wheel tuning, validated once when the wheel is
//   registered on a controller (add_wheel). Deserializable so vehicle presets
//   can live in the server config file.
// WheelState: everything that changes tick to tick (suspension, contact,
//   inputs, impulses, roll angle, published world transform).
// WheelContact: tagged contact result. Contact data only exists while the
//   wheel actually touches the ground, so stale contact fields cannot be read.
// ChassisAxes: which chassis-local axes are right / forward / up.
// ==============================================================================

use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::VehicleError;

/// The chassis’ local axis indices (`0 = x, 1 = y, 2 = z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChassisAxes {
    pub right: usize,
    pub forward: usize,
    pub up: usize,
}

impl Default for ChassisAxes {
    // +X forward, +Y up, +Z right (the demo car's convention)
    fn default() -> Self {
        Self {
            right: 2,
            forward: 0,
            up: 1,
        }
    }
}

impl ChassisAxes {
    pub fn new(right: usize, forward: usize, up: usize) -> Result<Self, VehicleError> {
        let axes = Self { right, forward, up };
        axes.validate()?;
        Ok(axes)
    }

    pub fn validate(&self) -> Result<(), VehicleError> {
        let in_range = self.right < 3 && self.forward < 3 && self.up < 3;
        let distinct =
            self.right != self.forward && self.right != self.up && self.forward != self.up;

        if in_range && distinct {
            Ok(())
        } else {
            Err(VehicleError::InvalidChassisAxes {
                right: self.right,
                forward: self.forward,
                up: self.up,
            })
        }
    }

    #[inline]
    pub fn right_local(&self) -> Vector<Real> {
        Vector::ith(self.right, 1.0)
    }

    #[inline]
    pub fn forward_local(&self) -> Vector<Real> {
        Vector::ith(self.forward, 1.0)
    }

    #[inline]
    pub fn up_local(&self) -> Vector<Real> {
        Vector::ith(self.up, 1.0)
    }
}

/// Parameters affecting the physical behavior of one wheel.
///
/// Stiffness and damping are expressed per unit of chassis mass: the solver
/// multiplies the spring-damper result by the chassis mass, so the same
/// tuning behaves the same on light and heavy bodies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    /// The wheel’s radius.
    pub radius: Real,
    /// The position of the wheel’s suspension attachment, relative to the chassis.
    pub chassis_connection_point: Point<Real>,
    /// The direction of the wheel’s suspension, relative to the chassis.
    ///
    /// The ray-casting will happen following this direction to detect the ground.
    pub direction: Vector<Real>,
    /// The wheel’s axle axis, relative to the chassis.
    pub axle: Vector<Real>,

    /// The suspension stiffness.
    ///
    /// Increase this value if the suspension appears to not push the vehicle strong enough.
    pub suspension_stiffness: Real,
    /// The rest length of the wheel’s suspension spring.
    pub suspension_rest_length: Real,
    /// The maximum force applied by the suspension.
    pub max_suspension_force: Real,
    /// The maximum distance the suspension can travel before and after its resting length.
    pub max_suspension_travel: Real,

    /// The multiplier of friction between a tire and the collider it's on top of.
    pub side_friction_stiffness: Real,
    /// Parameter controlling how much traction the tire has.
    ///
    /// The larger the value, the more instantaneous braking will happen (with the risk of
    /// causing the vehicle to flip if it’s too strong).
    pub friction_slip: Real,
    /// The suspension’s damping when it is being compressed.
    pub damping_compression: Real,
    /// The suspension’s damping when it is being released.
    ///
    /// Increase this value if the suspension appears to overshoot.
    pub damping_relaxation: Real,

    /// 0 applies lateral friction at the wheel center, 1 at the ground contact.
    pub roll_influence: Real,
    /// Spin rate (rad/s) shown while the driven wheel slides or spins in the air.
    pub custom_sliding_rotational_speed: Option<Real>,

    pub forward_acceleration: Real,
    pub side_acceleration: Real,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            radius: 0.38,
            chassis_connection_point: Point::origin(),
            direction: vector![0.0, -1.0, 0.0],
            axle: vector![0.0, 0.0, 1.0],

            suspension_stiffness: 30.0,
            suspension_rest_length: 0.3,
            max_suspension_force: 100_000.0,
            max_suspension_travel: 0.3,

            side_friction_stiffness: 1.0,
            friction_slip: 1.4,
            damping_compression: 4.4,
            damping_relaxation: 2.3,

            roll_influence: 0.01,
            custom_sliding_rotational_speed: Some(-30.0),

            forward_acceleration: 1.0,
            side_acceleration: 1.0,
        }
    }
}

fn non_negative(field: &'static str, value: Real) -> Result<(), VehicleError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(VehicleError::invalid_wheel(
            field,
            format!("must be finite and >= 0, got {value}"),
        ))
    }
}

impl WheelConfig {
    /// Same config with its suspension attached at `point` (chassis space).
    pub fn at(self, point: Point<Real>) -> Self {
        Self {
            chassis_connection_point: point,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), VehicleError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(VehicleError::invalid_wheel(
                "radius",
                format!("must be finite and > 0, got {}", self.radius),
            ));
        }
        if !(self.suspension_rest_length.is_finite() && self.suspension_rest_length > 0.0) {
            return Err(VehicleError::invalid_wheel(
                "suspension_rest_length",
                format!("must be finite and > 0, got {}", self.suspension_rest_length),
            ));
        }

        non_negative("max_suspension_travel", self.max_suspension_travel)?;
        if self.max_suspension_travel > self.suspension_rest_length {
            return Err(VehicleError::invalid_wheel(
                "max_suspension_travel",
                format!(
                    "travel {} exceeds rest length {} (suspension length would go negative)",
                    self.max_suspension_travel, self.suspension_rest_length
                ),
            ));
        }

        non_negative("suspension_stiffness", self.suspension_stiffness)?;
        non_negative("max_suspension_force", self.max_suspension_force)?;
        non_negative("side_friction_stiffness", self.side_friction_stiffness)?;
        non_negative("friction_slip", self.friction_slip)?;
        non_negative("damping_compression", self.damping_compression)?;
        non_negative("damping_relaxation", self.damping_relaxation)?;
        non_negative("forward_acceleration", self.forward_acceleration)?;
        non_negative("side_acceleration", self.side_acceleration)?;

        if !(0.0..=1.0).contains(&self.roll_influence) {
            return Err(VehicleError::invalid_wheel(
                "roll_influence",
                format!("must be within [0, 1], got {}", self.roll_influence),
            ));
        }
        if let Some(speed) = self.custom_sliding_rotational_speed {
            if !speed.is_finite() {
                return Err(VehicleError::invalid_wheel(
                    "custom_sliding_rotational_speed",
                    "must be finite",
                ));
            }
        }

        let p = self.chassis_connection_point;
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return Err(VehicleError::invalid_wheel(
                "chassis_connection_point",
                "must be finite",
            ));
        }

        let dir_len = self.direction.norm();
        let axle_len = self.axle.norm();
        if !(dir_len.is_finite() && dir_len > 1.0e-6) {
            return Err(VehicleError::invalid_wheel("direction", "must be a non-zero vector"));
        }
        if !(axle_len.is_finite() && axle_len > 1.0e-6) {
            return Err(VehicleError::invalid_wheel("axle", "must be a non-zero vector"));
        }
        if (self.direction / dir_len).cross(&(self.axle / axle_len)).norm() < 1.0e-3 {
            return Err(VehicleError::invalid_wheel(
                "axle",
                "must not be parallel to the suspension direction",
            ));
        }

        Ok(())
    }

    /// Validates and normalizes the direction/axle vectors. This is the form
    /// stored by the controller; it is never modified afterwards.
    pub(crate) fn into_validated(self) -> Result<Self, VehicleError> {
        self.validate()?;
        Ok(Self {
            direction: self.direction.normalize(),
            axle: self.axle.normalize(),
            ..self
        })
    }

    #[inline]
    pub fn min_suspension_length(&self) -> Real {
        self.suspension_rest_length - self.max_suspension_travel
    }

    #[inline]
    pub fn max_suspension_length(&self) -> Real {
        self.suspension_rest_length + self.max_suspension_travel
    }

    #[inline]
    pub fn max_ray_length(&self) -> Real {
        self.max_suspension_length() + self.radius
    }
}

/// Ground contact data, only present while the wheel touches something.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInfo {
    pub point: Point<Real>,
    pub normal: Vector<Real>,
    /// Hit distance minus the wheel radius (unclamped).
    pub distance: Real,
    /// Chassis velocity at the contact point, relative to the ground body.
    pub relative_velocity: Vector<Real>,
    pub ground: Option<ColliderHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WheelContact {
    #[default]
    NoContact,
    Contact(ContactInfo),
}

impl WheelContact {
    #[inline]
    pub fn is_in_contact(&self) -> bool {
        matches!(self, WheelContact::Contact(_))
    }

    #[inline]
    pub fn info(&self) -> Option<&ContactInfo> {
        match self {
            WheelContact::Contact(info) => Some(info),
            WheelContact::NoContact => None,
        }
    }
}

/// Per-tick runtime state of one wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelState {
    pub suspension_length: Real,
    pub(crate) previous_suspension_length: Real,
    /// Suspension force (N) applied this tick, also the friction normal force.
    pub suspension_force: Real,
    pub contact: WheelContact,

    pub steering: Real,        // radians, about chassis-local up
    pub rotation: Real,        // accumulated roll angle (radians)
    pub delta_rotation: Real,  // roll advance of the last tick
    pub engine_force: Real,    // N
    pub brake: Real,           // N

    pub forward_impulse: Real,
    pub side_impulse: Real,
    /// 0 = full grip, 1 = the friction circle delivered nothing of the demand.
    pub skid: Real,
    pub sliding: bool,

    pub world_transform: Isometry<Real>,
}

impl WheelState {
    pub(crate) fn new(config: &WheelConfig) -> Self {
        Self {
            suspension_length: config.suspension_rest_length,
            previous_suspension_length: config.suspension_rest_length,
            suspension_force: 0.0,
            contact: WheelContact::NoContact,
            steering: 0.0,
            rotation: 0.0,
            delta_rotation: 0.0,
            engine_force: 0.0,
            brake: 0.0,
            forward_impulse: 0.0,
            side_impulse: 0.0,
            skid: 0.0,
            sliding: false,
            world_transform: Isometry::identity(),
        }
    }

    #[inline]
    pub fn is_in_contact(&self) -> bool {
        self.contact.is_in_contact()
    }

    pub fn contact_point(&self) -> Option<Point<Real>> {
        self.contact.info().map(|c| c.point)
    }

    pub fn contact_normal(&self) -> Option<Vector<Real>> {
        self.contact.info().map(|c| c.normal)
    }
}
