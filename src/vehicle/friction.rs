// ==============================================================================
// friction.rs — TIRE FRICTION (FORWARD DRIVE/BRAKE + LATERAL SLIP)
// ------------------------------------------------------------------------------
// Ground-plane basis per contact:
//   side    = axle projected on the contact plane
//   forward = n × side, flipped to agree with the chassis forward axis
//
// Forward impulse: engine · dt plus a brake impulse that opposes v_fwd and
//   never exceeds what would stop this wheel's share of the chassis.
// Lateral impulse: velocity-damping impulse against v_lat (Bullet's 0.2
//   contact damping).
// Both go through the friction circle: |forward| ≤ slip · N · dt, and the
// lateral impulse gets whatever budget the forward one left.
// ==============================================================================

use rapier3d::prelude::*;

use super::types::WheelConfig;

/// Bullet's bilateral contact damping factor.
pub const SIDE_CONTACT_DAMPING: Real = 0.2;

/// Orthonormal contact-plane directions for one wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionBasis {
    pub forward: Vector<Real>,
    pub side: Vector<Real>,
}

impl FrictionBasis {
    /// `None` when the axle is (nearly) aligned with the contact normal,
    /// e.g. a wheel lying flat on its side.
    pub fn new(
        axle_ws: &Vector<Real>,
        normal: &Vector<Real>,
        chassis_forward_ws: &Vector<Real>,
    ) -> Option<Self> {
        let side = (axle_ws - normal * normal.dot(axle_ws)).try_normalize(1.0e-6)?;
        let mut forward = normal.cross(&side).try_normalize(1.0e-6)?;

        if forward.dot(chassis_forward_ws) < 0.0 {
            forward = -forward;
        }

        Some(Self { forward, side })
    }
}

/// Everything the friction solve needs for one in-contact wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionInput {
    pub forward_velocity: Real,
    pub side_velocity: Real,
    /// Effective chassis masses at the contact along forward / side.
    pub forward_mass: Real,
    pub side_mass: Real,
    pub engine_force: Real,
    pub brake: Real,
    /// This tick's suspension force.
    pub normal_force: Real,
    pub wheels_on_ground: usize,
    pub dt: Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrictionOutput {
    pub forward_impulse: Real,
    pub side_impulse: Real,
    pub skid: Real,
    pub sliding: bool,
}

/// Impulse that opposes `forward_velocity`, capped so that this wheel alone
/// can at most cancel its share of the chassis' forward momentum.
pub fn brake_impulse(
    brake: Real,
    forward_velocity: Real,
    forward_mass: Real,
    wheels_on_ground: usize,
    dt: Real,
) -> Real {
    if brake <= 0.0 || forward_velocity == 0.0 {
        return 0.0;
    }

    let share = forward_velocity.abs() * forward_mass / wheels_on_ground.max(1) as Real;
    -forward_velocity.signum() * (brake * dt).min(share)
}

pub fn solve_friction(config: &WheelConfig, input: &FrictionInput) -> FrictionOutput {
    let engine = input.engine_force * input.dt * config.forward_acceleration;
    // already capped to the stopping momentum, so it is not scaled
    let brake = brake_impulse(
        input.brake,
        input.forward_velocity,
        input.forward_mass,
        input.wheels_on_ground,
        input.dt,
    );
    let requested_forward = engine + brake;

    let requested_side = -config.side_friction_stiffness
        * input.side_velocity
        * input.side_mass
        * SIDE_CONTACT_DAMPING
        * config.side_acceleration;

    // friction circle
    let max_impulse = (config.friction_slip * input.normal_force.max(0.0) * input.dt).max(0.0);
    let forward_impulse = requested_forward.clamp(-max_impulse, max_impulse);
    let side_budget = (max_impulse * max_impulse - forward_impulse * forward_impulse)
        .max(0.0)
        .sqrt();
    let side_impulse = requested_side.clamp(-side_budget, side_budget);

    let requested = requested_forward.hypot(requested_side);
    let delivered = forward_impulse.hypot(side_impulse);
    let skid = if requested > 0.0 {
        (1.0 - delivered / requested).clamp(0.0, 1.0)
    } else {
        0.0
    };

    FrictionOutput {
        forward_impulse,
        side_impulse,
        skid,
        sliding: skid > 0.0,
    }
}
