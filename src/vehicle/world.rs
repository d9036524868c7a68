// ==============================================================================
// world.rs — THE PHYSICS SEAM THE CONTROLLER TALKS TO
// ------------------------------------------------------------------------------
// The controller never touches rapier directly. It needs exactly four things
// from the engine:
//   • a ray cast that ignores the chassis’ own colliders
//   • a read of the chassis’ pose / velocities / mass
//   • the scalar impulse denominator at a point along a direction
//   • an impulse applied at a world-space point
// PhysicsWorld (physics.rs) implements this for the server; unit tests use a
// scripted mock.
// ==============================================================================

use rapier3d::prelude::*;

/// Result of a suspension ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the (unit) ray direction.
    pub toi: Real,
    pub point: Point<Real>,
    pub normal: Vector<Real>,
    pub collider: Option<ColliderHandle>,
    /// Velocity of the hit body at `point` (zero for fixed geometry).
    pub ground_velocity: Vector<Real>,
}

/// Snapshot of the chassis body, read once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisState {
    pub pose: Isometry<Real>,
    pub linvel: Vector<Real>,
    pub angvel: Vector<Real>,
    /// World-space center of mass.
    pub center_of_mass: Point<Real>,
    pub mass: Real,
}

impl ChassisState {
    #[inline]
    pub fn velocity_at_point(&self, point: &Point<Real>) -> Vector<Real> {
        self.linvel + self.angvel.cross(&(point - self.center_of_mass))
    }
}

pub trait VehicleWorld {
    fn cast_ray(
        &self,
        origin: Point<Real>,
        dir: Vector<Real>,
        max_toi: Real,
        exclude: RigidBodyHandle,
    ) -> Option<RayHit>;

    fn chassis_state(&self, handle: RigidBodyHandle) -> Option<ChassisState>;

    /// `1/m + n·((I⁻¹ (r × n)) × r)` for the body at `point` along `dir`.
    /// `1 / denominator` is the effective mass for an impulse along `dir`.
    fn impulse_denominator(
        &self,
        handle: RigidBodyHandle,
        point: Point<Real>,
        dir: Vector<Real>,
    ) -> Real;

    fn apply_impulse_at_point(
        &mut self,
        handle: RigidBodyHandle,
        impulse: Vector<Real>,
        point: Point<Real>,
    );
}
