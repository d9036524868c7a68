// Scripted VehicleWorld for controller unit tests: one chassis, an optional
// infinite horizontal ground plane, and a log of every impulse applied.

use rapier3d::prelude::*;

use super::world::{ChassisState, RayHit, VehicleWorld};

pub(crate) fn chassis_handle() -> RigidBodyHandle {
    RigidBodyHandle::from_raw_parts(0, 0)
}

pub(crate) struct MockWorld {
    pub chassis: ChassisState,
    pub ground_height: Option<Real>,
    pub ground_velocity: Vector<Real>,
    pub degenerate_normal: bool,
    pub inv_inertia: Real,
    pub impulses: Vec<(Vector<Real>, Point<Real>)>,
}

impl MockWorld {
    /// Chassis at rest, `height` above a ground plane at y = 0.
    pub fn on_ground(height: Real) -> Self {
        let pose = Isometry::translation(0.0, height, 0.0);
        Self {
            chassis: ChassisState {
                pose,
                linvel: Vector::zeros(),
                angvel: Vector::zeros(),
                center_of_mass: pose.translation.vector.into(),
                mass: 150.0,
            },
            ground_height: Some(0.0),
            ground_velocity: Vector::zeros(),
            degenerate_normal: false,
            inv_inertia: 1.0 / 30.0,
            impulses: Vec::new(),
        }
    }

    pub fn airborne(height: Real) -> Self {
        Self {
            ground_height: None,
            ..Self::on_ground(height)
        }
    }

    pub fn total_impulse(&self) -> Vector<Real> {
        self.impulses.iter().map(|(imp, _)| *imp).sum()
    }
}

impl VehicleWorld for MockWorld {
    fn cast_ray(
        &self,
        origin: Point<Real>,
        dir: Vector<Real>,
        max_toi: Real,
        _exclude: RigidBodyHandle,
    ) -> Option<RayHit> {
        let ground = self.ground_height?;
        if dir.y >= 0.0 || origin.y < ground {
            return None;
        }
        let toi = (origin.y - ground) / -dir.y;
        if toi > max_toi {
            return None;
        }
        let normal = if self.degenerate_normal {
            Vector::zeros()
        } else {
            Vector::y()
        };
        Some(RayHit {
            toi,
            point: origin + dir * toi,
            normal,
            collider: None,
            ground_velocity: self.ground_velocity,
        })
    }

    fn chassis_state(&self, handle: RigidBodyHandle) -> Option<ChassisState> {
        (handle == chassis_handle()).then_some(self.chassis)
    }

    fn impulse_denominator(
        &self,
        _handle: RigidBodyHandle,
        point: Point<Real>,
        dir: Vector<Real>,
    ) -> Real {
        let r = point - self.chassis.center_of_mass;
        let v = (r.cross(&dir) * self.inv_inertia).cross(&r);
        1.0 / self.chassis.mass + dir.dot(&v)
    }

    fn apply_impulse_at_point(
        &mut self,
        _handle: RigidBodyHandle,
        impulse: Vector<Real>,
        point: Point<Real>,
    ) {
        self.impulses.push((impulse, point));
    }
}
