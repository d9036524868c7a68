// ==============================================================================
// raycast.rs — SUSPENSION RAY CAST (ONE PROBE PER WHEEL)
// ------------------------------------------------------------------------------
// Ray starts at the world-space suspension hardpoint and goes along the world
// suspension direction, up to rest + travel + radius.
//   hit  → suspension length = clamp(hit − radius, rest − travel, rest + travel)
//   miss → suspension fully extended, no contact
// Pure read of the world; nothing is applied here.
// ==============================================================================

use rapier3d::prelude::*;

use super::types::{ContactInfo, WheelConfig, WheelContact};
use super::world::{ChassisState, VehicleWorld};

/// World-space hardpoint and suspension direction of a wheel.
#[derive(Debug, Clone, Copy)]
pub struct SuspensionRay {
    pub origin: Point<Real>,
    pub dir: Vector<Real>,
}

impl SuspensionRay {
    pub fn new(config: &WheelConfig, chassis_pose: &Isometry<Real>) -> Self {
        Self {
            origin: chassis_pose * config.chassis_connection_point,
            dir: chassis_pose.rotation * config.direction,
        }
    }

    /// Wheel center for a given suspension length.
    #[inline]
    pub fn wheel_center(&self, suspension_length: Real) -> Point<Real> {
        self.origin + self.dir * suspension_length
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastOutcome {
    pub suspension_length: Real,
    pub contact: WheelContact,
}

pub fn cast_suspension<W: VehicleWorld + ?Sized>(
    world: &W,
    chassis_handle: RigidBodyHandle,
    chassis: &ChassisState,
    config: &WheelConfig,
) -> RaycastOutcome {
    let ray = SuspensionRay::new(config, &chassis.pose);

    let Some(hit) = world.cast_ray(ray.origin, ray.dir, config.max_ray_length(), chassis_handle)
    else {
        return RaycastOutcome {
            suspension_length: config.max_suspension_length(),
            contact: WheelContact::NoContact,
        };
    };

    let distance = hit.toi - config.radius;
    let suspension_length = distance.clamp(
        config.min_suspension_length(),
        config.max_suspension_length(),
    );

    // Rays that start inside geometry report a zero normal.
    let normal_len = hit.normal.norm();
    let normal = if normal_len.is_finite() && normal_len > 1.0e-6 {
        hit.normal / normal_len
    } else {
        -ray.dir
    };

    let relative_velocity = chassis.velocity_at_point(&hit.point) - hit.ground_velocity;

    RaycastOutcome {
        suspension_length,
        contact: WheelContact::Contact(ContactInfo {
            point: hit.point,
            normal,
            distance,
            relative_velocity,
            ground: hit.collider,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::test_world::{chassis_handle, MockWorld};
    use approx::assert_relative_eq;
    use rapier3d::na::UnitQuaternion;

    fn wheel() -> WheelConfig {
        WheelConfig::default()
            .at(point![0.0, -0.38, 0.0])
            .into_validated()
            .unwrap()
    }

    #[test]
    fn miss_extends_suspension_fully() {
        let world = MockWorld::airborne(5.0);
        let cfg = wheel();
        let out = cast_suspension(&world, chassis_handle(), &world.chassis, &cfg);

        assert_eq!(out.contact, WheelContact::NoContact);
        assert_relative_eq!(out.suspension_length, cfg.max_suspension_length());
    }

    #[test]
    fn ground_out_of_reach_is_a_miss() {
        // hardpoint at 1.62, reach = 0.6 + 0.38 = 0.98
        let world = MockWorld::on_ground(2.0);
        let out = cast_suspension(&world, chassis_handle(), &world.chassis, &wheel());
        assert!(!out.contact.is_in_contact());
    }

    #[test]
    fn hit_reports_length_minus_radius() {
        // hardpoint at y = 0.68, minus radius 0.38
        let world = MockWorld::on_ground(1.06);
        let cfg = wheel();
        let out = cast_suspension(&world, chassis_handle(), &world.chassis, &cfg);

        let info = out.contact.info().expect("contact");
        assert_relative_eq!(out.suspension_length, 0.3, epsilon = 1.0e-5);
        assert_relative_eq!(info.distance, 0.3, epsilon = 1.0e-5);
        assert_relative_eq!(info.normal, Vector::y(), epsilon = 1.0e-6);
        assert_relative_eq!(info.point.y, 0.0, epsilon = 1.0e-5);
    }

    #[test]
    fn deep_penetration_clamps_to_min_length() {
        let world = MockWorld::on_ground(0.5);
        let cfg = wheel();
        let out = cast_suspension(&world, chassis_handle(), &world.chassis, &cfg);

        assert!(out.contact.is_in_contact());
        assert_relative_eq!(out.suspension_length, cfg.min_suspension_length());
    }

    #[test]
    fn degenerate_normal_falls_back_to_reverse_direction() {
        let mut world = MockWorld::on_ground(1.0);
        world.degenerate_normal = true;
        let out = cast_suspension(&world, chassis_handle(), &world.chassis, &wheel());

        let info = out.contact.info().expect("contact");
        assert_relative_eq!(info.normal, vector![0.0, 1.0, 0.0], epsilon = 1.0e-6);
    }

    #[test]
    fn relative_velocity_subtracts_ground_motion() {
        let mut world = MockWorld::on_ground(1.0);
        world.chassis.linvel = vector![3.0, 0.0, 0.0];
        world.ground_velocity = vector![1.0, 0.0, 0.0];
        let out = cast_suspension(&world, chassis_handle(), &world.chassis, &wheel());

        let info = out.contact.info().expect("contact");
        assert_relative_eq!(info.relative_velocity, vector![2.0, 0.0, 0.0], epsilon = 1.0e-6);
    }

    #[test]
    fn ray_follows_chassis_rotation() {
        // Upside down: the suspension points up, away from the ground.
        let mut world = MockWorld::on_ground(1.0);
        world.chassis.pose.rotation =
            UnitQuaternion::from_axis_angle(&Vector::x_axis(), std::f32::consts::PI);
        let out = cast_suspension(&world, chassis_handle(), &world.chassis, &wheel());
        assert!(!out.contact.is_in_contact());
    }
}
