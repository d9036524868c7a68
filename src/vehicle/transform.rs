// ==============================================================================
// transform.rs — WHEEL POSE FROM CHASSIS POSE
// ------------------------------------------------------------------------------
// local = translate(connection + direction · length)
//         ∘ rot(steering about chassis-local up)
//         ∘ rot(roll angle about the axle)
// world = chassis_pose ∘ local
//
// Pure functions of config + (length, steering, rotation). The controller
// calls them after the physics step so the pose matches the integrated chassis.
// ==============================================================================

use rapier3d::na::{Translation3, Unit, UnitQuaternion};
use rapier3d::prelude::*;

use super::types::WheelConfig;

#[inline]
pub fn steering_rotation(up_local: &Vector<Real>, steering: Real) -> UnitQuaternion<Real> {
    UnitQuaternion::from_axis_angle(&Unit::new_normalize(*up_local), steering)
}

/// Axle direction (chassis space) after steering.
pub fn steered_axle(config: &WheelConfig, up_local: &Vector<Real>, steering: Real) -> Vector<Real> {
    steering_rotation(up_local, steering) * config.axle
}

pub fn wheel_local_transform(
    config: &WheelConfig,
    up_local: &Vector<Real>,
    suspension_length: Real,
    steering: Real,
    rotation: Real,
) -> Isometry<Real> {
    let center = config.chassis_connection_point + config.direction * suspension_length;
    let roll = UnitQuaternion::from_axis_angle(&Unit::new_normalize(config.axle), rotation);

    Isometry::from_parts(
        Translation3::from(center.coords),
        steering_rotation(up_local, steering) * roll,
    )
}

pub fn wheel_world_transform(
    chassis_pose: &Isometry<Real>,
    config: &WheelConfig,
    up_local: &Vector<Real>,
    suspension_length: Real,
    steering: Real,
    rotation: Real,
) -> Isometry<Real> {
    chassis_pose * wheel_local_transform(config, up_local, suspension_length, steering, rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn wheel() -> WheelConfig {
        WheelConfig::default()
            .at(point![0.7, -0.38, 0.5])
            .into_validated()
            .unwrap()
    }

    #[test]
    fn zero_angles_give_pure_translation() {
        let cfg = wheel();
        let iso = wheel_world_transform(&Isometry::identity(), &cfg, &Vector::y(), 0.3, 0.0, 0.0);

        assert_relative_eq!(iso.translation.vector, vector![0.7, -0.68, 0.5], epsilon = 1.0e-6);
        assert_relative_eq!(iso.rotation.angle(), 0.0, epsilon = 1.0e-6);
    }

    #[test]
    fn steering_turns_the_axle_about_up() {
        let cfg = wheel();
        let axle = steered_axle(&cfg, &Vector::y(), FRAC_PI_2);
        // z rotated +90° about y → +x
        assert_relative_eq!(axle, Vector::x(), epsilon = 1.0e-6);
    }

    #[test]
    fn roll_spins_about_the_axle() {
        let cfg = wheel();
        let iso = wheel_local_transform(&cfg, &Vector::y(), 0.3, 0.0, FRAC_PI_2);

        // The axle itself is invariant under roll.
        assert_relative_eq!(iso.rotation * cfg.axle, cfg.axle, epsilon = 1.0e-6);
        // Quarter turn about +z: a spoke along +x ends up along +y.
        assert_relative_eq!(iso.rotation * Vector::x(), Vector::y(), epsilon = 1.0e-6);
    }

    #[test]
    fn world_pose_follows_chassis() {
        let cfg = wheel();
        let chassis = Isometry::new(vector![10.0, 2.0, -3.0], vector![0.0, FRAC_PI_2, 0.0]);

        let local = wheel_local_transform(&cfg, &Vector::y(), 0.25, 0.2, 1.0);
        let world = wheel_world_transform(&chassis, &cfg, &Vector::y(), 0.25, 0.2, 1.0);

        assert_relative_eq!(world, chassis * local, epsilon = 1.0e-5);
        // Translation is independent of the wheel's own angles.
        let plain = wheel_world_transform(&chassis, &cfg, &Vector::y(), 0.25, 0.0, 0.0);
        assert_relative_eq!(
            world.translation.vector,
            plain.translation.vector,
            epsilon = 1.0e-6
        );
    }
}
