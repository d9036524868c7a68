// End-to-end checks of the raycast vehicle against the real rapier world.

use approx::assert_relative_eq;
use rapier3d::prelude::*;

use raycast_vehicle::config::ChassisSpec;
use raycast_vehicle::physics::PhysicsWorld;
use raycast_vehicle::vehicle::{
    ChassisAxes, DriverInput, DrivetrainLayout, VehicleController, VehicleWorld, WheelConfig,
};

const DT: Real = 1.0 / 60.0;

struct Rig {
    world: PhysicsWorld,
    vehicle: VehicleController,
}

impl Rig {
    /// Symmetric four-wheel car (+X forward, +Y up, +Z right) dropped from `height`.
    fn new(height: Real) -> Self {
        Self::with_wheel(height, WheelConfig::default())
    }

    fn with_wheel(height: Real, wheel: WheelConfig) -> Self {
        let mut world = PhysicsWorld::default();
        world.add_ground([50.0, 0.1, 50.0], 1.0);

        let spec = ChassisSpec {
            half_extents: [1.0, 0.25, 0.5],
            mass: 150.0,
            ..Default::default()
        };
        let chassis = world.spawn_chassis(&spec, Isometry::translation(0.0, height, 0.0));

        let mut vehicle = VehicleController::new(chassis, ChassisAxes::default()).unwrap();
        for (x, z) in [(0.8, 0.3), (0.8, -0.3), (-0.8, 0.3), (-0.8, -0.3)] {
            vehicle
                .add_wheel(wheel.at(point![x, -0.38, z]))
                .unwrap();
        }

        Self { world, vehicle }
    }

    fn tick(&mut self) {
        self.vehicle.update(&mut self.world, DT).unwrap();
        self.world.step(DT);
        self.vehicle.sync_wheel_transforms(&self.world).unwrap();
    }

    fn chassis_height(&self) -> Real {
        self.world
            .chassis_state(self.vehicle.chassis())
            .unwrap()
            .pose
            .translation
            .y
    }

    fn forward_velocity(&self) -> Real {
        let state = self.world.chassis_state(self.vehicle.chassis()).unwrap();
        let forward = state.pose.rotation * Vector::x();
        state.linvel.dot(&forward)
    }

    fn settle(&mut self) {
        for _ in 0..120 {
            self.tick();
        }
    }
}

#[test]
fn settles_at_spring_equilibrium() {
    let mut rig = Rig::new(4.0);

    let mut heights = Vec::new();
    for _ in 0..120 {
        rig.tick();
        heights.push(rig.chassis_height());
    }

    // k is per unit chassis mass: 4 · k · (rest − len) = g
    let cfg = WheelConfig::default();
    let equilibrium = cfg.suspension_rest_length
        - 9.81 / (rig.vehicle.num_wheels() as Real * cfg.suspension_stiffness);

    for (_, state) in rig.vehicle.wheels() {
        assert!(state.is_in_contact());
        assert!(
            (state.suspension_length - equilibrium).abs() < 0.02,
            "suspension length {} not near {}",
            state.suspension_length,
            equilibrium
        );
    }

    let last = &heights[heights.len() - 10..];
    let max = last.iter().cloned().fold(Real::MIN, Real::max);
    let min = last.iter().cloned().fold(Real::MAX, Real::min);
    assert!(max - min < 0.01, "still bouncing: {min}..{max}");
}

fn brake_one_tick(mut rig: Rig, speed: Real) -> Rig {
    rig.settle();

    let chassis = rig.vehicle.chassis();
    if let Some(body) = rig.world.bodies.get_mut(chassis) {
        body.set_linvel(vector![speed, 0.0, 0.0], true);
        body.set_angvel(Vector::zeros(), true);
    }
    for i in 0..rig.vehicle.num_wheels() {
        rig.vehicle.set_brake_value(1.0e6, i).unwrap();
    }

    rig.tick();
    rig
}

#[test]
fn brake_never_flips_forward_velocity_with_strong_forward_acceleration() {
    for fa in [1.0, 3.0, 5.0, 10.0] {
        let wheel = WheelConfig {
            forward_acceleration: fa,
            ..Default::default()
        };
        let rig = brake_one_tick(Rig::with_wheel(1.2, wheel), 0.1);
        let v = rig.forward_velocity();
        assert!(v > -1.0e-3, "forward_acceleration {fa}: v = {v}");
        assert!(v < 0.1);
    }
}

#[test]
fn brake_never_flips_forward_velocity() {
    let rig = brake_one_tick(Rig::new(1.2), 0.1);
    let chassis = rig.vehicle.chassis();

    assert!(rig.forward_velocity() > -1.0e-3, "v = {}", rig.forward_velocity());
    assert!(rig.forward_velocity() < 0.1);

    let state = rig.world.chassis_state(chassis).unwrap();
    for (_, wheel) in rig.vehicle.wheels() {
        let point = wheel.contact_point().unwrap();
        let v = state.velocity_at_point(&point).dot(&(state.pose.rotation * Vector::x()));
        assert!(v > -1.0e-3, "contact velocity flipped: {v}");
    }
}

#[test]
fn engine_force_drives_in_its_sign() {
    let layout = DrivetrainLayout::default();

    for throttle in [1.0, -1.0] {
        let mut rig = Rig::new(1.2);
        rig.settle();

        for _ in 0..60 {
            rig.vehicle
                .apply_input(&layout, &DriverInput::new(throttle, 0.0, 0.0))
                .unwrap();
            rig.tick();
        }

        let v = rig.forward_velocity();
        assert!(v * throttle > 0.05, "throttle {throttle} gave v = {v}");
        assert_relative_eq!(rig.vehicle.current_speed_km_hour(), rig.vehicle.current_vehicle_speed() * 3.6);
    }
}

#[test]
fn steering_turns_the_car() {
    let layout = DrivetrainLayout::default();
    let mut rig = Rig::new(1.2);
    rig.settle();

    for _ in 0..90 {
        rig.vehicle
            .apply_input(&layout, &DriverInput::new(1.0, 1.0, 0.0))
            .unwrap();
        rig.tick();
    }

    let state = rig.world.chassis_state(rig.vehicle.chassis()).unwrap();
    assert!(state.angvel.y.abs() > 1.0e-3, "no yaw: {:?}", state.angvel);
}

#[test]
fn airborne_wheels_apply_nothing() {
    let mut world = PhysicsWorld::new(Vector::zeros());
    world.add_ground([50.0, 0.1, 50.0], 1.0);
    let chassis = world.spawn_chassis(&ChassisSpec::default(), Isometry::translation(0.0, 10.0, 0.0));

    let mut vehicle = VehicleController::new(chassis, ChassisAxes::default()).unwrap();
    for x in [0.8, -0.8] {
        vehicle
            .add_wheel(WheelConfig::default().at(point![x, -0.38, 0.0]))
            .unwrap();
    }
    vehicle.apply_engine_force(1_000.0, 0).unwrap();
    vehicle.set_brake_value(1_000.0, 1).unwrap();

    vehicle.update(&mut world, DT).unwrap();
    world.step(DT);
    vehicle.sync_wheel_transforms(&world).unwrap();

    let state = world.chassis_state(chassis).unwrap();
    assert_relative_eq!(state.linvel, Vector::zeros(), epsilon = 1.0e-6);
    assert_relative_eq!(state.angvel, Vector::zeros(), epsilon = 1.0e-6);
    assert_eq!(vehicle.num_wheels_on_ground(), 0);
    for (cfg, wheel) in vehicle.wheels() {
        assert!(!wheel.is_in_contact());
        assert_eq!(wheel.suspension_force, 0.0);
        assert_eq!(wheel.forward_impulse, 0.0);
        assert_eq!(wheel.side_impulse, 0.0);
        assert_relative_eq!(wheel.suspension_length, cfg.max_suspension_length());
    }
}

#[test]
fn wheel_transforms_are_recomputable() {
    let mut rig = Rig::new(1.2);
    rig.vehicle.set_steering_value(0.25, 0).unwrap();
    for _ in 0..30 {
        rig.tick();
    }

    let pose = rig.world.chassis_state(rig.vehicle.chassis()).unwrap().pose;
    for i in 0..rig.vehicle.num_wheels() {
        let a = rig.vehicle.wheel_world_transform(i, &pose).unwrap();
        let b = rig.vehicle.wheel_world_transform(i, &pose).unwrap();
        assert_eq!(a, b);
        assert_relative_eq!(a, rig.vehicle.wheel_state(i).unwrap().world_transform, epsilon = 1.0e-6);
    }
}
