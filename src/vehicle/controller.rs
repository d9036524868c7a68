// ==============================================================================
// controller.rs — RAYCAST VEHICLE CONTROLLER (ONE CHASSIS, N LOGICAL WHEELS)
// ------------------------------------------------------------------------------
// Per tick, strictly BEFORE the physics step:
//   1) read the chassis snapshot once (pose, velocities, COM, mass)
//   2) per wheel, in index order: raycast → suspension length → spring force
//   3) per wheel: friction (engine / brake / lateral) through the friction circle
//   4) roll angle bookkeeping
//   5) flush every queued impulse onto the chassis in wheel order
// AFTER the physics step:
//   sync_wheel_transforms() publishes the wheel poses from the integrated chassis.
//
// The controller never integrates the chassis itself; rapier does that.
// ==============================================================================

use log::{debug, warn};
use rapier3d::prelude::*;

use super::drivetrain::{DriverInput, DrivetrainLayout};
use super::friction::{solve_friction, FrictionBasis, FrictionInput, FrictionOutput};
use super::raycast::{cast_suspension, SuspensionRay};
use super::suspension::compute_suspension_force;
use super::transform::{steered_axle, wheel_world_transform};
use super::types::{ChassisAxes, WheelConfig, WheelContact, WheelState};
use super::world::{ChassisState, VehicleWorld};
use crate::error::VehicleError;

const ROLL_DECAY: Real = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    /// No wheels yet.
    Uninitialized,
    /// At least one wheel, never updated.
    Configured,
    /// Updated at least once.
    Running,
}

#[derive(Debug, Clone, Copy)]
struct PendingImpulse {
    wheel: usize,
    impulse: Vector<Real>,
    point: Point<Real>,
}

/// Zeroes a non-finite solver value and reports which wheel produced it.
fn finite_or_zero(value: Real, what: &str, wheel: usize) -> Real {
    if value.is_finite() {
        value
    } else {
        warn!("⚠️ wheel {wheel}: non-finite {what} ({value}), zeroed for this tick");
        0.0
    }
}

fn effective_mass(denominator: Real) -> Real {
    if denominator.is_finite() && denominator > 1.0e-9 {
        1.0 / denominator
    } else {
        0.0
    }
}

pub struct VehicleController {
    chassis: RigidBodyHandle,
    axes: ChassisAxes,
    configs: Vec<WheelConfig>,
    states: Vec<WheelState>,
    phase: ControllerPhase,
    current_vehicle_speed: Real, // m/s along chassis forward, from the last update
    impulses: Vec<PendingImpulse>,
}

impl VehicleController {
    pub fn new(chassis: RigidBodyHandle, axes: ChassisAxes) -> Result<Self, VehicleError> {
        axes.validate()?;
        Ok(Self {
            chassis,
            axes,
            configs: Vec::new(),
            states: Vec::new(),
            phase: ControllerPhase::Uninitialized,
            current_vehicle_speed: 0.0,
            impulses: Vec::new(),
        })
    }

    #[inline]
    pub fn chassis(&self) -> RigidBodyHandle {
        self.chassis
    }

    #[inline]
    pub fn axes(&self) -> ChassisAxes {
        self.axes
    }

    #[inline]
    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    /// Registers a wheel and returns its index (insertion order).
    pub fn add_wheel(&mut self, config: WheelConfig) -> Result<usize, VehicleError> {
        let config = config.into_validated()?;
        if config.axle.dot(&self.axes.right_local()).abs() < 1.0e-3 {
            return Err(VehicleError::invalid_wheel(
                "axle",
                format!(
                    "{:?} is perpendicular to the chassis right axis",
                    config.axle
                ),
            ));
        }
        let index = self.configs.len();

        self.states.push(WheelState::new(&config));
        self.configs.push(config);

        if self.phase == ControllerPhase::Uninitialized {
            self.phase = ControllerPhase::Configured;
        }
        debug!(
            "🛞 wheel {index} added at {:?} (radius {})",
            config.chassis_connection_point, config.radius
        );
        Ok(index)
    }

    #[inline]
    pub fn num_wheels(&self) -> usize {
        self.configs.len()
    }

    fn check_index(&self, index: usize) -> Result<(), VehicleError> {
        if index < self.configs.len() {
            Ok(())
        } else {
            Err(VehicleError::WheelIndexOutOfRange {
                index,
                count: self.configs.len(),
            })
        }
    }

    pub fn wheel_state(&self, index: usize) -> Result<&WheelState, VehicleError> {
        self.check_index(index)?;
        Ok(&self.states[index])
    }

    pub fn wheel_config(&self, index: usize) -> Result<&WheelConfig, VehicleError> {
        self.check_index(index)?;
        Ok(&self.configs[index])
    }

    /// Configs and states, paired by index.
    pub fn wheels(&self) -> impl Iterator<Item = (&WheelConfig, &WheelState)> {
        self.configs.iter().zip(self.states.iter())
    }

    // --------------------------------------------------------------------------
    // Driver controls (persist until overwritten)
    // --------------------------------------------------------------------------

    pub fn set_steering_value(&mut self, angle: Real, index: usize) -> Result<(), VehicleError> {
        self.check_index(index)?;
        self.states[index].steering = angle;
        Ok(())
    }

    pub fn apply_engine_force(&mut self, force: Real, index: usize) -> Result<(), VehicleError> {
        self.check_index(index)?;
        self.states[index].engine_force = force;
        Ok(())
    }

    pub fn set_brake_value(&mut self, force: Real, index: usize) -> Result<(), VehicleError> {
        self.check_index(index)?;
        self.states[index].brake = force;
        Ok(())
    }

    /// Maps one driver input snapshot onto every wheel through `layout`.
    pub fn apply_input(
        &mut self,
        layout: &DrivetrainLayout,
        input: &DriverInput,
    ) -> Result<(), VehicleError> {
        if let Some(max) = layout.max_wheel_index() {
            self.check_index(max)?;
        }

        let commands = layout.resolve(input, self.states.len());
        for (state, cmd) in self.states.iter_mut().zip(commands) {
            state.steering = cmd.steering;
            state.engine_force = cmd.engine_force;
            state.brake = cmd.brake;
        }
        Ok(())
    }

    // --------------------------------------------------------------------------
    // Speed / status queries
    // --------------------------------------------------------------------------

    /// Signed speed along the chassis forward axis, as of the last update.
    #[inline]
    pub fn current_vehicle_speed(&self) -> Real {
        self.current_vehicle_speed
    }

    #[inline]
    pub fn current_speed_km_hour(&self) -> Real {
        self.current_vehicle_speed * 3.6
    }

    pub fn num_wheels_on_ground(&self) -> usize {
        self.states.iter().filter(|s| s.is_in_contact()).count()
    }

    pub fn is_sliding(&self) -> bool {
        self.states.iter().any(|s| s.sliding)
    }

    // --------------------------------------------------------------------------
    // Tick
    // --------------------------------------------------------------------------

    /// Computes and applies this tick's suspension and friction impulses.
    /// Must be called before the physics step.
    pub fn update<W: VehicleWorld + ?Sized>(
        &mut self,
        world: &mut W,
        dt: Real,
    ) -> Result<(), VehicleError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(VehicleError::InvalidTimeStep(dt));
        }
        let chassis = world
            .chassis_state(self.chassis)
            .ok_or(VehicleError::ChassisNotFound(self.chassis))?;

        self.phase = match self.phase {
            ControllerPhase::Uninitialized => ControllerPhase::Uninitialized,
            _ => ControllerPhase::Running,
        };

        let forward_ws = chassis.pose.rotation * self.axes.forward_local();
        self.current_vehicle_speed = chassis.linvel.dot(&forward_ws);

        self.impulses.clear();
        self.update_suspension(world, &chassis, dt);
        self.update_friction(world, &chassis, &forward_ws, dt);
        self.update_roll(&chassis, &forward_ws, dt);

        self.impulses.sort_by_key(|p| p.wheel);
        for p in self.impulses.drain(..) {
            world.apply_impulse_at_point(self.chassis, p.impulse, p.point);
        }

        Ok(())
    }

    fn update_suspension<W: VehicleWorld + ?Sized>(
        &mut self,
        world: &W,
        chassis: &ChassisState,
        dt: Real,
    ) {
        for (i, (config, state)) in self.configs.iter().zip(self.states.iter_mut()).enumerate() {
            let cast = cast_suspension(world, self.chassis, chassis, config);
            state.suspension_length = cast.suspension_length;
            state.contact = cast.contact;

            state.suspension_force = match &state.contact {
                WheelContact::Contact(info) => {
                    let force = compute_suspension_force(
                        config,
                        state.suspension_length,
                        state.previous_suspension_length,
                        dt,
                        chassis.mass,
                    );
                    let force = finite_or_zero(force, "suspension force", i);
                    if force > 0.0 {
                        self.impulses.push(PendingImpulse {
                            wheel: i,
                            impulse: info.normal * (force * dt),
                            point: info.point,
                        });
                    }
                    force
                }
                WheelContact::NoContact => 0.0,
            };

            state.previous_suspension_length = state.suspension_length;
        }
    }

    fn update_friction<W: VehicleWorld + ?Sized>(
        &mut self,
        world: &W,
        chassis: &ChassisState,
        forward_ws: &Vector<Real>,
        dt: Real,
    ) {
        let wheels_on_ground = self.num_wheels_on_ground();
        let up_local = self.axes.up_local();

        for (i, (config, state)) in self.configs.iter().zip(self.states.iter_mut()).enumerate() {
            let Some(info) = state.contact.info().copied() else {
                let out = FrictionOutput::default();
                state.forward_impulse = out.forward_impulse;
                state.side_impulse = out.side_impulse;
                state.skid = out.skid;
                state.sliding = out.sliding;
                continue;
            };

            let axle_ws = chassis.pose.rotation * steered_axle(config, &up_local, state.steering);
            let Some(basis) = FrictionBasis::new(&axle_ws, &info.normal, forward_ws) else {
                debug!("wheel {i}: axle aligned with contact normal, no friction this tick");
                state.forward_impulse = 0.0;
                state.side_impulse = 0.0;
                state.skid = 0.0;
                state.sliding = false;
                continue;
            };

            let input = FrictionInput {
                forward_velocity: info.relative_velocity.dot(&basis.forward),
                side_velocity: info.relative_velocity.dot(&basis.side),
                forward_mass: effective_mass(world.impulse_denominator(
                    self.chassis,
                    info.point,
                    basis.forward,
                )),
                side_mass: effective_mass(world.impulse_denominator(
                    self.chassis,
                    info.point,
                    basis.side,
                )),
                engine_force: state.engine_force,
                brake: state.brake,
                normal_force: state.suspension_force,
                wheels_on_ground,
                dt,
            };
            let out = solve_friction(config, &input);

            state.forward_impulse = finite_or_zero(out.forward_impulse, "forward impulse", i);
            state.side_impulse = finite_or_zero(out.side_impulse, "side impulse", i);
            state.skid = finite_or_zero(out.skid, "skid", i);
            state.sliding = out.sliding;

            if state.forward_impulse != 0.0 {
                self.impulses.push(PendingImpulse {
                    wheel: i,
                    impulse: basis.forward * state.forward_impulse,
                    point: info.point,
                });
            }
            if state.side_impulse != 0.0 {
                // roll_influence 0 → wheel center, 1 → ground contact
                let center = SuspensionRay::new(config, &chassis.pose)
                    .wheel_center(state.suspension_length);
                let point = center + (info.point - center) * config.roll_influence;
                self.impulses.push(PendingImpulse {
                    wheel: i,
                    impulse: basis.side * state.side_impulse,
                    point,
                });
            }
        }
    }

    fn update_roll(&mut self, chassis: &ChassisState, forward_ws: &Vector<Real>, dt: Real) {
        for (i, (config, state)) in self.configs.iter().zip(self.states.iter_mut()).enumerate() {
            if let Some(info) = state.contact.info() {
                let hardpoint = chassis.pose * config.chassis_connection_point;
                let fwd = forward_ws - info.normal * info.normal.dot(forward_ws);
                let proj = fwd.dot(&chassis.velocity_at_point(&hardpoint));
                state.delta_rotation = finite_or_zero(proj * dt / config.radius, "roll delta", i);
            }

            if let Some(speed) = config.custom_sliding_rotational_speed {
                let spinning = state.sliding || !state.is_in_contact();
                if spinning && state.engine_force != 0.0 {
                    state.delta_rotation = state.engine_force.signum() * speed * dt;
                }
            }

            state.rotation = (state.rotation + state.delta_rotation) % std::f32::consts::TAU;
            state.delta_rotation *= ROLL_DECAY;
        }
    }

    // --------------------------------------------------------------------------
    // Transforms (after the physics step)
    // --------------------------------------------------------------------------

    /// Pure wheel pose for an arbitrary chassis pose.
    pub fn wheel_world_transform(
        &self,
        index: usize,
        chassis_pose: &Isometry<Real>,
    ) -> Result<Isometry<Real>, VehicleError> {
        self.check_index(index)?;
        let (config, state) = (&self.configs[index], &self.states[index]);
        Ok(wheel_world_transform(
            chassis_pose,
            config,
            &self.axes.up_local(),
            state.suspension_length,
            state.steering,
            state.rotation,
        ))
    }

    /// Stores every wheel's world pose from the chassis' current (integrated) pose.
    pub fn sync_wheel_transforms<W: VehicleWorld + ?Sized>(
        &mut self,
        world: &W,
    ) -> Result<(), VehicleError> {
        let pose = world
            .chassis_state(self.chassis)
            .ok_or(VehicleError::ChassisNotFound(self.chassis))?
            .pose;
        let up_local = self.axes.up_local();

        for (config, state) in self.configs.iter().zip(self.states.iter_mut()) {
            state.world_transform = wheel_world_transform(
                &pose,
                config,
                &up_local,
                state.suspension_length,
                state.steering,
                state.rotation,
            );
        }
        Ok(())
    }
}
