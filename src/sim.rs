// ==============================================================================
// sim.rs — ONE PHYSICS WORLD + EVERY PLAYER'S RAYCAST VEHICLE
// ------------------------------------------------------------------------------
// Tick order (fixed):
//   1) each vehicle: latest DriverInput → wheels (drivetrain layout)
//   2) each vehicle: controller.update()   (queues impulses on its chassis)
//   3) world.step()                        (rapier integrates everything)
//   4) each vehicle: sync_wheel_transforms()
// Vehicles are kept in a BTreeMap so the update order is stable tick to tick.
// ==============================================================================

use std::collections::BTreeMap;

use log::{info, warn};
use rapier3d::prelude::*;

use crate::config::ServerConfig;
use crate::error::VehicleError;
use crate::physics::PhysicsWorld;
use crate::state::{ServerMessage, TransformSnapshot, VehicleSnapshot, WheelSnapshot};
use crate::vehicle::{DriverInput, VehicleController, VehicleWorld};

pub struct PlayerVehicle {
    pub controller: VehicleController,
    pub input: DriverInput, // latest snapshot from the client
    pub slot: usize,        // spawn lane
}

pub struct Simulation {
    pub world: PhysicsWorld,
    config: ServerConfig,
    vehicles: BTreeMap<String, PlayerVehicle>,
    tick: u64,
}

impl Simulation {
    pub fn new(config: ServerConfig) -> Self {
        let world = PhysicsWorld::from_config(&config.world);
        Self {
            world,
            config,
            vehicles: BTreeMap::new(),
            tick: 0,
        }
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    #[inline]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn vehicle(&self, id: &str) -> Option<&PlayerVehicle> {
        self.vehicles.get(id)
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    fn free_slot(&self) -> usize {
        (0..)
            .find(|slot| self.vehicles.values().all(|v| v.slot != *slot))
            .unwrap_or(self.vehicles.len())
    }

    fn spawn_pose(&self, slot: usize) -> Isometry<Real> {
        let spawn = &self.config.spawn;
        let [x, y, z] = spawn.origin;
        Isometry::new(
            vector![x, y, z - slot as Real * spawn.spacing],
            vector![0.0, spawn.yaw_degrees.to_radians(), 0.0],
        )
    }

    /// Creates a chassis + controller for `id` from the configured preset.
    /// Re-spawning an existing id replaces its vehicle.
    pub fn spawn_vehicle(&mut self, id: &str) -> Result<RigidBodyHandle, VehicleError> {
        self.despawn_vehicle(id);

        let slot = self.free_slot();
        let pose = self.spawn_pose(slot);
        let preset = &self.config.vehicle;

        let chassis = self.world.spawn_chassis(&preset.chassis, pose);
        let built = VehicleController::new(chassis, preset.axes).and_then(|mut controller| {
            for wheel in &preset.wheels {
                controller.add_wheel(*wheel)?;
            }
            Ok(controller)
        });
        let controller = match built {
            Ok(controller) => controller,
            Err(err) => {
                self.world.remove_body(chassis);
                return Err(err);
            }
        };

        self.vehicles.insert(
            id.to_string(),
            PlayerVehicle {
                controller,
                input: DriverInput::default(),
                slot,
            },
        );

        info!(
            "🚗 Spawned vehicle for player {} in slot {} (body = {:?})",
            id, slot, chassis
        );
        Ok(chassis)
    }

    pub fn despawn_vehicle(&mut self, id: &str) -> bool {
        match self.vehicles.remove(id) {
            Some(vehicle) => {
                self.world.remove_body(vehicle.controller.chassis());
                info!("🗑️ Despawned vehicle for player {}", id);
                true
            }
            None => false,
        }
    }

    /// Stores the latest input for `id`. Returns false for unknown players.
    pub fn set_input(&mut self, id: &str, input: DriverInput) -> bool {
        match self.vehicles.get_mut(id) {
            Some(vehicle) => {
                vehicle.input = input.sanitized();
                true
            }
            None => false,
        }
    }

    pub fn tick(&mut self, dt: Real) -> Result<(), VehicleError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(VehicleError::InvalidTimeStep(dt));
        }
        let layout = &self.config.vehicle.drivetrain;

        // 1 + 2) inputs, suspension, friction
        for (id, vehicle) in self.vehicles.iter_mut() {
            let result = vehicle
                .controller
                .apply_input(layout, &vehicle.input)
                .and_then(|_| vehicle.controller.update(&mut self.world, dt));
            if let Err(err) = result {
                warn!("⚠️ vehicle {id} skipped this tick: {err}");
            }
        }

        // 3) integrate
        self.world.step(dt);

        // 4) publish wheel poses
        for (id, vehicle) in self.vehicles.iter_mut() {
            if let Err(err) = vehicle.controller.sync_wheel_transforms(&self.world) {
                warn!("⚠️ vehicle {id}: wheel transforms not updated: {err}");
            }
        }

        self.tick += 1;
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<VehicleSnapshot> {
        self.vehicles
            .iter()
            .filter_map(|(id, vehicle)| {
                let chassis = self.world.chassis_state(vehicle.controller.chassis())?;
                let wheels = vehicle
                    .controller
                    .wheels()
                    .map(|(_, state)| {
                        let t = TransformSnapshot::from(&state.world_transform);
                        WheelSnapshot {
                            position: t.position,
                            rotation: t.rotation,
                            contact: state.is_in_contact(),
                            suspension_length: state.suspension_length,
                            suspension_force: state.suspension_force,
                            skid: state.skid,
                        }
                    })
                    .collect();

                Some(VehicleSnapshot {
                    id: id.clone(),
                    chassis: TransformSnapshot::from(&chassis.pose),
                    speed_kmh: vehicle.controller.current_speed_km_hour(),
                    wheels,
                })
            })
            .collect()
    }

    pub fn snapshot_message(&self) -> ServerMessage {
        ServerMessage::Snapshot {
            tick: self.tick,
            vehicles: self.snapshot(),
        }
    }
}
