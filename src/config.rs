// ==============================================================================
// config.rs — SERVER + VEHICLE PRESET CONFIGURATION
// ------------------------------------------------------------------------------
// Everything tunable lives here and is loaded from one JSON file:
//   • network (bind address) and fixed tick rate
//   • world (gravity, ground slab, static/dynamic obstacles)
//   • spawn layout for new players
//   • the vehicle preset: chassis box, axes, wheels, drivetrain layout
// Every struct is #[serde(default)], so a config file only needs the fields
// it changes. Defaults reproduce the demo car.
// ==============================================================================

use std::path::Path;

use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::vehicle::{ChassisAxes, DrivetrainLayout, WheelConfig};

// --------------------------------------------------
// Chassis rigid body
// --------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisSpec {
    pub half_extents: [Real; 3],
    pub mass: Real,           // kg, set on the collider
    pub linear_damping: Real,
    pub angular_damping: Real,
    pub friction: Real,       // body-on-ground friction, wheels don't use it
}

impl Default for ChassisSpec {
    fn default() -> Self {
        Self {
            half_extents: [1.0, 0.25, 0.5],
            mass: 120.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            friction: 0.0,
        }
    }
}

// --------------------------------------------------
// Vehicle preset
// --------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehiclePreset {
    pub chassis: ChassisSpec,
    pub axes: ChassisAxes,
    pub wheels: Vec<WheelConfig>,
    pub drivetrain: DrivetrainLayout,
}

const TIRE_WIDTH: Real = 0.2;

impl Default for VehiclePreset {
    // front-left, front-right, rear-left, rear-right
    fn default() -> Self {
        let chassis = ChassisSpec::default();
        let half_width = chassis.half_extents[2];
        let (front, rear, height): (Real, Real, Real) = (0.7, -0.9, -0.38);
        let side = half_width - TIRE_WIDTH;

        let wheel = WheelConfig::default();
        let wheels = vec![
            wheel.at([front, height, side].into()),
            wheel.at([front, height, -side].into()),
            wheel.at([rear, height, side].into()),
            wheel.at([rear, height, -side].into()),
        ];

        Self {
            chassis,
            axes: ChassisAxes::default(),
            wheels,
            drivetrain: DrivetrainLayout::default(),
        }
    }
}

impl VehiclePreset {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [hx, hy, hz] = self.chassis.half_extents;
        if !(hx > 0.0 && hy > 0.0 && hz > 0.0) {
            return Err(invalid("vehicle.chassis.half_extents", "must all be > 0"));
        }
        if !(self.chassis.mass.is_finite() && self.chassis.mass > 0.0) {
            return Err(invalid("vehicle.chassis.mass", "must be finite and > 0"));
        }

        self.axes.validate()?;
        if self.wheels.is_empty() {
            return Err(invalid("vehicle.wheels", "at least one wheel is required"));
        }
        for wheel in &self.wheels {
            wheel.validate()?;
        }

        if let Some(max) = self.drivetrain.max_wheel_index() {
            if max >= self.wheels.len() {
                return Err(invalid(
                    "vehicle.drivetrain",
                    format!(
                        "references wheel {max} but the preset has {} wheels",
                        self.wheels.len()
                    ),
                ));
            }
        }
        Ok(())
    }
}

// --------------------------------------------------
// World
// --------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleSpec {
    pub half_extents: [Real; 3],
    pub position: [Real; 3],
    pub yaw_degrees: Real,
    /// Dynamic obstacles can be pushed around (and driven over).
    pub dynamic: bool,
    pub mass: Real,
}

impl Default for ObstacleSpec {
    fn default() -> Self {
        Self {
            half_extents: [2.5, 2.5, 2.5],
            position: [6.0, 0.0, -2.0],
            yaw_degrees: 60.0,
            dynamic: false,
            mass: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: [Real; 3],
    /// Ground slab half extents; its top face sits at y = 0.
    pub ground_half_extents: [Real; 3],
    pub ground_friction: Real,
    pub obstacles: Vec<ObstacleSpec>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            ground_half_extents: [100.0, 0.1, 100.0],
            ground_friction: 1.2,
            obstacles: vec![ObstacleSpec::default()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub origin: [Real; 3],
    /// Players are lined up along -z, this far apart.
    pub spacing: Real,
    /// Initial heading about +y, in degrees.
    pub yaw_degrees: Real,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            origin: [0.0, 4.0, 0.0],
            spacing: 4.0,
            yaw_degrees: 90.0,
        }
    }
}

// --------------------------------------------------
// Server
// --------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub tick_hz: u32,
    pub world: WorldConfig,
    pub spawn: SpawnConfig,
    pub vehicle: VehiclePreset,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9001".to_string(),
            tick_hz: 60,
            world: WorldConfig::default(),
            spawn: SpawnConfig::default(),
            vehicle: VehiclePreset::default(),
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.into(),
    }
}

impl ServerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    #[inline]
    pub fn dt(&self) -> Real {
        1.0 / self.tick_hz as Real
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 || self.tick_hz > 1_000 {
            return Err(invalid("tick_hz", format!("must be within 1..=1000, got {}", self.tick_hz)));
        }
        if self.bind_addr.trim().is_empty() {
            return Err(invalid("bind_addr", "must not be empty"));
        }
        if self.world.gravity.iter().any(|g| !g.is_finite()) {
            return Err(invalid("world.gravity", "must be finite"));
        }
        if self.world.ground_half_extents.iter().any(|h| !(*h > 0.0)) {
            return Err(invalid("world.ground_half_extents", "must all be > 0"));
        }
        for (i, obstacle) in self.world.obstacles.iter().enumerate() {
            if obstacle.half_extents.iter().any(|h| !(*h > 0.0)) {
                return Err(invalid(
                    &format!("world.obstacles[{i}].half_extents"),
                    "must all be > 0",
                ));
            }
            if obstacle.dynamic && !(obstacle.mass > 0.0) {
                return Err(invalid(&format!("world.obstacles[{i}].mass"), "must be > 0"));
            }
        }
        if !(self.spawn.spacing.is_finite() && self.spawn.spacing >= 0.0) {
            return Err(invalid("spawn.spacing", "must be finite and >= 0"));
        }
        self.vehicle.validate()
    }
}
