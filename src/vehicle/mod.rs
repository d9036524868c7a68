// ==============================================================================
// vehicle — RAYCAST VEHICLE (SUSPENSION + DRIVETRAIN) ON TOP OF A RIGID BODY
// ------------------------------------------------------------------------------
// Wheels are not bodies. Each one is a ray probe hanging off the chassis:
//   raycast.rs    — ground contact + suspension length
//   suspension.rs — spring-damper force along the contact normal
//   friction.rs   — forward (engine/brake) + lateral impulses, friction circle
//   drivetrain.rs — driver input snapshot → per-wheel steer/engine/brake
//   transform.rs  — wheel world pose from chassis pose
//   controller.rs — runs all of the above once per tick
//   world.rs      — the trait the controller uses to talk to the physics engine
// ==============================================================================

pub mod controller;
pub mod drivetrain;
pub mod friction;
pub mod raycast;
pub mod suspension;
pub mod transform;
pub mod types;
pub mod world;

#[cfg(test)]
pub(crate) mod test_world;

pub use controller::{ControllerPhase, VehicleController};
pub use drivetrain::{DriverInput, DrivetrainLayout};
pub use types::{ChassisAxes, ContactInfo, WheelConfig, WheelContact, WheelState};
pub use world::{ChassisState, RayHit, VehicleWorld};
