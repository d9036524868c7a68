// ==============================================================================
// raycast_vehicle — raycast vehicle controller on rapier3d + headless server
// ------------------------------------------------------------------------------
// vehicle/   suspension, friction, drivetrain, wheel transforms (engine-agnostic)
// physics    rapier3d world implementing the controller's VehicleWorld seam
// sim        one world + one vehicle per player, fixed tick order
// config     JSON server config and vehicle presets
// state/net  websocket clients and the snapshot wire format
// ==============================================================================

pub mod config;
pub mod error;
pub mod net;
pub mod physics;
pub mod sim;
pub mod state;
pub mod vehicle;

pub use error::{ConfigError, VehicleError};
