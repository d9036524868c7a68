// ==============================================================================
// state.rs — CONNECTED CLIENTS + WIRE SNAPSHOT TYPES
// ------------------------------------------------------------------------------
// SharedGameState only tracks who is connected and how to reach them (one
// unbounded sender per client, drained by that client's send task).
// The snapshot structs are the JSON the tick loop broadcasts after each step.
// ==============================================================================

use std::collections::HashMap;

use log::debug;
use rapier3d::prelude::{Isometry, Real};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformSnapshot {
    pub position: [Real; 3],
    pub rotation: [Real; 4], // x, y, z, w
}

impl From<&Isometry<Real>> for TransformSnapshot {
    fn from(iso: &Isometry<Real>) -> Self {
        let t = iso.translation.vector;
        let q = iso.rotation;
        Self {
            position: [t.x, t.y, t.z],
            rotation: [q.i, q.j, q.k, q.w],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelSnapshot {
    pub position: [Real; 3],
    pub rotation: [Real; 4],
    pub contact: bool,
    pub suspension_length: Real,
    pub suspension_force: Real,
    pub skid: Real,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: String,
    pub chassis: TransformSnapshot,
    pub speed_kmh: Real,
    pub wheels: Vec<WheelSnapshot>,
}

/// Everything the server sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Welcome { player_id: String },
    Pong,
    Snapshot { tick: u64, vehicles: Vec<VehicleSnapshot> },
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Default)]
pub struct SharedGameState {
    pub clients: HashMap<String, UnboundedSender<String>>, // player id → outgoing queue
}

impl SharedGameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_client(&mut self, player_id: &str, tx: UnboundedSender<String>) {
        self.clients.insert(player_id.to_string(), tx);
    }

    pub fn remove_client(&mut self, player_id: &str) {
        self.clients.remove(player_id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Sends `json` to every client; clients whose send task is gone are dropped.
    pub fn broadcast(&mut self, json: &str) {
        self.clients.retain(|id, tx| {
            let alive = tx.send(json.to_string()).is_ok();
            if !alive {
                debug!("dropping closed client {id}");
            }
            alive
        });
    }
}
