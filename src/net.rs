// ==============================================================================
// net.rs — WEBSOCKET SESSIONS
// ------------------------------------------------------------------------------
// One task per connection:
//   1) outgoing channel registered in SharedGameState (the tick loop
//      broadcasts snapshots into it), drained by a dedicated send task
//   2) vehicle spawned in the Simulation under a fresh uuid
//   3) receive loop: "input" → latest DriverInput, "ping" → "pong"
//   4) on disconnect: vehicle + client removed
// Malformed messages are logged at debug and ignored.
// ==============================================================================

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use rapier3d::prelude::Real;
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use uuid::Uuid;

use crate::sim::Simulation;
use crate::state::{ServerMessage, SharedGameState};
use crate::vehicle::DriverInput;

/// Everything a client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Input {
        #[serde(default)]
        throttle: Real,
        #[serde(default)]
        steer: Real,
        #[serde(default)]
        brake: Real,
    },
    Ping,
}

impl ClientMessage {
    pub fn from_json(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(msg) => Some(msg),
            Err(err) => {
                debug!("ignoring malformed client message ({err}): {text}");
                None
            }
        }
    }
}

pub async fn start_websocket_server(
    bind_addr: &str,
    state: Arc<Mutex<SharedGameState>>,
    sim: Arc<Mutex<Simulation>>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!("🌐 WebSocket listening on ws://{}", listener.local_addr()?);

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!("accept failed: {err}");
                continue;
            }
        };
        debug!("incoming connection from {peer}");

        tokio::spawn(handle_connection(raw, Arc::clone(&state), Arc::clone(&sim)));
    }
}

fn send(tx: &mpsc::UnboundedSender<String>, msg: &ServerMessage) {
    match msg.to_json() {
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(err) => warn!("could not serialize {msg:?}: {err}"),
    }
}

async fn handle_connection(
    raw: TcpStream,
    state: Arc<Mutex<SharedGameState>>,
    sim: Arc<Mutex<Simulation>>,
) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!("websocket handshake failed: {err}");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing message channel + send-loop task
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // -------------------------------
    // 2) Vehicle for this player
    // -------------------------------
    let player_id = Uuid::new_v4().to_string();
    if let Err(err) = sim.lock().await.spawn_vehicle(&player_id) {
        warn!("could not spawn vehicle for {player_id}: {err}");
        return;
    }
    state.lock().await.register_client(&player_id, tx.clone());

    info!("🟢 Player connected: {}", player_id);
    send(
        &tx,
        &ServerMessage::Welcome {
            player_id: player_id.clone(),
        },
    );

    // -------------------------------
    // 3) Main receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };
        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else {
            continue;
        };

        match ClientMessage::from_json(text) {
            Some(ClientMessage::Ping) => send(&tx, &ServerMessage::Pong),
            Some(ClientMessage::Input {
                throttle,
                steer,
                brake,
            }) => {
                sim.lock()
                    .await
                    .set_input(&player_id, DriverInput::new(throttle, steer, brake));
            }
            None => {}
        }
    }

    // -------------------------------
    // 4) Cleanup
    // -------------------------------
    info!("🔴 Player disconnected: {}", player_id);
    state.lock().await.remove_client(&player_id);
    sim.lock().await.despawn_vehicle(&player_id);
}
