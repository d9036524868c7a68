use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};

use raycast_vehicle::config::ServerConfig;
use raycast_vehicle::net::start_websocket_server;
use raycast_vehicle::sim::Simulation;
use raycast_vehicle::state::SharedGameState;

/// Headless raycast-vehicle server: one car per websocket client.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON config file (defaults are used for anything it leaves out)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the websocket bind address, e.g. 0.0.0.0:9001
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the fixed simulation rate
    #[arg(long)]
    tick_hz: Option<u32>,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn load_config(args: &Args) -> Result<ServerConfig, raycast_vehicle::ConfigError> {
    let mut config = match &args.config {
        Some(path) => {
            info!("📄 Loading config from {}", path.display());
            ServerConfig::load(path)?
        }
        None => ServerConfig::default(),
    };

    if let Some(bind) = &args.bind {
        config.bind_addr = bind.clone();
    }
    if let Some(tick_hz) = args.tick_hz {
        config.tick_hz = tick_hz;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("❌ {err}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "🚀 Starting raycast vehicle server ({} Hz, {} wheels per car)",
        config.tick_hz,
        config.vehicle.wheels.len()
    );

    let dt = config.dt();
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(Mutex::new(SharedGameState::new()));
    let sim = Arc::new(Mutex::new(Simulation::new(config)));

    // Start WebSocket server
    let server = {
        let state = Arc::clone(&state);
        let sim = Arc::clone(&sim);
        tokio::spawn(async move {
            if let Err(err) = start_websocket_server(&bind_addr, state, sim).await {
                error!("❌ WebSocket server stopped: {err}");
            }
        })
    };

    // Fixed timestep
    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if server.is_finished() {
            return ExitCode::FAILURE;
        }

        let snapshot = {
            let mut sim = sim.lock().await;
            if let Err(err) = sim.tick(dt) {
                warn!("⚠️ tick skipped: {err}");
                continue;
            }
            sim.snapshot_message()
        };

        match snapshot.to_json() {
            Ok(json) => state.lock().await.broadcast(&json),
            Err(err) => warn!("⚠️ snapshot not serialized: {err}"),
        }
    }
}
