//! Process entry point: loads configuration, builds the engine,
//! registry and orchestrator, and serves the websocket transport
//! (SPEC_FULL §6.2).
//!
//! Grounded on the teacher's `main.rs` (tracing-subscriber registry
//! setup, an axum router over one upgrade route, a watchdog task) —
//! generalized from "serve an arbitrary number of named, reloadable
//! game rooms" to "run exactly one authoritative match per process"
//! (SPEC_FULL §1's explicit non-goal on matchmaking).

mod config_loader;
mod connection;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use engine::Engine;
use orchestrator::{MatchOutcome, Orchestrator, OrchestratorHandle};
use protocol::{GameSettings, ServerConfig};
use registry::Registry;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Shared handles every connection task needs: the seat directory, the
/// handle used to feed the single-consumer orchestrator inbox, and the
/// most recently loaded configuration (re-readable via `/reload`).
///
/// Since this process hosts exactly one game for its lifetime (SPEC_FULL
/// §1's matchmaking Non-goal), a reload can never re-seed the match
/// already in flight; it only refreshes what `/status` and any future
/// process restart would see, mirroring the teacher's `reload_config`
/// contract without violating the one-game-per-process model.
pub struct ServerState {
    registry: Arc<Registry>,
    handle: OrchestratorHandle,
    config_path: PathBuf,
    arena_path: Option<PathBuf>,
    config: RwLock<ServerConfig>,
}

/// Command-line surface: the JSON config file and an optional arena
/// text map that overrides its `mapConfig` (SPEC_FULL §6.3).
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "GameConfig.json")]
    config: PathBuf,

    #[arg(long)]
    arena: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    let cli = Cli::parse();
    let config = match config_loader::load(&cli.config, cli.arena.as_deref()).await {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "failed to load configuration");
            std::process::exit(1);
        }
    };

    tracing::info!(port = config.port, protocol_version = config.protocol_version, "configuration loaded");

    let settings = settings_from_config(&config);
    let registry = Arc::new(Registry::new());
    let game_engine = Engine::new(settings);
    let (orchestrator, handle) = Orchestrator::new(game_engine, registry.clone(), config.stall_round_limit);

    let (done_tx, done_rx) = oneshot::channel::<MatchOutcome>();
    let match_task = tokio::spawn(async move {
        let outcome = orchestrator.run().await;
        let _ = done_tx.send(outcome.clone());
        outcome
    });

    let state = Arc::new(ServerState {
        registry,
        handle: handle.clone(),
        config_path: cli.config.clone(),
        arena_path: cli.arena.clone(),
        config: RwLock::new(config.clone()),
    });

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .route("/status", get(status_handler))
        .route("/reload", get(reload_handler))
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, port = config.port, "failed to bind listening socket");
            std::process::exit(1);
        }
    };
    tracing::info!(port = config.port, "listening for players");

    if let Err(error) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(handle, done_rx))
        .await
    {
        tracing::error!(%error, "server loop exited with an error");
    }

    match match_task.await {
        Ok(outcome) => {
            tracing::info!(winner = ?outcome.winner_id, rounds = outcome.deltas.len(), "match finished");
        }
        Err(error) => {
            tracing::error!(%error, "orchestrator task panicked");
        }
    }
}

fn settings_from_config(config: &ServerConfig) -> GameSettings {
    GameSettings {
        dimension: config.map_config.dimension,
        walls: config.map_config.walls.clone(),
        potential_base_locations: config.map_config.potential_base_locations.clone(),
        turn_time_limit_ms: config.turn_time_limit_ms,
        food_scarcity: config.food_scarcity,
        fog_of_war: config.fog_of_war,
    }
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_socket(socket, state))
}

/// A point-in-time JSON snapshot of the match's progress.
async fn status_handler(State(state): State<Arc<ServerState>>) -> axum::Json<orchestrator::StatusSnapshot> {
    axum::Json(state.handle.status().await)
}

/// Re-reads the configuration file (and arena map, if one was given on
/// the command line) without restarting the process, mirroring the
/// teacher's `/reload` endpoint. Does not affect the match already in
/// flight (SPEC_FULL §6.2) — only the stored configuration snapshot.
async fn reload_handler(State(state): State<Arc<ServerState>>) -> String {
    match config_loader::load(&state.config_path, state.arena_path.as_deref()).await {
        Ok(new_config) => {
            let summary = format!(
                "port={} protocolVersion={} turnTimeLimit={}ms foodScarcity={} stallRoundLimit={}",
                new_config.port,
                new_config.protocol_version,
                new_config.turn_time_limit_ms,
                new_config.food_scarcity,
                new_config.stall_round_limit,
            );
            *state.config.write().await = new_config;
            summary
        }
        Err(error) => format!("config reload failed: {}", error),
    }
}

/// Resolves once the process should begin graceful shutdown: either an
/// OS interrupt (SPEC_FULL §5's cooperative shutdown flag) or the match
/// finishing on its own (SPEC_FULL §4.3.1's `END_GAME` exit path).
async fn shutdown_signal(handle: OrchestratorHandle, done_rx: oneshot::Receiver<MatchOutcome>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("interrupt received, requesting cooperative shutdown");
            handle.request_shutdown().await;
        }
        _ = done_rx => {
            tracing::info!("match finished, shutting down transport");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{Dimension, MapConfig, Position};

    fn sample_config() -> ServerConfig {
        ServerConfig {
            port: 9000,
            map_config: MapConfig {
                dimension: Dimension { width: 8, height: 8 },
                walls: vec![Position::new(3, 3)],
                potential_base_locations: vec![Position::new(0, 0), Position::new(7, 7)],
            },
            turn_time_limit_ms: 5_000,
            protocol_version: 1,
            food_scarcity: 0.9,
            fog_of_war: false,
            stall_round_limit: 1_000,
        }
    }

    #[test]
    fn settings_from_config_carries_every_map_and_rule_field() {
        let config = sample_config();
        let settings = settings_from_config(&config);
        assert_eq!(settings.dimension, config.map_config.dimension);
        assert_eq!(settings.walls, config.map_config.walls);
        assert_eq!(
            settings.potential_base_locations,
            config.map_config.potential_base_locations
        );
        assert_eq!(settings.turn_time_limit_ms, config.turn_time_limit_ms);
        assert_eq!(settings.food_scarcity, config.food_scarcity);
        assert_eq!(settings.fog_of_war, config.fog_of_war);
    }
}
