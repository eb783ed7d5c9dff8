//! Documentation of a nearby-restaurant roulette.
//!
//! Can't decide where to eat? Find every restaurant within walking distance, spin, go.
//!
//!
//!
//! # General Flow
//! - Client asks the server to locate it, either with its own browser fix in the body or with an empty body so
//!   the server falls back to an IP lookup
//! - Server searches the Kakao Local category API (restaurants, 500 m radius) around that point
//! - Results are projected as markers on a headless map scene the frontend polls and draws
//! - Client hits the spin button, the server animates the highlight across the markers and lands on a random one
//! - A callout with the winner's name and category opens once the map settles
//!
//!
//!
//! # Endpoints
//!
//! | Method | Path | |
//! |---|---|---|
//! | POST | `/locate` | body `{latitude, longitude}`, `{error: "denied" \| "unavailable" \| "timeout"}` or empty |
//! | POST | `/search` | search again around the current center |
//! | POST | `/spin` | start a spin, ignored while one is running or with no places |
//! | POST | `/spin/cancel` | |
//! | GET | `/status` | spin phase, winner |
//! | GET | `/scene` | everything the frontend draws: center, markers, callout, notice |
//! | POST | `/map/click` | close the callout |
//! | POST | `/markers/{id}/click` | open the callout for place `id` |
//!
//!
//!
//! # Notes
//!
//! ## Single session
//! The server holds exactly one map scene and one roulette. It is meant to sit behind a single frontend
//! (a kiosk, a team's lunch page), not to serve many independent users.
//!
//! ## Spin timing
//! Defaults: 20 to 29 steps, 50 ms apart, each of the last 8 steps 15 ms slower than the one before, callout
//! 500 ms after landing. A spin takes roughly 1.4 to 2.2 seconds.
//!
//! ## Provider paging
//! We cap at 5 pages of 15. Kakao itself stops at 45 documents for category search, so 3 pages is the usual
//! ceiling.
//!
//!
//!
//! # Setup
//!
//! Kakao REST key as a secret (or `KAKAO_REST_KEY` in the environment).
//! ```sh
//! echo "<key>" | docker secret create KAKAO_REST_KEY -
//! ```
//!
//! Run locally.
//! ```sh
//! KAKAO_REST_KEY=<key> RUST_LOG=info cargo run -p backend
//! ```
//!
//! One-off search from the terminal.
//! ```sh
//! KAKAO_REST_KEY=<key> cargo run -p scout -- --latitude 37.5665 --longitude 126.978 --spin
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::time::Duration;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod category;
pub mod config;
pub mod controller;
pub mod error;
pub mod geoip;
pub mod location;
pub mod map;
pub mod notice;
pub mod projection;
pub mod roulette;
pub mod routes;
pub mod scene;
pub mod session;
pub mod state;
pub mod utils;

use config::Config;
use error::AppError;
use routes::{
    cancel_handler, locate_handler, map_click_handler, marker_click_handler, scene_handler,
    search_handler, spin_handler, status_handler,
};
use state::State;

pub async fn start_server() -> Result<(), AppError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config)?;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/locate", post(locate_handler))
        .route("/search", post(search_handler))
        .route("/spin", post(spin_handler))
        .route("/spin/cancel", post(cancel_handler))
        .route("/status", get(status_handler))
        .route("/scene", get(scene_handler))
        .route("/map/click", post(map_click_handler))
        .route("/markers/{id}/click", post(marker_click_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| AppError::InternalError(e.into()))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::InternalError(e.into()))?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
