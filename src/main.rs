use axum::{routing::get, Router};
use std::{env, net::SocketAddr, sync::Arc};
use log::{debug, info};
use simplelog::*;
mod actor;
mod controllers;
mod errors;
mod logic;
mod models;
mod protocol;
mod relay;
mod store;
use crate::relay::Relay;
use crate::store::BattleStore;

// Shared immutable state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<BattleStore>,
    pub relay: Relay,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {

    // set up tracing facility
    let _ = SimpleLogger::init(LevelFilter::Debug, Config::default());
    info!("Starting..");

    // battles and relay channels live in memory only
    let state = AppState {
        store: Arc::new(BattleStore::new()),
        relay: Relay::new(),
    };

    // Define routes
    let app = Router::new()
        .route("/api/create-battle", get(controllers::battle::create_battle))
        .route("/ws/battle/:address", get(controllers::battle::ws_battle))
        .with_state(state);

    // Start the server
    let addr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse::<SocketAddr>()?;
    debug!("Listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())

}
