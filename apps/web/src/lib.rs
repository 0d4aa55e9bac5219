//! Forecast wizard web application: upload, historical review, scenario
//! editing, simulation and the final report.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod views;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::create_router;
pub use state::AppState;

use axum::Router;
use std::sync::Arc;

/// Build the shared state and the full router for `config`.
pub fn build_app(config: Config) -> anyhow::Result<Router> {
    let state = Arc::new(AppState::new(config)?);
    Ok(create_router(state))
}
