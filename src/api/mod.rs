//! HTTP API module - REST endpoints

mod auth;

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::auth::accounts::AccountService;
use crate::auth::store::UserStore;
use crate::config::Config;
use crate::db::Database;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub accounts: AccountService,
    pub session_ttl_secs: u64,
}

/// Build the API router
pub fn router(db: Arc<Database>, config: &Config) -> Router {
    let store = UserStore::new(db.pool().clone());
    let accounts = AccountService::new(store, config.min_credential_len);

    let state = AppState {
        db,
        accounts,
        session_ttl_secs: config.session_ttl_secs,
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(auth::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Root endpoint
async fn root() -> impl IntoResponse {
    Json(RootResponse {
        name: "authd",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "ok",
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy",
                database: "error",
            }),
        ),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}
