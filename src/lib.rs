pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
}

pub fn create_app(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: String,
    version: String,
    db: String,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    // Check database connectivity with SELECT 1 query
    let db_status = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let health_response = HealthStatus {
        status: if db_status == "connected" {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        db: db_status.to_string(),
    };

    // Return 503 if database is down, 200 otherwise
    let status_code = if db_status == "connected" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_response))
}
