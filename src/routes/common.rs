//! Common routes: health, readiness, version.

use crate::error::AppError;
use crate::response::{success, Response};
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
pub struct ReadyBody {
    status: &'static str,
    database: &'static str,
}

#[derive(Serialize)]
pub struct VersionBody {
    name: &'static str,
    version: &'static str,
}

async fn health() -> Json<Response<HealthBody>> {
    success(HealthBody { status: "ok" })
}

async fn ready(State(state): State<AppState>) -> Result<Json<Response<ReadyBody>>, AppError> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;
    Ok(success(ReadyBody {
        status: "ok",
        database: "ok",
    }))
}

async fn version() -> Json<Response<VersionBody>> {
    success(VersionBody {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /health, GET /ready (database ping), GET /version.
pub fn common_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
}
