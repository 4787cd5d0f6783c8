use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use paygate::infra::db::postgres::postgres_connection::{self, PgPoolSquad};
use serde_json::json;
use tracing::{error, info};

pub async fn not_found() -> impl IntoResponse {
    info!("backend router: not_found handler invoked");
    (StatusCode::NOT_FOUND, "NOT_FOUND").into_response()
}

pub async fn health_check_simple() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}

pub async fn health_check(State(db_pool): State<Arc<PgPoolSquad>>) -> impl IntoResponse {
    match postgres_connection::ping(&db_pool) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "timestamp": Utc::now(),
            })),
        )
            .into_response(),
        Err(err) => {
            error!(db_error = ?err, "backend router: health check could not reach postgres");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "disconnected",
                    "timestamp": Utc::now(),
                })),
            )
                .into_response()
        }
    }
}
