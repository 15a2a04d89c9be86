use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/scrape", post(scrape))
        .route("/test", get(manual_test))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

pub fn router(state: AppState) -> Router {
    create_router(state)
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "Forex scraper service running",
        "timestamp": now_iso(),
    }))
}

// Triggered by the external scheduler.
async fn scrape(State(state): State<AppState>) -> Response {
    tracing::info!(at = %now_iso(), "forex scraper triggered");
    match state.pipeline.run().await {
        Ok(result) => Json(json!({
            "success": true,
            "message": "Forex scraping completed",
            "data": result,
            "timestamp": now_iso(),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": e.to_string(),
                "timestamp": now_iso(),
            })),
        )
            .into_response(),
    }
}

async fn manual_test(State(state): State<AppState>) -> Response {
    match state.pipeline.run().await {
        Ok(result) => Json(json!({ "success": true, "data": result })).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
