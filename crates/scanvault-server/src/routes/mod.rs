//! HTTP route definitions.

pub mod folders;
pub mod scans;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the API router.
pub fn router(state: AppState, cors: bool) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .nest("/scans", scans::routes())
        .nest("/folders", folders::routes());

    let mut app = Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
