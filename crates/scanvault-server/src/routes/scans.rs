//! Scan upload, listing, and lifecycle endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use scanvault_core::{ScanId, ScanRecord, ScanUpdate, StoredScan};

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_scans).post(create_scan))
        .route("/:id", get(get_scan).put(update_scan).delete(delete_scan))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateScanBody {
    xml: String,
    file_name: Option<String>,
}

async fn list_scans(State(state): State<AppState>) -> Result<Json<Vec<ScanRecord>>, ApiError> {
    let store = state.store()?;
    Ok(Json(store.list_scans()?))
}

async fn create_scan(
    State(state): State<AppState>,
    Json(body): Json<CreateScanBody>,
) -> Result<(StatusCode, Json<ScanRecord>), ApiError> {
    let doc = scanvault_ingest::parse(&body.xml)?;
    let mut store = state.store()?;
    let record = store.save_scan(&doc, body.file_name.as_deref())?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_scan(
    State(state): State<AppState>,
    Path(id): Path<ScanId>,
) -> Result<Json<StoredScan>, ApiError> {
    let store = state.store()?;
    store
        .get_scan(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("scan {id}")))
}

async fn update_scan(
    State(state): State<AppState>,
    Path(id): Path<ScanId>,
    Json(update): Json<ScanUpdate>,
) -> Result<Json<ScanRecord>, ApiError> {
    let mut store = state.store()?;
    store
        .update_scan(&id, &update)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("scan {id}")))
}

async fn delete_scan(
    State(state): State<AppState>,
    Path(id): Path<ScanId>,
) -> Result<StatusCode, ApiError> {
    let store = state.store()?;
    if store.delete_scan(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("scan {id}")))
    }
}
