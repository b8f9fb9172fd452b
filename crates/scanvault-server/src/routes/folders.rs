//! Folder hierarchy endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Deserializer, Serialize};

use scanvault_core::{Folder, FolderId, FolderListing, ScanRecord};
use scanvault_store::FolderUpdate;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_folders).post(create_folder))
        .route(
            "/:id",
            get(get_folder).put(update_folder).delete(delete_folder),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFolderBody {
    name: String,
    parent_id: Option<FolderId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateFolderBody {
    name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    parent_id: Option<Option<FolderId>>,
}

/// A folder with the scans it contains, as returned by the detail endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FolderDetail {
    #[serde(flatten)]
    folder: Folder,
    scans: Vec<ScanRecord>,
}

async fn list_folders(State(state): State<AppState>) -> Result<Json<Vec<FolderListing>>, ApiError> {
    let store = state.store()?;
    Ok(Json(store.list_folders()?))
}

async fn create_folder(
    State(state): State<AppState>,
    Json(body): Json<CreateFolderBody>,
) -> Result<(StatusCode, Json<Folder>), ApiError> {
    let store = state.store()?;
    let folder = store.create_folder(&body.name, body.parent_id)?;
    Ok((StatusCode::CREATED, Json(folder)))
}

async fn get_folder(
    State(state): State<AppState>,
    Path(id): Path<FolderId>,
) -> Result<Json<FolderDetail>, ApiError> {
    let store = state.store()?;
    store
        .get_folder(&id)?
        .map(|(folder, scans)| Json(FolderDetail { folder, scans }))
        .ok_or_else(|| ApiError::not_found(format!("folder {id}")))
}

async fn update_folder(
    State(state): State<AppState>,
    Path(id): Path<FolderId>,
    Json(body): Json<UpdateFolderBody>,
) -> Result<Json<Folder>, ApiError> {
    let update = FolderUpdate {
        name: body.name,
        parent_id: body.parent_id,
    };
    let mut store = state.store()?;
    store
        .update_folder(&id, &update)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("folder {id}")))
}

async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<FolderId>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store()?;
    if store.delete_folder(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("folder {id}")))
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
