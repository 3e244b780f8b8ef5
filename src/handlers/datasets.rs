use crate::error::BridgeError;
use crate::middleware::RequireKeyAuth;
use crate::router::BridgeState;
use crate::types::{Dataset, DatasetStats, RecordPage};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

/// GET /v1/datasets/{dataset_id}
pub async fn get_dataset(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(dataset_id): Path<String>,
) -> Result<Json<Dataset>, BridgeError> {
    Ok(Json(state.registry.get_dataset(&dataset_id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDatasetResponse {
    pub dataset_id: String,
    pub records_deleted: u64,
}

/// DELETE /v1/datasets/{dataset_id} — operator hard delete. Explicit
/// cleanup: records first, then the dataset document. Any sheet sync
/// config (and the backup spreadsheet) stay behind.
pub async fn delete_dataset(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(dataset_id): Path<String>,
) -> Result<Json<DeleteDatasetResponse>, BridgeError> {
    // Ensure the dataset exists before tearing records down.
    state.registry.get_dataset(&dataset_id).await?;
    let records_deleted = state.records.delete_all_for_dataset(&dataset_id).await?;
    // The form link lives on the dataset row, so it disappears with it.
    state.registry.delete_dataset(&dataset_id).await?;
    Ok(Json(DeleteDatasetResponse {
        dataset_id,
        records_deleted,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListRecordsQuery {
    pub page_size: Option<i64>,
    pub cursor: Option<i64>,
}

/// GET /v1/datasets/{dataset_id}/records?page_size=&cursor=
pub async fn list_records(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(dataset_id): Path<String>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<RecordPage>, BridgeError> {
    Ok(Json(
        state
            .records
            .list_records(&dataset_id, query.page_size, query.cursor)
            .await?,
    ))
}

/// GET /v1/datasets/{dataset_id}/stats
pub async fn stats(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(dataset_id): Path<String>,
) -> Result<Json<DatasetStats>, BridgeError> {
    Ok(Json(state.registry.get_dataset_stats(&dataset_id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ArchiveRequest {
    pub archived_by: Option<String>,
}

/// POST /v1/datasets/{dataset_id}/archive — soft delete.
pub async fn archive(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(dataset_id): Path<String>,
    Json(req): Json<ArchiveRequest>,
) -> Result<Json<Dataset>, BridgeError> {
    Ok(Json(
        state
            .registry
            .archive_dataset(&dataset_id, req.archived_by)
            .await?,
    ))
}
