use crate::error::BridgeError;
use crate::middleware::RequireKeyAuth;
use crate::router::BridgeState;
use crate::types::{PublishOutcome, SheetSyncConfig, SyncOutcome};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

/// POST /v1/datasets/{dataset_id}/publish — first publish to sheets.
pub async fn publish(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(dataset_id): Path<String>,
) -> Result<Json<PublishOutcome>, BridgeError> {
    Ok(Json(state.sheet_sync.publish(&dataset_id).await?))
}

/// POST /v1/datasets/{dataset_id}/sync — full-replace re-sync.
pub async fn sync(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(dataset_id): Path<String>,
) -> Result<Json<SyncOutcome>, BridgeError> {
    Ok(Json(state.sheet_sync.resync(&dataset_id).await?))
}

#[derive(Debug, Serialize)]
pub struct SyncConfigResponse {
    pub config: Option<SheetSyncConfig>,
}

/// GET /v1/datasets/{dataset_id}/sheet
pub async fn sync_config(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(dataset_id): Path<String>,
) -> Result<Json<SyncConfigResponse>, BridgeError> {
    Ok(Json(SyncConfigResponse {
        config: state.sheet_sync.get_config(&dataset_id).await?,
    }))
}

/// DELETE /v1/datasets/{dataset_id}/sheet — delete the primary spreadsheet.
/// The backup spreadsheet is permanent.
pub async fn delete_primary(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(dataset_id): Path<String>,
) -> Result<StatusCode, BridgeError> {
    state.sheet_sync.delete_primary_sheet(&dataset_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
