use crate::error::BridgeError;
use crate::middleware::RequireKeyAuth;
use crate::router::BridgeState;
use crate::types::{Dataset, DatasetAction, FieldDef, FormDeletionOutcome, FormDeletionPlan};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct FormSavedRequest {
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSavedResponse {
    pub dataset_id: Option<String>,
}

/// POST /v1/forms/{form_id}/saved — called after the form save committed.
/// Always succeeds: dataset creation is advisory and never blocks the save.
pub async fn form_saved(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(form_id): Path<String>,
    Json(req): Json<FormSavedRequest>,
) -> Json<FormSavedResponse> {
    let dataset_id = state.binder.form_saved(&form_id, &req.title, &req.fields).await;
    Json(FormSavedResponse { dataset_id })
}

#[derive(Debug, Serialize)]
pub struct FormDatasetResponse {
    pub dataset: Option<Dataset>,
}

/// GET /v1/forms/{form_id}/dataset — `null` is the normal "no dataset yet"
/// answer, not an error.
pub async fn form_dataset(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(form_id): Path<String>,
) -> Result<Json<FormDatasetResponse>, BridgeError> {
    let dataset = state.registry.get_dataset_for_form(&form_id).await?;
    Ok(Json(FormDatasetResponse { dataset }))
}

/// GET /v1/forms/{form_id}/deletion-plan — what a delete would touch.
pub async fn deletion_plan(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(form_id): Path<String>,
) -> Result<Json<FormDeletionPlan>, BridgeError> {
    Ok(Json(state.binder.deletion_plan(&form_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct FormDeleteQuery {
    pub dataset_action: Option<DatasetAction>,
}

/// DELETE /v1/forms/{form_id}?dataset_action=delete|preserve
///
/// When a dataset is linked the caller must choose explicitly; the form's
/// own submissions are removed either way.
pub async fn form_deleted(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(form_id): Path<String>,
    Query(query): Query<FormDeleteQuery>,
) -> Result<Json<FormDeletionOutcome>, BridgeError> {
    let action = match query.dataset_action {
        Some(action) => action,
        None => {
            let plan = state.binder.deletion_plan(&form_id).await?;
            if plan.linked_dataset.is_some() {
                return Err(BridgeError::Validation(
                    "form has a linked dataset; pass dataset_action=delete or dataset_action=preserve"
                        .into(),
                ));
            }
            DatasetAction::Preserve
        }
    };
    Ok(Json(state.binder.form_deleted(&form_id, action).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub dataset_id: Option<String>,
}

/// POST /v1/forms/{form_id}/submissions — submission ingestion.
pub async fn ingest_submission(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Path(form_id): Path<String>,
    Json(data): Json<Map<String, Value>>,
) -> Result<Json<IngestResponse>, BridgeError> {
    let dataset_id = state.binder.ingest_submission(&form_id, &data).await?;
    Ok(Json(IngestResponse { dataset_id }))
}
