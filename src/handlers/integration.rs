use crate::error::BridgeError;
use crate::middleware::RequireKeyAuth;
use crate::router::BridgeState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub client_id: String,
    pub client_secret: String,
    /// Obtained once via an out-of-band OAuth consent flow.
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationStatus {
    pub connected: bool,
    pub token_expiry: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// PUT /v1/integration/google — store the operator-supplied credential.
pub async fn connect(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
    Json(req): Json<ConnectRequest>,
) -> Result<StatusCode, BridgeError> {
    if req.client_id.trim().is_empty()
        || req.client_secret.trim().is_empty()
        || req.refresh_token.trim().is_empty()
    {
        return Err(BridgeError::Validation(
            "client_id, client_secret and refresh_token are all required".into(),
        ));
    }
    state
        .integration
        .connect(&req.client_id, &req.client_secret, &req.refresh_token)
        .await?;
    info!("Google integration connected");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/integration/google — connection status for the admin UI.
pub async fn status(
    State(state): State<BridgeState>,
    _auth: RequireKeyAuth,
) -> Result<Json<IntegrationStatus>, BridgeError> {
    let status = match state.integration.get().await? {
        Some(row) => IntegrationStatus {
            connected: row.refresh_token.as_deref().is_some_and(|t| !t.is_empty()),
            token_expiry: row.expiry,
            updated_at: Some(row.updated_at),
        },
        None => IntegrationStatus {
            connected: false,
            token_expiry: None,
            updated_at: None,
        },
    };
    Ok(Json(status))
}
