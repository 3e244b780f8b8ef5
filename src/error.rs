use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::{Deserialize, Serialize};
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum BridgeError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    /// No refresh token on file; the operator has not connected the
    /// Google integration yet.
    #[error("Google integration is not connected")]
    IntegrationNotConnected,

    /// The refresh-token grant was rejected by the provider. Treated like
    /// `IntegrationNotConnected` by callers but logged distinctly.
    #[error("access token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// Transport-level failure while talking to the token endpoint.
    #[error("OAuth2 token request error: {0}")]
    Oauth2Transport(String),

    /// Non-2xx from the Sheets or Drive API, with the remote-reported message.
    #[error("remote API error ({status}): {message}")]
    RemoteApi { status: StatusCode, message: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Whether a failed operation is worth retrying without operator action.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for BridgeError {
    fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            BridgeError::Oauth2Transport(_) => true,
            BridgeError::RemoteApi { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for BridgeError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => {
                BridgeError::TokenRefreshFailed(err.error().to_string())
            }
            RequestTokenError::Request(req_e) => {
                BridgeError::Oauth2Transport(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => BridgeError::Json(parse_err.into_inner()),
            RequestTokenError::Other(s) => BridgeError::Oauth2Transport(s),
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            BridgeError::IntegrationNotConnected => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorBody {
                    code: "INTEGRATION_NOT_CONNECTED".to_string(),
                    message: "Google integration is not connected; an operator must connect it."
                        .to_string(),
                },
            ),
            BridgeError::TokenRefreshFailed(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorBody {
                    code: "TOKEN_REFRESH_FAILED".to_string(),
                    message: "Google integration needs operator attention.".to_string(),
                },
            ),
            BridgeError::RemoteApi { status, message } => {
                let status = if status.is_client_error() || status.is_server_error() {
                    StatusCode::BAD_GATEWAY
                } else {
                    status
                };
                (
                    status,
                    ApiErrorBody {
                        code: "REMOTE_API_ERROR".to_string(),
                        message,
                    },
                )
            }
            BridgeError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{what} not found"),
                },
            ),
            BridgeError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    code: "VALIDATION_ERROR".to_string(),
                    message: msg,
                },
            ),
            BridgeError::Database(_) | BridgeError::Json(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                },
            ),
            BridgeError::Reqwest(_) | BridgeError::UrlParse(_) | BridgeError::Oauth2Transport(_) => {
                (
                    StatusCode::BAD_GATEWAY,
                    ApiErrorBody {
                        code: "BAD_GATEWAY".to_string(),
                        message: "Upstream service is unavailable.".to_string(),
                    },
                )
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// Google API error response structure (Sheets and Drive share the shape).
#[derive(Deserialize, Debug)]
pub struct GoogleApiError {
    pub error: GoogleApiErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct GoogleApiErrorBody {
    pub code: u32,
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// Map a non-2xx Google API response into `BridgeError::RemoteApi`,
/// preferring the remote-reported message when the body parses.
pub async fn remote_api_error(resp: reqwest::Response) -> BridgeError {
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let message = match resp.json::<GoogleApiError>().await {
        Ok(body) => body.error.message,
        Err(_) => format!("remote API returned status {status}"),
    };
    BridgeError::RemoteApi { status, message }
}
