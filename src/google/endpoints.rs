use crate::config::{DRIVE_API_BASE, GOOGLE_AUTH_URL, SHEETS_API_BASE};
use crate::error::{BridgeError, remote_api_error};
use crate::google::token::GoogleCredential;
use crate::types::sheets::{
    CreateSpreadsheetResponse, DriveFileList, header_format_request, value_range,
};
use crate::types::SpreadsheetInfo;

use oauth2::{
    AuthUrl, Client as OAuth2Client, ClientId, ClientSecret, EmptyExtraTokenFields,
    EndpointNotSet, EndpointSet, RefreshToken, StandardRevocableToken, StandardTokenResponse,
    TokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
};
use serde_json::json;
use tracing::info;
use url::Url;

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Result of a successful refresh-token grant.
#[derive(Debug, Clone)]
pub(crate) struct RefreshedToken {
    pub access_token: String,
    pub expires_in_secs: u64,
}

/// Stateless Google endpoints: OAuth token grant, Sheets, Drive.
pub(crate) struct GoogleEndpoints;

impl GoogleEndpoints {
    /// Exchange the stored refresh token for a fresh access token.
    pub(crate) async fn refresh_access_token(
        creds: &GoogleCredential,
        refresh_token: &str,
        http_client: reqwest::Client,
        token_uri: &Url,
    ) -> Result<RefreshedToken, BridgeError> {
        let client = build_oauth2_client(creds, token_uri)?;
        let token_result: GoogleTokenResponse = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&http_client)
            .await?;
        // Google reports expires_in on every refresh grant; 3600s is the
        // documented default when it is omitted.
        let expires_in_secs = token_result
            .expires_in()
            .map(|d| d.as_secs())
            .unwrap_or(3600);
        Ok(RefreshedToken {
            access_token: token_result.access_token().secret().clone(),
            expires_in_secs,
        })
    }

    /// Create a spreadsheet with a single named sheet.
    pub(crate) async fn create_spreadsheet(
        token: &str,
        title: &str,
        sheet_name: &str,
        http_client: &reqwest::Client,
    ) -> Result<SpreadsheetInfo, BridgeError> {
        let body = json!({
            "properties": { "title": title },
            "sheets": [{ "properties": { "title": sheet_name } }],
        });
        let resp = http_client
            .post(SHEETS_API_BASE.as_str())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(remote_api_error(resp).await);
        }
        let created: CreateSpreadsheetResponse = resp.json().await?;
        let sheet_id = created
            .sheets
            .first()
            .map(|s| s.properties.sheet_id)
            .unwrap_or(0);
        info!(spreadsheet_id = %created.spreadsheet_id, "spreadsheet created");
        Ok(SpreadsheetInfo {
            spreadsheet_id: created.spreadsheet_id,
            spreadsheet_url: created.spreadsheet_url,
            sheet_id,
        })
    }

    pub(crate) async fn update_values(
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        http_client: &reqwest::Client,
    ) -> Result<(), BridgeError> {
        let url = format!(
            "{}/{}/values/{}?valueInputOption=RAW",
            SHEETS_API_BASE.as_str(),
            spreadsheet_id,
            range
        );
        let resp = http_client
            .put(url)
            .bearer_auth(token)
            .json(&value_range(range, values))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(remote_api_error(resp).await);
        }
        Ok(())
    }

    pub(crate) async fn append_values(
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        http_client: &reqwest::Client,
    ) -> Result<(), BridgeError> {
        let url = format!(
            "{}/{}/values/{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            SHEETS_API_BASE.as_str(),
            spreadsheet_id,
            range
        );
        let resp = http_client
            .post(url)
            .bearer_auth(token)
            .json(&value_range(range, values))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(remote_api_error(resp).await);
        }
        Ok(())
    }

    /// Values-only clear; cell formatting is left intact.
    pub(crate) async fn clear_values(
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        http_client: &reqwest::Client,
    ) -> Result<(), BridgeError> {
        let url = format!(
            "{}/{}/values/{}:clear",
            SHEETS_API_BASE.as_str(),
            spreadsheet_id,
            range
        );
        let resp = http_client
            .post(url)
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(remote_api_error(resp).await);
        }
        Ok(())
    }

    /// Bold + background on the header row via batchUpdate.
    pub(crate) async fn format_header_row(
        token: &str,
        spreadsheet_id: &str,
        sheet_id: i64,
        columns: usize,
        http_client: &reqwest::Client,
    ) -> Result<(), BridgeError> {
        let url = format!("{}/{}:batchUpdate", SHEETS_API_BASE.as_str(), spreadsheet_id);
        let resp = http_client
            .post(url)
            .bearer_auth(token)
            .json(&header_format_request(sheet_id, columns))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(remote_api_error(resp).await);
        }
        Ok(())
    }

    /// Exact-name folder lookup. Returns the first match; the lookup-then-
    /// create sequence is not safe against concurrent publishers and may
    /// leave a duplicate folder (documented race).
    pub(crate) async fn find_folder(
        token: &str,
        name: &str,
        http_client: &reqwest::Client,
    ) -> Result<Option<String>, BridgeError> {
        let escaped = name.replace('\'', "\\'");
        let query = format!(
            "name = '{escaped}' and mimeType = '{FOLDER_MIME}' and trashed = false"
        );
        let resp = http_client
            .get(DRIVE_API_BASE.as_str())
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("fields", "files(id)")])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(remote_api_error(resp).await);
        }
        let list: DriveFileList = resp.json().await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    pub(crate) async fn create_folder(
        token: &str,
        name: &str,
        http_client: &reqwest::Client,
    ) -> Result<String, BridgeError> {
        let body = json!({ "name": name, "mimeType": FOLDER_MIME });
        let resp = http_client
            .post(DRIVE_API_BASE.as_str())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(remote_api_error(resp).await);
        }
        let file: serde_json::Value = resp.json().await?;
        let id = file
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BridgeError::Validation("Drive folder response missing id".into()))?;
        info!(folder_id = %id, name, "backup folder created");
        Ok(id.to_string())
    }

    /// Move a file into a folder via addParents.
    pub(crate) async fn move_to_folder(
        token: &str,
        file_id: &str,
        folder_id: &str,
        http_client: &reqwest::Client,
    ) -> Result<(), BridgeError> {
        let url = format!("{}/{}", DRIVE_API_BASE.as_str(), file_id);
        let resp = http_client
            .patch(url)
            .bearer_auth(token)
            .query(&[("addParents", folder_id), ("fields", "id,parents")])
            .json(&json!({}))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(remote_api_error(resp).await);
        }
        Ok(())
    }

    pub(crate) async fn delete_file(
        token: &str,
        file_id: &str,
        http_client: &reqwest::Client,
    ) -> Result<(), BridgeError> {
        let url = format!("{}/{}", DRIVE_API_BASE.as_str(), file_id);
        let resp = http_client.delete(url).bearer_auth(token).send().await?;
        if !resp.status().is_success() {
            return Err(remote_api_error(resp).await);
        }
        Ok(())
    }
}

/// Build the Google OAuth2 client from credentials.
fn build_oauth2_client(
    creds: &GoogleCredential,
    token_uri: &Url,
) -> Result<GoogleOauth2Client, BridgeError> {
    let client = OAuth2Client::new(ClientId::new(creds.client_id.clone()))
        .set_client_secret(ClientSecret::new(creds.client_secret.clone()))
        .set_auth_uri(AuthUrl::new(GOOGLE_AUTH_URL.as_str().to_string())?)
        .set_token_uri(TokenUrl::new(token_uri.as_str().to_string())?);
    Ok(client)
}

pub(crate) type GoogleTokenResponse =
    StandardTokenResponse<EmptyExtraTokenFields, BasicTokenType>;

pub(crate) type GoogleOauth2Client = OAuth2Client<
    BasicErrorResponse,
    GoogleTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;
