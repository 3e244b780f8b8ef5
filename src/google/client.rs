use crate::error::BridgeError;
use crate::google::endpoints::GoogleEndpoints;
use crate::types::SpreadsheetInfo;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Semantic port over the Sheets and Drive APIs. The sync manager talks to
/// this trait; tests substitute an in-memory fake.
#[async_trait]
pub trait SheetsDrive: Send + Sync {
    async fn create_spreadsheet(
        &self,
        token: &str,
        title: &str,
        sheet_name: &str,
    ) -> Result<SpreadsheetInfo, BridgeError>;

    async fn update_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> Result<(), BridgeError>;

    async fn append_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> Result<(), BridgeError>;

    async fn clear_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<(), BridgeError>;

    async fn format_header_row(
        &self,
        token: &str,
        spreadsheet_id: &str,
        sheet_id: i64,
        columns: usize,
    ) -> Result<(), BridgeError>;

    async fn find_folder(&self, token: &str, name: &str) -> Result<Option<String>, BridgeError>;

    async fn create_folder(&self, token: &str, name: &str) -> Result<String, BridgeError>;

    async fn move_to_folder(
        &self,
        token: &str,
        file_id: &str,
        folder_id: &str,
    ) -> Result<(), BridgeError>;

    async fn delete_file(&self, token: &str, file_id: &str) -> Result<(), BridgeError>;
}

/// Real client: one shared reqwest client with conservative timeouts.
pub struct GoogleApiClient {
    http: reqwest::Client,
}

impl GoogleApiClient {
    pub fn new(proxy: Option<Url>) -> Self {
        let mut builder = reqwest::Client::builder()
            .user_agent("sheetbridge/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30));
        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url.as_str())
                .expect("invalid PROXY url for reqwest client");
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .expect("FATAL: initialize Google API HTTP client failed");
        Self { http }
    }

    pub fn http(&self) -> reqwest::Client {
        self.http.clone()
    }
}

#[async_trait]
impl SheetsDrive for GoogleApiClient {
    async fn create_spreadsheet(
        &self,
        token: &str,
        title: &str,
        sheet_name: &str,
    ) -> Result<SpreadsheetInfo, BridgeError> {
        GoogleEndpoints::create_spreadsheet(token, title, sheet_name, &self.http).await
    }

    async fn update_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> Result<(), BridgeError> {
        GoogleEndpoints::update_values(token, spreadsheet_id, range, values, &self.http).await
    }

    async fn append_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> Result<(), BridgeError> {
        GoogleEndpoints::append_values(token, spreadsheet_id, range, values, &self.http).await
    }

    async fn clear_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<(), BridgeError> {
        GoogleEndpoints::clear_values(token, spreadsheet_id, range, &self.http).await
    }

    async fn format_header_row(
        &self,
        token: &str,
        spreadsheet_id: &str,
        sheet_id: i64,
        columns: usize,
    ) -> Result<(), BridgeError> {
        GoogleEndpoints::format_header_row(token, spreadsheet_id, sheet_id, columns, &self.http)
            .await
    }

    async fn find_folder(&self, token: &str, name: &str) -> Result<Option<String>, BridgeError> {
        GoogleEndpoints::find_folder(token, name, &self.http).await
    }

    async fn create_folder(&self, token: &str, name: &str) -> Result<String, BridgeError> {
        GoogleEndpoints::create_folder(token, name, &self.http).await
    }

    async fn move_to_folder(
        &self,
        token: &str,
        file_id: &str,
        folder_id: &str,
    ) -> Result<(), BridgeError> {
        GoogleEndpoints::move_to_folder(token, file_id, folder_id, &self.http).await
    }

    async fn delete_file(&self, token: &str, file_id: &str) -> Result<(), BridgeError> {
        GoogleEndpoints::delete_file(token, file_id, &self.http).await
    }
}
