use crate::db::models::{DbRecord, DbSheetSync};
use crate::db::{RecordStorage, SheetSyncStorage};
use crate::error::BridgeError;
use crate::google::{SheetsDrive, TokenManager};
use crate::service::registry::DatasetRegistry;
use crate::types::{Dataset, PublishOutcome, SheetSyncConfig, SyncOutcome};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

const SHEET_NAME: &str = "Submissions";

/// Data rows live below the frozen header; a values-only clear of this
/// range leaves the header and its formatting intact.
const DATA_RANGE: &str = "Submissions!A2:ZZ";
const APPEND_RANGE: &str = "Submissions!A1";

/// Maps a dataset to a primary spreadsheet and an immutable backup
/// spreadsheet, and pushes record snapshots into both.
///
/// Lifecycle: Unpublished → Publishing → Published → (Syncing ⇄ Published).
/// There is no unpublish; only explicit primary-sheet deletion, and the
/// backup is never deleted by any code path.
#[derive(Clone)]
pub struct SheetSyncManager {
    tokens: Arc<TokenManager>,
    api: Arc<dyn SheetsDrive>,
    registry: DatasetRegistry,
    records: RecordStorage,
    configs: SheetSyncStorage,
    backup_folder_name: String,
}

impl SheetSyncManager {
    pub fn new(
        tokens: Arc<TokenManager>,
        api: Arc<dyn SheetsDrive>,
        registry: DatasetRegistry,
        records: RecordStorage,
        configs: SheetSyncStorage,
        backup_folder_name: String,
    ) -> Self {
        Self {
            tokens,
            api,
            registry,
            records,
            configs,
            backup_folder_name,
        }
    }

    pub async fn get_config(
        &self,
        dataset_id: &str,
    ) -> Result<Option<SheetSyncConfig>, BridgeError> {
        Ok(self.configs.get(dataset_id).await?.map(Into::into))
    }

    /// First publish of a dataset: creates the primary spreadsheet, a dated
    /// backup in the well-known backup folder, persists the config, then
    /// pushes the full current record set into both sheets.
    ///
    /// The token gate runs before anything is created, so an unconnected
    /// integration aborts with no partial spreadsheet left behind. After
    /// the primary exists, a failure before the config is persisted leaves
    /// an orphaned spreadsheet in Drive; that is surfaced in the logs and
    /// not auto-repaired.
    pub async fn publish(&self, dataset_id: &str) -> Result<PublishOutcome, BridgeError> {
        let dataset = self.registry.get_dataset(dataset_id).await?;
        if self.configs.get(dataset_id).await?.is_some() {
            return Err(BridgeError::Validation(
                "dataset is already published to sheets; use sync instead".into(),
            ));
        }

        let token = self.tokens.get_valid_access_token().await?;
        let mut warnings = Vec::new();
        let headers = dataset.schema.header_row();

        let primary = self
            .api
            .create_spreadsheet(&token, &dataset.name, SHEET_NAME)
            .await?;

        match self
            .publish_after_primary(&token, &dataset, &headers, &primary, &mut warnings)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(
                    dataset_id,
                    spreadsheet_id = %primary.spreadsheet_id,
                    error = %e,
                    "publish failed after the primary spreadsheet was created; \
                     the orphaned spreadsheet may need manual deletion"
                );
                Err(e)
            }
        }
    }

    async fn publish_after_primary(
        &self,
        token: &str,
        dataset: &Dataset,
        headers: &[String],
        primary: &crate::types::SpreadsheetInfo,
        warnings: &mut Vec<String>,
    ) -> Result<PublishOutcome, BridgeError> {
        self.api
            .update_values(token, &primary.spreadsheet_id, APPEND_RANGE, &[headers.to_vec()])
            .await?;

        // Cosmetic only: a formatting failure must not abort the publish.
        if let Err(e) = self
            .api
            .format_header_row(token, &primary.spreadsheet_id, primary.sheet_id, headers.len())
            .await
        {
            warn!(error = %e, "header formatting failed; continuing");
            warnings.push(format!("header formatting failed: {e}"));
        }

        let folder_id = match self.api.find_folder(token, &self.backup_folder_name).await? {
            Some(id) => id,
            None => self.api.create_folder(token, &self.backup_folder_name).await?,
        };

        let backup_title = format!("{} - {}", dataset.name, Utc::now().format("%Y-%m-%d"));
        let backup = self
            .api
            .create_spreadsheet(token, &backup_title, SHEET_NAME)
            .await?;
        self.api
            .move_to_folder(token, &backup.spreadsheet_id, &folder_id)
            .await?;
        self.api
            .update_values(token, &backup.spreadsheet_id, APPEND_RANGE, &[headers.to_vec()])
            .await?;

        let now = Utc::now();
        let config = DbSheetSync {
            dataset_id: dataset.id.clone(),
            spreadsheet_id: primary.spreadsheet_id.clone(),
            spreadsheet_url: primary.spreadsheet_url.clone(),
            sheet_name: SHEET_NAME.to_string(),
            backup_spreadsheet_id: Some(backup.spreadsheet_id.clone()),
            backup_spreadsheet_url: Some(backup.spreadsheet_url.clone()),
            created_at: now,
            last_sync_at: None,
            auto_sync: false,
        };
        self.configs.upsert(&config).await?;
        self.registry
            .set_sheet_url(&dataset.id, &primary.spreadsheet_url)
            .await?;

        let rows = self.load_rows(&dataset.id, headers).await?;
        if !rows.is_empty() {
            self.api
                .append_values(token, &primary.spreadsheet_id, APPEND_RANGE, &rows)
                .await?;
            self.api
                .append_values(token, &backup.spreadsheet_id, APPEND_RANGE, &rows)
                .await?;
        }
        self.configs.set_last_sync(&dataset.id, Utc::now()).await?;

        info!(
            dataset_id = %dataset.id,
            spreadsheet_id = %primary.spreadsheet_id,
            backup_spreadsheet_id = %backup.spreadsheet_id,
            records = rows.len(),
            "dataset published to sheets"
        );
        Ok(PublishOutcome {
            dataset_id: dataset.id.clone(),
            spreadsheet_url: primary.spreadsheet_url.clone(),
            backup_spreadsheet_url: backup.spreadsheet_url,
            records_synced: rows.len(),
            warnings: std::mem::take(warnings),
        })
    }

    /// Full-replace re-sync: values-only clear of the primary data range,
    /// rewrite of the full current record set, and the same rows appended
    /// to the backup. Chosen over an incremental diff because record counts
    /// are small and the store exposes no cheap changed-since semantics.
    pub async fn resync(&self, dataset_id: &str) -> Result<SyncOutcome, BridgeError> {
        let dataset = self.registry.get_dataset(dataset_id).await?;
        let config = self
            .configs
            .get(dataset_id)
            .await?
            .ok_or(BridgeError::NotFound("sheet sync config"))?;

        let token = self.tokens.get_valid_access_token().await?;
        let headers = dataset.schema.header_row();
        let rows = self.load_rows(dataset_id, &headers).await?;

        self.api
            .clear_values(&token, &config.spreadsheet_id, DATA_RANGE)
            .await?;
        if !rows.is_empty() {
            self.api
                .update_values(&token, &config.spreadsheet_id, "Submissions!A2", &rows)
                .await?;
            if let Some(backup_id) = config.backup_spreadsheet_id.as_deref() {
                self.api
                    .append_values(&token, backup_id, APPEND_RANGE, &rows)
                    .await?;
            }
        }

        let now = Utc::now();
        self.configs.set_last_sync(dataset_id, now).await?;
        info!(dataset_id, records = rows.len(), "dataset re-synced to sheets");
        Ok(SyncOutcome {
            dataset_id: dataset_id.to_string(),
            records_synced: rows.len(),
            last_sync_at: now,
        })
    }

    /// Delete the primary spreadsheet from Drive. The backup spreadsheet is
    /// permanent and its id is never passed to a delete call; the config
    /// row is kept as an operator-visible dangling reference.
    pub async fn delete_primary_sheet(&self, dataset_id: &str) -> Result<(), BridgeError> {
        let config = self
            .configs
            .get(dataset_id)
            .await?
            .ok_or(BridgeError::NotFound("sheet sync config"))?;
        let token = self.tokens.get_valid_access_token().await?;
        self.api.delete_file(&token, &config.spreadsheet_id).await?;
        info!(
            dataset_id,
            spreadsheet_id = %config.spreadsheet_id,
            "primary spreadsheet deleted; backup retained"
        );
        Ok(())
    }

    /// Records mapped through the schema's field order, oldest first.
    async fn load_rows(
        &self,
        dataset_id: &str,
        headers: &[String],
    ) -> Result<Vec<Vec<String>>, BridgeError> {
        let records = self.records.list_all_asc(dataset_id).await?;
        records
            .into_iter()
            .map(|r| record_row(&r, headers))
            .collect()
    }
}

fn record_row(record: &DbRecord, headers: &[String]) -> Result<Vec<String>, BridgeError> {
    let data: serde_json::Map<String, Value> = serde_json::from_str(&record.data_json)?;
    Ok(headers.iter().map(|h| cell_value(data.get(h))).collect())
}

fn cell_value(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
