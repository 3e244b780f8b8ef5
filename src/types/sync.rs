use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link between a dataset and its published spreadsheets. At most one per
/// dataset; once set, the backup spreadsheet id is never changed or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSyncConfig {
    pub dataset_id: String,
    pub spreadsheet_id: String,
    pub spreadsheet_url: String,
    pub sheet_name: String,
    pub backup_spreadsheet_id: Option<String>,
    pub backup_spreadsheet_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub auto_sync: bool,
}

/// Result of a successful publish. `warnings` carries non-fatal cosmetic
/// failures (e.g. header formatting) without conflating them with errors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub dataset_id: String,
    pub spreadsheet_url: String,
    pub backup_spreadsheet_url: String,
    pub records_synced: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub dataset_id: String,
    pub records_synced: usize,
    pub last_sync_at: DateTime<Utc>,
}
