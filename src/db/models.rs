use crate::error::BridgeError;
use crate::google::token::GoogleCredential;
use crate::types::{Dataset, DatasetMetadata, DatasetSchema, Record, SheetSyncConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row mirror of the `google_integration` singleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbIntegration {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbIntegration> for GoogleCredential {
    fn from(d: DbIntegration) -> Self {
        GoogleCredential {
            client_id: d.client_id,
            client_secret: d.client_secret,
            refresh_token: d.refresh_token,
            access_token: d.access_token,
            expiry: d.expiry,
        }
    }
}

/// Row mirror of `datasets`, with schema/metadata still serialized.
#[derive(Debug, Clone)]
pub struct DbDataset {
    pub id: String,
    pub name: String,
    pub source_form_id: Option<String>,
    pub source_application: String,
    pub schema_json: String,
    pub metadata_json: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbDataset> for Dataset {
    type Error = BridgeError;

    fn try_from(d: DbDataset) -> Result<Self, Self::Error> {
        let schema: DatasetSchema = serde_json::from_str(&d.schema_json)?;
        let metadata: DatasetMetadata = serde_json::from_str(&d.metadata_json)?;
        Ok(Dataset {
            id: d.id,
            name: d.name,
            source_form_id: d.source_form_id,
            source_application: d.source_application,
            schema,
            metadata,
            created_by: d.created_by,
            created_at: d.created_at,
            updated_at: d.updated_at,
        })
    }
}

/// Row mirror of `dataset_records`.
#[derive(Debug, Clone)]
pub struct DbRecord {
    pub id: i64,
    pub dataset_id: String,
    pub data_json: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbRecord> for Record {
    type Error = BridgeError;

    fn try_from(r: DbRecord) -> Result<Self, Self::Error> {
        let data = serde_json::from_str(&r.data_json)?;
        Ok(Record {
            id: r.id,
            dataset_id: r.dataset_id,
            data,
            created_at: r.created_at,
        })
    }
}

/// Row mirror of `dataset_sheet_sync`; field-compatible with the public
/// [`SheetSyncConfig`] type, so conversion is direct.
#[derive(Debug, Clone)]
pub struct DbSheetSync {
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

impl From<DbSheetSync> for SheetSyncConfig {
    fn from(d: DbSheetSync) -> Self {
        SheetSyncConfig {
            dataset_id: d.dataset_id,
            spreadsheet_id: d.spreadsheet_id,
            spreadsheet_url: d.spreadsheet_url,
            sheet_name: d.sheet_name,
            backup_spreadsheet_id: d.backup_spreadsheet_id,
            backup_spreadsheet_url: d.backup_spreadsheet_url,
            created_at: d.created_at,
            last_sync_at: d.last_sync_at,
            auto_sync: d.auto_sync,
        }
    }
}
