use crate::db::models::{DbDataset, DbIntegration, DbRecord, DbSheetSync};
use crate::db::schema::SQLITE_INIT;
use crate::error::BridgeError;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub type SqlitePool = Pool<Sqlite>;

fn parse_ts(s: &str) -> Result<DateTime<Utc>, BridgeError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
        .with_timezone(&Utc))
}

fn parse_ts_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>, BridgeError> {
    s.as_deref().map(parse_ts).transpose()
}

/// Initialize the schema by executing the bundled DDL.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), BridgeError> {
    // execute multiple statements safely (SQLite supports multi-commands but sqlx::query doesn't)
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}

/// Storage for the singleton Google integration credential.
#[derive(Clone)]
pub struct IntegrationStorage {
    pool: SqlitePool,
}

impl IntegrationStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> Result<Option<DbIntegration>, BridgeError> {
        let row = sqlx::query(
            r#"SELECT client_id, client_secret, refresh_token, access_token, expiry, updated_at
               FROM google_integration WHERE id = 1"#,
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_model).transpose()
    }

    /// Upsert the connection details submitted by an operator. Clears any
    /// cached access token so the next use performs a fresh grant.
    pub async fn connect(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<(), BridgeError> {
        sqlx::query(
            r#"
            INSERT INTO google_integration (id, client_id, client_secret, refresh_token,
                access_token, expiry, updated_at)
            VALUES (1, ?, ?, ?, NULL, NULL, ?)
            ON CONFLICT(id) DO UPDATE SET
                client_id=excluded.client_id,
                client_secret=excluded.client_secret,
                refresh_token=excluded.refresh_token,
                access_token=NULL,
                expiry=NULL,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(client_id)
        .bind(client_secret)
        .bind(refresh_token)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist a freshly minted access token and its expiry.
    pub async fn save_tokens(
        &self,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), BridgeError> {
        sqlx::query(
            r#"UPDATE google_integration
               SET access_token = ?, expiry = ?, updated_at = ?
               WHERE id = 1"#,
        )
        .bind(access_token)
        .bind(expiry.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_model(row: SqliteRow) -> Result<DbIntegration, BridgeError> {
        let client_id: String = row.try_get("client_id")?;
        let client_secret: String = row.try_get("client_secret")?;
        let refresh_token: Option<String> = row.try_get("refresh_token")?;
        let access_token: Option<String> = row.try_get("access_token")?;
        let expiry: Option<String> = row.try_get("expiry")?;
        let updated_at: String = row.try_get("updated_at")?;
        Ok(DbIntegration {
            client_id,
            client_secret,
            refresh_token,
            access_token,
            expiry: parse_ts_opt(expiry)?,
            updated_at: parse_ts(&updated_at)?,
        })
    }
}

/// Storage for dataset documents.
#[derive(Clone)]
pub struct DatasetStorage {
    pool: SqlitePool,
}

impl DatasetStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a dataset unless one linked to the same form already exists.
    /// The UNIQUE constraint on `source_form_id` makes concurrent ensure
    /// calls collapse to a single row; callers re-read after inserting.
    pub async fn insert_if_absent(&self, d: &DbDataset) -> Result<(), BridgeError> {
        sqlx::query(
            r#"
            INSERT INTO datasets (
                id, name, source_form_id, source_application,
                schema_json, metadata_json, created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_form_id) DO NOTHING
            "#,
        )
        .bind(&d.id)
        .bind(&d.name)
        .bind(&d.source_form_id)
        .bind(&d.source_application)
        .bind(&d.schema_json)
        .bind(&d.metadata_json)
        .bind(&d.created_by)
        .bind(d.created_at.to_rfc3339())
        .bind(d.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<DbDataset>, BridgeError> {
        let row = sqlx::query(
            r#"SELECT id, name, source_form_id, source_application, schema_json,
               metadata_json, created_by, created_at, updated_at
               FROM datasets WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_model).transpose()
    }

    pub async fn get_by_form(&self, form_id: &str) -> Result<Option<DbDataset>, BridgeError> {
        let row = sqlx::query(
            r#"SELECT id, name, source_form_id, source_application, schema_json,
               metadata_json, created_by, created_at, updated_at
               FROM datasets WHERE source_form_id = ?"#,
        )
        .bind(form_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_model).transpose()
    }

    /// Hard delete. Returns the number of rows removed (0 when absent).
    pub async fn delete(&self, id: &str) -> Result<u64, BridgeError> {
        let res = sqlx::query("DELETE FROM datasets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn unlink_form(&self, form_id: &str) -> Result<u64, BridgeError> {
        let res = sqlx::query(
            "UPDATE datasets SET source_form_id = NULL, updated_at = ? WHERE source_form_id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(form_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    pub async fn update_metadata(&self, id: &str, metadata_json: &str) -> Result<(), BridgeError> {
        sqlx::query("UPDATE datasets SET metadata_json = ?, updated_at = ? WHERE id = ?")
            .bind(metadata_json)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_model(row: SqliteRow) -> Result<DbDataset, BridgeError> {
        let id: String = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let source_form_id: Option<String> = row.try_get("source_form_id")?;
        let source_application: String = row.try_get("source_application")?;
        let schema_json: String = row.try_get("schema_json")?;
        let metadata_json: String = row.try_get("metadata_json")?;
        let created_by: Option<String> = row.try_get("created_by")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;
        Ok(DbDataset {
            id,
            name,
            source_form_id,
            source_application,
            schema_json,
            metadata_json,
            created_by,
            created_at: parse_ts(&created_at)?,
            updated_at: parse_ts(&updated_at)?,
        })
    }
}

/// Storage for dataset submission records.
#[derive(Clone)]
pub struct RecordStorage {
    pool: SqlitePool,
}

impl RecordStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        dataset_id: &str,
        data: &Map<String, Value>,
    ) -> Result<i64, BridgeError> {
        let data_json = serde_json::to_string(data)?;
        let res = sqlx::query(
            "INSERT INTO dataset_records (dataset_id, data_json, created_at) VALUES (?, ?, ?)",
        )
        .bind(dataset_id)
        .bind(data_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    /// Newest first. `cursor` is the id of the last row of the previous
    /// page; ids are monotonic, so `id < cursor` continues the scan.
    pub async fn list_desc(
        &self,
        dataset_id: &str,
        limit: i64,
        cursor: Option<i64>,
    ) -> Result<Vec<DbRecord>, BridgeError> {
        let rows = match cursor {
            Some(c) => {
                sqlx::query(
                    r#"SELECT id, dataset_id, data_json, created_at FROM dataset_records
                       WHERE dataset_id = ? AND id < ? ORDER BY id DESC LIMIT ?"#,
                )
                .bind(dataset_id)
                .bind(c)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"SELECT id, dataset_id, data_json, created_at FROM dataset_records
                       WHERE dataset_id = ? ORDER BY id DESC LIMIT ?"#,
                )
                .bind(dataset_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(Self::row_to_model).collect()
    }

    /// Full chronological scan, used when pushing rows to a spreadsheet.
    pub async fn list_all_asc(&self, dataset_id: &str) -> Result<Vec<DbRecord>, BridgeError> {
        let rows = sqlx::query(
            r#"SELECT id, dataset_id, data_json, created_at FROM dataset_records
               WHERE dataset_id = ? ORDER BY id ASC"#,
        )
        .bind(dataset_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_model).collect()
    }

    pub async fn count(&self, dataset_id: &str) -> Result<i64, BridgeError> {
        let rec: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM dataset_records WHERE dataset_id = ?")
                .bind(dataset_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(rec.0)
    }

    pub async fn last_created_at(
        &self,
        dataset_id: &str,
    ) -> Result<Option<DateTime<Utc>>, BridgeError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT created_at FROM dataset_records WHERE dataset_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(dataset_id)
        .fetch_optional(&self.pool)
        .await?;
        parse_ts_opt(row.map(|(s,)| s))
    }

    /// Delete one bounded batch. Returns rows removed; callers loop until 0.
    /// Interruption mid-way is safe: deletion is idempotent per row.
    pub async fn delete_batch(&self, dataset_id: &str, limit: i64) -> Result<u64, BridgeError> {
        let res = sqlx::query(
            r#"DELETE FROM dataset_records WHERE id IN (
                 SELECT id FROM dataset_records WHERE dataset_id = ? LIMIT ?
               )"#,
        )
        .bind(dataset_id)
        .bind(limit)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    fn row_to_model(row: SqliteRow) -> Result<DbRecord, BridgeError> {
        let id: i64 = row.try_get("id")?;
        let dataset_id: String = row.try_get("dataset_id")?;
        let data_json: String = row.try_get("data_json")?;
        let created_at: String = row.try_get("created_at")?;
        Ok(DbRecord {
            id,
            dataset_id,
            data_json,
            created_at: parse_ts(&created_at)?,
        })
    }
}

/// Storage for a form's own raw submissions (distinct from dataset records).
#[derive(Clone)]
pub struct SubmissionStorage {
    pool: SqlitePool,
}

impl SubmissionStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        form_id: &str,
        data: &Map<String, Value>,
    ) -> Result<i64, BridgeError> {
        let data_json = serde_json::to_string(data)?;
        let res = sqlx::query(
            "INSERT INTO form_submissions (form_id, data_json, created_at) VALUES (?, ?, ?)",
        )
        .bind(form_id)
        .bind(data_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    pub async fn count_for_form(&self, form_id: &str) -> Result<i64, BridgeError> {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM form_submissions WHERE form_id = ?")
            .bind(form_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    pub async fn delete_batch(&self, form_id: &str, limit: i64) -> Result<u64, BridgeError> {
        let res = sqlx::query(
            r#"DELETE FROM form_submissions WHERE id IN (
                 SELECT id FROM form_submissions WHERE form_id = ? LIMIT ?
               )"#,
        )
        .bind(form_id)
        .bind(limit)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }
}

/// Storage for dataset → spreadsheet sync configs.
#[derive(Clone)]
pub struct SheetSyncStorage {
    pool: SqlitePool,
}

impl SheetSyncStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Last write wins on the dataset key; concurrent publishers are not
    /// serialized (accepted race in a low-traffic admin tool).
    pub async fn upsert(&self, c: &DbSheetSync) -> Result<(), BridgeError> {
        sqlx::query(
            r#"
            INSERT INTO dataset_sheet_sync (
                dataset_id, spreadsheet_id, spreadsheet_url, sheet_name,
                backup_spreadsheet_id, backup_spreadsheet_url,
                created_at, last_sync_at, auto_sync
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(dataset_id) DO UPDATE SET
                spreadsheet_id=excluded.spreadsheet_id,
                spreadsheet_url=excluded.spreadsheet_url,
                sheet_name=excluded.sheet_name,
                backup_spreadsheet_id=excluded.backup_spreadsheet_id,
                backup_spreadsheet_url=excluded.backup_spreadsheet_url,
                last_sync_at=excluded.last_sync_at,
                auto_sync=excluded.auto_sync
            "#,
        )
        .bind(&c.dataset_id)
        .bind(&c.spreadsheet_id)
        .bind(&c.spreadsheet_url)
        .bind(&c.sheet_name)
        .bind(&c.backup_spreadsheet_id)
        .bind(&c.backup_spreadsheet_url)
        .bind(c.created_at.to_rfc3339())
        .bind(c.last_sync_at.map(|t| t.to_rfc3339()))
        .bind(if c.auto_sync { 1 } else { 0 })
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, dataset_id: &str) -> Result<Option<DbSheetSync>, BridgeError> {
        let row = sqlx::query(
            r#"SELECT dataset_id, spreadsheet_id, spreadsheet_url, sheet_name,
               backup_spreadsheet_id, backup_spreadsheet_url,
               created_at, last_sync_at, auto_sync
               FROM dataset_sheet_sync WHERE dataset_id = ?"#,
        )
        .bind(dataset_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_model).transpose()
    }

    pub async fn set_last_sync(
        &self,
        dataset_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), BridgeError> {
        sqlx::query("UPDATE dataset_sheet_sync SET last_sync_at = ? WHERE dataset_id = ?")
            .bind(at.to_rfc3339())
            .bind(dataset_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_model(row: SqliteRow) -> Result<DbSheetSync, BridgeError> {
        let dataset_id: String = row.try_get("dataset_id")?;
        let spreadsheet_id: String = row.try_get("spreadsheet_id")?;
        let spreadsheet_url: String = row.try_get("spreadsheet_url")?;
        let sheet_name: String = row.try_get("sheet_name")?;
        let backup_spreadsheet_id: Option<String> = row.try_get("backup_spreadsheet_id")?;
        let backup_spreadsheet_url: Option<String> = row.try_get("backup_spreadsheet_url")?;
        let created_at: String = row.try_get("created_at")?;
        let last_sync_at: Option<String> = row.try_get("last_sync_at")?;
        let auto_sync: i64 = row.try_get("auto_sync")?;
        Ok(DbSheetSync {
            dataset_id,
            spreadsheet_id,
            spreadsheet_url,
            sheet_name,
            backup_spreadsheet_id,
            backup_spreadsheet_url,
            created_at: parse_ts(&created_at)?,
            last_sync_at: parse_ts_opt(last_sync_at)?,
            auto_sync: auto_sync != 0,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Single-connection in-memory pool; one connection keeps every query
    /// on the same in-memory database.
    pub(crate) async fn memory_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        init_schema(&pool).await.expect("schema init");
        pool
    }
}
