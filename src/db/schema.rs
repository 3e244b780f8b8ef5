//! SQL DDL for initializing persistent storage.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema:
/// - `google_integration`: singleton credential row (id forced to 1),
///   mirroring the source's `integrations/google` document
/// - `datasets`: flexible schema/metadata stored as JSON text,
///   `source_form_id` UNIQUE so "ensure" is structurally idempotent
/// - `dataset_records`: append-only submissions keyed to a dataset;
///   AUTOINCREMENT ids double as the pagination cursor
/// - `form_submissions`: a form's own raw submissions, distinct from
///   dataset records and always deleted with the form
/// - `dataset_sheet_sync`: at most one row per dataset
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS google_integration (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    client_id TEXT NOT NULL,
    client_secret TEXT NOT NULL,
    refresh_token TEXT NULL,
    access_token TEXT NULL,
    expiry TEXT NULL, -- RFC3339
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS datasets (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    source_form_id TEXT NULL UNIQUE,
    source_application TEXT NOT NULL,
    schema_json TEXT NOT NULL,   -- JSON: {"fields": [...]}
    metadata_json TEXT NOT NULL, -- JSON object
    created_by TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dataset_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset_id TEXT NOT NULL,
    data_json TEXT NOT NULL, -- JSON object, keys advisory vs schema
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_dataset_records_dataset_id
    ON dataset_records(dataset_id);

CREATE TABLE IF NOT EXISTS form_submissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    form_id TEXT NOT NULL,
    data_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_form_submissions_form_id
    ON form_submissions(form_id);

CREATE TABLE IF NOT EXISTS dataset_sheet_sync (
    dataset_id TEXT PRIMARY KEY,
    spreadsheet_id TEXT NOT NULL,
    spreadsheet_url TEXT NOT NULL,
    sheet_name TEXT NOT NULL,
    backup_spreadsheet_id TEXT NULL,
    backup_spreadsheet_url TEXT NULL,
    created_at TEXT NOT NULL,
    last_sync_at TEXT NULL,
    auto_sync INTEGER NOT NULL DEFAULT 0
);
"#;
