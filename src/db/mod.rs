//! Database module: models, schema and storage for persistent state.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and conversions
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: per-table storage structs over a shared pool

pub mod models;
pub mod schema;
pub mod sqlite;

pub use schema::SQLITE_INIT;
pub use sqlite::{
    DatasetStorage, IntegrationStorage, RecordStorage, SheetSyncStorage, SqlitePool,
    SubmissionStorage, init_schema,
};

use crate::error::BridgeError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// Open (creating if missing) the database and run schema init.
pub async fn connect(database_url: &str) -> Result<SqlitePool, BridgeError> {
    let opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(opts).await?;
    init_schema(&pool).await?;
    Ok(pool)
}
