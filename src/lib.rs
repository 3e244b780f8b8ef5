pub mod config;
pub mod db;
pub mod error;
pub mod google;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;

pub use error::BridgeError;
pub use google::{GoogleApiClient, GoogleCredential, SheetsDrive, TokenManager};
pub use service::{DatasetRegistry, FormDatasetBinder, RecordService, SheetSyncManager};
