use crate::db::{
    DatasetStorage, IntegrationStorage, RecordStorage, SheetSyncStorage, SqlitePool,
    SubmissionStorage,
};
use crate::google::{SheetsDrive, TokenManager};
use crate::handlers;
use crate::service::{DatasetRegistry, FormDatasetBinder, RecordService, SheetSyncManager};
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct BridgeState {
    pub integration: IntegrationStorage,
    pub registry: DatasetRegistry,
    pub records: RecordService,
    pub sheet_sync: SheetSyncManager,
    pub binder: FormDatasetBinder,
    pub api_key: Arc<str>,
}

impl BridgeState {
    /// Wire the full service set over one pool and one Sheets/Drive port.
    pub fn new(
        pool: SqlitePool,
        api: Arc<dyn SheetsDrive>,
        http: reqwest::Client,
        api_key: Arc<str>,
        backup_folder_name: String,
    ) -> Self {
        let integration = IntegrationStorage::new(pool.clone());
        let datasets = DatasetStorage::new(pool.clone());
        let record_storage = RecordStorage::new(pool.clone());
        let registry = DatasetRegistry::new(datasets.clone(), record_storage.clone());
        let records = RecordService::new(record_storage.clone(), datasets);
        let tokens = Arc::new(TokenManager::new(Arc::new(integration.clone()), http));
        let sheet_sync = SheetSyncManager::new(
            tokens,
            api,
            registry.clone(),
            record_storage,
            SheetSyncStorage::new(pool.clone()),
            backup_folder_name,
        );
        let binder = FormDatasetBinder::new(
            registry.clone(),
            records.clone(),
            SubmissionStorage::new(pool),
        );
        Self {
            integration,
            registry,
            records,
            sheet_sync,
            binder,
            api_key,
        }
    }
}

pub fn bridge_router(state: BridgeState) -> Router {
    Router::new()
        .route(
            "/v1/integration/google",
            get(handlers::integration::status).put(handlers::integration::connect),
        )
        .route("/v1/forms/{form_id}/saved", post(handlers::forms::form_saved))
        .route("/v1/forms/{form_id}/dataset", get(handlers::forms::form_dataset))
        .route(
            "/v1/forms/{form_id}/deletion-plan",
            get(handlers::forms::deletion_plan),
        )
        .route("/v1/forms/{form_id}", delete(handlers::forms::form_deleted))
        .route(
            "/v1/forms/{form_id}/submissions",
            post(handlers::forms::ingest_submission),
        )
        .route(
            "/v1/datasets/{dataset_id}",
            get(handlers::datasets::get_dataset).delete(handlers::datasets::delete_dataset),
        )
        .route(
            "/v1/datasets/{dataset_id}/records",
            get(handlers::datasets::list_records),
        )
        .route(
            "/v1/datasets/{dataset_id}/stats",
            get(handlers::datasets::stats),
        )
        .route(
            "/v1/datasets/{dataset_id}/archive",
            post(handlers::datasets::archive),
        )
        .route(
            "/v1/datasets/{dataset_id}/publish",
            post(handlers::sheets::publish),
        )
        .route("/v1/datasets/{dataset_id}/sync", post(handlers::sheets::sync))
        .route(
            "/v1/datasets/{dataset_id}/sheet",
            get(handlers::sheets::sync_config).delete(handlers::sheets::delete_primary),
        )
        .with_state(state)
}
