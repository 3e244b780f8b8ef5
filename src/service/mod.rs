pub mod binder;
pub mod records;
pub mod registry;
pub mod sheet_sync;

pub use binder::FormDatasetBinder;
pub use records::RecordService;
pub use registry::DatasetRegistry;
pub use sheet_sync::SheetSyncManager;
