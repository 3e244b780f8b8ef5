pub mod dataset;
pub mod form;
pub mod record;
pub mod sheets;
pub mod sync;

pub use dataset::{Dataset, DatasetMetadata, DatasetSchema, DatasetStats, FieldDef};
pub use form::{DatasetAction, FormDeletionOutcome, FormDeletionPlan, LinkedDatasetSummary};
pub use record::{Record, RecordPage};
pub use sheets::SpreadsheetInfo;
pub use sync::{PublishOutcome, SheetSyncConfig, SyncOutcome};
