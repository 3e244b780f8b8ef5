use crate::db::SubmissionStorage;
use crate::error::BridgeError;
use crate::service::records::RecordService;
use crate::service::registry::DatasetRegistry;
use crate::types::{
    DatasetAction, FieldDef, FormDeletionOutcome, FormDeletionPlan, LinkedDatasetSummary,
};
use serde_json::{Map, Value};
use tracing::{info, warn};

const SUBMISSION_DELETE_BATCH: i64 = 500;

/// Orchestrates form lifecycle events against the dataset registry: ensure
/// on save, delete-or-preserve on form deletion, submission ingestion.
#[derive(Clone)]
pub struct FormDatasetBinder {
    registry: DatasetRegistry,
    records: RecordService,
    submissions: SubmissionStorage,
}

impl FormDatasetBinder {
    pub fn new(
        registry: DatasetRegistry,
        records: RecordService,
        submissions: SubmissionStorage,
    ) -> Self {
        Self {
            registry,
            records,
            submissions,
        }
    }

    /// Called after a form save has already committed. Dataset creation is
    /// best-effort and advisory: a failure here is logged and swallowed so
    /// the form save itself is never blocked.
    pub async fn form_saved(
        &self,
        form_id: &str,
        form_title: &str,
        fields: &[FieldDef],
    ) -> Option<String> {
        if fields.is_empty() {
            return None;
        }
        match self
            .registry
            .ensure_dataset_for_form(form_id, form_title, fields)
            .await
        {
            Ok(dataset_id) => Some(dataset_id),
            Err(e) => {
                warn!(form_id, error = %e, "dataset ensure failed after form save; continuing");
                None
            }
        }
    }

    /// What a deletion of this form would touch, so the caller can choose
    /// an explicit [`DatasetAction`] for a linked dataset.
    pub async fn deletion_plan(&self, form_id: &str) -> Result<FormDeletionPlan, BridgeError> {
        let submission_count = self.submissions.count_for_form(form_id).await?;
        let linked_dataset = match self.registry.get_dataset_for_form(form_id).await? {
            Some(dataset) => Some(LinkedDatasetSummary {
                record_count: self.records.count_records(&dataset.id).await?,
                dataset_id: dataset.id,
                dataset_name: dataset.name,
            }),
            None => None,
        };
        Ok(FormDeletionPlan {
            form_id: form_id.to_string(),
            submission_count,
            linked_dataset,
        })
    }

    /// Execute the form deletion. The form's own submissions are always
    /// removed; the linked dataset is deleted or merely unlinked per the
    /// supplied action.
    pub async fn form_deleted(
        &self,
        form_id: &str,
        action: DatasetAction,
    ) -> Result<FormDeletionOutcome, BridgeError> {
        let linked = self.registry.get_dataset_for_form(form_id).await?;

        let mut submissions_deleted: u64 = 0;
        loop {
            let removed = self
                .submissions
                .delete_batch(form_id, SUBMISSION_DELETE_BATCH)
                .await?;
            submissions_deleted += removed;
            if removed < SUBMISSION_DELETE_BATCH as u64 {
                break;
            }
        }

        let mut outcome = FormDeletionOutcome {
            form_id: form_id.to_string(),
            submissions_deleted,
            dataset_deleted: None,
            dataset_preserved: None,
        };

        if let Some(dataset) = linked {
            match action {
                DatasetAction::Delete => {
                    // Explicit cascade: records first, then the document.
                    // The sheet sync config (and the backup spreadsheet)
                    // are intentionally left behind.
                    self.records.delete_all_for_dataset(&dataset.id).await?;
                    self.registry.delete_dataset(&dataset.id).await?;
                    info!(form_id, dataset_id = %dataset.id, "form and dataset deleted");
                    outcome.dataset_deleted = Some(dataset.id);
                }
                DatasetAction::Preserve => {
                    self.registry.unlink_form_from_dataset(form_id).await?;
                    info!(form_id, dataset_id = %dataset.id, "form deleted, dataset preserved");
                    outcome.dataset_preserved = Some(dataset.id);
                }
            }
        }
        Ok(outcome)
    }

    /// Store a raw submission and, when a dataset is linked, mirror it as a
    /// dataset record. No dataset is created here: ingestion has no form
    /// definition to derive a schema from.
    pub async fn ingest_submission(
        &self,
        form_id: &str,
        data: &Map<String, Value>,
    ) -> Result<Option<String>, BridgeError> {
        self.submissions.insert(form_id, data).await?;
        match self.registry.get_dataset_for_form(form_id).await? {
            Some(dataset) => {
                self.records.insert_record(&dataset.id, data).await?;
                Ok(Some(dataset.id))
            }
            None => Ok(None),
        }
    }
}
