use serde::{Deserialize, Serialize};

/// Operator decision for a linked dataset when its owning form is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetAction {
    /// Hard-delete the dataset and all of its records.
    Delete,
    /// Keep the dataset and its records; only remove the form link.
    Preserve,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedDatasetSummary {
    pub dataset_id: String,
    pub dataset_name: String,
    pub record_count: i64,
}

/// What deleting a form would touch, presented before the deletion so the
/// caller can choose a [`DatasetAction`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDeletionPlan {
    pub form_id: String,
    pub submission_count: i64,
    pub linked_dataset: Option<LinkedDatasetSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDeletionOutcome {
    pub form_id: String,
    pub submissions_deleted: u64,
    pub dataset_deleted: Option<String>,
    pub dataset_preserved: Option<String>,
}
