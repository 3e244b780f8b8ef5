use crate::db::models::DbDataset;
use crate::db::{DatasetStorage, RecordStorage};
use crate::error::BridgeError;
use crate::types::{Dataset, DatasetMetadata, DatasetSchema, DatasetStats, FieldDef};
use chrono::Utc;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

/// Named datasets with form-derived schemas and idempotent "ensure"
/// semantics.
#[derive(Clone)]
pub struct DatasetRegistry {
    datasets: DatasetStorage,
    records: RecordStorage,
}

impl DatasetRegistry {
    pub fn new(datasets: DatasetStorage, records: RecordStorage) -> Self {
        Self { datasets, records }
    }

    /// Idempotent: returns the existing dataset id when one is already
    /// linked to the form, without touching its schema. A second call with
    /// a different field list does not alter the stored schema; schema
    /// drift needs an explicit update path.
    pub async fn ensure_dataset_for_form(
        &self,
        form_id: &str,
        form_title: &str,
        fields: &[FieldDef],
    ) -> Result<String, BridgeError> {
        if let Some(existing) = self.datasets.get_by_form(form_id).await? {
            return Ok(existing.id);
        }

        if fields.is_empty() {
            return Err(BridgeError::Validation(
                "cannot create a dataset from a form with no fields".into(),
            ));
        }
        let mut seen = HashSet::new();
        for f in fields {
            if !seen.insert(f.name.as_str()) {
                return Err(BridgeError::Validation(format!(
                    "duplicate field name '{}' in form definition",
                    f.name
                )));
            }
        }

        let now = Utc::now();
        let schema = DatasetSchema {
            fields: fields.to_vec(),
        };
        let candidate = DbDataset {
            id: Uuid::new_v4().to_string(),
            name: form_title.to_string(),
            source_form_id: Some(form_id.to_string()),
            source_application: "form-builder".to_string(),
            schema_json: serde_json::to_string(&schema)?,
            metadata_json: serde_json::to_string(&DatasetMetadata::default())?,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        // The UNIQUE(source_form_id) constraint absorbs concurrent ensures;
        // whoever lost the race reads the winner's row back.
        self.datasets.insert_if_absent(&candidate).await?;
        let stored = self
            .datasets
            .get_by_form(form_id)
            .await?
            .ok_or(BridgeError::NotFound("dataset"))?;
        if stored.id == candidate.id {
            info!(dataset_id = %stored.id, form_id, "dataset created for form");
        }
        Ok(stored.id)
    }

    /// `None` is a normal outcome for forms that never produced a dataset.
    pub async fn get_dataset_for_form(
        &self,
        form_id: &str,
    ) -> Result<Option<Dataset>, BridgeError> {
        self.datasets
            .get_by_form(form_id)
            .await?
            .map(Dataset::try_from)
            .transpose()
    }

    pub async fn get_dataset(&self, dataset_id: &str) -> Result<Dataset, BridgeError> {
        self.datasets
            .get(dataset_id)
            .await?
            .ok_or(BridgeError::NotFound("dataset"))?
            .try_into()
    }

    /// Hard delete of the dataset document only. Records and sheet sync
    /// config are the caller's responsibility.
    pub async fn delete_dataset(&self, dataset_id: &str) -> Result<(), BridgeError> {
        let removed = self.datasets.delete(dataset_id).await?;
        if removed == 0 {
            return Err(BridgeError::NotFound("dataset"));
        }
        info!(dataset_id, "dataset hard-deleted");
        Ok(())
    }

    /// Remove the form link, keeping the dataset. Returns whether a link
    /// existed.
    pub async fn unlink_form_from_dataset(&self, form_id: &str) -> Result<bool, BridgeError> {
        Ok(self.datasets.unlink_form(form_id).await? > 0)
    }

    /// Soft delete: flags the dataset archived in its metadata.
    pub async fn archive_dataset(
        &self,
        dataset_id: &str,
        archived_by: Option<String>,
    ) -> Result<Dataset, BridgeError> {
        let mut dataset = self.get_dataset(dataset_id).await?;
        dataset.metadata.archived = true;
        dataset.metadata.archived_at = Some(Utc::now());
        dataset.metadata.archived_by = archived_by;
        self.datasets
            .update_metadata(dataset_id, &serde_json::to_string(&dataset.metadata)?)
            .await?;
        Ok(dataset)
    }

    /// Derived stats; the record count comes from a separate counting pass
    /// and may lag writes.
    pub async fn get_dataset_stats(&self, dataset_id: &str) -> Result<DatasetStats, BridgeError> {
        let dataset = self.get_dataset(dataset_id).await?;
        let record_count = self.records.count(dataset_id).await?;
        let last_record_at = self.records.last_created_at(dataset_id).await?;
        Ok(DatasetStats {
            record_count,
            field_count: dataset.schema.fields.len(),
            last_record_at,
        })
    }

    /// Stamp the published spreadsheet URL into the dataset metadata.
    pub async fn set_sheet_url(&self, dataset_id: &str, url: &str) -> Result<(), BridgeError> {
        let mut dataset = self.get_dataset(dataset_id).await?;
        dataset.metadata.google_sheet_url = Some(url.to_string());
        self.datasets
            .update_metadata(dataset_id, &serde_json::to_string(&dataset.metadata)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::test_support::memory_pool;

    fn field(name: &str, ty: &str, required: bool) -> FieldDef {
        FieldDef {
            name: name.to_string(),
            field_type: ty.to_string(),
            required,
            description: None,
        }
    }

    async fn registry() -> DatasetRegistry {
        let pool = memory_pool().await;
        DatasetRegistry::new(DatasetStorage::new(pool.clone()), RecordStorage::new(pool))
    }

    #[tokio::test]
    async fn ensure_is_idempotent_and_preserves_schema() {
        let registry = registry().await;
        let fields = vec![field("email", "email", true), field("skills", "text", false)];

        let first = registry
            .ensure_dataset_for_form("form-1", "Volunteer Signup", &fields)
            .await
            .unwrap();
        let second = registry
            .ensure_dataset_for_form("form-1", "Volunteer Signup", &fields)
            .await
            .unwrap();
        assert_eq!(first, second);

        let dataset = registry.get_dataset(&first).await.unwrap();
        assert_eq!(dataset.name, "Volunteer Signup");
        assert_eq!(dataset.schema.fields, fields);
        assert_eq!(dataset.schema.header_row(), vec!["email", "skills"]);
    }

    #[tokio::test]
    async fn ensure_does_not_mutate_schema_on_changed_fields() {
        let registry = registry().await;
        let original = vec![field("email", "email", true)];
        let changed = vec![field("email", "email", true), field("phone", "text", false)];

        let id = registry
            .ensure_dataset_for_form("form-2", "Contact", &original)
            .await
            .unwrap();
        let again = registry
            .ensure_dataset_for_form("form-2", "Contact", &changed)
            .await
            .unwrap();
        assert_eq!(id, again);

        let dataset = registry.get_dataset(&id).await.unwrap();
        assert_eq!(dataset.schema.fields, original);
    }

    #[tokio::test]
    async fn ensure_rejects_duplicate_field_names() {
        let registry = registry().await;
        let fields = vec![field("email", "email", true), field("email", "text", false)];
        let err = registry
            .ensure_dataset_for_form("form-3", "Broken", &fields)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_dataset_is_a_normal_outcome_for_forms() {
        let registry = registry().await;
        assert!(registry
            .get_dataset_for_form("never-saved")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unlink_keeps_dataset_but_detaches_form() {
        let registry = registry().await;
        let id = registry
            .ensure_dataset_for_form("form-4", "Signup", &[field("email", "email", true)])
            .await
            .unwrap();

        assert!(registry.unlink_form_from_dataset("form-4").await.unwrap());
        assert!(registry
            .get_dataset_for_form("form-4")
            .await
            .unwrap()
            .is_none());
        // Dataset itself survives.
        let dataset = registry.get_dataset(&id).await.unwrap();
        assert_eq!(dataset.source_form_id, None);
    }

    #[tokio::test]
    async fn archive_flags_metadata() {
        let registry = registry().await;
        let id = registry
            .ensure_dataset_for_form("form-5", "Signup", &[field("email", "email", true)])
            .await
            .unwrap();
        let archived = registry
            .archive_dataset(&id, Some("ops@example.org".into()))
            .await
            .unwrap();
        assert!(archived.metadata.archived);
        assert!(archived.metadata.archived_at.is_some());

        let reloaded = registry.get_dataset(&id).await.unwrap();
        assert!(reloaded.metadata.archived);
        assert_eq!(reloaded.metadata.archived_by.as_deref(), Some("ops@example.org"));
    }

    #[tokio::test]
    async fn delete_missing_dataset_is_not_found() {
        let registry = registry().await;
        let err = registry.delete_dataset("nope").await.unwrap_err();
        assert!(matches!(err, BridgeError::NotFound("dataset")));
    }
}
