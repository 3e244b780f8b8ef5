use crate::db::{DatasetStorage, RecordStorage};
use crate::error::BridgeError;
use crate::types::{Record, RecordPage};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// UI pages are capped at 100 records; the full count is reconciled by a
/// separate counting pass.
pub const MAX_PAGE_SIZE: i64 = 100;

const DELETE_BATCH_SIZE: i64 = 500;

/// Read contract over append-only submission records, plus the
/// deletion-on-cascade contract used when a form is removed.
#[derive(Clone)]
pub struct RecordService {
    records: RecordStorage,
    datasets: DatasetStorage,
}

impl RecordService {
    pub fn new(records: RecordStorage, datasets: DatasetStorage) -> Self {
        Self { records, datasets }
    }

    /// Newest-first, cursor-paginated. `next_cursor` is set only when the
    /// page came back full, so callers can avoid a count on short pages.
    pub async fn list_records(
        &self,
        dataset_id: &str,
        page_size: Option<i64>,
        cursor: Option<i64>,
    ) -> Result<RecordPage, BridgeError> {
        self.require_dataset(dataset_id).await?;
        let limit = page_size.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let rows = self.records.list_desc(dataset_id, limit, cursor).await?;
        let full_page = rows.len() as i64 == limit;
        let records: Vec<Record> = rows
            .into_iter()
            .map(Record::try_from)
            .collect::<Result<_, _>>()?;
        let next_cursor = if full_page {
            records.last().map(|r| r.id)
        } else {
            None
        };
        Ok(RecordPage {
            records,
            next_cursor,
        })
    }

    /// Separate full-count pass; potentially expensive, invoked when a
    /// capped first page cannot infer the total.
    pub async fn count_records(&self, dataset_id: &str) -> Result<i64, BridgeError> {
        self.require_dataset(dataset_id).await?;
        self.records.count(dataset_id).await
    }

    /// Append one record. The data keys are advisory with respect to the
    /// dataset schema; they are not validated at write time.
    pub async fn insert_record(
        &self,
        dataset_id: &str,
        data: &Map<String, Value>,
    ) -> Result<i64, BridgeError> {
        self.require_dataset(dataset_id).await?;
        let id = self.records.insert(dataset_id, data).await?;
        debug!(dataset_id, record_id = id, "record appended");
        Ok(id)
    }

    /// Bounded-batch deletion. Not atomic across the whole set; a partial
    /// run is safe to retry since each row delete is idempotent.
    pub async fn delete_all_for_dataset(&self, dataset_id: &str) -> Result<u64, BridgeError> {
        let mut total: u64 = 0;
        loop {
            let removed = self
                .records
                .delete_batch(dataset_id, DELETE_BATCH_SIZE)
                .await?;
            total += removed;
            if removed < DELETE_BATCH_SIZE as u64 {
                break;
            }
        }
        if total > 0 {
            info!(dataset_id, deleted = total, "dataset records deleted");
        }
        Ok(total)
    }

    async fn require_dataset(&self, dataset_id: &str) -> Result<(), BridgeError> {
        self.datasets
            .get(dataset_id)
            .await?
            .map(|_| ())
            .ok_or(BridgeError::NotFound("dataset"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::test_support::memory_pool;
    use crate::service::registry::DatasetRegistry;
    use crate::types::FieldDef;
    use serde_json::json;

    async fn setup() -> (RecordService, String) {
        let pool = memory_pool().await;
        let datasets = DatasetStorage::new(pool.clone());
        let records = RecordStorage::new(pool);
        let registry = DatasetRegistry::new(datasets.clone(), records.clone());
        let dataset_id = registry
            .ensure_dataset_for_form(
                "form-1",
                "Signup",
                &[FieldDef {
                    name: "email".into(),
                    field_type: "email".into(),
                    required: true,
                    description: None,
                }],
            )
            .await
            .unwrap();
        (RecordService::new(records, datasets), dataset_id)
    }

    fn data(email: &str) -> Map<String, Value> {
        let Value::Object(map) = json!({ "email": email }) else {
            unreachable!()
        };
        map
    }

    #[tokio::test]
    async fn pagination_is_newest_first_with_cursor() {
        let (svc, ds) = setup().await;
        for i in 0..5 {
            svc.insert_record(&ds, &data(&format!("u{i}@example.org")))
                .await
                .unwrap();
        }

        let page1 = svc.list_records(&ds, Some(2), None).await.unwrap();
        assert_eq!(page1.records.len(), 2);
        assert!(page1.records[0].id > page1.records[1].id);
        let cursor = page1.next_cursor.expect("full page yields a cursor");

        let page2 = svc.list_records(&ds, Some(2), Some(cursor)).await.unwrap();
        assert_eq!(page2.records.len(), 2);
        assert!(page2.records[0].id < cursor);

        let page3 = svc
            .list_records(&ds, Some(2), page2.next_cursor)
            .await
            .unwrap();
        assert_eq!(page3.records.len(), 1);
        assert!(page3.next_cursor.is_none());
    }

    #[tokio::test]
    async fn short_page_has_no_cursor() {
        let (svc, ds) = setup().await;
        svc.insert_record(&ds, &data("a@example.org")).await.unwrap();
        let page = svc.list_records(&ds, Some(10), None).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn page_size_is_clamped() {
        let (svc, ds) = setup().await;
        // A request for more than the cap must not exceed it.
        let page = svc.list_records(&ds, Some(10_000), None).await.unwrap();
        assert!(page.records.len() as i64 <= MAX_PAGE_SIZE);
    }

    #[tokio::test]
    async fn count_matches_inserts() {
        let (svc, ds) = setup().await;
        for i in 0..3 {
            svc.insert_record(&ds, &data(&format!("u{i}@example.org")))
                .await
                .unwrap();
        }
        assert_eq!(svc.count_records(&ds).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn delete_all_is_idempotent() {
        let (svc, ds) = setup().await;
        for i in 0..4 {
            svc.insert_record(&ds, &data(&format!("u{i}@example.org")))
                .await
                .unwrap();
        }
        assert_eq!(svc.delete_all_for_dataset(&ds).await.unwrap(), 4);
        // Retry after completion removes nothing and does not fail.
        assert_eq!(svc.delete_all_for_dataset(&ds).await.unwrap(), 0);
        assert_eq!(svc.count_records(&ds).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn listing_missing_dataset_is_not_found() {
        let (svc, _) = setup().await;
        let err = svc.list_records("ghost", None, None).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotFound("dataset")));
    }
}
