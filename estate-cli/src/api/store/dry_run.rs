//! Store decorator that reads through and never writes

use async_trait::async_trait;
use log::info;

use super::{ListFilter, RecordStore};
use crate::error::SyncResult;
use crate::models::{EntityType, Record};

pub struct DryRunStore<S> {
    inner: S,
}

impl<S: RecordStore> DryRunStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for DryRunStore<S> {
    async fn get(&self, entity: EntityType, business_number: &str) -> SyncResult<Option<Record>> {
        self.inner.get(entity, business_number).await
    }

    /// Returns what the store would hold after the upsert
    async fn upsert(&self, record: &Record) -> SyncResult<Record> {
        let existing = self
            .inner
            .get(record.entity_type(), record.business_number())
            .await?;
        let preview = match existing {
            Some(current) => current.merged_with(record)?,
            None => record.clone(),
        };
        info!(
            "[dry-run] would upsert {} {} ({} fields)",
            record.entity_type(),
            record.business_number(),
            record.to_json_map()?.len()
        );
        Ok(preview)
    }

    async fn list(&self, entity: EntityType, filter: &ListFilter) -> SyncResult<Vec<Record>> {
        self.inner.list(entity, filter).await
    }

    fn describe(&self) -> String {
        format!("{} (dry run)", self.inner.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::store::memory::MemoryStore;
    use crate::models::SellerRecord;

    #[tokio::test]
    async fn test_dry_run_never_writes() {
        let inner = MemoryStore::new();
        inner.insert(Record::Seller(SellerRecord {
            seller_number: "AA1".into(),
            name: Some("旧".into()),
            comments: Some("keep".into()),
            ..Default::default()
        }));
        let store = DryRunStore::new(inner.clone());

        let preview = store
            .upsert(&Record::Seller(SellerRecord {
                seller_number: "AA1".into(),
                name: Some("新".into()),
                ..Default::default()
            }))
            .await
            .unwrap();

        match preview {
            Record::Seller(s) => {
                assert_eq!(s.name.as_deref(), Some("新"));
                assert_eq!(s.comments.as_deref(), Some("keep"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let stored = inner.get(EntityType::Seller, "AA1").await.unwrap().unwrap();
        match stored {
            Record::Seller(s) => assert_eq!(s.name.as_deref(), Some("旧")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(inner.write_count(), 0);
    }
}
