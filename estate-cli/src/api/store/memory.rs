//! In-memory record store for tests

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{ListFilter, RecordStore};
use crate::error::{SyncError, SyncResult};
use crate::models::{EntityType, Record};

#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<BTreeMap<(EntityType, String), Record>>>,
    writes: Arc<AtomicUsize>,
    /// Business numbers whose upsert fails with a transport error
    failing: Arc<Mutex<Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a record directly, bypassing upsert bookkeeping (a manual edit)
    pub fn insert(&self, record: Record) {
        let key = (record.entity_type(), record.business_number().to_string());
        self.records.lock().unwrap().insert(key, record);
    }

    pub fn snapshot(&self, entity: EntityType, business_number: &str) -> Option<Record> {
        self.records
            .lock()
            .unwrap()
            .get(&(entity, business_number.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_upserts_for(&self, business_number: &str) {
        self.failing.lock().unwrap().push(business_number.to_string());
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, entity: EntityType, business_number: &str) -> SyncResult<Option<Record>> {
        Ok(self
            .snapshot(entity, business_number)
            .filter(Record::is_active))
    }

    async fn upsert(&self, record: &Record) -> SyncResult<Record> {
        if self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|n| n == record.business_number())
        {
            return Err(SyncError::Transport("connection reset by peer".into()));
        }

        let key = (record.entity_type(), record.business_number().to_string());
        let mut records = self.records.lock().unwrap();
        let stored = match records.get(&key) {
            Some(existing) => existing.merged_with(record)?,
            None => record.clone(),
        };
        records.insert(key, stored.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn list(&self, entity: EntityType, filter: &ListFilter) -> SyncResult<Vec<Record>> {
        let records = self.records.lock().unwrap();
        let mut out = Vec::new();
        for ((e, _), record) in records.iter() {
            if *e != entity {
                continue;
            }
            if filter.matches(&record.to_json_map()?) {
                out.push(record.clone());
            }
            if filter.limit.is_some_and(|limit| out.len() >= limit) {
                break;
            }
        }
        Ok(out)
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}
