//! Data store accessor
//!
//! Thin query/upsert layer over the relational store, keyed by business
//! number. The sync service and the diagnostic commands both go through the
//! [`RecordStore`] trait.

pub mod dry_run;
pub mod filter;
#[cfg(test)]
pub mod memory;
pub mod rest;

pub use dry_run::DryRunStore;
pub use filter::{Filter, FilterValue, ListFilter};
pub use rest::RestStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SyncResult;
use crate::models::{EntityType, Record};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Active (not soft-deleted) record with this business number
    async fn get(&self, entity: EntityType, business_number: &str) -> SyncResult<Option<Record>>;

    /// Insert or update keyed by business number. Only the fields set on
    /// `record` are written; the stored record is returned.
    async fn upsert(&self, record: &Record) -> SyncResult<Record>;

    async fn list(&self, entity: EntityType, filter: &ListFilter) -> SyncResult<Vec<Record>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn get(&self, entity: EntityType, business_number: &str) -> SyncResult<Option<Record>> {
        (**self).get(entity, business_number).await
    }

    async fn upsert(&self, record: &Record) -> SyncResult<Record> {
        (**self).upsert(record).await
    }

    async fn list(&self, entity: EntityType, filter: &ListFilter) -> SyncResult<Vec<Record>> {
        (**self).list(entity, filter).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
