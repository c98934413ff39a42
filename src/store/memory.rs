use std::collections::BTreeMap;

use async_trait::async_trait;
use log::debug;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

use super::DocumentStore;
use crate::core::{Document, DocumentId, Result, StoreError};
use crate::pipeline::{self, Stage};

/// Embedded in-memory backend.
///
/// One instance is one collection: an identifier-keyed map behind a
/// tokio `RwLock`, so readers proceed concurrently and writers get
/// exclusive access per call. Identifiers are assigned on insert and
/// never reused; removing a record leaves its identifier retired.
///
/// Pipelines run over a point-in-time snapshot of the record set taken
/// under the read lock, so a result row set is never partial.
pub struct MemoryCollection {
    /// `database/collection`, for log lines only
    name: String,
    records: RwLock<BTreeMap<DocumentId, Document>>,
}

impl MemoryCollection {
    /// Open (create) an empty collection.
    pub fn open(database: &str, collection: &str) -> Self {
        debug!("memory backend: opening {}/{}", database, collection);
        Self {
            name: format!("{}/{}", database, collection),
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of live records.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryCollection {
    async fn insert_one(&self, doc: Document) -> Result<DocumentId> {
        let id = DocumentId::generate();
        let mut records = self.records.write().await;

        if records.insert(id, doc).is_some() {
            // Generation guarantees uniqueness within a process.
            return Err(StoreError::InvariantViolation(format!(
                "identifier collision on insert into {}",
                self.name
            )));
        }

        debug!("memory backend: inserted {} into {}", id, self.name);
        Ok(id)
    }

    async fn find_one(&self, id: DocumentId) -> Result<Option<Document>> {
        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn delete_one(&self, id: DocumentId) -> Result<u64> {
        let mut records = self.records.write().await;
        let deleted = records.remove(&id).is_some();

        if deleted {
            debug!("memory backend: deleted {} from {}", id, self.name);
        }
        Ok(deleted as u64)
    }

    async fn run_pipeline(&self, stages: &[Stage]) -> Result<Vec<JsonValue>> {
        let rows: Vec<JsonValue> = {
            let records = self.records.read().await;
            records.values().map(|doc| doc.clone().into_json()).collect()
        };

        pipeline::eval::execute(stages, rows)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        debug!("memory backend: shutting down {}", self.name);
        Ok(())
    }
}
