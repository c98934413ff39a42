pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::connection::config::StoreConfig;
use crate::core::{Document, DocumentId, Result, StoreError};
use crate::pipeline::Stage;

pub use memory::MemoryCollection;

/// The narrow interface of an external document store.
///
/// This is everything the adapter depends on: single-record insert,
/// find, delete by identifier, server-side pipeline execution, and a
/// liveness probe. The storage engine, query planner, and wire protocol
/// behind these calls are the backend's concern.
///
/// Implementations must be safe for concurrent use; a single handle is
/// shared across every in-flight operation of an adapter.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert one record. The store assigns and returns a fresh
    /// identifier; it never reuses one, even after deletion.
    async fn insert_one(&self, doc: Document) -> Result<DocumentId>;

    /// Fetch the record with this identifier, if any.
    async fn find_one(&self, id: DocumentId) -> Result<Option<Document>>;

    /// Delete the record with this identifier. Returns the raw deletion
    /// count as reported by the store; with unique identifiers that
    /// count can only legitimately be 0 or 1, and the adapter treats
    /// anything else as an invariant violation.
    async fn delete_one(&self, id: DocumentId) -> Result<u64>;

    /// Execute an aggregation pipeline over the whole collection and
    /// return the fully materialized result rows. All-or-nothing: a
    /// partial row set must never be returned as success.
    async fn run_pipeline(&self, stages: &[Stage]) -> Result<Vec<JsonValue>>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<()>;

    /// Release backend-side session resources. Idempotent.
    async fn shutdown(&self) -> Result<()>;
}

/// Resolve a backend for the configured endpoint.
///
/// Only the `memory` scheme has a built-in backend. Anything else
/// surfaces `StoreError::Unavailable` at session establishment, never
/// at adapter construction.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>> {
    config.validate().map_err(StoreError::Config)?;

    match config.scheme() {
        "memory" => Ok(Arc::new(MemoryCollection::open(
            &config.database,
            &config.collection,
        ))),
        other => Err(StoreError::Unavailable(format!(
            "no backend registered for endpoint scheme '{}'",
            other
        ))),
    }
}
