// ============================================================================
// taskstore Library
// ============================================================================
//
// A typed, resilient document-store access layer: connection lifecycle
// management, identifier validation, single-record CRUD, and
// pipeline-based aggregation. The backing store is reached through the
// narrow `DocumentStore` interface; an embeddable in-memory backend is
// built in for tests and zero-infrastructure hosts.

pub mod connection;
pub mod core;
pub mod pipeline;
pub mod repository;
pub mod result;
pub mod store;

// Re-export main types for convenience
pub use crate::connection::Connection;
pub use crate::connection::config::StoreConfig;
pub use crate::core::{Document, DocumentId, ID_FIELD, Result, StoreError, TAGS_FIELD};
pub use crate::repository::TaskRepository;
pub use crate::result::TagCount;
pub use crate::store::{DocumentStore, MemoryCollection};
