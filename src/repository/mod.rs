use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use serde_json::json;
use tokio::sync::OnceCell;

use crate::connection::Connection;
use crate::connection::config::StoreConfig;
use crate::core::{Document, DocumentId, ID_FIELD, Result, StoreError};
use crate::pipeline;
use crate::result::TagCount;
use crate::store::DocumentStore;

/// Document-store repository adapter
///
/// The facade a host application talks to: create, fetch and delete
/// single records by identifier, and run the tag aggregation. One
/// repository owns one backend session, established lazily on the first
/// operation, and released exactly once by [`close`](Self::close).
///
/// All operations take `&self` and may be issued concurrently; each is
/// a single logical request to the store. A configured
/// `operation_timeout` bounds every call, surfacing an elapsed deadline
/// as `StoreError::Cancelled`. Dropping an operation future cancels it
/// without attributing any partial effect to the caller.
///
/// # Examples
///
/// ```
/// use taskstore::{Document, StoreConfig, TaskRepository};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let repo = TaskRepository::connect(StoreConfig::in_memory("task_db", "tasks")).unwrap();
///
/// let payload = Document::from_json(json!({
///     "title": "Ship the release",
///     "tags": ["release", "urgent"],
/// })).unwrap();
///
/// let id = repo.create(payload).await.unwrap();
/// let task = repo.get(&id).await.unwrap().expect("just created");
/// assert_eq!(task.id(), Some(id.as_str()));
///
/// assert!(repo.delete(&id).await.unwrap());
/// assert!(repo.get(&id).await.unwrap().is_none());
/// repo.close().await.unwrap();
/// # });
/// ```
pub struct TaskRepository {
    config: StoreConfig,
    conn: OnceCell<Connection>,
    closed: AtomicBool,
}

impl TaskRepository {
    /// Create an adapter for the configured collection.
    ///
    /// Fails only on a malformed configuration. The endpoint is not
    /// contacted here; an unreachable store surfaces as
    /// `StoreError::Unavailable` from the first operation instead.
    pub fn connect(config: StoreConfig) -> Result<Self> {
        config.validate().map_err(StoreError::Config)?;

        Ok(Self {
            config,
            conn: OnceCell::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Create an adapter from a connection URL
    /// (`scheme://authority/database/collection`).
    pub fn connect_url(url: &str) -> Result<Self> {
        let config = StoreConfig::from_url(url).map_err(StoreError::Config)?;
        Self::connect(config)
    }

    /// Create an adapter over an injected backend handle.
    ///
    /// For hosts that construct or pool their own store sessions, and
    /// for tests substituting a backend.
    pub fn with_store(store: Arc<dyn DocumentStore>, config: StoreConfig) -> Self {
        let conn = Connection::from_store(store, &config.endpoint);
        Self {
            config,
            conn: OnceCell::new_with(Some(conn)),
            closed: AtomicBool::new(false),
        }
    }

    /// Insert one record and return its assigned identifier token.
    ///
    /// The payload is opaque; no fields are required or interpreted.
    /// On success exactly one new record is visible to subsequent reads;
    /// a token is only returned once the store acknowledged the write.
    pub async fn create(&self, doc: Document) -> Result<String> {
        let store = self.store().await?;

        let id = self.run("create", store.insert_one(doc)).await?;
        debug!("created record {} in {}", id, self.config.collection);
        Ok(id.to_hex())
    }

    /// Fetch the record with this identifier token.
    ///
    /// A token that is not a valid identifier encoding folds to
    /// `Ok(None)` without contacting the store: from the caller's view
    /// the outcome is the same as a well-formed token nothing matches.
    /// On a hit, the payload carries the token under `"id"` (replacing
    /// any field of that name the payload had).
    pub async fn get(&self, id: &str) -> Result<Option<Document>> {
        if self.is_closed() {
            return Err(StoreError::AdapterClosed);
        }

        // Folding happens before any session exists; a malformed token
        // must never trigger lazy connection establishment.
        let id = match DocumentId::parse_str(id) {
            Ok(id) => id,
            Err(_) => {
                debug!("malformed identifier {:?} folded to absent", id);
                return Ok(None);
            }
        };

        let store = self.store().await?;
        let found = self.run("get", store.find_one(id)).await?;
        Ok(found.map(|mut doc| {
            doc.set(ID_FIELD, json!(id.to_hex()));
            doc
        }))
    }

    /// Delete the record with this identifier token.
    ///
    /// Returns `true` iff exactly one record was deleted. A malformed
    /// token folds to `Ok(false)` without contacting the store.
    /// Idempotent in effect: the first delete of a live record returns
    /// `true`, every later one `false`.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        if self.is_closed() {
            return Err(StoreError::AdapterClosed);
        }

        let id = match DocumentId::parse_str(id) {
            Ok(id) => id,
            Err(_) => {
                debug!("malformed identifier {:?} folded to no-op delete", id);
                return Ok(false);
            }
        };

        let store = self.store().await?;
        let deleted = self.run("delete", store.delete_one(id)).await?;
        match deleted {
            0 => Ok(false),
            1 => Ok(true),
            n => {
                // Unique identifiers make this impossible; if the store
                // reports it anyway, something upstream is corrupt.
                warn!("store deleted {} records for single identifier {}", n, id);
                Err(StoreError::InvariantViolation(format!(
                    "delete by identifier removed {} records",
                    n
                )))
            }
        }
    }

    /// Count tag occurrences across all records.
    ///
    /// A record with N tags contributes to N groups; records without
    /// tags contribute to none. Row order is unspecified and must not
    /// be relied on. All-or-nothing: either the full result set decodes
    /// or the call fails.
    pub async fn aggregate_by_tags(&self) -> Result<Vec<TagCount>> {
        let store = self.store().await?;
        let stages = pipeline::tag_counts();

        let rows = self
            .run("aggregate_by_tags", store.run_pipeline(&stages))
            .await?;
        TagCount::from_rows(rows)
    }

    /// Probe backend liveness.
    pub async fn ping(&self) -> Result<()> {
        let store = self.store().await?;
        self.run("ping", store.ping()).await
    }

    /// Release the backend session. Idempotent; afterwards every other
    /// operation fails with `StoreError::AdapterClosed`.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        match self.conn.get() {
            Some(conn) => conn.close().await,
            // Never used, so there is no session to release.
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The collection this adapter is bound to.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Shared store handle, establishing the session on first use.
    async fn store(&self) -> Result<Arc<dyn DocumentStore>> {
        if self.is_closed() {
            return Err(StoreError::AdapterClosed);
        }

        let conn = self
            .conn
            .get_or_try_init(|| Connection::open(&self.config))
            .await?;
        conn.store()
    }

    /// Apply the configured per-operation deadline.
    async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.config.operation_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Cancelled(format!(
                    "{} exceeded deadline of {:?}",
                    op, limit
                ))),
            },
            None => fut.await,
        }
    }
}
