pub mod config;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

use crate::core::{Result, StoreError};
use crate::store::{self, DocumentStore};
use config::StoreConfig;

/// Backend session handle
///
/// Owns exactly one backend session for the lifetime of an adapter.
/// All operations take `&self`; the underlying store handle is shared
/// across every in-flight operation, so the session must be safe for
/// concurrent use (the built-in backends are).
///
/// State machine is Active -> Closed, one way. `close` is idempotent
/// and releases the backend session exactly once.
pub struct Connection {
    store: Arc<dyn DocumentStore>,
    endpoint: String,
    closed: AtomicBool,
}

impl Connection {
    /// Establish a session against the configured endpoint.
    ///
    /// Bounded by `config.connect_timeout`; an unreachable or unknown
    /// endpoint surfaces as `StoreError::Unavailable` here, never at
    /// adapter construction.
    pub(crate) async fn open(config: &StoreConfig) -> Result<Self> {
        let store = match tokio::time::timeout(config.connect_timeout, store::connect(config)).await
        {
            Ok(store) => store?,
            Err(_) => {
                return Err(StoreError::Unavailable(format!(
                    "connect to {} timed out after {:?}",
                    config.endpoint, config.connect_timeout
                )));
            }
        };

        info!("connected to {}", config.to_url());
        Ok(Self {
            store,
            endpoint: config.endpoint.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// Wrap an injected backend handle (dependency-injected hosts, tests).
    pub(crate) fn from_store(store: Arc<dyn DocumentStore>, endpoint: &str) -> Self {
        Self {
            store,
            endpoint: endpoint.to_string(),
            closed: AtomicBool::new(false),
        }
    }

    /// The shared store handle, gated on connection state.
    pub(crate) fn store(&self) -> Result<Arc<dyn DocumentStore>> {
        if self.is_closed() {
            return Err(StoreError::AdapterClosed);
        }
        Ok(Arc::clone(&self.store))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Probe backend liveness.
    pub async fn ping(&self) -> Result<()> {
        self.store()?.ping().await
    }

    /// Release the session. Safe to call more than once; only the first
    /// call reaches the backend.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("connection to {} already closed", self.endpoint);
            return Ok(());
        }

        info!("closing connection to {}", self.endpoint);
        self.store.shutdown().await
    }
}
