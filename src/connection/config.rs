use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Store connection configuration
///
/// Identifies one collection inside one logical database behind one
/// endpoint. Building a config never touches the network; reachability
/// of the endpoint is checked only when an operation first runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection target, `scheme://authority` (e.g. `memory://local`)
    pub endpoint: String,

    /// Logical namespace within the store
    pub database: String,

    /// Record set name within the database
    pub collection: String,

    /// Budget for establishing the backend session
    pub connect_timeout: Duration,

    /// Default per-operation deadline; `None` means wait indefinitely
    pub operation_timeout: Option<Duration>,
}

impl StoreConfig {
    /// Create a configuration for one collection.
    pub fn new(endpoint: &str, database: &str, collection: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            database: database.to_string(),
            collection: collection.to_string(),
            connect_timeout: Duration::from_secs(30),
            operation_timeout: None,
        }
    }

    /// In-memory backend shorthand, mostly for tests and embedded hosts.
    pub fn in_memory(database: &str, collection: &str) -> Self {
        Self::new("memory://local", database, collection)
    }

    /// Set the session establishment budget
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the default per-operation deadline
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Parse from a connection URL
    ///
    /// Format: `scheme://authority/database/collection`
    ///
    /// # Examples
    ///
    /// ```
    /// use taskstore::StoreConfig;
    ///
    /// let config = StoreConfig::from_url("memory://local/task_db/tasks").unwrap();
    /// assert_eq!(config.database, "task_db");
    /// assert_eq!(config.collection, "tasks");
    /// ```
    pub fn from_url(url: &str) -> Result<Self, String> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| "URL must contain '://'".to_string())?;

        if scheme.is_empty() {
            return Err("URL scheme cannot be empty".to_string());
        }

        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != 3 {
            return Err(
                "expected 'scheme://authority/database/collection'".to_string(),
            );
        }

        let (authority, database, collection) = (parts[0], parts[1], parts[2]);
        if authority.is_empty() {
            return Err("authority cannot be empty".to_string());
        }

        let config = Self::new(&format!("{}://{}", scheme, authority), database, collection);
        config.validate()?;
        Ok(config)
    }

    /// Convert back to a connection URL
    pub fn to_url(&self) -> String {
        format!("{}/{}/{}", self.endpoint, self.database, self.collection)
    }

    /// The endpoint scheme (`memory`, `taskstore`, ...)
    pub fn scheme(&self) -> &str {
        self.endpoint
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or("")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.endpoint.contains("://") {
            return Err("endpoint must be of the form 'scheme://authority'".to_string());
        }

        if self.database.is_empty() {
            return Err("database cannot be empty".to_string());
        }

        if self.collection.is_empty() {
            return Err("collection cannot be empty".to_string());
        }

        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_memory("taskstore", "tasks")
    }
}
