use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Adapter is closed")]
    AdapterClosed,

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Store invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Malformed store response: {0}")]
    Malformed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl StoreError {
    /// True for failures where retrying against the same store could
    /// succeed. Retrying is a host concern; the adapter never retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Cancelled(_))
    }
}
