pub mod document;
pub mod error;
pub mod id;

pub use document::{Document, ID_FIELD, TAGS_FIELD};
pub use error::{Result, StoreError};
pub use id::DocumentId;
