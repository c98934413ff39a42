use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::core::{Result, StoreError};

/// Field under which reads surface the record's identifier token.
pub const ID_FIELD: &str = "id";

/// Field interpreted by tag aggregation. Everything else is opaque payload.
pub const TAGS_FIELD: &str = "tags";

/// Schema-less record payload.
///
/// A thin wrapper over a string-keyed JSON object. The adapter does not
/// enforce any required fields; the only field it ever interprets is
/// `tags` (an array of strings consumed by aggregation). The store keeps
/// the payload verbatim and associates it with an assigned identifier.
///
/// # Examples
///
/// ```
/// use taskstore::Document;
/// use serde_json::json;
///
/// let mut doc = Document::new();
/// doc.set("title", json!("Write release notes"));
/// doc.set("tags", json!(["docs", "release"]));
///
/// assert_eq!(doc.tags(), vec!["docs", "release"]);
/// assert_eq!(doc.get("title"), Some(&json!("Write release notes")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, JsonValue>);

impl Document {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a payload from any JSON value. Only objects are accepted;
    /// a record body is a field mapping, never a bare scalar or array.
    pub fn from_json(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(map) => Ok(Self(map)),
            other => Err(StoreError::Malformed(format!(
                "record payload must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: JsonValue) -> &mut Self {
        self.0.insert(field.into(), value);
        self
    }

    /// Read a field.
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.0.get(field)
    }

    /// Remove a field, returning its previous value.
    pub fn remove(&mut self, field: &str) -> Option<JsonValue> {
        self.0.remove(field)
    }

    /// The record's tag sequence, in payload order.
    ///
    /// Missing `tags`, a non-array `tags`, and non-string entries all
    /// contribute nothing.
    pub fn tags(&self) -> Vec<&str> {
        match self.0.get(TAGS_FIELD) {
            Some(JsonValue::Array(items)) => {
                items.iter().filter_map(|v| v.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// The identifier token, if this payload came back from a read.
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(|v| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }

    /// View the payload as a plain JSON object.
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    /// Consume the payload into a JSON value.
    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(self.0)
    }
}

impl From<Map<String, JsonValue>> for Document {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
