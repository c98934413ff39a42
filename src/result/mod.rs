use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::core::{Result, StoreError};

/// One row of the tag aggregation: how many records carry `tag`.
///
/// A derived, read-only projection produced fresh per call. Not an
/// entity: two rows with the same fields are the same row. The order of
/// rows within a result set is unspecified; compare result sets as
/// sets, never positionally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    /// Total occurrences across all records; always >= 1, a tag nobody
    /// carries simply has no row.
    pub count: u64,
}

impl TagCount {
    pub fn new(tag: &str, count: u64) -> Self {
        Self {
            tag: tag.to_string(),
            count,
        }
    }

    /// Decode a full pipeline result. All-or-nothing: one undecodable
    /// row fails the whole call rather than silently dropping rows.
    pub fn from_rows(rows: Vec<JsonValue>) -> Result<Vec<Self>> {
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row.clone()).map_err(|e| {
                    StoreError::Malformed(format!("bad aggregation row {}: {}", row, e))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_rows() {
        let rows = vec![json!({"tag": "a", "count": 2}), json!({"tag": "b", "count": 1})];
        let counts = TagCount::from_rows(rows).unwrap();

        assert_eq!(counts, vec![TagCount::new("a", 2), TagCount::new("b", 1)]);
    }

    #[test]
    fn test_from_rows_rejects_bad_shape() {
        assert!(TagCount::from_rows(vec![json!({"tag": "a"})]).is_err());
        assert!(TagCount::from_rows(vec![json!({"tag": 7, "count": 1})]).is_err());
        assert!(TagCount::from_rows(vec![json!("not an object")]).is_err());
    }

    #[test]
    fn test_from_rows_empty() {
        assert!(TagCount::from_rows(Vec::new()).unwrap().is_empty());
    }
}
