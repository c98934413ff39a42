//! In-memory pipeline interpreter
//!
//! Runs a stage list over materialized JSON rows. Used by the embedded
//! backend; a server-backed store would execute the same stages remotely.

use std::collections::HashMap;

use serde_json::{Map, Number, Value as JsonValue};

use super::{Accumulator, GROUP_KEY_FIELD, Projection, Stage};
use crate::core::{Result, StoreError};

/// Execute a pipeline over a row set, stage by stage.
pub fn execute(stages: &[Stage], rows: Vec<JsonValue>) -> Result<Vec<JsonValue>> {
    let mut current = rows;
    for stage in stages {
        current = match stage {
            Stage::Unwind { path } => unwind(path, current)?,
            Stage::Group {
                by,
                accumulator,
                output,
            } => group(by, accumulator, output, current)?,
            Stage::Project { fields } => project(fields, current)?,
        };
    }
    Ok(current)
}

fn as_object(row: JsonValue) -> Result<Map<String, JsonValue>> {
    match row {
        JsonValue::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(format!(
            "pipeline row is not an object: {}",
            other
        ))),
    }
}

fn unwind(path: &str, rows: Vec<JsonValue>) -> Result<Vec<JsonValue>> {
    let mut out = Vec::with_capacity(rows.len());

    for row in rows {
        let map = as_object(row)?;
        match map.get(path) {
            // Missing, null and empty arrays drop the record.
            None | Some(JsonValue::Null) => {}
            Some(JsonValue::Array(items)) => {
                for item in items.clone() {
                    let mut unwound = map.clone();
                    unwound.insert(path.to_string(), item);
                    out.push(JsonValue::Object(unwound));
                }
            }
            // A scalar unwinds to itself, one row.
            Some(_) => out.push(JsonValue::Object(map)),
        }
    }

    Ok(out)
}

fn group(
    by: &str,
    accumulator: &Accumulator,
    output: &str,
    rows: Vec<JsonValue>,
) -> Result<Vec<JsonValue>> {
    // Keyed by the serialized group value; serde_json::Value is not
    // hashable. The original value is kept for the output row.
    let mut groups: HashMap<String, (JsonValue, f64, u64)> = HashMap::new();

    for row in rows {
        let map = as_object(row)?;
        let key_value = map.get(by).cloned().unwrap_or(JsonValue::Null);
        let key = serde_json::to_string(&key_value)?;

        let entry = groups.entry(key).or_insert((key_value, 0.0, 0));
        entry.2 += 1;
        if let Accumulator::Sum { path } = accumulator {
            if let Some(n) = map.get(path).and_then(JsonValue::as_f64) {
                entry.1 += n;
            }
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (_, (key_value, sum, count)) in groups {
        let folded = match accumulator {
            Accumulator::Count => JsonValue::Number(Number::from(count)),
            Accumulator::Sum { .. } => Number::from_f64(sum)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
        };

        let mut row = Map::new();
        row.insert(GROUP_KEY_FIELD.to_string(), key_value);
        row.insert(output.to_string(), folded);
        out.push(JsonValue::Object(row));
    }

    Ok(out)
}

fn project(fields: &[Projection], rows: Vec<JsonValue>) -> Result<Vec<JsonValue>> {
    let mut out = Vec::with_capacity(rows.len());

    for row in rows {
        let map = as_object(row)?;
        let mut projected = Map::new();
        for field in fields {
            if let Some(value) = map.get(&field.source) {
                projected.insert(field.target.clone(), value.clone());
            }
        }
        out.push(JsonValue::Object(projected));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tag_counts;
    use serde_json::json;

    #[test]
    fn test_unwind_expands_arrays() {
        let input = vec![json!({"t": "x", "tags": ["a", "b"]})];
        let out = unwind("tags", input).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0], json!({"t": "x", "tags": "a"}));
        assert_eq!(out[1], json!({"t": "x", "tags": "b"}));
    }

    #[test]
    fn test_unwind_drops_missing_and_empty() {
        let input = vec![
            json!({"tags": []}),
            json!({"other": 1}),
            json!({"tags": null}),
        ];
        assert!(unwind("tags", input).unwrap().is_empty());
    }

    #[test]
    fn test_unwind_scalar_passes_through() {
        let input = vec![json!({"tags": "solo"})];
        let out = unwind("tags", input).unwrap();
        assert_eq!(out, vec![json!({"tags": "solo"})]);
    }

    #[test]
    fn test_group_count() {
        let input = vec![
            json!({"tags": "a"}),
            json!({"tags": "b"}),
            json!({"tags": "a"}),
        ];
        let mut out = group("tags", &Accumulator::Count, "count", input).unwrap();
        out.sort_by_key(|r| r[GROUP_KEY_FIELD].as_str().unwrap_or("").to_string());

        assert_eq!(
            out,
            vec![json!({"_id": "a", "count": 2}), json!({"_id": "b", "count": 1})]
        );
    }

    #[test]
    fn test_group_sum_skips_non_numeric() {
        let input = vec![
            json!({"k": "g", "n": 2}),
            json!({"k": "g", "n": "not a number"}),
            json!({"k": "g", "n": 3.5}),
        ];
        let out = group(
            "k",
            &Accumulator::Sum {
                path: "n".to_string(),
            },
            "total",
            input,
        )
        .unwrap();

        assert_eq!(out, vec![json!({"_id": "g", "total": 5.5})]);
    }

    #[test]
    fn test_project_renames_and_drops() {
        let input = vec![json!({"_id": "a", "count": 2, "junk": true})];
        let fields = vec![
            Projection::new("tag", "_id"),
            Projection::new("count", "count"),
        ];
        let out = project(&fields, input).unwrap();

        assert_eq!(out, vec![json!({"tag": "a", "count": 2})]);
    }

    #[test]
    fn test_full_tag_count_pipeline() {
        let input = vec![
            json!({"title": "one", "tags": ["a", "b"]}),
            json!({"title": "two", "tags": ["a"]}),
            json!({"title": "three", "tags": []}),
        ];

        let mut out = execute(&tag_counts(), input).unwrap();
        out.sort_by_key(|r| r["tag"].as_str().unwrap_or("").to_string());

        assert_eq!(
            out,
            vec![json!({"tag": "a", "count": 2}), json!({"tag": "b", "count": 1})]
        );
    }

    #[test]
    fn test_non_object_row_is_rejected() {
        let input = vec![json!("scalar row")];
        assert!(execute(&tag_counts(), input).is_err());
    }
}
