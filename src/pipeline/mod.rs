//! Aggregation pipelines
//!
//! A pipeline is an ordered list of transform stages executed by the
//! backend over every record of the collection. Stages are plain data so
//! a remote backend can ship them over the wire; the embedded backend
//! interprets them locally via [`eval`].

pub mod eval;

use serde::{Deserialize, Serialize};

use crate::core::TAGS_FIELD;

/// Field name a `Group` stage emits its key under.
pub const GROUP_KEY_FIELD: &str = "_id";

/// One transform stage of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stage {
    /// Replace each record having an array at `path` with one record per
    /// element, the element substituted in place of the array. Records
    /// where `path` is missing, null, or an empty array are dropped.
    Unwind { path: String },

    /// Group records by the value at `by` and fold each group through an
    /// accumulator, emitted under the `output` field. Each result row
    /// carries its group key under [`GROUP_KEY_FIELD`].
    Group {
        by: String,
        accumulator: Accumulator,
        output: String,
    },

    /// Reshape each row: the output row has exactly the projected fields,
    /// each copied from its source field on the input row.
    Project { fields: Vec<Projection> },
}

/// Fold applied to each group of a `Group` stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Accumulator {
    /// Number of records in the group.
    Count,

    /// Sum of the numeric values at `path` across the group.
    /// Non-numeric and missing values contribute nothing.
    Sum { path: String },
}

/// One output field of a `Project` stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Field name on the output row
    pub target: String,
    /// Field name on the input row
    pub source: String,
}

impl Projection {
    pub fn new(target: &str, source: &str) -> Self {
        Self {
            target: target.to_string(),
            source: source.to_string(),
        }
    }
}

/// The canned tag-occurrence pipeline: unwind `tags`, count per distinct
/// tag value, reshape to `{tag, count}` rows. A record with N tags
/// contributes to N groups; a record with no tags contributes to none.
pub fn tag_counts() -> Vec<Stage> {
    vec![
        Stage::Unwind {
            path: TAGS_FIELD.to_string(),
        },
        Stage::Group {
            by: TAGS_FIELD.to_string(),
            accumulator: Accumulator::Count,
            output: "count".to_string(),
        },
        Stage::Project {
            fields: vec![
                Projection::new("tag", GROUP_KEY_FIELD),
                Projection::new("count", "count"),
            ],
        },
    ]
}
