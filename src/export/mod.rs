//! Generation descriptor handed to the execution engine.

pub mod descriptor;
pub mod replacement;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use descriptor::{export, ExportError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationDescriptor {
    pub global: GlobalSection,
    pub samples: Vec<SampleDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalSection {
    pub output: OutputSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_files: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleDescriptor {
    pub name: String,
    /// Backfill start, if any
    pub begin: Option<String>,
    pub count: Option<i64>,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub interval: Option<i64>,
    pub randomize_count: Option<f64>,
    pub randomize_events: Option<bool>,
    /// Sample records with trailing whitespace removed from every field
    pub lines: Vec<BTreeMap<String, String>>,
    pub tokens: Vec<TokenDescriptor>,
}

/// Numeric range bound; integers for `integer[..]`, floats for `float[..]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Int(i64),
    Float(f64),
}

/// A substitution rule in the engine's shape. Which optional fields are set
/// depends on `token_type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDescriptor {
    pub name: String,
    pub format: String,
    /// Pattern with at least one capturing group
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_choice: Option<Vec<BTreeMap<usize, String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
}

impl TokenDescriptor {
    pub fn new(name: impl Into<String>, token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: "regex".to_string(),
            token: token.into(),
            token_type: token_type.into(),
            ..Self::default()
        }
    }
}
