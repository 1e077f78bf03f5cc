use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A datasource query. Queries are built by a separate query builder and are
/// forwarded to the server untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSourceQuery(pub Value);

/// A preprocessing chain applied by every node before the computation runs.
/// Like queries, chains are opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreprocessingChain(pub Value);

/// Data supplied by the local node in place of its datasource, keyed by
/// column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalInput(pub BTreeMap<String, Vec<String>>);

impl LocalInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column<S: Into<String>>(mut self, column: S, values: Vec<String>) -> Self {
        self.0.insert(column.into(), values);
        self
    }
}

/// How nodes treat inputs falling outside the declared bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputClippingMethod {
    /// Clip silently.
    Silent,
    /// Clip and report a warning.
    Warning,
    /// Refuse to run.
    Error,
    /// Do not clip.
    None,
}

/// Differential privacy policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DpPolicy {
    #[serde(default)]
    pub use_differential_privacy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_queries: Option<u64>,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

/// The datasource settings forwarded with a computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_query: Option<DataSourceQuery>,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

/// The subset of a project this client needs to build definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Query used when a computation does not bring its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_query: Option<DataSourceQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp_policy: Option<DpPolicy>,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl Project {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            name: None,
            data_source_query: None,
            dp_policy: None,
            additional_properties: Map::new(),
        }
    }

    /// Whether computations of this project run under differential privacy.
    pub fn enforces_dp(&self) -> bool {
        self.dp_policy
            .as_ref()
            .map_or(false, |policy| policy.use_differential_privacy)
    }
}
