use serde::{Deserialize, Serialize};

/// One grouping dimension of an aggregation.
///
/// Numeric columns are bucketed either by explicit `cuts` or by
/// `bin_size`/`bin_center`; categorical columns are grouped by value, optionally
/// restricted to `possible_values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSpec {
    pub column: String,
    #[serde(default)]
    pub numeric: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuts: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_center: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possible_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_group: Option<String>,
}

impl GroupSpec {
    /// A numeric grouping with explicit cuts.
    pub fn cuts<S: Into<String>>(column: S, cuts: Vec<f64>) -> Self {
        Self {
            cuts: Some(cuts),
            ..Self::numeric(column)
        }
    }

    /// A numeric grouping in bins of `size` centered on `center`.
    pub fn bins<S: Into<String>>(column: S, size: f64, center: f64) -> Self {
        Self {
            bin_size: Some(size),
            bin_center: Some(center),
            ..Self::numeric(column)
        }
    }

    /// A categorical grouping over a fixed set of values.
    pub fn categories<S: Into<String>>(column: S, possible_values: Vec<String>) -> Self {
        Self {
            possible_values: Some(possible_values),
            ..Self::categorical(column)
        }
    }

    /// A categorical grouping whose groups are the values found in the data.
    pub fn categorical<S: Into<String>>(column: S) -> Self {
        Self {
            column: column.into(),
            numeric: false,
            cuts: None,
            bin_size: None,
            bin_center: None,
            possible_values: None,
            default_group: None,
        }
    }

    fn numeric<S: Into<String>>(column: S) -> Self {
        Self {
            numeric: true,
            ..Self::categorical(column)
        }
    }
}

/// A `(column, value)` pair identifying one group along one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupValue {
    pub column: String,
    pub value: String,
}

impl GroupValue {
    pub fn new<C: Into<String>, V: Into<String>>(column: C, value: V) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Wire description of one output column of a grouped aggregation. The server
/// serializes it to JSON and uses the resulting string as the column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedGroupColumn {
    #[serde(default)]
    pub aggregated_column: String,
    #[serde(default)]
    pub groups: Vec<GroupValue>,
    #[serde(default)]
    pub count: bool,
}

impl EncodedGroupColumn {
    /// Produce the column name the server would emit for this column.
    pub fn encode(&self) -> String {
        // serializing plain strings and bools cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a column name.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The record used in place of a column name that cannot be parsed.
    pub fn fallback(raw: &str) -> Self {
        Self {
            aggregated_column: raw.to_string(),
            groups: Vec::new(),
            count: false,
        }
    }
}
