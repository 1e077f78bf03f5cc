use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Status of a computation, as tracked by the server.
///
/// Statuses this client does not know deserialize to
/// [`ComputationStatus::Unknown`] and are never considered terminal.
#[derive(Debug, Display, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComputationStatus {
    #[display(fmt = "created")]
    Created,
    #[display(fmt = "running")]
    Running,
    #[display(fmt = "success")]
    Success,
    #[display(fmt = "error")]
    Error,
    #[display(fmt = "{}", _0)]
    Unknown(String),
}

impl ComputationStatus {
    /// Whether the server will not change this computation anymore.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl From<String> for ComputationStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "created" => Self::Created,
            "running" => Self::Running,
            "success" => Self::Success,
            "error" => Self::Error,
            _ => Self::Unknown(status),
        }
    }
}

impl From<ComputationStatus> for String {
    fn from(status: ComputationStatus) -> Self {
        status.to_string()
    }
}

/// An error reported by the server for a computation. Older servers send
/// plain strings, newer ones send objects with a machine readable type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorEntry {
    Message(String),
    Detailed(DetailedError),
}

/// A structured error entry. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl ErrorEntry {
    /// The message of the entry, or its type when the server sent none.
    pub fn message(&self) -> &str {
        match self {
            Self::Message(message) => message,
            Self::Detailed(detail) if detail.message.is_empty() => {
                detail.error_type.as_deref().unwrap_or_default()
            }
            Self::Detailed(detail) => &detail.message,
        }
    }

    pub fn error_type(&self) -> Option<&str> {
        match self {
            Self::Message(_) => None,
            Self::Detailed(detail) => detail.error_type.as_deref(),
        }
    }
}

/// Reads an explicit `null` list as an empty one.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The server-tracked instance of a submitted computation definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Computation {
    pub id: String,
    pub status: ComputationStatus,
    /// Identifiers of the data objects produced by the computation.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<String>,
    /// Identifier of the persisted result, only set for some computation types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<ErrorEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub warnings: Vec<String>,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl Computation {
    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    /// The most recent warning reported by the server, if any.
    pub fn latest_warning(&self) -> Option<&str> {
        self.warnings.last().map(String::as_str)
    }

    /// Whether the computation ended in a state that must be reported as a
    /// computation error.
    pub fn has_failed(&self) -> bool {
        self.status == ComputationStatus::Error || !self.errors.is_empty()
    }
}
