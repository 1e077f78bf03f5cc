use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named output bundle persisted by the server when results are released.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computation_id: Option<String>,
    /// Data object holding the result content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_object_id: Option<String>,
    /// Whether the content is encrypted under a key only this client holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_to_end_encrypted: Option<bool>,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl ResultEntity {
    pub fn is_end_to_end_encrypted(&self) -> bool {
        self.end_to_end_encrypted.unwrap_or(false)
    }
}

/// Kind of content a data object references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataObjectType {
    FloatMatrix,
    StringMatrix,
    Statistics,
    Prediction,
    Ciphertable,
    EncryptedContent,
    #[serde(other)]
    Other,
}

/// An opaque reference to typed content stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataObject {
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: DataObjectType,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatMatrix {
    pub columns: Vec<String>,
    pub data: Vec<Vec<f64>>,
}

impl FloatMatrix {
    /// The first cell of the first row.
    pub fn first_value(&self) -> Option<f64> {
        self.data.first().and_then(|row| row.first()).copied()
    }

    /// The first row, which is where aggregations put their output.
    pub fn first_row(&self) -> &[f64] {
        self.data.first().map_or(&[], |row| row.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringMatrix {
    pub columns: Vec<String>,
    pub data: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub results: Vec<StatisticResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub labels: Vec<String>,
    pub predictions: Vec<Vec<f64>>,
}

/// Base64 encoded ciphertext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedContent {
    pub value: String,
}

impl EncryptedContent {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            value: base64::encode(bytes),
        }
    }

    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::decode(&self.value)
    }
}

/// Typed content of a data object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Content {
    FloatMatrix(FloatMatrix),
    StringMatrix(StringMatrix),
    Statistics(Statistics),
    Prediction(Prediction),
    /// A table of ciphertexts.
    Ciphertable(EncryptedContent),
    EncryptedContent(EncryptedContent),
}

impl Content {
    /// Whether the content still needs a decryption step before it can be
    /// analysed.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Ciphertable(_) | Self::EncryptedContent(_))
    }

    pub fn as_float_matrix(&self) -> Option<&FloatMatrix> {
        match self {
            Self::FloatMatrix(matrix) => Some(matrix),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn content_is_tagged_on_type() {
        let content: Content = serde_json::from_value(json!({
            "type": "floatMatrix",
            "columns": ["a", "b"],
            "data": [[1.0, 2.0]],
        }))
        .unwrap();
        assert!(!content.is_encrypted());
        assert_eq!(content.as_float_matrix().unwrap().first_value(), Some(1.0));

        let content: Content =
            serde_json::from_value(json!({"type": "ciphertable", "value": "AAEC"})).unwrap();
        assert!(content.is_encrypted());
    }

    #[test]
    fn encrypted_content_bytes() {
        let content = EncryptedContent::from_bytes(&[0, 1, 2]);
        assert_eq!(content.value, "AAEC");
        assert_eq!(content.bytes().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn unknown_data_object_type() {
        let object: DataObject =
            serde_json::from_value(json!({"id": "do-1", "type": "model", "owner": "me"}))
                .unwrap();
        assert_eq!(object.object_type, DataObjectType::Other);
        assert!(!object.encrypted);
    }

    #[test]
    fn result_encryption_flag_defaults_to_false() {
        let result: ResultEntity = serde_json::from_value(json!({"id": "r-1"})).unwrap();
        assert!(!result.is_end_to_end_encrypted());
    }
}
