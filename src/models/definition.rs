//! Declarative computation definitions.
//!
//! A [`ComputationDefinition`] is a tagged union keyed by the `type` field. All
//! variants share the fields of [`ComputationCommon`], which are flattened into
//! the variant payload on the wire.

use derive_more::From;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    DataSourceParameters,
    GroupSpec,
    InputClippingMethod,
    LocalInput,
    PreprocessingChain,
};

/// Fields shared by every kind of computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputationCommon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Server-side timeout, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Whether the server should block the submission until completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<bool>,
    /// Ask the server to key switch, decrypt and persist the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_results: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_input: Option<LocalInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_parameters: Option<DataSourceParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessing_parameters: Option<PreprocessingChain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp_epsilon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_clipping_method: Option<InputClippingMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_to_end_encrypted: Option<bool>,
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedAggregation {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub aggregate_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSpec>,
    /// Also output the number of records of each group.
    #[serde(default)]
    pub count: bool,
    /// Derive per-group averages from the sums and counts.
    #[serde(default)]
    pub average: bool,
    /// Largest absolute value a single record may contribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_bound: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedMean {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grouping_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_bound: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticalAggregation {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub aggregation_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<GroupSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_bound: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticDefinition {
    pub name: String,
    pub variable: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quantities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStatistics {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub statistics: Vec<StatisticDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivalAggregation {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub duration_column: String,
    #[serde(default)]
    pub event_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegressionType {
    Linear,
    Logistic,
    Poisson,
}

impl Default for RegressionType {
    fn default() -> Self {
        Self::Linear
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedRegression {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub regression_type: RegressionType,
    #[serde(default)]
    pub feature_columns: Vec<String>,
    #[serde(default)]
    pub label_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPrediction {
    #[serde(flatten)]
    pub common: ComputationCommon,
    /// Data object holding the trained model.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub feature_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetIntersection {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub matching_columns: Vec<String>,
    /// Return only the size of the intersection.
    #[serde(default)]
    pub cardinality_only: bool,
    /// Persist the matched records as a cohort reusable by later computations.
    #[serde(default)]
    pub create_cohort: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gwas {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub target_label: String,
    #[serde(default)]
    pub variants_organization: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub covariates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_params: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateSearch {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub pir_dataset_object_id: String,
    /// Data object holding the encrypted query.
    #[serde(default)]
    pub pir_search_object_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateSearchSetup {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub value_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySwitchedComputation {
    #[serde(flatten)]
    pub common: ComputationCommon,
    pub computation: Box<ComputationDefinition>,
    #[serde(default)]
    pub decrypt_results: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_public_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectiveKeySwitch {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub cipher_vector: String,
    #[serde(default)]
    pub target_public_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectiveKeyGen {
    #[serde(flatten)]
    pub common: ComputationCommon,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelinearizationKeyGen {
    #[serde(flatten)]
    pub common: ComputationCommon,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootstrap {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub cipher_vector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encryption {
    #[serde(flatten)]
    pub common: ComputationCommon,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decryption {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub cipher_vector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleExtraction {
    #[serde(flatten)]
    pub common: ComputationCommon,
    #[serde(default)]
    pub sample_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

/// A server-ready description of a computation.
#[derive(Debug, Clone, PartialEq, From, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ComputationDefinition {
    EncryptedAggregation(EncryptedAggregation),
    EncryptedMean(EncryptedMean),
    StatisticalAggregation(StatisticalAggregation),
    DatasetStatistics(DatasetStatistics),
    SurvivalAggregation(SurvivalAggregation),
    EncryptedRegression(EncryptedRegression),
    EncryptedPrediction(EncryptedPrediction),
    SetIntersection(SetIntersection),
    Gwas(Gwas),
    PrivateSearch(PrivateSearch),
    PrivateSearchSetup(PrivateSearchSetup),
    KeySwitchedComputation(KeySwitchedComputation),
    CollectiveKeySwitch(CollectiveKeySwitch),
    CollectiveKeyGen(CollectiveKeyGen),
    RelinearizationKeyGen(RelinearizationKeyGen),
    Bootstrap(Bootstrap),
    Encryption(Encryption),
    Decryption(Decryption),
    SampleExtraction(SampleExtraction),
}

/// Apply `$body` to the payload of whichever variant `$definition` holds.
macro_rules! with_variant {
    ($definition:expr, $payload:ident => $body:expr) => {
        match $definition {
            ComputationDefinition::EncryptedAggregation($payload) => $body,
            ComputationDefinition::EncryptedMean($payload) => $body,
            ComputationDefinition::StatisticalAggregation($payload) => $body,
            ComputationDefinition::DatasetStatistics($payload) => $body,
            ComputationDefinition::SurvivalAggregation($payload) => $body,
            ComputationDefinition::EncryptedRegression($payload) => $body,
            ComputationDefinition::EncryptedPrediction($payload) => $body,
            ComputationDefinition::SetIntersection($payload) => $body,
            ComputationDefinition::Gwas($payload) => $body,
            ComputationDefinition::PrivateSearch($payload) => $body,
            ComputationDefinition::PrivateSearchSetup($payload) => $body,
            ComputationDefinition::KeySwitchedComputation($payload) => $body,
            ComputationDefinition::CollectiveKeySwitch($payload) => $body,
            ComputationDefinition::CollectiveKeyGen($payload) => $body,
            ComputationDefinition::RelinearizationKeyGen($payload) => $body,
            ComputationDefinition::Bootstrap($payload) => $body,
            ComputationDefinition::Encryption($payload) => $body,
            ComputationDefinition::Decryption($payload) => $body,
            ComputationDefinition::SampleExtraction($payload) => $body,
        }
    };
}

impl ComputationDefinition {
    /// The `type` discriminant used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EncryptedAggregation(_) => "encryptedAggregation",
            Self::EncryptedMean(_) => "encryptedMean",
            Self::StatisticalAggregation(_) => "statisticalAggregation",
            Self::DatasetStatistics(_) => "datasetStatistics",
            Self::SurvivalAggregation(_) => "survivalAggregation",
            Self::EncryptedRegression(_) => "encryptedRegression",
            Self::EncryptedPrediction(_) => "encryptedPrediction",
            Self::SetIntersection(_) => "setIntersection",
            Self::Gwas(_) => "gwas",
            Self::PrivateSearch(_) => "privateSearch",
            Self::PrivateSearchSetup(_) => "privateSearchSetup",
            Self::KeySwitchedComputation(_) => "keySwitchedComputation",
            Self::CollectiveKeySwitch(_) => "collectiveKeySwitch",
            Self::CollectiveKeyGen(_) => "collectiveKeyGen",
            Self::RelinearizationKeyGen(_) => "relinearizationKeyGen",
            Self::Bootstrap(_) => "bootstrap",
            Self::Encryption(_) => "encryption",
            Self::Decryption(_) => "decryption",
            Self::SampleExtraction(_) => "sampleExtraction",
        }
    }

    pub fn common(&self) -> &ComputationCommon {
        with_variant!(self, payload => &payload.common)
    }

    pub fn common_mut(&mut self) -> &mut ComputationCommon {
        with_variant!(self, payload => &mut payload.common)
    }

    /// The grouping dimensions of the computation, for the kinds that group.
    pub fn group_specs(&self) -> &[GroupSpec] {
        match self {
            Self::EncryptedAggregation(aggregation) => &aggregation.groups,
            Self::StatisticalAggregation(aggregation) => &aggregation.group_by,
            Self::SurvivalAggregation(aggregation) => &aggregation.groups,
            _ => &[],
        }
    }

    /// The per-record contribution bound, for the kinds that accept one.
    pub fn value_bound_mut(&mut self) -> Option<&mut Option<f64>> {
        match self {
            Self::EncryptedAggregation(aggregation) => Some(&mut aggregation.value_bound),
            Self::EncryptedMean(mean) => Some(&mut mean.value_bound),
            Self::StatisticalAggregation(aggregation) => Some(&mut aggregation.value_bound),
            _ => None,
        }
    }
}
