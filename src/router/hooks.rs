use crate::{
    aggregation::{Decoded, GroupAggregationDecoder},
    error::Error,
    models::{ComputationDefinition, Content, FloatMatrix},
};

/// Post-processing applied to the contents of a finished computation.
///
/// Exactly one of the two methods is called per routed computation, depending
/// on whether the first content is still encrypted.
pub trait PostProcess {
    type Output;

    /// Shape plaintext contents into the value handed to the caller.
    fn plaintext(&self, contents: Vec<Content>) -> Result<Self::Output, Error>;

    /// Process contents that are still encrypted. They are returned as is by
    /// default.
    fn encrypted(&self, contents: Vec<Content>) -> Result<Vec<Content>, Error> {
        Ok(contents)
    }
}

fn first_float_matrix(contents: Vec<Content>) -> Result<FloatMatrix, Error> {
    match contents.into_iter().next() {
        Some(Content::FloatMatrix(matrix)) => Ok(matrix),
        Some(other) => Err(Error::PostProcess(format!(
            "expected a float matrix, got {:?}",
            other
        ))),
        None => Err(Error::PostProcess("no content to process".to_string())),
    }
}

/// Hands the contents over unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl PostProcess for Identity {
    type Output = Vec<Content>;

    fn plaintext(&self, contents: Vec<Content>) -> Result<Self::Output, Error> {
        Ok(contents)
    }
}

/// Extracts the first value of the first float matrix, for computations that
/// output a single number.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scalar;

impl PostProcess for Scalar {
    type Output = f64;

    fn plaintext(&self, contents: Vec<Content>) -> Result<Self::Output, Error> {
        first_float_matrix(contents)?
            .first_value()
            .ok_or_else(|| Error::PostProcess("the float matrix is empty".to_string()))
    }
}

/// Returns the first float matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct Matrix;

impl PostProcess for Matrix {
    type Output = FloatMatrix;

    fn plaintext(&self, contents: Vec<Content>) -> Result<Self::Output, Error> {
        first_float_matrix(contents)
    }
}

/// Decodes the output of a grouped aggregation into one row per group.
#[derive(Debug, Clone)]
pub struct GroupedAggregation {
    decoder: GroupAggregationDecoder,
}

impl GroupedAggregation {
    pub fn new(decoder: GroupAggregationDecoder) -> Self {
        Self { decoder }
    }

    /// Decoder matching the groups and the average flag of an aggregation
    /// definition, rounding averages to `precision` decimals. Returns `None`
    /// for other kinds of computations.
    pub fn for_definition(definition: &ComputationDefinition, precision: u32) -> Option<Self> {
        match definition {
            ComputationDefinition::EncryptedAggregation(aggregation) => {
                let decoder = GroupAggregationDecoder::new(aggregation.groups.clone())
                    .with_average(aggregation.average)
                    .with_precision(precision);
                Some(Self::new(decoder))
            }
            _ => None,
        }
    }
}

impl PostProcess for GroupedAggregation {
    type Output = Decoded;

    fn plaintext(&self, contents: Vec<Content>) -> Result<Self::Output, Error> {
        let matrix = first_float_matrix(contents)?;
        Ok(self.decoder.decode(&matrix.columns, matrix.first_row())?)
    }
}
