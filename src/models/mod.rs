//! Wire data model shared by the lifecycle, routing and decoding code.
//!
//! Field names follow the service's JSON API. Types that the service is known
//! to extend over time keep unknown keys in an `additional_properties` map so
//! that they survive a round trip through this client.

mod computation;
pub mod definition;
mod group;
mod project;
mod result;

pub use self::{
    computation::{Computation, ComputationStatus, DetailedError, ErrorEntry},
    definition::{ComputationCommon, ComputationDefinition},
    group::{EncodedGroupColumn, GroupSpec, GroupValue},
    project::{
        DataSourceParameters,
        DataSourceQuery,
        DpPolicy,
        InputClippingMethod,
        LocalInput,
        PreprocessingChain,
        Project,
    },
    result::{
        Content,
        DataObject,
        DataObjectType,
        EncryptedContent,
        FloatMatrix,
        Prediction,
        ResultEntity,
        StatisticResult,
        Statistics,
        StringMatrix,
    },
};
