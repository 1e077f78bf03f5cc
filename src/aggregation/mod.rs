//! Grouped aggregation support: checking group specs before submission and
//! decoding the group-by table out of the aggregation output.

mod decoder;
mod groups;

pub use self::{
    decoder::{
        DecodeError,
        DecodeWarning,
        Decoded,
        GroupAggregationDecoder,
        GroupRow,
        DEFAULT_FLOAT_PRECISION,
    },
    groups::{check_dp_compatible, validate_groups},
};
