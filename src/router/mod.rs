//! Locating the results of a finished computation and shaping them for the
//! caller.
//!
//! Results are fetched through their [`ResultEntity`] when the computation has
//! one, or else from the raw data objects it produced. End-to-end encrypted
//! results are decrypted by a caller provided [`Decryptor`] before being
//! handed to the [`PostProcess`] hook.
//!
//! [`ResultEntity`]: crate::models::ResultEntity

mod hooks;
mod route;

pub use self::{
    hooks::{GroupedAggregation, Identity, Matrix, PostProcess, Scalar},
    route::{Decryptor, ResultRouter, Routed, RoutedResult},
};
