//! Errors surfaced to callers of this crate.
//!
//! Validation and protocol errors abort an operation immediately. Computation
//! errors and timeouts are the only failures that can follow an otherwise
//! successful HTTP round trip, and both keep enough state for the caller to
//! react without rebuilding the job.

use std::{fmt, time::Duration};

use thiserror::Error;

use crate::{
    aggregation::DecodeError,
    client::ClientError,
    models::{Computation, ComputationStatus, ErrorEntry},
};

/// A definition was rejected locally, before anything was sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{variant} computation requires `{field}`")]
    MissingField {
        variant: &'static str,
        field: &'static str,
    },
    #[error("invalid `{field}` for {variant} computation: {reason}")]
    InvalidField {
        variant: &'static str,
        field: &'static str,
        reason: String,
    },
    #[error("invalid grouping on column `{column}`: {reason}")]
    InvalidGroup { column: String, reason: String },
    #[error(
        "grouping on column `{column}` must set `{missing}` when differential privacy is enforced"
    )]
    DpIncompatibleGroup {
        column: String,
        missing: &'static str,
    },
    #[error("dpEpsilon must be positive, got {0}")]
    NonPositiveEpsilon(f64),
}

/// Classification of a failed computation, derived from the type the server
/// attached to its first error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationErrorKind {
    Internal,
    Validation,
    Preprocessing,
    DataSource,
    PrivacyBudget,
    Unknown,
}

impl ComputationErrorKind {
    fn from_type(error_type: &str) -> Self {
        match error_type {
            "internal" => Self::Internal,
            "validation" => Self::Validation,
            "preprocessing" => Self::Preprocessing,
            "dataSource" | "datasource" => Self::DataSource,
            "privacyBudget" | "dpBudget" => Self::PrivacyBudget,
            _ => Self::Unknown,
        }
    }
}

/// The server reported the computation as failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ComputationError {
    pub computation_id: String,
    pub status: ComputationStatus,
    pub errors: Vec<ErrorEntry>,
}

impl ComputationError {
    pub fn new(computation: &Computation) -> Self {
        Self {
            computation_id: computation.id.clone(),
            status: computation.status.clone(),
            errors: computation.errors.clone(),
        }
    }

    pub fn kind(&self) -> ComputationErrorKind {
        self.errors
            .iter()
            .find_map(ErrorEntry::error_type)
            .map_or(ComputationErrorKind::Unknown, ComputationErrorKind::from_type)
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(ErrorEntry::message)
    }
}

impl fmt::Display for ComputationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "computation {} ended with status {}",
            self.computation_id, self.status
        )?;
        let messages: Vec<&str> = self.messages().collect();
        if !messages.is_empty() {
            write!(f, ": {}", messages.join("; "))?;
        }
        Ok(())
    }
}

/// The local deadline passed while the remote computation may still be
/// running. The last known snapshot is kept so that waiting can be resumed.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct TimeoutError {
    pub snapshot: Box<Computation>,
    pub elapsed: Duration,
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "computation {} still {} after {:?}",
            self.snapshot.id, self.snapshot.status, self.elapsed
        )
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Protocol(#[from] ClientError),
    #[error(transparent)]
    Computation(#[from] ComputationError),
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
    #[error("there is no timed out computation to resume")]
    NoTimedOutComputation,
    #[error("computation {0} succeeded without producing any result")]
    MissingResults(String),
    #[error("result {0} is end-to-end encrypted but no decryptor is configured")]
    MissingDecryptor(String),
    #[error("failed to decrypt result: {0}")]
    Decryption(String),
    #[error("failed to post-process results: {0}")]
    PostProcess(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Error {
    /// The snapshot kept by a timeout, if this is one.
    pub fn timed_out_snapshot(&self) -> Option<&Computation> {
        match self {
            Self::Timeout(e) => Some(&e.snapshot),
            _ => None,
        }
    }
}
