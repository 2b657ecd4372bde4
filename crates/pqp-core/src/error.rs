//! Typed errors for record validation and trace estimation.
//!
//! The estimator is pure, so every error is final: retrying with the same
//! inputs reproduces it. I/O helpers keep returning `anyhow::Result` and wrap
//! these via `?`.

use thiserror::Error;

/// Errors raised while validating inputs or estimating a trace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    /// Empty data, ragged rows, or tokens outside the outcome alphabet.
    #[error("malformed measurement data: {reason}")]
    MalformedData {
        /// Human-readable detail (row/column when known).
        reason: String,
    },

    /// Empty subset or a repeated qubit index.
    #[error("invalid qubit subset: {reason}")]
    InvalidSubset {
        /// Human-readable detail.
        reason: String,
    },

    /// A subset index is not a qubit of the record.
    #[error("qubit index {index} out of range: record has {num_qubits} qubits")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of qubits N in the record.
        num_qubits: usize,
    },

    /// Pairwise estimation needs at least two shots (per group).
    #[error("insufficient shots: got {shots}, need at least {required}")]
    InsufficientShots {
        /// Shots available.
        shots: usize,
        /// Shots required.
        required: usize,
    },

    /// Estimator configuration that cannot be applied to this record.
    #[error("invalid estimator configuration: {reason}")]
    InvalidConfig {
        /// Human-readable detail.
        reason: String,
    },
}

impl TraceError {
    /// Build a [`TraceError::MalformedData`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedData {
            reason: reason.into(),
        }
    }

    /// Build a [`TraceError::InvalidSubset`].
    pub fn invalid_subset(reason: impl Into<String>) -> Self {
        Self::InvalidSubset {
            reason: reason.into(),
        }
    }

    /// Build a [`TraceError::InvalidConfig`].
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Result alias for estimator-facing APIs.
pub type TraceResult<T> = Result<T, TraceError>;
