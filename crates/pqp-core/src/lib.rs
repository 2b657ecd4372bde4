//! pqp-core: classical-shadow records and the pairwise trace estimator.
//!
//! This crate defines the **stable boundary** used across the `pqp-*` crates:
//! - outcome types (`Basis`, `Spin`, `Outcome`) and their token alphabet,
//! - validated containers (`ShadowRecord`, `Subset`),
//! - the trace estimator (`TraceEstimator`, `perform_trace_calculation`),
//! - estimator options with environment overrides (`TraceConfig`),
//! - JSON/CBOR/JSONL/PQP-text I/O, and
//! - conversion from per-unitary experiment dumps (`notation`).
//!
//! ```
//! use pqp_core::prelude::*;
//!
//! let rec = ShadowRecord::from_tokens(
//!     &[vec!["X+", "Z-"], vec!["X+", "Z+"], vec!["Y-", "Z-"]],
//!     TokenLayout::Auto,
//! )?;
//! let subset = Subset::new(vec![1], rec.num_qubits())?;
//! let est = TraceEstimator::default().estimate(&rec, &subset)?;
//! assert!(est.value.is_finite());
//! # Ok::<(), pqp_core::TraceError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
// Small, explicit allowlist to keep docs readable and APIs ergonomic.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp))]

/// Estimator options and `PQP_TRACE_*` environment overrides.
pub mod config;
/// Typed validation/estimation errors.
pub mod error;
/// Pairwise classical-shadow trace estimator.
pub mod estimator;
/// JSON/CBOR/PQP-text helpers and auto-detecting read/write APIs.
pub mod io;
/// Streaming JSONL/NDJSON helpers for large shot sets.
pub mod io_jsonl;
/// Experiment dump conversion and upstream notations.
pub mod notation;
/// Validated records and subsets.
pub mod record;
/// Per-qubit outcome types.
pub mod types;

pub use config::*;
pub use error::*;
pub use estimator::*;
pub use record::*;
pub use types::*;

/// Commonly-used items for quick imports.
///
/// ```rust
/// use pqp_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        config::{Aggregation, Strategy, TraceConfig},
        error::{TraceError, TraceResult},
        estimator::{perform_trace_calculation, TraceEstimate, TraceEstimator},
        record::{ShadowRecord, Subset, TokenLayout},
        types::{Basis, Outcome, Spin},
    };
}
