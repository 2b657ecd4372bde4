//! Synthetic classical-shadow data for product states.
//!
//! Nothing here talks to hardware: the generator draws a uniformly random
//! Pauli basis per qubit per shot and samples the outcome from a known
//! single-qubit state, which gives estimator tests an exact purity to aim at.
//!
//! Callers use stable module paths like `pqp_sim::generator::generate_record`.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

/// Seeded shot generator.
pub mod generator;
/// Product-state models and their exact purities.
pub mod state;
