// crates/pqp-py/src/lib.rs

//! `pqp-py`: optional Python bindings for the trace estimator.
//!
//! This crate builds as a plain Rust lib by default. Enable the `python`
//! feature to compile the CPython extension module `shadow_trace_rust`:
//!
//! ```python
//! from shadow_trace_rust import perform_trace_calculation
//! perform_trace_calculation([["Z+", "Z+"], ["Z+", "Z-"], ["Z-", "Z+"]], [0])  # -1.0
//! ```
//!
//! Rows may use combined tokens (`"X+"`) or paired tokens
//! (`["X", "1", "Z", "-1"]`). The estimator runs with its default
//! configuration regardless of `PQP_TRACE_*`, so results depend only on the
//! arguments. The GIL is released while the pair loop runs.

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

use pqp_core::TraceError;

/// Python exception class raised for each error kind.
///
/// Must agree with the `into_pyerr` mapping of the `python` feature.
#[must_use]
pub const fn exception_name(err: &TraceError) -> &'static str {
    match err {
        TraceError::MalformedData { .. } => "MalformedDataError",
        TraceError::InvalidSubset { .. } => "InvalidSubsetError",
        TraceError::IndexOutOfRange { .. } => "IndexOutOfRangeError",
        TraceError::InsufficientShots { .. } => "InsufficientShotsError",
        TraceError::InvalidConfig { .. } => "TraceError",
    }
}

#[cfg(feature = "python")]
mod py {
    use pqp_core::TraceError as CoreError;
    use pyo3::exceptions::PyException;
    use pyo3::prelude::*;

    pyo3::create_exception!(shadow_trace_rust, TraceError, PyException, "Base exception for trace estimation");
    pyo3::create_exception!(shadow_trace_rust, MalformedDataError, TraceError, "Empty, ragged, or unparseable measurement data");
    pyo3::create_exception!(shadow_trace_rust, InvalidSubsetError, TraceError, "Empty subset or repeated qubit index");
    pyo3::create_exception!(shadow_trace_rust, IndexOutOfRangeError, TraceError, "Subset index outside the record's qubits");
    pyo3::create_exception!(shadow_trace_rust, InsufficientShotsError, TraceError, "Fewer than two shots");

    fn into_pyerr(err: CoreError) -> PyErr {
        let msg = err.to_string();
        match err {
            CoreError::MalformedData { .. } => MalformedDataError::new_err(msg),
            CoreError::InvalidSubset { .. } => InvalidSubsetError::new_err(msg),
            CoreError::IndexOutOfRange { .. } => IndexOutOfRangeError::new_err(msg),
            CoreError::InsufficientShots { .. } => InsufficientShotsError::new_err(msg),
            CoreError::InvalidConfig { .. } => TraceError::new_err(msg),
        }
    }

    /// Mean pair trace of `data` restricted to the qubits in `subs`.
    #[pyfunction]
    fn perform_trace_calculation(py: Python<'_>, data: Vec<Vec<String>>, subs: Vec<usize>) -> PyResult<f64> {
        py.allow_threads(|| pqp_core::perform_trace_calculation(&data, &subs))
            .map_err(into_pyerr)
    }

    /// Raw sum of pair traces (no normalization).
    #[pyfunction]
    fn perform_trace_sum(py: Python<'_>, data: Vec<Vec<String>>, subs: Vec<usize>) -> PyResult<f64> {
        py.allow_threads(|| pqp_core::perform_trace_sum(&data, &subs))
            .map_err(into_pyerr)
    }

    /// Return the crate version as a Python string.
    #[pyfunction]
    fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Python module `shadow_trace_rust`.
    #[pymodule]
    fn shadow_trace_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
        let py = m.py();
        m.add_function(wrap_pyfunction!(perform_trace_calculation, m)?)?;
        m.add_function(wrap_pyfunction!(perform_trace_sum, m)?)?;
        m.add_function(wrap_pyfunction!(version, m)?)?;
        m.add("TraceError", py.get_type_bound::<TraceError>())?;
        m.add("MalformedDataError", py.get_type_bound::<MalformedDataError>())?;
        m.add("InvalidSubsetError", py.get_type_bound::<InvalidSubsetError>())?;
        m.add("IndexOutOfRangeError", py.get_type_bound::<IndexOutOfRangeError>())?;
        m.add("InsufficientShotsError", py.get_type_bound::<InsufficientShotsError>())?;
        Ok(())
    }
}
