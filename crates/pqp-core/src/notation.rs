//! Conversion from per-unitary experiment dumps to shot records, and back
//! out to the upstream string / integer notations.
//!
//! A randomized-measurement experiment reports, for each random unitary `u`,
//! the basis id chosen per qubit and a counts map of measured bitstrings.
//! Bitstrings are little-endian: the rightmost character is qubit 0.
//!
//! [`spread_out`] expands every count into its own shot so the pairwise
//! estimator sees one row per single-shot snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{TraceError, TraceResult};
use crate::types::{Basis, Outcome, Spin};
use crate::ShadowRecord;

/// Per-unitary counts plus random basis ids.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShadowExperiment {
    /// Qubits measured per shot.
    pub num_qubits: usize,
    /// `random_basis[u][q]` = basis id (`0 → X`, `1 → Y`, `2 → Z`) of qubit `q`
    /// under unitary `u`.
    pub random_basis: Vec<Vec<u8>>,
    /// `counts[u]` = bitstring → number of shots under unitary `u`.
    pub counts: Vec<BTreeMap<String, u64>>,
}

/// Expand an experiment into one shot per count.
///
/// Within a unitary, bitstrings are emitted in lexicographic order.
pub fn spread_out(exp: &ShadowExperiment) -> TraceResult<ShadowRecord> {
    if exp.random_basis.len() != exp.counts.len() {
        return Err(TraceError::malformed(format!(
            "{} random-basis entries but {} counts entries",
            exp.random_basis.len(),
            exp.counts.len()
        )));
    }

    let mut shots = Vec::new();
    for (idx, (basis_ids, counts)) in exp.random_basis.iter().zip(&exp.counts).enumerate() {
        if basis_ids.len() != exp.num_qubits {
            return Err(TraceError::malformed(format!(
                "unitary {idx}: {} basis ids for {} qubits",
                basis_ids.len(),
                exp.num_qubits
            )));
        }
        let bases = basis_ids
            .iter()
            .map(|&id| {
                Basis::from_id(id).ok_or_else(|| {
                    TraceError::malformed(format!("unitary {idx}: unknown basis id {id}"))
                })
            })
            .collect::<TraceResult<Vec<_>>>()?;

        for (bitstring, &n) in counts {
            let shot = combine_counts_and_basis(idx, bitstring, &bases)?;
            for _ in 0..n {
                shots.push(shot.clone());
            }
        }
    }
    ShadowRecord::new(shots)
}

/// Zip a little-endian bitstring with per-qubit bases.
pub fn combine_counts_and_basis(
    idx: usize,
    bitstring: &str,
    bases: &[Basis],
) -> TraceResult<Vec<Outcome>> {
    let bits: Vec<char> = bitstring.chars().collect();
    if bits.len() != bases.len() {
        return Err(TraceError::malformed(format!(
            "unitary {idx}: bitstring {bitstring:?} has length {}, expected {}",
            bits.len(),
            bases.len()
        )));
    }
    bases
        .iter()
        .zip(bits.iter().rev())
        .map(|(&basis, &bit)| {
            Spin::from_bit(bit)
                .map(|spin| Outcome::new(basis, spin))
                .ok_or_else(|| {
                    TraceError::malformed(format!("unitary {idx}: bad bit {bit:?} in {bitstring:?}"))
                })
        })
        .collect()
}

/// Paired string tokens per shot: `["X", "1", "Z", "-1", ...]`.
#[must_use]
pub fn to_strnota(record: &ShadowRecord) -> Vec<Vec<String>> {
    record
        .shots()
        .iter()
        .map(|shot| {
            shot.iter()
                .flat_map(|o| [o.basis.to_string(), o.spin.to_string()])
                .collect()
        })
        .collect()
}

/// Basis ids and ±1 spins per shot.
#[must_use]
pub fn to_intnota(record: &ShadowRecord) -> (Vec<Vec<u8>>, Vec<Vec<i8>>) {
    record
        .shots()
        .iter()
        .map(|shot| {
            (
                shot.iter().map(|o| o.basis.id()).collect::<Vec<_>>(),
                shot.iter().map(|o| o.spin.value()).collect::<Vec<_>>(),
            )
        })
        .unzip()
}

/// Check that paired-notation rows all describe `num_qubits` qubits.
pub fn check_pqp_result<S: AsRef<str>>(rows: &[Vec<S>], num_qubits: usize) -> TraceResult<()> {
    if rows.is_empty() {
        return Err(TraceError::malformed("no shots"));
    }
    for (row, tokens) in rows.iter().enumerate() {
        if tokens.len() != 2 * num_qubits {
            return Err(TraceError::malformed(format!(
                "row {row} has {} tokens, expected {} for {num_qubits} qubits",
                tokens.len(),
                2 * num_qubits
            )));
        }
    }
    Ok(())
}
