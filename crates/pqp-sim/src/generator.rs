//! Seeded shot generator for product states.
//!
//! Each shot picks a uniform basis in `{X, Y, Z}` per qubit. Z readouts are
//! `+1` with probability `(1 + r)/2`; X and Y readouts are unbiased.

use anyhow::Result;
use pqp_core::{Basis, Outcome, ShadowRecord, Spin};
use rand::{rngs::StdRng, SeedableRng};

use crate::state::StateModel;

/// Default seed used by the CLI and benches.
pub const DEFAULT_SEED: u64 = 42;

/// Draw one shot of `qubits` outcomes.
pub fn sample_shot<R: rand::Rng + ?Sized>(rng: &mut R, qubits: usize, model: StateModel) -> Vec<Outcome> {
    let p_up_z = model.p_up_z();
    (0..qubits)
        .map(|_| {
            let basis = Basis::ALL[rng.random_range(0..3)];
            let p_up = if basis == Basis::Z { p_up_z } else { 0.5 };
            let spin = if rng.random_bool(p_up) { Spin::Up } else { Spin::Down };
            Outcome::new(basis, spin)
        })
        .collect()
}

/// Generate `shots × qubits` outcomes deterministically from `seed`.
pub fn generate_record(shots: usize, qubits: usize, model: StateModel, seed: u64) -> Result<ShadowRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = (0..shots)
        .map(|_| sample_shot(&mut rng, qubits, model))
        .collect();
    Ok(ShadowRecord::new(rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_record() {
        let a = generate_record(50, 3, StateModel::Pure, 7).unwrap();
        let b = generate_record(50, 3, StateModel::Pure, 7).unwrap();
        let c = generate_record(50, 3, StateModel::Pure, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.num_shots(), 50);
        assert_eq!(a.num_qubits(), 3);
    }

    #[test]
    fn pure_state_never_reads_minus_in_z() {
        let rec = generate_record(200, 2, StateModel::Pure, DEFAULT_SEED).unwrap();
        let minus_z = rec
            .shots()
            .iter()
            .flatten()
            .filter(|o| o.basis == Basis::Z && o.spin == Spin::Down)
            .count();
        assert_eq!(minus_z, 0);
    }

    #[test]
    fn empty_shapes_are_rejected() {
        assert!(generate_record(0, 2, StateModel::Pure, 1).is_err());
        assert!(generate_record(3, 0, StateModel::Pure, 1).is_err());
    }
}
