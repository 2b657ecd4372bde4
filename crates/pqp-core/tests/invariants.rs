//! Invariants of the pairwise trace estimator.
//!
//! These tests treat:
//! - **execution strategy** as unobservable (sequential and parallel runs
//!   must agree bit for bit), and
//! - the **mean aggregation** as a symmetric function of the shots, so any
//!   permutation of rows leaves the estimate unchanged.

use pqp_core::{
    perform_trace_calculation, Aggregation, Basis, Outcome, ShadowRecord, Spin,
    Strategy as Exec, Subset, TraceConfig, TraceError, TraceEstimator,
};
use pqp_sim::{generator::generate_record, state::StateModel};
use proptest::prelude::*;

fn estimator(strategy: Exec) -> TraceEstimator {
    TraceEstimator::new(TraceConfig::default().with_strategy(strategy))
}

fn arb_outcome() -> impl Strategy<Value = Outcome> {
    (0u8..3, any::<bool>()).prop_map(|(b, up)| {
        let basis = Basis::from_id(b).unwrap_or(Basis::Z);
        Outcome::new(basis, if up { Spin::Up } else { Spin::Down })
    })
}

prop_compose! {
    fn arb_record()(n in 1usize..=4)(
        rows in prop::collection::vec(prop::collection::vec(arb_outcome(), n), 2..=24),
    ) -> ShadowRecord {
        ShadowRecord::new(rows).unwrap()
    }
}

fn arb_record_and_subset() -> impl Strategy<Value = (ShadowRecord, Subset)> {
    arb_record().prop_flat_map(|rec| {
        let n = rec.num_qubits();
        let picks = prop::sample::subsequence((0..n).collect::<Vec<_>>(), 1..=n);
        (Just(rec), picks).prop_map(move |(rec, picks)| (rec, Subset::new(picks, n).unwrap()))
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn strategies_agree_bitwise((rec, sub) in arb_record_and_subset()) {
        let a = estimator(Exec::Sequential).estimate(&rec, &sub).unwrap();
        let b = estimator(Exec::Parallel).estimate(&rec, &sub).unwrap();
        prop_assert_eq!(a.value.to_bits(), b.value.to_bits());
        prop_assert_eq!(a.sum.to_bits(), b.sum.to_bits());
    }

    #[test]
    fn result_is_finite_and_repeatable((rec, sub) in arb_record_and_subset()) {
        let est = estimator(Exec::Parallel);
        let a = est.estimate(&rec, &sub).unwrap();
        let b = est.estimate(&rec, &sub).unwrap();
        prop_assert!(a.value.is_finite());
        prop_assert_eq!(a.value.to_bits(), b.value.to_bits());
    }

    #[test]
    fn single_qubit_estimate_is_bounded(rec in arb_record(), q in 0usize..4) {
        let q = q % rec.num_qubits();
        let sub = Subset::new(vec![q], rec.num_qubits()).unwrap();
        let v = estimator(Exec::Sequential).estimate(&rec, &sub).unwrap().value;
        prop_assert!((-4.0..=5.0).contains(&v), "value {} out of [-4, 5]", v);
    }

    #[test]
    fn shot_order_does_not_matter((rec, sub) in arb_record_and_subset(), seed in any::<u64>()) {
        let mut rows = rec.shots().to_vec();
        // Deterministic Fisher-Yates driven by a tiny LCG.
        let mut s = seed | 1;
        for i in (1..rows.len()).rev() {
            s = s.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            let j = (s >> 33) as usize % (i + 1);
            rows.swap(i, j);
        }
        let shuffled = ShadowRecord::new(rows).unwrap();
        let a = estimator(Exec::Sequential).estimate(&rec, &sub).unwrap().value;
        let b = estimator(Exec::Sequential).estimate(&shuffled, &sub).unwrap().value;
        // Pair products are reordered in the sum, so allow rounding noise.
        prop_assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0), "{} vs {}", a, b);
    }

    #[test]
    fn subset_order_does_not_matter((rec, sub) in arb_record_and_subset()) {
        let mut rev = sub.indices().to_vec();
        rev.reverse();
        let rev = Subset::new(rev, rec.num_qubits()).unwrap();
        let a = estimator(Exec::Sequential).estimate(&rec, &sub).unwrap().value;
        let b = estimator(Exec::Sequential).estimate(&rec, &rev).unwrap().value;
        prop_assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0));
    }
}

#[test]
fn hand_computed_examples() {
    let data = vec![vec!["Z+", "Z+"], vec!["Z+", "Z-"], vec!["Z-", "Z+"]];
    assert_eq!(perform_trace_calculation(&data, &[0]).unwrap(), -1.0);

    let same = vec![vec!["X+", "Y+"]; 5];
    assert_eq!(perform_trace_calculation(&same, &[0, 1]).unwrap(), 25.0);
}

#[test]
fn paired_rows_match_combined_rows() {
    let combined = vec![vec!["X+", "Z-"], vec!["X-", "Z-"], vec!["Y+", "Z+"]];
    let paired = vec![
        vec!["X", "1", "Z", "-1"],
        vec!["X", "-1", "Z", "-1"],
        vec!["Y", "1", "Z", "1"],
    ];
    assert_eq!(
        perform_trace_calculation(&combined, &[0, 1]).unwrap(),
        perform_trace_calculation(&paired, &[0, 1]).unwrap()
    );
}

#[test]
fn boundary_errors_surface_as_typed_kinds() {
    let one = vec![vec!["X+"]];
    assert!(matches!(
        perform_trace_calculation(&one, &[0]),
        Err(TraceError::InsufficientShots { shots: 1, .. })
    ));
    let two = vec![vec!["X+"], vec!["Z-"]];
    assert!(matches!(
        perform_trace_calculation(&two, &[]),
        Err(TraceError::InvalidSubset { .. })
    ));
    assert!(matches!(
        perform_trace_calculation(&two, &[1]),
        Err(TraceError::IndexOutOfRange { index: 1, num_qubits: 1 })
    ));
    assert!(matches!(
        perform_trace_calculation(&two, &[0, 0]),
        Err(TraceError::InvalidSubset { .. })
    ));
    let ragged = vec![vec!["X+", "Y+"], vec!["Z-"]];
    assert!(matches!(
        perform_trace_calculation(&ragged, &[0]),
        Err(TraceError::MalformedData { .. })
    ));
    let empty: Vec<Vec<&str>> = vec![];
    assert!(matches!(
        perform_trace_calculation(&empty, &[0]),
        Err(TraceError::MalformedData { .. })
    ));
}

/// Synthetic product states: the estimator should land near the exact purity.
#[test]
fn recovers_purity_of_product_states() {
    let cases = [
        (StateModel::Pure, vec![0]),
        (StateModel::Pure, vec![0, 1]),
        (StateModel::MaximallyMixed, vec![0]),
        (StateModel::Partial { bloch: 0.6 }, vec![1]),
    ];
    for (model, subs) in cases {
        let rec = generate_record(1500, 3, model, 2024).unwrap();
        let sub = Subset::new(subs.clone(), 3).unwrap();
        let got = estimator(Exec::Parallel).estimate(&rec, &sub).unwrap().value;
        let want = model.purity(subs.len());
        assert!(
            (got - want).abs() < 0.35,
            "{model}: subset {subs:?} estimated {got}, exact {want}"
        );
    }
}

#[test]
fn median_of_means_tracks_the_mean_on_clean_data() {
    let rec = generate_record(1200, 2, StateModel::Pure, 11).unwrap();
    let sub = Subset::new(vec![0], 2).unwrap();
    let mean = estimator(Exec::Sequential).estimate(&rec, &sub).unwrap();
    let mom = TraceEstimator::new(
        TraceConfig::default().with_aggregation(Aggregation::MedianOfMeans { groups: 6 }),
    )
    .estimate(&rec, &sub)
    .unwrap();
    assert_eq!(mom.aggregation, Aggregation::MedianOfMeans { groups: 6 });
    assert!(mom.pairs < mean.pairs);
    assert!((mom.value - mean.value).abs() < 0.5, "{} vs {}", mom.value, mean.value);
}
