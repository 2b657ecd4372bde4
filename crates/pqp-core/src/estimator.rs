//! Pairwise classical-shadow trace estimator.
//!
//! Each shot defines a product snapshot `ρ̂ = ⊗_q (3|s_q⟩⟨s_q| − I)`. For two
//! independent snapshots the trace of their product restricted to a subset
//! `A` factorizes over qubits, with per-qubit values:
//!
//! | bases | spins | `Tr(ρ̂_a ρ̂_b)` |
//! |---|---|---|
//! | differ | – | `0.5` |
//! | equal | equal | `5` |
//! | equal | differ | `−4` |
//!
//! Averaging the pair product over all `M(M−1)/2` unordered pairs gives an
//! unbiased estimate of `Tr(ρ_A²)` (subsystem purity).
//!
//! The kernel packs the subset columns into one contiguous byte buffer before
//! the O(M²·|A|) loop. Row partial sums are always reduced in row order, so
//! the sequential and parallel strategies agree bit for bit.

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, debug_span};

use rayon::prelude::*;

use crate::config::{Aggregation, Strategy, TraceConfig};
use crate::error::{TraceError, TraceResult};
use crate::record::{ShadowRecord, Subset, TokenLayout};
use crate::types::Outcome;

/// Per-qubit overlap when the two shots used different bases.
pub const BASIS_MISMATCH: f64 = 0.5;
/// Per-qubit overlap for equal basis and equal spin.
pub const SPIN_MATCH: f64 = 5.0;
/// Per-qubit overlap for equal basis and opposite spin.
pub const SPIN_MISMATCH: f64 = -4.0;

/// Minimum shots for a pairwise estimate.
pub const MIN_SHOTS: usize = 2;

/// Single-qubit snapshot overlap `Tr(ρ̂_a ρ̂_b)`.
#[inline]
#[must_use]
pub fn snapshot_overlap(a: Outcome, b: Outcome) -> f64 {
    code_overlap(a.code(), b.code())
}

#[inline]
fn code_overlap(a: u8, b: u8) -> f64 {
    if a >> 1 != b >> 1 {
        BASIS_MISMATCH
    } else if a == b {
        SPIN_MATCH
    } else {
        SPIN_MISMATCH
    }
}

/// Trace of the product of two shot snapshots over `subset`.
///
/// # Panics
/// Panics if a subset index is out of bounds for either shot; a [`Subset`]
/// validated against the same record never is.
#[must_use]
pub fn pair_trace(a: &[Outcome], b: &[Outcome], subset: &Subset) -> f64 {
    subset
        .indices()
        .iter()
        .fold(1.0, |acc, &q| acc * snapshot_overlap(a[q], b[q]))
}

/// Subset columns of a block of shots as outcome codes, row-major.
struct Packed {
    width: usize,
    codes: Vec<u8>,
}

impl Packed {
    fn new(rows: &[Vec<Outcome>], subset: &Subset) -> Self {
        let width = subset.len();
        let mut codes = Vec::with_capacity(rows.len() * width);
        for row in rows {
            codes.extend(subset.indices().iter().map(|&q| row[q].code()));
        }
        Self { width, codes }
    }

    #[inline]
    fn rows(&self) -> usize {
        self.codes.len() / self.width
    }

    #[inline]
    fn row(&self, i: usize) -> &[u8] {
        &self.codes[i * self.width..(i + 1) * self.width]
    }

    /// Σ_{j>i} pair(i, j).
    fn row_sum(&self, i: usize) -> f64 {
        let a = self.row(i);
        (i + 1..self.rows())
            .map(|j| {
                a.iter()
                    .zip(self.row(j))
                    .fold(1.0, |acc, (&x, &y)| acc * code_overlap(x, y))
            })
            .sum()
    }
}

/// Optional progress bar, one tick per finished row.
struct Progress {
    #[cfg(feature = "progress")]
    bar: Option<indicatif::ProgressBar>,
}

impl Progress {
    fn new(len: usize, enabled: bool) -> Self {
        #[cfg(feature = "progress")]
        {
            let bar = enabled.then(|| {
                let bar = indicatif::ProgressBar::new(len as u64);
                let style = indicatif::ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                    )
                    .map(|s| s.progress_chars("#>-"))
                    .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar());
                bar.set_style(style);
                bar
            });
            Self { bar }
        }
        #[cfg(not(feature = "progress"))]
        {
            let _ = (len, enabled);
            Self {}
        }
    }

    #[inline]
    fn tick(&self) {
        #[cfg(feature = "progress")]
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn finish(&self) {
        #[cfg(feature = "progress")]
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Result of one estimate.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TraceEstimate {
    /// The estimate (mean, or median of group means).
    pub value: f64,
    /// Raw Σ over the pairs that contributed.
    pub sum: f64,
    /// Number of unordered pairs that contributed.
    pub pairs: u64,
    /// Shots in the record.
    pub shots: usize,
    /// Qubits in the subset.
    pub subset_len: usize,
    /// Aggregation that produced `value`.
    pub aggregation: Aggregation,
}

/// Estimator bound to one configuration.
#[derive(Clone, Debug, Default)]
pub struct TraceEstimator {
    config: TraceConfig,
}

impl TraceEstimator {
    /// Build with an explicit configuration.
    #[must_use]
    pub const fn new(config: TraceConfig) -> Self {
        Self { config }
    }

    /// Build from defaults merged with `PQP_TRACE_*` environment overrides.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(TraceConfig::from_env())
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Estimate the trace quantity of `record` restricted to `subset`.
    ///
    /// `subset` must have been validated against `record` (same N).
    pub fn estimate(&self, record: &ShadowRecord, subset: &Subset) -> TraceResult<TraceEstimate> {
        let shots = record.num_shots();
        if shots < MIN_SHOTS {
            return Err(TraceError::InsufficientShots {
                shots,
                required: MIN_SHOTS,
            });
        }
        if subset.is_empty() {
            return Err(TraceError::invalid_subset("subset is empty"));
        }
        if let Some(&index) = subset.indices().iter().find(|&&q| q >= record.num_qubits()) {
            return Err(TraceError::IndexOutOfRange {
                index,
                num_qubits: record.num_qubits(),
            });
        }
        self.config.validate(shots)?;

        let _span = debug_span!(
            "trace_estimate",
            shots,
            qubits = record.num_qubits(),
            subset = subset.len()
        )
        .entered();
        let started = Instant::now();

        let estimate = match self.config.aggregation {
            Aggregation::Mean => {
                let packed = Packed::new(record.shots(), subset);
                let sum = self.pair_sum(&packed)?;
                let pairs = pair_count(shots);
                TraceEstimate {
                    value: sum / pairs as f64,
                    sum,
                    pairs,
                    shots,
                    subset_len: subset.len(),
                    aggregation: Aggregation::Mean,
                }
            }
            Aggregation::MedianOfMeans { groups } => {
                self.median_of_means(record, subset, groups)?
            }
        };

        debug!(
            strategy = ?self.config.strategy,
            pairs = estimate.pairs,
            value = estimate.value,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "trace estimate done"
        );
        Ok(estimate)
    }

    /// Estimate every subset against the same record.
    pub fn estimate_many(
        &self,
        record: &ShadowRecord,
        subsets: &[Subset],
    ) -> TraceResult<Vec<TraceEstimate>> {
        subsets.iter().map(|s| self.estimate(record, s)).collect()
    }

    /// Parse string rows, validate `subs`, and estimate.
    pub fn calculate<R, S>(&self, data: &[R], subs: &[usize]) -> TraceResult<TraceEstimate>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let record = ShadowRecord::from_tokens(data, TokenLayout::Auto)?;
        let subset = Subset::new(subs.to_vec(), record.num_qubits())?;
        self.estimate(&record, &subset)
    }

    fn median_of_means(
        &self,
        record: &ShadowRecord,
        subset: &Subset,
        groups: usize,
    ) -> TraceResult<TraceEstimate> {
        let shots = record.num_shots();
        let mut means = Vec::with_capacity(groups);
        let mut sum = 0.0;
        let mut pairs = 0u64;
        for range in group_ranges(shots, groups) {
            let packed = Packed::new(record.slice_rows(range.clone()), subset);
            let group_sum = self.pair_sum(&packed)?;
            let group_pairs = pair_count(range.len());
            means.push(group_sum / group_pairs as f64);
            sum += group_sum;
            pairs += group_pairs;
        }
        Ok(TraceEstimate {
            value: median(&mut means),
            sum,
            pairs,
            shots,
            subset_len: subset.len(),
            aggregation: Aggregation::MedianOfMeans { groups },
        })
    }

    fn pair_sum(&self, packed: &Packed) -> TraceResult<f64> {
        let rows = packed.rows();
        let progress = Progress::new(rows, self.config.progress);

        let sum = match self.config.strategy {
            Strategy::Sequential => (0..rows)
                .map(|i| {
                    let s = packed.row_sum(i);
                    progress.tick();
                    s
                })
                .sum::<f64>(),
            Strategy::Parallel => {
                let run = || -> Vec<f64> {
                    (0..rows)
                        .into_par_iter()
                        .map(|i| {
                            let s = packed.row_sum(i);
                            progress.tick();
                            s
                        })
                        .collect()
                };
                let partials = match self.config.threads {
                    Some(n) => rayon::ThreadPoolBuilder::new()
                        .num_threads(n)
                        .build()
                        .map_err(|e| TraceError::invalid_config(format!("thread pool: {e}")))?
                        .install(run),
                    None => run(),
                };
                partials.iter().sum::<f64>()
            }
        };
        progress.finish();
        Ok(sum)
    }
}

/// `m(m−1)/2`.
#[inline]
#[must_use]
pub const fn pair_count(m: usize) -> u64 {
    let m = m as u64;
    m * m.saturating_sub(1) / 2
}

/// Split `0..m` into `groups` contiguous ranges whose sizes differ by ≤ 1
/// (larger groups first).
#[must_use]
pub fn group_ranges(m: usize, groups: usize) -> Vec<std::ops::Range<usize>> {
    if groups == 0 {
        return Vec::new();
    }
    let base = m / groups;
    let extra = m % groups;
    let mut start = 0;
    (0..groups)
        .map(|g| {
            let len = base + usize::from(g < extra);
            let r = start..start + len;
            start += len;
            r
        })
        .collect()
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n == 0 {
        f64::NAN
    } else if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Mean pair trace of string rows over `subs`, the Python-facing contract.
///
/// Always runs with [`TraceConfig::default`]; the result depends only on the
/// arguments. Use [`TraceEstimator::from_env`] to honor `PQP_TRACE_*`.
///
/// ```
/// let data = vec![
///     vec!["Z+", "Z+"],
///     vec!["Z+", "Z-"],
///     vec!["Z-", "Z+"],
/// ];
/// let v = pqp_core::perform_trace_calculation(&data, &[0])?;
/// assert_eq!(v, -1.0);
/// # Ok::<(), pqp_core::TraceError>(())
/// ```
pub fn perform_trace_calculation<R, S>(data: &[R], subs: &[usize]) -> TraceResult<f64>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    TraceEstimator::default()
        .calculate(data, subs)
        .map(|e| e.value)
}

/// Raw Σ of pair traces (no normalization), as returned by earlier extension builds.
///
/// Like [`perform_trace_calculation`], ignores the environment.
pub fn perform_trace_sum<R, S>(data: &[R], subs: &[usize]) -> TraceResult<f64>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    TraceEstimator::default()
        .calculate(data, subs)
        .map(|e| e.sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Basis, Spin};

    fn seq() -> TraceEstimator {
        TraceEstimator::new(TraceConfig::default().with_strategy(Strategy::Sequential))
    }

    #[test]
    fn overlap_table() {
        let xp = Outcome::new(Basis::X, Spin::Up);
        let xm = Outcome::new(Basis::X, Spin::Down);
        let zp = Outcome::new(Basis::Z, Spin::Up);
        assert_eq!(snapshot_overlap(xp, xp), 5.0);
        assert_eq!(snapshot_overlap(xp, xm), -4.0);
        assert_eq!(snapshot_overlap(xp, zp), 0.5);
    }

    #[test]
    fn three_shot_example_by_hand() {
        // pairs (0,1)=5, (0,2)=-4, (1,2)=-4
        let data = [["Z+", "Z+"], ["Z+", "Z-"], ["Z-", "Z+"]];
        let est = seq().calculate(&data, &[0]).unwrap();
        assert_eq!(est.sum, -3.0);
        assert_eq!(est.pairs, 3);
        assert_eq!(est.value, -1.0);
    }

    #[test]
    fn identical_rows_hit_the_maximum() {
        let data = vec![vec!["X+", "Y+"]; 5];
        let est = seq().calculate(&data, &[0, 1]).unwrap();
        assert_eq!(est.pairs, 10);
        assert_eq!(est.value, 25.0);
    }

    #[test]
    fn pair_trace_matches_kernel() {
        let data = [["X+", "Y-", "Z+"], ["X+", "Y+", "X-"]];
        let rec = ShadowRecord::from_tokens(&data, TokenLayout::Combined).unwrap();
        let sub = Subset::new(vec![2, 0, 1], 3).unwrap();
        let direct = pair_trace(&rec.shots()[0], &rec.shots()[1], &sub);
        assert_eq!(direct, 0.5 * 5.0 * -4.0);
        assert_eq!(seq().estimate(&rec, &sub).unwrap().sum, direct);
    }

    #[test]
    fn boundary_errors() {
        let one = [["X+", "Z-"]];
        assert_eq!(
            seq().calculate(&one, &[0]).unwrap_err(),
            TraceError::InsufficientShots {
                shots: 1,
                required: 2
            }
        );
        let two = [["X+", "Z-"], ["Y+", "Z+"]];
        assert!(matches!(
            seq().calculate(&two, &[]),
            Err(TraceError::InvalidSubset { .. })
        ));
        assert!(matches!(
            seq().calculate(&two, &[2]),
            Err(TraceError::IndexOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn deserialized_subset_is_range_checked() {
        let two = [["X+", "Z-"], ["X+", "Z+"]];
        let rec = ShadowRecord::from_tokens(&two, TokenLayout::Combined).unwrap();
        let sub: Subset = serde_json::from_str(r#"{"indices":[1,5]}"#).unwrap();
        assert_eq!(
            seq().estimate(&rec, &sub).unwrap_err(),
            TraceError::IndexOutOfRange {
                index: 5,
                num_qubits: 2
            }
        );
        let sub: Subset = serde_json::from_str(r#"{"indices":[0]}"#).unwrap();
        assert_eq!(seq().estimate(&rec, &sub).unwrap().value, 5.0);
    }

    #[test]
    fn entry_points_return_mean_and_raw_sum() {
        let data = [["Z+", "Z+"], ["Z+", "Z-"], ["Z-", "Z+"]];
        assert_eq!(perform_trace_calculation(&data, &[0]).unwrap(), -1.0);
        assert_eq!(perform_trace_sum(&data, &[0]).unwrap(), -3.0);
    }

    #[test]
    fn group_ranges_cover_everything() {
        let r = group_ranges(10, 3);
        assert_eq!(r, vec![0..4, 4..7, 7..10]);
        assert!(group_ranges(5, 0).is_empty());
    }

    #[test]
    fn median_of_means_on_identical_rows() {
        let data = vec![vec!["Z-"]; 9];
        let est = TraceEstimator::new(
            TraceConfig::default().with_aggregation(Aggregation::MedianOfMeans { groups: 3 }),
        )
        .calculate(&data, &[0])
        .unwrap();
        assert_eq!(est.value, 5.0);
        assert_eq!(est.pairs, 9);
    }

    #[test]
    fn median_of_means_rejects_thin_groups() {
        let data = vec![vec!["Z-"]; 5];
        let err = TraceEstimator::new(
            TraceConfig::default().with_aggregation(Aggregation::MedianOfMeans { groups: 3 }),
        )
        .calculate(&data, &[0])
        .unwrap_err();
        assert!(matches!(err, TraceError::InvalidConfig { .. }));
    }

    #[test]
    fn median_even_count_averages_middle() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&mut v), 2.5);
    }

    #[test]
    fn dedicated_pool_matches_global_pool() {
        let data: Vec<Vec<String>> = (0..40)
            .map(|i| {
                vec![
                    ["X+", "Y-", "Z+"][i % 3].to_owned(),
                    ["Z-", "Z+"][i % 2].to_owned(),
                ]
            })
            .collect();
        let a = TraceEstimator::new(TraceConfig::default().with_threads(2))
            .calculate(&data, &[0, 1])
            .unwrap();
        let b = seq().calculate(&data, &[0, 1]).unwrap();
        assert_eq!(a.value.to_bits(), b.value.to_bits());
    }
}
