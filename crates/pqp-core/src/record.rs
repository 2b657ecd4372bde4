//! Validated measurement records and qubit subsets.
//!
//! [`ShadowRecord`] is the M × N outcome matrix (M shots, N qubits) and
//! [`Subset`] a checked list of qubit indices into it. Both are only
//! constructible through validating constructors, so downstream code (the
//! estimator in particular) can index without re-checking.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{TraceError, TraceResult};
use crate::types::Outcome;

/// How a row of string tokens encodes its outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenLayout {
    /// One token per qubit: `"X+"`, `"Z-1"`.
    Combined,
    /// Two tokens per qubit, basis then spin: `["X", "1", "Z", "-1"]`.
    Paired,
    /// Combined if the first token parses as a combined outcome, else Paired.
    #[default]
    Auto,
}

impl TokenLayout {
    /// Resolve `Auto` against the first token of the data.
    #[must_use]
    pub fn resolve(self, first_token: Option<&str>) -> Self {
        match self {
            Self::Auto => match first_token {
                Some(t) if t.parse::<Outcome>().is_ok() => Self::Combined,
                _ => Self::Paired,
            },
            other => other,
        }
    }
}

/// M shots × N qubit outcomes with equal-length rows (M ≥ 1, N ≥ 1).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawRecord")]
pub struct ShadowRecord {
    num_qubits: usize,
    shots: Vec<Vec<Outcome>>,
}

/// Unchecked wire form; converted through [`ShadowRecord::new`].
#[derive(Deserialize)]
struct RawRecord {
    num_qubits: usize,
    shots: Vec<Vec<Outcome>>,
}

impl TryFrom<RawRecord> for ShadowRecord {
    type Error = TraceError;

    fn try_from(raw: RawRecord) -> TraceResult<Self> {
        let rec = Self::new(raw.shots)?;
        if rec.num_qubits != raw.num_qubits {
            return Err(TraceError::malformed(format!(
                "declared num_qubits {} but rows have {} outcomes",
                raw.num_qubits, rec.num_qubits
            )));
        }
        Ok(rec)
    }
}

impl ShadowRecord {
    /// Validate and wrap a shot matrix.
    pub fn new(shots: Vec<Vec<Outcome>>) -> TraceResult<Self> {
        let Some(first) = shots.first() else {
            return Err(TraceError::malformed("record has no shots"));
        };
        let num_qubits = first.len();
        if num_qubits == 0 {
            return Err(TraceError::malformed("shots have no qubits"));
        }
        if let Some((row, shot)) = shots
            .iter()
            .enumerate()
            .find(|(_, s)| s.len() != num_qubits)
        {
            return Err(TraceError::malformed(format!(
                "row {row} has {} outcomes, expected {num_qubits}",
                shot.len()
            )));
        }
        Ok(Self { num_qubits, shots })
    }

    /// Parse string rows in the given layout.
    ///
    /// ```
    /// use pqp_core::{ShadowRecord, TokenLayout};
    /// let rec = ShadowRecord::from_tokens(&[vec!["X", "1", "Z", "-1"]], TokenLayout::Auto)?;
    /// assert_eq!(rec.num_qubits(), 2);
    /// # Ok::<(), pqp_core::TraceError>(())
    /// ```
    pub fn from_tokens<R, S>(rows: &[R], layout: TokenLayout) -> TraceResult<Self>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let first = rows
            .first()
            .and_then(|r| r.as_ref().first())
            .map(AsRef::as_ref);
        let layout = layout.resolve(first);

        let shots = rows
            .iter()
            .enumerate()
            .map(|(row, tokens)| parse_row(row, tokens.as_ref(), layout))
            .collect::<TraceResult<Vec<_>>>()?;
        Self::new(shots)
    }

    /// Number of shots M.
    #[inline]
    #[must_use]
    pub fn num_shots(&self) -> usize {
        self.shots.len()
    }

    /// Number of qubits N.
    #[inline]
    #[must_use]
    pub const fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// All shots, row-major.
    #[inline]
    #[must_use]
    pub fn shots(&self) -> &[Vec<Outcome>] {
        &self.shots
    }

    /// Consume into the raw shot matrix.
    #[must_use]
    pub fn into_shots(self) -> Vec<Vec<Outcome>> {
        self.shots
    }

    /// Keep only the shots in `range` (used for median-of-means groups).
    pub(crate) fn slice_rows(&self, range: std::ops::Range<usize>) -> &[Vec<Outcome>] {
        &self.shots[range]
    }
}

fn parse_row<S: AsRef<str>>(row: usize, tokens: &[S], layout: TokenLayout) -> TraceResult<Vec<Outcome>> {
    match layout {
        TokenLayout::Paired => {
            if tokens.len() % 2 != 0 {
                return Err(TraceError::malformed(format!(
                    "row {row} has an odd number of tokens ({}) for paired layout",
                    tokens.len()
                )));
            }
            tokens
                .chunks_exact(2)
                .enumerate()
                .map(|(q, pair)| {
                    Outcome::from_pair(pair[0].as_ref(), pair[1].as_ref())
                        .map_err(|e| TraceError::malformed(format!("row {row}, qubit {q}: {e}")))
                })
                .collect()
        }
        // Auto is resolved by the caller; treat it like Combined if it slips through.
        TokenLayout::Combined | TokenLayout::Auto => tokens
            .iter()
            .enumerate()
            .map(|(q, t)| {
                t.as_ref()
                    .parse::<Outcome>()
                    .map_err(|e| TraceError::malformed(format!("row {row}, qubit {q}: {e}")))
            })
            .collect(),
    }
}

/// Non-empty set of distinct qubit indices, each valid for a given N.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "RawSubset")]
pub struct Subset {
    indices: Vec<usize>,
}

/// Unchecked wire form. N is unknown here, so only emptiness and
/// duplicates are checked; the estimator checks range against the record.
#[derive(Deserialize)]
struct RawSubset {
    indices: Vec<usize>,
}

impl TryFrom<RawSubset> for Subset {
    type Error = TraceError;

    fn try_from(raw: RawSubset) -> TraceResult<Self> {
        Self::new(raw.indices, usize::MAX)
    }
}

impl Subset {
    /// Validate `indices` against a record with `num_qubits` qubits.
    ///
    /// Order is preserved; duplicates are rejected rather than collapsed.
    pub fn new(indices: Vec<usize>, num_qubits: usize) -> TraceResult<Self> {
        if indices.is_empty() {
            return Err(TraceError::invalid_subset("subset is empty"));
        }
        let mut seen = HashSet::with_capacity(indices.len());
        for &index in &indices {
            if index >= num_qubits {
                return Err(TraceError::IndexOutOfRange { index, num_qubits });
            }
            if !seen.insert(index) {
                return Err(TraceError::invalid_subset(format!(
                    "qubit {index} appears more than once"
                )));
            }
        }
        Ok(Self { indices })
    }

    /// Every qubit of an N-qubit record.
    pub fn full(num_qubits: usize) -> TraceResult<Self> {
        Self::new((0..num_qubits).collect(), num_qubits)
    }

    /// Indices in caller order.
    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Subset size |A|.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Always `false` for a constructed subset.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Basis, Spin};

    #[test]
    fn auto_layout_detects_both_encodings() {
        let combined = ShadowRecord::from_tokens(&[vec!["X+", "Z-"]], TokenLayout::Auto).unwrap();
        let paired =
            ShadowRecord::from_tokens(&[vec!["X", "1", "Z", "-1"]], TokenLayout::Auto).unwrap();
        assert_eq!(combined, paired);
        assert_eq!(combined.shots()[0][1], Outcome::new(Basis::Z, Spin::Down));
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let err = ShadowRecord::from_tokens(&[vec!["X+", "Z-"], vec!["Y+"]], TokenLayout::Combined)
            .unwrap_err();
        assert!(matches!(err, TraceError::MalformedData { .. }));
    }

    #[test]
    fn empty_and_bad_tokens_are_malformed() {
        let rows: Vec<Vec<String>> = vec![];
        assert!(matches!(
            ShadowRecord::from_tokens(&rows, TokenLayout::Auto),
            Err(TraceError::MalformedData { .. })
        ));
        assert!(matches!(
            ShadowRecord::from_tokens(&[vec!["X", "1", "Z"]], TokenLayout::Paired),
            Err(TraceError::MalformedData { .. })
        ));
        assert!(matches!(
            ShadowRecord::from_tokens(&[vec!["X+", "W+"]], TokenLayout::Combined),
            Err(TraceError::MalformedData { .. })
        ));
    }

    #[test]
    fn subset_validation() {
        assert!(Subset::new(vec![1, 0], 2).is_ok());
        assert!(matches!(
            Subset::new(vec![], 2),
            Err(TraceError::InvalidSubset { .. })
        ));
        assert_eq!(
            Subset::new(vec![0, 2], 2),
            Err(TraceError::IndexOutOfRange {
                index: 2,
                num_qubits: 2
            })
        );
        assert!(matches!(
            Subset::new(vec![1, 1], 2),
            Err(TraceError::InvalidSubset { .. })
        ));
        assert_eq!(Subset::full(3).unwrap().indices(), &[0, 1, 2]);
    }

    #[test]
    fn serde_rejects_inconsistent_records() {
        let rec = ShadowRecord::from_tokens(&[vec!["X+"], vec!["Y-"]], TokenLayout::Combined).unwrap();
        let json = serde_json::to_string(&rec).unwrap();
        let back: ShadowRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);

        let bad = r#"{"num_qubits":2,"shots":[[{"basis":"X","spin":"Up"}]]}"#;
        assert!(serde_json::from_str::<ShadowRecord>(bad).is_err());
    }

    #[test]
    fn serde_rejects_empty_or_repeated_subsets() {
        let sub: Subset = serde_json::from_str(r#"{"indices":[2,0]}"#).unwrap();
        assert_eq!(sub.indices(), &[2, 0]);
        assert_eq!(serde_json::to_string(&sub).unwrap(), r#"{"indices":[2,0]}"#);

        assert!(serde_json::from_str::<Subset>(r#"{"indices":[]}"#).is_err());
        let err = serde_json::from_str::<Subset>(r#"{"indices":[0,0]}"#).unwrap_err();
        assert!(err.to_string().contains("more than once"), "{err}");
    }
}
