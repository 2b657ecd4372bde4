//! Single-qubit states shared by every qubit of a synthetic product state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Each qubit is `(I + r·Z)/2`, i.e. `|0⟩` shrunk toward the maximally mixed
/// state by Bloch length `r`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StateModel {
    /// `|0⟩` on every qubit (`r = 1`).
    Pure,
    /// `I/2` on every qubit (`r = 0`).
    MaximallyMixed,
    /// Bloch length `r ∈ [0, 1]` along +Z.
    Partial {
        /// Bloch vector length.
        bloch: f64,
    },
}

impl StateModel {
    /// Bloch vector length along +Z, clamped to `[0, 1]`.
    #[must_use]
    pub fn bloch(self) -> f64 {
        match self {
            Self::Pure => 1.0,
            Self::MaximallyMixed => 0.0,
            Self::Partial { bloch } => bloch.clamp(0.0, 1.0),
        }
    }

    /// Probability of reading `+1` when measuring Z.
    #[must_use]
    pub fn p_up_z(self) -> f64 {
        (1.0 + self.bloch()) / 2.0
    }

    /// Exact `Tr(ρ_A²)` for a subset of `k` qubits.
    #[must_use]
    pub fn purity(self, k: usize) -> f64 {
        let r = self.bloch();
        let single = (1.0 + r * r) / 2.0;
        (0..k).fold(1.0, |acc, _| acc * single)
    }
}

impl fmt::Display for StateModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pure => write!(f, "pure"),
            Self::MaximallyMixed => write!(f, "mixed"),
            Self::Partial { bloch } => write!(f, "partial:{bloch}"),
        }
    }
}

/// Accepts `pure`, `mixed`, or `partial:<r>`.
impl FromStr for StateModel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "pure" => Ok(Self::Pure),
            "mixed" | "maximally_mixed" => Ok(Self::MaximallyMixed),
            other => {
                let Some(r) = other.strip_prefix("partial:") else {
                    anyhow::bail!("unknown state model {other:?} (use pure|mixed|partial:<r>)");
                };
                let bloch: f64 = r.parse()?;
                if !(0.0..=1.0).contains(&bloch) {
                    anyhow::bail!("bloch length {bloch} outside [0, 1]");
                }
                Ok(Self::Partial { bloch })
            }
        }
    }
}
