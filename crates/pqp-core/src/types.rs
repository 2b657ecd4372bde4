//! Per-qubit measurement outcomes of a classical-shadow shot.
//!
//! A shot measures every qubit in a randomly chosen Pauli basis and records
//! the eigenvalue that came out. These types are re-exported at the crate
//! root so callers can import `pqp_core::Outcome`, `pqp_core::Basis`, etc.
//!
//! Text forms are the stable token alphabet used by records on the wire:
//! bases are `X`/`Y`/`Z` (or the upstream ids `0`/`1`/`2`), spins are
//! `+`/`+1`/`1` and `-`/`-1`/`0`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Random Pauli measurement basis.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Basis {
    /// Pauli X.
    X,
    /// Pauli Y.
    Y,
    /// Pauli Z (computational basis).
    Z,
}

impl Basis {
    /// All bases in id order.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    /// Upstream integer id (`0 → X`, `1 → Y`, `2 → Z`).
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Inverse of [`Basis::id`].
    #[inline]
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::X),
            1 => Some(Self::Y),
            2 => Some(Self::Z),
            _ => None,
        }
    }

    /// Single-letter symbol.
    #[inline]
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::Z => 'Z',
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Basis {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "X" | "x" | "0" => Ok(Self::X),
            "Y" | "y" | "1" => Ok(Self::Y),
            "Z" | "z" | "2" => Ok(Self::Z),
            other => Err(ParseTokenError::new("basis", other)),
        }
    }
}

/// Measured eigenvalue of the chosen Pauli.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Spin {
    /// Eigenvalue +1 (raw bit `1` in upstream integer notation).
    Up,
    /// Eigenvalue −1 (raw bit `0` in upstream integer notation).
    Down,
}

impl Spin {
    /// Eigenvalue as `±1`.
    #[inline]
    #[must_use]
    pub const fn value(self) -> i8 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    /// Map a raw measured bit (`'1'` → Up, `'0'` → Down).
    #[inline]
    #[must_use]
    pub const fn from_bit(bit: char) -> Option<Self> {
        match bit {
            '1' => Some(Self::Up),
            '0' => Some(Self::Down),
            _ => None,
        }
    }

    /// Short sign used in combined tokens.
    #[inline]
    #[must_use]
    pub const fn sign(self) -> char {
        match self {
            Self::Up => '+',
            Self::Down => '-',
        }
    }
}

impl fmt::Display for Spin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for Spin {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" | "+1" | "1" => Ok(Self::Up),
            "-" | "-1" | "0" => Ok(Self::Down),
            other => Err(ParseTokenError::new("spin", other)),
        }
    }
}

/// One qubit's result within a shot.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Outcome {
    /// Basis the qubit was measured in.
    pub basis: Basis,
    /// Eigenvalue obtained.
    pub spin: Spin,
}

impl Outcome {
    /// Construct an outcome.
    #[inline]
    #[must_use]
    pub const fn new(basis: Basis, spin: Spin) -> Self {
        Self { basis, spin }
    }

    /// Dense code in `0..6` (`basis * 2 + spin`), used by the pair kernel.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        let s = match self.spin {
            Spin::Up => 0,
            Spin::Down => 1,
        };
        self.basis.id() * 2 + s
    }

    /// Parse a paired token (`basis`, `spin`), e.g. `("X", "-1")`.
    pub fn from_pair(basis: &str, spin: &str) -> Result<Self, ParseTokenError> {
        Ok(Self::new(basis.parse()?, spin.parse()?))
    }
}

/// Combined token form, e.g. `X+` / `Z-`.
impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.basis.symbol(), self.spin.sign())
    }
}

/// Parses a combined token: a basis letter followed by a spin (`X+`, `Y-1`).
impl FromStr for Outcome {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let mut chars = t.chars();
        let Some(head) = chars.next() else {
            return Err(ParseTokenError::new("outcome", s));
        };
        let basis = match head {
            'X' | 'x' => Basis::X,
            'Y' | 'y' => Basis::Y,
            'Z' | 'z' => Basis::Z,
            _ => return Err(ParseTokenError::new("outcome", s)),
        };
        let spin = chars
            .as_str()
            .parse::<Spin>()
            .map_err(|_| ParseTokenError::new("outcome", s))?;
        Ok(Self::new(basis, spin))
    }
}

/// A token that is not part of the outcome alphabet.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid {field} token {token:?}")]
pub struct ParseTokenError {
    /// Which field was being parsed (`basis`, `spin`, `outcome`).
    pub field: &'static str,
    /// Offending token.
    pub token: String,
}

impl ParseTokenError {
    fn new(field: &'static str, token: &str) -> Self {
        Self {
            field,
            token: token.to_owned(),
        }
    }
}
