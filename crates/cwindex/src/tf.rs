//! Term-frequency weighting strategies.
//!
//! A weight is computed from the running count of a token inside a range and
//! the maximum raw count of any token in the whole document. Raw counts are
//! the only mode representable with integer weights; every other mode (and
//! any IDF scaling) produces real weights.
//!
//! | mode | formula |
//! |---|---|
//! | `Raw` | `freq` |
//! | `LogNorm` | `1 + ln(freq)` |
//! | `Boolean` | `1 if freq > 0 else 0` |
//! | `Augmented` | `0.5 + 0.5 * freq / max_freq` |
//! | `Square` | `freq^2` |

use crate::error::BuildError;

/// Term-frequency weighting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TfMode {
    /// Raw count.
    Raw,
    /// Log-normalized: `1 + ln(freq)` (dampens high frequencies).
    LogNorm,
    /// Boolean presence: 1 if the token occurs at all.
    Boolean,
    /// Augmented: `0.5 + 0.5 * freq / max_freq` (normalized against the most
    /// frequent token in the document).
    Augmented,
    /// Squared count.
    Square,
}

impl TfMode {
    /// Parse a CLI-style mode name.
    pub fn parse(s: &str) -> Result<Self, BuildError> {
        match s {
            "raw" => Ok(TfMode::Raw),
            "log" => Ok(TfMode::LogNorm),
            "boolean" => Ok(TfMode::Boolean),
            "augmented" => Ok(TfMode::Augmented),
            "square" => Ok(TfMode::Square),
            _ => Err(BuildError::UnknownTfMode(s.to_string())),
        }
    }

    /// Canonical name, the inverse of [`TfMode::parse`].
    pub fn as_str(self) -> &'static str {
        match self {
            TfMode::Raw => "raw",
            TfMode::LogNorm => "log",
            TfMode::Boolean => "boolean",
            TfMode::Augmented => "augmented",
            TfMode::Square => "square",
        }
    }

    /// Stable on-disk discriminant.
    pub fn code(self) -> i32 {
        match self {
            TfMode::Raw => 0,
            TfMode::LogNorm => 1,
            TfMode::Boolean => 2,
            TfMode::Augmented => 3,
            TfMode::Square => 4,
        }
    }

    /// Decode an on-disk discriminant.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TfMode::Raw),
            1 => Some(TfMode::LogNorm),
            2 => Some(TfMode::Boolean),
            3 => Some(TfMode::Augmented),
            4 => Some(TfMode::Square),
            _ => None,
        }
    }

    /// Whether this mode needs real-valued weights.
    pub fn requires_real(self) -> bool {
        !matches!(self, TfMode::Raw)
    }
}

/// Compute a real-valued weight for a running count.
///
/// `freq` is the count of the token inside the range under consideration;
/// `max_freq` is the maximum raw count of any token in the full document
/// (only `Augmented` reads it).
pub fn weight_real(mode: TfMode, freq: u32, max_freq: u32) -> f64 {
    match mode {
        TfMode::Raw => freq as f64,
        TfMode::LogNorm => {
            if freq > 0 {
                1.0 + (freq as f64).ln()
            } else {
                0.0
            }
        }
        TfMode::Boolean => {
            if freq > 0 {
                1.0
            } else {
                0.0
            }
        }
        TfMode::Augmented => 0.5 + 0.5 * freq as f64 / max_freq as f64,
        TfMode::Square => (freq as f64) * (freq as f64),
    }
}
