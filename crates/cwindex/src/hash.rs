//! Deterministic hash kernels.
//!
//! Two kernels produce the per-range minimum statistics behind the index:
//!
//! - [`IntHasher`]: a linear hash `(A*token + B*weight + C) mod p` over
//!   machine integers, usable only with raw term counts and no IDF.
//! - [`CwsHasher`]: the Ioffe (2010) consistent weighted sampling draw over
//!   non-negative real weights, so that two ranges collide on one hash
//!   coordinate with probability equal to their weighted Jaccard similarity.
//!
//! All randomness is derived from a stored 64-bit seed through ChaCha20.
//! The seed mapping (little-endian into the first 8 bytes of the 32-byte
//! ChaCha key), the uniform/gamma conversions, and the draw order are fixed:
//! they are part of the on-disk format, and an index built on one platform
//! must hash identically on another.

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

use crate::error::BuildError;
use crate::tf::{weight_real, TfMode};
use crate::window::WeightValue;

/// Modulus of the integer linear hash.
pub const MODULUS: i64 = 998_244_353;

/// Weight arithmetic selected for an index.
///
/// Integer precision applies iff the TF mode is raw and IDF is disabled;
/// everything else needs real weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Integer,
    Real,
}

impl Precision {
    pub fn of(tf_mode: TfMode, use_idf: bool) -> Self {
        if tf_mode == TfMode::Raw && !use_idf {
            Precision::Integer
        } else {
            Precision::Real
        }
    }
}

/// Build a ChaCha20 stream from a 64-bit seed.
///
/// The seed goes little-endian into the first 8 bytes of the key; the rest
/// stay zero. Keeping the mapping explicit avoids any cross-platform
/// ambiguity in the derived stream.
fn seed_rng(seed: u64) -> ChaCha20Rng {
    let mut key = [0u8; 32];
    key[..8].copy_from_slice(&seed.to_le_bytes());
    ChaCha20Rng::from_seed(key)
}

/// 53-bit uniform in `[0, 1)`.
fn unit_f64(rng: &mut ChaCha20Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Uniform draw in `[lo, hi)` by modular reduction.
fn draw_range(rng: &mut ChaCha20Rng, lo: i64, hi: i64) -> i64 {
    lo + (rng.next_u64() % (hi - lo) as u64) as i64
}

/// Gamma(shape 2, scale 1) as an Erlang sum of two exponentials:
/// `-(ln u1 + ln u2)`.
fn gamma2(rng: &mut ChaCha20Rng) -> f64 {
    let u1 = unit_f64(rng).max(f64::MIN_POSITIVE);
    let u2 = unit_f64(rng).max(f64::MIN_POSITIVE);
    -(u1.ln() + u2.ln())
}

/// Hasher parameters in their serialized shape.
///
/// The exchange type between kernels and the index file; see
/// `index::save_index` for the wire layout.
#[derive(Debug, Clone)]
pub struct StoredHasher {
    pub k: usize,
    pub token_num: usize,
    pub use_idf: bool,
    pub tf_mode: TfMode,
    pub seed: u64,
    /// Present iff `use_idf`.
    pub idf: Option<Vec<f64>>,
}

/// A family of `k` hash functions over `(token, weight)` pairs.
///
/// Implementations are monomorphic: builders and the query engine are
/// generic over the kernel so the per-call `eval` stays a direct call in the
/// hot loop.
pub trait HashKernel: Sized {
    /// Hash value type (`i32` or `f64`).
    type Value: WeightValue;

    /// Human-readable kernel name for logs.
    const NAME: &'static str;

    fn k(&self) -> usize;
    fn token_num(&self) -> usize;
    fn tf_mode(&self) -> TfMode;
    fn seed(&self) -> u64;
    fn use_idf(&self) -> bool;

    /// Weight of a token occurrence given its running count in the range and
    /// the document-wide maximum count.
    fn weight(&self, freq: u32, max_freq: u32) -> Self::Value;

    /// Hash value of `(token, weight)` under hash function `hid`. Smaller is
    /// better; ties are broken by the caller keeping the earliest position.
    fn eval(&self, hid: usize, token: u32, weight: Self::Value) -> Self::Value;

    /// Serialized parameters.
    fn to_stored(&self) -> StoredHasher;

    /// Rebuild from serialized parameters; fails when the stored
    /// configuration does not fit this kernel's precision.
    fn from_stored(stored: StoredHasher) -> Result<Self, BuildError>;
}

/// Per-hash-function coefficients of the integer linear hash.
#[derive(Debug, Clone, Copy)]
struct LinearCoeffs {
    a: i64,
    b: i64,
    c: i64,
}

/// Integer linear hash: `(A*token + B*weight + C) mod 998244353`.
///
/// Coefficients are derived once per hash id from the low 32 bits of
/// `seed ^ hid`, drawing `A in [1, p)`, `B in [1, p)`, `C in [0, p)` in that
/// order.
#[derive(Debug, Clone)]
pub struct IntHasher {
    k: usize,
    token_num: usize,
    seed: u64,
    coeffs: Vec<LinearCoeffs>,
}

impl IntHasher {
    pub fn new(k: usize, token_num: usize, seed: u64) -> Self {
        let coeffs = (0..k)
            .map(|hid| {
                let low = (seed ^ hid as u64) as u32;
                let mut rng = seed_rng(low as u64);
                let a = draw_range(&mut rng, 1, MODULUS);
                let b = draw_range(&mut rng, 1, MODULUS);
                let c = draw_range(&mut rng, 0, MODULUS);
                LinearCoeffs { a, b, c }
            })
            .collect();
        Self {
            k,
            token_num,
            seed,
            coeffs,
        }
    }
}

impl HashKernel for IntHasher {
    type Value = i32;

    const NAME: &'static str = "integer";

    fn k(&self) -> usize {
        self.k
    }

    fn token_num(&self) -> usize {
        self.token_num
    }

    fn tf_mode(&self) -> TfMode {
        TfMode::Raw
    }

    fn seed(&self) -> u64 {
        self.seed
    }

    fn use_idf(&self) -> bool {
        false
    }

    #[inline]
    fn weight(&self, freq: u32, _max_freq: u32) -> i32 {
        freq as i32
    }

    #[inline]
    fn eval(&self, hid: usize, token: u32, weight: i32) -> i32 {
        let LinearCoeffs { a, b, c } = self.coeffs[hid];
        ((token as i64 * a + weight as i64 * b + c) % MODULUS) as i32
    }

    fn to_stored(&self) -> StoredHasher {
        StoredHasher {
            k: self.k,
            token_num: self.token_num,
            use_idf: false,
            tf_mode: TfMode::Raw,
            seed: self.seed,
            idf: None,
        }
    }

    fn from_stored(stored: StoredHasher) -> Result<Self, BuildError> {
        if stored.tf_mode != TfMode::Raw || stored.use_idf {
            return Err(BuildError::PrecisionMismatch {
                tf_mode: stored.tf_mode,
                use_idf: stored.use_idf,
            });
        }
        Ok(Self::new(stored.k, stored.token_num, stored.seed))
    }
}

/// Consistent weighted sampling hash over real weights.
///
/// For a positive weight `w` (scaled by the token's IDF when enabled), the
/// per-`(hid, token)` stream yields `r ~ Gamma(2,1)`, `c ~ Gamma(2,1)`,
/// `beta ~ U[0,1)` in that order, and the hash value is
/// `c / (y * exp(r))` with `t = floor(ln(w)/r + beta)` and
/// `y = exp(r * (t - beta))`. Non-positive weights hash to `+inf`, which
/// never wins a minimum.
#[derive(Debug, Clone)]
pub struct CwsHasher {
    k: usize,
    token_num: usize,
    tf_mode: TfMode,
    seed: u64,
    idf: Vec<f64>,
    use_idf: bool,
}

impl CwsHasher {
    pub fn new(k: usize, token_num: usize, tf_mode: TfMode, seed: u64) -> Self {
        Self {
            k,
            token_num,
            tf_mode,
            seed,
            idf: vec![1.0; token_num],
            use_idf: false,
        }
    }

    /// Install an IDF vector (one entry per token id) and enable IDF
    /// scaling.
    pub fn set_idf(&mut self, idf: Vec<f64>) -> Result<(), BuildError> {
        if idf.len() != self.token_num {
            return Err(BuildError::InvalidParameter(format!(
                "idf vector has {} entries, vocabulary needs {}",
                idf.len(),
                self.token_num
            )));
        }
        self.idf = idf;
        self.use_idf = true;
        Ok(())
    }

    /// Derive IDF weights from the corpus itself:
    /// `idf[t] = ln(|docs| / df[t])`, zero for tokens that never occur.
    pub fn idf_from_corpus(&mut self, docs: &[Vec<u32>]) {
        let mut doc_freq = vec![0u32; self.token_num];
        for doc in docs {
            let unique: std::collections::HashSet<u32> = doc.iter().copied().collect();
            for token in unique {
                if (token as usize) < self.token_num {
                    doc_freq[token as usize] += 1;
                }
            }
        }
        for (t, &df) in doc_freq.iter().enumerate() {
            self.idf[t] = if df > 0 {
                (docs.len() as f64 / df as f64).ln()
            } else {
                0.0
            };
        }
        self.use_idf = true;
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    fn cws(&self, hid: usize, token: u32, w: f64) -> f64 {
        if w <= 0.0 {
            return f64::INFINITY;
        }
        let mut rng = seed_rng(self.seed ^ (((hid as u64) << 32) ^ token as u64));
        let mut r = gamma2(&mut rng);
        let c = gamma2(&mut rng);
        let mut beta = unit_f64(&mut rng);
        if r <= 0.0 {
            r = f64::MIN_POSITIVE;
        }
        if beta <= 0.0 {
            beta = f64::MIN_POSITIVE;
        }
        if beta >= 1.0 {
            beta = f64::from_bits(1.0f64.to_bits() - 1);
        }
        let t = (w.ln() / r + beta).floor();
        let y = (r * (t - beta)).exp();
        c / (y * r.exp())
    }
}

impl HashKernel for CwsHasher {
    type Value = f64;

    const NAME: &'static str = "cws";

    fn k(&self) -> usize {
        self.k
    }

    fn token_num(&self) -> usize {
        self.token_num
    }

    fn tf_mode(&self) -> TfMode {
        self.tf_mode
    }

    fn seed(&self) -> u64 {
        self.seed
    }

    fn use_idf(&self) -> bool {
        self.use_idf
    }

    #[inline]
    fn weight(&self, freq: u32, max_freq: u32) -> f64 {
        weight_real(self.tf_mode, freq, max_freq)
    }

    #[inline]
    fn eval(&self, hid: usize, token: u32, weight: f64) -> f64 {
        let w = if self.use_idf {
            weight * self.idf.get(token as usize).copied().unwrap_or(1.0)
        } else {
            weight
        };
        self.cws(hid, token, w)
    }

    fn to_stored(&self) -> StoredHasher {
        StoredHasher {
            k: self.k,
            token_num: self.token_num,
            use_idf: self.use_idf,
            tf_mode: self.tf_mode,
            seed: self.seed,
            idf: if self.use_idf {
                Some(self.idf.clone())
            } else {
                None
            },
        }
    }

    fn from_stored(stored: StoredHasher) -> Result<Self, BuildError> {
        let mut hasher = Self::new(stored.k, stored.token_num, stored.tf_mode, stored.seed);
        if stored.use_idf {
            let idf = stored
                .idf
                .ok_or_else(|| BuildError::InvalidParameter("idf vector missing".to_string()))?;
            hasher.set_idf(idf)?;
        }
        Ok(hasher)
    }
}
