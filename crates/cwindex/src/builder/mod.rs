//! Window enumeration.
//!
//! Three builders produce, per hash function and document, the complete set
//! of disjoint windows covering every sub-range `[i, j]`:
//!
//! - [`all_align`]: divide-and-conquer on the leftmost argmin position,
//! - [`monotonic`]: processes token occurrences in ascending hash order with
//!   a dominant-interval set (splay tree or naive backend),
//! - [`single_column`]: fixes the left endpoint and sweeps the right one,
//!   emitting degenerate one-column windows.
//!
//! All three induce the same `[i, j] -> value` map; they fragment it into
//! different rectangles. The enumeration order is deterministic and is what
//! ends up in the index file.

use crate::error::BuildError;
use crate::hash::HashKernel;
use crate::window::{WeightValue, Window};

pub mod all_align;
pub mod monotonic;
pub mod single_column;

pub use monotonic::SearchStrategy;

/// The per-hash-function window table. Bucket `hid` holds every window of
/// every document under hash function `hid`, in emission order.
#[derive(Debug, Clone)]
pub struct WindowTable<V> {
    pub per_hash: Vec<Vec<Window<V>>>,
}

impl<V: WeightValue> WindowTable<V> {
    pub fn new(k: usize) -> Self {
        Self {
            per_hash: vec![Vec::new(); k],
        }
    }

    pub fn k(&self) -> usize {
        self.per_hash.len()
    }

    /// Total number of windows across all hash functions.
    pub fn total(&self) -> u64 {
        self.per_hash.iter().map(|b| b.len() as u64).sum()
    }
}

/// Which enumeration algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderKind {
    Monotonic,
    AllAlign,
    SingleColumn,
}

impl BuilderKind {
    pub fn parse(s: &str) -> Result<Self, BuildError> {
        match s {
            "monotonic" => Ok(BuilderKind::Monotonic),
            "allalign" => Ok(BuilderKind::AllAlign),
            "single" | "singlecolumn" => Ok(BuilderKind::SingleColumn),
            _ => Err(BuildError::UnknownBuilder(s.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuilderKind::Monotonic => "monotonic",
            BuilderKind::AllAlign => "allalign",
            BuilderKind::SingleColumn => "single",
        }
    }
}

/// Build configuration: the algorithm plus the monotonic builder's knobs
/// (ignored by the other two).
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub builder: BuilderKind,
    /// Monotonic only: generate keys lazily, keeping just the occurrences
    /// that improve the running per-token minimum.
    pub active: bool,
    /// Monotonic only: dominant-set backend.
    pub strategy: SearchStrategy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            builder: BuilderKind::Monotonic,
            active: true,
            strategy: SearchStrategy::Binary,
        }
    }
}

/// Run the selected builder over the corpus.
pub fn build_table<K: HashKernel>(
    docs: &[Vec<u32>],
    hasher: &K,
    options: BuildOptions,
) -> WindowTable<K::Value> {
    match options.builder {
        BuilderKind::Monotonic => {
            monotonic::build(docs, hasher, options.active, options.strategy)
        }
        BuilderKind::AllAlign => all_align::build(docs, hasher),
        BuilderKind::SingleColumn => single_column::build(docs, hasher),
    }
}

/// Per-document scratch arrays shared by the builders.
///
/// Token-indexed arrays (`freq`, `first`) are sized to the vocabulary and
/// reused across documents; position-indexed arrays (`next`, `rnext`) are
/// resized per document. `freq` must read all-zero for the document's tokens
/// on entry to every counting pass - the clearing passes below are part of
/// the algorithm, not an optimization.
pub(crate) struct DocScratch {
    pub freq: Vec<u32>,
    pub first: Vec<i32>,
    /// `next[i]`: next position after `i` holding the same token, else `n`.
    pub next: Vec<i32>,
    /// `rnext[i]`: previous position before `i` holding the same token,
    /// else `-1`.
    pub rnext: Vec<i32>,
}

impl DocScratch {
    pub fn new(token_num: usize) -> Self {
        Self {
            freq: vec![0; token_num],
            first: vec![0; token_num],
            next: Vec::new(),
            rnext: Vec::new(),
        }
    }

    /// Count token frequencies, returning the maximum. Leaves `freq[t]`
    /// holding the document-wide count of `t`.
    pub fn count_freqs(&mut self, doc: &[u32]) -> u32 {
        for &t in doc {
            self.freq[t as usize] = 0;
        }
        let mut max_freq = 0;
        for &t in doc {
            self.freq[t as usize] += 1;
            max_freq = max_freq.max(self.freq[t as usize]);
        }
        max_freq
    }

    /// Zero `freq` for this document's tokens.
    pub fn clear_freqs(&mut self, doc: &[u32]) {
        for &t in doc {
            self.freq[t as usize] = 0;
        }
    }

    /// Fill `next` (length `n + 1`, `next[n] == n`). Afterwards `first[t]`
    /// holds the first position of `t`, or is untouched for absent tokens.
    pub fn build_next(&mut self, doc: &[u32]) {
        let n = doc.len();
        self.next.clear();
        self.next.resize(n + 1, 0);
        for &t in doc {
            self.first[t as usize] = n as i32;
        }
        self.next[n] = n as i32;
        for i in (0..n).rev() {
            let t = doc[i] as usize;
            self.next[i] = self.first[t];
            self.first[t] = i as i32;
        }
    }

    /// Fill `rnext` (length `n`). Trashes `first`.
    pub fn build_rnext(&mut self, doc: &[u32]) {
        let n = doc.len();
        self.rnext.clear();
        self.rnext.resize(n, 0);
        for &t in doc {
            self.first[t as usize] = -1;
        }
        for i in 0..n {
            let t = doc[i] as usize;
            self.rnext[i] = self.first[t];
            self.first[t] = i as i32;
        }
    }
}

/// Coverage diagnostics from [`validate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// `(hid, doc, i, j)` combinations covered by no window.
    pub uncovered: u64,
    /// Combinations covered by more than one window.
    pub multi_covered: u64,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.uncovered == 0 && self.multi_covered == 0
    }
}

/// Check that, per hash function, the windows of each document cover every
/// sub-range exactly once. Quadratic per document; diagnostic use only.
/// Violations are logged one line each and counted.
pub fn validate<V: WeightValue>(docs: &[Vec<u32>], table: &WindowTable<V>) -> ValidationReport {
    let mut report = ValidationReport::default();
    for (doc_id, doc) in docs.iter().enumerate() {
        let n = doc.len() as i32;
        for (hid, windows) in table.per_hash.iter().enumerate() {
            for i in 0..n {
                for j in i..n {
                    let hits = windows
                        .iter()
                        .filter(|w| w.doc == doc_id as u32 && w.covers(i, j))
                        .count();
                    if hits == 0 {
                        log::warn!("uncovered: hid {} doc {} range [{}, {}]", hid, doc_id, i, j);
                        report.uncovered += 1;
                    } else if hits > 1 {
                        log::warn!(
                            "multicover: hid {} doc {} range [{}, {}] ({} windows)",
                            hid,
                            doc_id,
                            i,
                            j,
                            hits
                        );
                        report.multi_covered += 1;
                    }
                }
            }
        }
    }
    report
}
