//! Approximate containment queries against a loaded index.
//!
//! A query is hashed into a k-dimensional signature the same way documents
//! were at build time. Every window whose value collides with the signature
//! on its hash coordinate is a witness that some sub-range of its document
//! shares that coordinate's minimum; a document sub-range matching on at
//! least `k * threshold` coordinates is reported.
//!
//! Matching runs as a two-level sweep per candidate document: the outer
//! sweep walks the end-position axis (`c..=d` of each window), and wherever
//! enough windows are simultaneously active, the inner sweep walks the
//! start-position axis (`a..=b`) of the active windows to find the start
//! intervals that complete the match.

use std::collections::{BTreeMap, HashMap};

use crate::builder::WindowTable;
use crate::error::BuildError;
use crate::hash::HashKernel;
use crate::index::{load_index, IndexResult};
use crate::window::{WeightValue, Window};

/// Slack applied to the `k * threshold` vote count.
pub const EPSILON: f64 = 1e-5;

/// How match coordinates are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    /// The historical pairing: couple the outer sweep's left boundary with
    /// the inner sweep's right boundary into a single `(lo, hi)` pair.
    Anchored,
    /// Full region: the start-position interval and the end-position
    /// interval, reported separately.
    Rectangle,
}

impl SweepMode {
    pub fn parse(s: &str) -> Result<Self, BuildError> {
        match s {
            "anchored" => Ok(SweepMode::Anchored),
            "rectangle" => Ok(SweepMode::Rectangle),
            _ => Err(BuildError::InvalidParameter(format!(
                "unknown sweep mode '{}' (valid: anchored, rectangle)",
                s
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SweepMode::Anchored => "anchored",
            SweepMode::Rectangle => "rectangle",
        }
    }
}

/// One matched region of a document.
///
/// `start_lo..=start_hi` are the admissible sub-range starts, and
/// `end_lo..=end_hi` the admissible ends, for which the vote count clears
/// the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchRegion {
    pub start_lo: i32,
    pub start_hi: i32,
    pub end_lo: i32,
    pub end_hi: i32,
}

impl MatchRegion {
    /// The historical `(lo, hi)` pairing of [`SweepMode::Anchored`]: the
    /// outer sweep's left boundary with the inner sweep's right boundary.
    pub fn anchored(&self) -> (i32, i32) {
        (self.end_lo, self.start_hi)
    }
}

/// Per-document query result.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocHits {
    pub doc_id: u32,
    /// Number of colliding windows the document contributed.
    pub window_count: usize,
    pub regions: Vec<MatchRegion>,
}

/// A loaded index plus its hasher, ready to answer queries.
pub struct QueryEngine<K: HashKernel> {
    hasher: K,
    table: WindowTable<K::Value>,
}

impl<K: HashKernel> QueryEngine<K> {
    pub fn new(hasher: K, table: WindowTable<K::Value>) -> Result<Self, BuildError> {
        if table.k() != hasher.k() {
            return Err(BuildError::InvalidParameter(format!(
                "table has {} hash buckets, hasher expects {}",
                table.k(),
                hasher.k()
            )));
        }
        Ok(Self { hasher, table })
    }

    /// Load an index file. The caller is expected to have checked the
    /// header's precision to pick `K`.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> IndexResult<Self> {
        let (hasher, table) = load_index::<_, K>(path)?;
        Ok(Self { hasher, table })
    }

    pub fn hasher(&self) -> &K {
        &self.hasher
    }

    pub fn total_windows(&self) -> u64 {
        self.table.total()
    }

    /// The query's k-dimensional min-hash signature.
    ///
    /// Per hash function, tokens are scanned left to right with a running
    /// frequency counter (reset between hash functions); the signature
    /// coordinate is the minimum hash value seen.
    pub fn signature(&self, query: &[u32]) -> Vec<K::Value> {
        let mut max_freq = 0u32;
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for &token in query {
            let c = counts.entry(token).or_insert(0);
            *c += 1;
            max_freq = max_freq.max(*c);
        }

        let mut signature = Vec::with_capacity(self.hasher.k());
        for hid in 0..self.hasher.k() {
            counts.clear();
            let mut best = K::Value::MAX_SENTINEL;
            for &token in query {
                let c = counts.entry(token).or_insert(0);
                *c += 1;
                let w = self.hasher.weight(*c, max_freq);
                let v = self.hasher.eval(hid, token, w);
                if v < best {
                    best = v;
                }
            }
            signature.push(best);
        }
        signature
    }

    /// Find all matching document regions at the given threshold.
    ///
    /// Results come back in ascending document order; documents with
    /// colliding windows but no region that clears the threshold are
    /// omitted.
    pub fn search(&self, query: &[u32], threshold: f64) -> Result<Vec<DocHits>, BuildError> {
        if query.is_empty() {
            return Err(BuildError::EmptyQuery);
        }
        if !threshold.is_finite() {
            return Err(BuildError::InvalidParameter(format!(
                "threshold must be finite, got {}",
                threshold
            )));
        }
        let signature = self.signature(query);

        let mut collided: BTreeMap<u32, Vec<&Window<K::Value>>> = BTreeMap::new();
        for (hid, windows) in self.table.per_hash.iter().enumerate() {
            for w in windows {
                if w.value == signature[hid] {
                    collided.entry(w.doc).or_default().push(w);
                }
            }
        }

        let mut results = Vec::new();
        for (doc_id, windows) in collided {
            let regions = sweep(&windows, self.hasher.k(), threshold);
            if !regions.is_empty() {
                results.push(DocHits {
                    doc_id,
                    window_count: windows.len(),
                    regions,
                });
            }
        }
        Ok(results)
    }
}

/// Two-level sweep over one document's colliding windows.
fn sweep<V: WeightValue>(windows: &[&Window<V>], k: usize, threshold: f64) -> Vec<MatchRegion> {
    let need = k as f64 * threshold - EPSILON;
    let mut events: Vec<(i32, i32, usize)> = Vec::with_capacity(windows.len() * 2);
    for (idx, w) in windows.iter().enumerate() {
        events.push((w.c, 1, idx));
        events.push((w.d + 1, -1, idx));
    }
    events.sort_by_key(|e| e.0);

    let mut active = vec![false; windows.len()];
    let mut regions = Vec::new();
    let mut count = 0i64;
    for i in 0..events.len() {
        if i > 0 && events[i].0 != events[i - 1].0 && count as f64 >= need {
            inner_sweep(
                windows,
                &active,
                need,
                events[i - 1].0,
                events[i].0 - 1,
                &mut regions,
            );
        }
        count += events[i].1 as i64;
        active[events[i].2] = events[i].1 > 0;
    }
    regions
}

/// Sweep the start axis of the currently-active windows.
fn inner_sweep<V: WeightValue>(
    windows: &[&Window<V>],
    active: &[bool],
    need: f64,
    end_lo: i32,
    end_hi: i32,
    out: &mut Vec<MatchRegion>,
) {
    let mut updates: Vec<(i32, i32)> = Vec::new();
    for (idx, w) in windows.iter().enumerate() {
        if active[idx] {
            updates.push((w.a, 1));
            updates.push((w.b + 1, -1));
        }
    }
    updates.sort();

    let mut count = 0i64;
    for i in 0..updates.len() {
        if i > 0 && updates[i].0 != updates[i - 1].0 && count as f64 >= need {
            out.push(MatchRegion {
                start_lo: updates[i - 1].0,
                start_hi: updates[i].0 - 1,
                end_lo,
                end_hi,
            });
        }
        count += updates[i].1 as i64;
    }
}
