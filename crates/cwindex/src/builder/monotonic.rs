//! Ascending-hash-order window enumerator.
//!
//! Token occurrences are turned into keys `(token, x)` - the `x`-th
//! occurrence of `token` in the document - and processed in increasing order
//! of their hash value. When a key is processed, every earlier key had a
//! smaller value, so the occurrence window `[keys_start, keys_end]` of the
//! current key becomes the minimum exactly on the sub-ranges not already
//! claimed by a dominant interval. Those sub-ranges are carved out of the
//! dominant-interval set `S` as rectangles; intervals the new window
//! strictly dominates are removed, and the window is inserted as a new
//! dominant interval.
//!
//! `S` starts with sentinels `(-1, -1)` and `(n, n)` so ceiling/floor
//! lookups always land somewhere.
//!
//! With the `active` option, a key is only generated when it improves the
//! running per-token minimum: later occurrences of a token weight heavier
//! (or equal), so most of them can never become a range minimum and are
//! skipped up front.

use std::cmp::Ordering;

use crate::error::BuildError;
use crate::hash::HashKernel;
use crate::splay::{DominantSet, LinearSet, SplayTree};
use crate::window::{WeightValue, Window};

use super::{DocScratch, WindowTable};

/// Dominant-set backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Splay tree, amortized `O(log n)` per key.
    Binary,
    /// Naive scan over a sorted vec, `O(|S|)` per key.
    Linear,
}

impl SearchStrategy {
    pub fn parse(s: &str) -> Result<Self, BuildError> {
        match s {
            "binary" => Ok(SearchStrategy::Binary),
            "linear" => Ok(SearchStrategy::Linear),
            _ => Err(BuildError::UnknownStrategy(s.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SearchStrategy::Binary => "binary",
            SearchStrategy::Linear => "linear",
        }
    }
}

/// A token occurrence with its precomputed sort key.
struct Key<V> {
    token: u32,
    x: u32,
    value: V,
}

/// Enumerate windows for the whole corpus.
pub fn build<K: HashKernel>(
    docs: &[Vec<u32>],
    hasher: &K,
    active: bool,
    strategy: SearchStrategy,
) -> WindowTable<K::Value> {
    match strategy {
        SearchStrategy::Binary => run::<K, SplayTree>(docs, hasher, active),
        SearchStrategy::Linear => run::<K, LinearSet>(docs, hasher, active),
    }
}

fn generate_keys<K: HashKernel>(
    hasher: &K,
    hid: usize,
    doc: &[u32],
    max_freq: u32,
    active: bool,
    freq: &mut [u32],
    mini: &mut [K::Value],
    keys: &mut Vec<Key<K::Value>>,
) {
    for &token in doc {
        let t = token as usize;
        freq[t] += 1;
        let x = freq[t];
        let w = hasher.weight(x, max_freq);
        let v = hasher.eval(hid, token, w);
        if active {
            // First occurrences always enter (and overwrite whatever an
            // earlier document left in mini); later ones only when they
            // improve on the running minimum.
            if x == 1 || v < mini[t] {
                mini[t] = v;
                keys.push(Key { token, x, value: v });
            }
        } else {
            keys.push(Key { token, x, value: v });
        }
    }
}

fn run<K: HashKernel, S: DominantSet>(
    docs: &[Vec<u32>],
    hasher: &K,
    active: bool,
) -> WindowTable<K::Value> {
    let max_len = docs.iter().map(|d| d.len()).max().unwrap_or(0);
    let mut scratch = DocScratch::new(hasher.token_num().max(max_len + 1));
    let mut mini = vec![K::Value::MAX_SENTINEL; hasher.token_num()];
    let mut keys: Vec<Key<K::Value>> = Vec::new();
    let mut span: Vec<(i32, i32)> = Vec::new();
    let mut table = WindowTable::new(hasher.k());

    for hid in 0..hasher.k() {
        for (doc_id, doc) in docs.iter().enumerate() {
            let n = doc.len() as i32;
            scratch.build_next(doc);
            let max_freq = scratch.count_freqs(doc);
            scratch.clear_freqs(doc);

            keys.clear();
            generate_keys(
                hasher,
                hid,
                doc,
                max_freq,
                active,
                &mut scratch.freq,
                &mut mini,
                &mut keys,
            );
            // Key generation restored freq[t] to the document-wide counts.
            keys.sort_by(|l, r| l.value.partial_cmp(&r.value).unwrap_or(Ordering::Equal));

            let mut set = S::default();
            set.insert(-1, -1);
            set.insert(n, n);

            for key in &keys {
                let t = key.token as usize;
                let x = key.x;
                let total = scratch.freq[t];

                let mut ks = 0i32;
                let mut ke = 0i32;
                for j in 0..=(total - x) {
                    if j == 0 {
                        ks = scratch.first[t];
                        ke = ks;
                        for _ in 1..x {
                            ke = scratch.next[ke as usize];
                        }
                    } else {
                        ks = scratch.next[ks as usize];
                        ke = scratch.next[ke as usize];
                    }

                    let (ceil_x, floor_x) =
                        match (set.ceiling_by_x(ks), set.floor_by_y(ke)) {
                            (Some((cx, _)), Some((fx, _))) => (cx, fx),
                            _ => continue,
                        };
                    if floor_x >= ceil_x {
                        // Window already inside a dominant interval.
                        continue;
                    }

                    let b = ks;
                    let mut c = ke;
                    span.clear();
                    set.range_inorder(floor_x, ceil_x, &mut span);
                    for w in 0..span.len().saturating_sub(1) {
                        let (ix, iy) = span[w];
                        let (_, ny) = span[w + 1];
                        let a = ix + 1;
                        let d = ny - 1;
                        if ix <= ks && iy >= ke {
                            set.remove(ix);
                        }
                        table.per_hash[hid].push(Window::new(
                            doc_id as u32,
                            key.value,
                            a,
                            b,
                            c,
                            d,
                        ));
                        c = ny;
                    }
                    if let Some(&(lx, ly)) = span.last() {
                        if lx <= ks && ly >= ke {
                            set.remove(lx);
                        }
                    }
                    set.insert(ks, ke);
                }
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::validate;
    use crate::hash::{CwsHasher, IntHasher};
    use crate::tf::TfMode;

    #[test]
    fn strategy_parsing() {
        assert_eq!(SearchStrategy::parse("binary").unwrap(), SearchStrategy::Binary);
        assert_eq!(SearchStrategy::parse("linear").unwrap(), SearchStrategy::Linear);
        assert!(SearchStrategy::parse("hash").is_err());
    }

    #[test]
    fn single_token_doc_gives_one_window() {
        let docs = vec![vec![7u32]];
        let hasher = IntHasher::new(1, 10, 0);
        let table = build(&docs, &hasher, true, SearchStrategy::Binary);
        assert_eq!(table.per_hash[0].len(), 1);
        let w = table.per_hash[0][0];
        assert_eq!((w.doc, w.a, w.b, w.c, w.d), (0, 0, 0, 0, 0));
        assert_eq!(w.value, hasher.eval(0, 7, 1));
    }

    #[test]
    fn covers_exactly_once() {
        let docs = vec![vec![3u32, 9, 3, 3, 1, 9], vec![5u32, 5, 5]];
        let hasher = IntHasher::new(3, 10, 42);
        for active in [false, true] {
            for strategy in [SearchStrategy::Binary, SearchStrategy::Linear] {
                let table = build(&docs, &hasher, active, strategy);
                assert!(
                    validate(&docs, &table).is_clean(),
                    "active={} strategy={:?}",
                    active,
                    strategy
                );
            }
        }
    }

    #[test]
    fn backends_emit_identical_windows() {
        let docs = vec![vec![1u32, 4, 1, 2, 4, 1, 1], vec![0u32, 2, 0]];
        let hasher = CwsHasher::new(2, 5, TfMode::LogNorm, 9);
        for active in [false, true] {
            let binary = build(&docs, &hasher, active, SearchStrategy::Binary);
            let linear = build(&docs, &hasher, active, SearchStrategy::Linear);
            for hid in 0..2 {
                let mut lhs = binary.per_hash[hid].clone();
                let mut rhs = linear.per_hash[hid].clone();
                let key = |w: &Window<f64>| (w.doc, w.a, w.b, w.c, w.d);
                lhs.sort_by_key(key);
                rhs.sort_by_key(key);
                assert_eq!(lhs, rhs);
            }
        }
    }
}
