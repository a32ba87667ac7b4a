//! Coverage and min-hash invariants, checked against a brute-force model.
//!
//! For every builder, every hash function, every document and every
//! sub-range `[i, j]`:
//! - exactly one window covers `(i, j)`, and
//! - its value equals the directly computed minimum hash over the range.
//!
//! Because all builders are checked against the same model, agreement of
//! the induced `[i, j] -> value` maps across builders follows. The
//! monotonic builder's two backends must additionally emit identical
//! window multisets.

use std::collections::HashMap;

use proptest::prelude::*;

use cwindex::builder::{all_align, monotonic, single_column, validate, SearchStrategy, WindowTable};
use cwindex::hash::{CwsHasher, HashKernel, IntHasher};
use cwindex::tf::TfMode;
use cwindex::window::{WeightValue, Window};

// ─────────────────────────────────────────────────────────────────────────────
// Brute-force model
// ─────────────────────────────────────────────────────────────────────────────

fn doc_max_freq(doc: &[u32]) -> u32 {
    let mut counts: HashMap<u32, u32> = HashMap::new();
    let mut max = 0;
    for &t in doc {
        let c = counts.entry(t).or_insert(0);
        *c += 1;
        max = max.max(*c);
    }
    max
}

/// Minimum hash over `[i, j]` and its leftmost argmin position, weighting
/// each position by its running count inside the range.
fn range_min<K: HashKernel>(
    hasher: &K,
    hid: usize,
    doc: &[u32],
    i: usize,
    j: usize,
    max_freq: u32,
) -> (K::Value, usize) {
    let mut counts: HashMap<u32, u32> = HashMap::new();
    // First element initializes the minimum: a range of all-infinite CWS
    // values (zero effective weight) has minimum infinity, which a sentinel
    // seed would never record.
    let mut best = None;
    let mut argmin = i;
    for (pos, &t) in doc.iter().enumerate().take(j + 1).skip(i) {
        let c = counts.entry(t).or_insert(0);
        *c += 1;
        let w = hasher.weight(*c, max_freq);
        let v = hasher.eval(hid, t, w);
        let improved = match best {
            None => true,
            Some(b) => v < b,
        };
        if improved {
            best = Some(v);
            argmin = pos;
        }
    }
    (best.expect("non-empty range"), argmin)
}

/// Assert the coverage and min-hash properties of a built table.
fn check_against_model<K: HashKernel>(docs: &[Vec<u32>], hasher: &K, table: &WindowTable<K::Value>, label: &str) {
    assert_eq!(table.k(), hasher.k());
    for (doc_id, doc) in docs.iter().enumerate() {
        let n = doc.len();
        let max_freq = doc_max_freq(doc);
        for hid in 0..hasher.k() {
            for i in 0..n {
                for j in i..n {
                    let covering: Vec<&Window<K::Value>> = table.per_hash[hid]
                        .iter()
                        .filter(|w| w.doc == doc_id as u32 && w.covers(i as i32, j as i32))
                        .collect();
                    assert_eq!(
                        covering.len(),
                        1,
                        "{}: hid {} doc {} range [{}, {}] covered {} times",
                        label,
                        hid,
                        doc_id,
                        i,
                        j,
                        covering.len()
                    );
                    let (expected, argmin) = range_min(hasher, hid, doc, i, j, max_freq);
                    assert_eq!(
                        covering[0].value, expected,
                        "{}: hid {} doc {} range [{}, {}] value mismatch",
                        label, hid, doc_id, i, j
                    );
                    // The argmin position of every covered range lies inside
                    // [b, c].
                    assert!(
                        covering[0].b <= argmin as i32 && (argmin as i32) <= covering[0].c,
                        "{}: hid {} doc {} range [{}, {}] argmin {} outside [{}, {}]",
                        label,
                        hid,
                        doc_id,
                        i,
                        j,
                        argmin,
                        covering[0].b,
                        covering[0].c
                    );
                }
            }
        }
    }
}

fn all_tables<K: HashKernel>(docs: &[Vec<u32>], hasher: &K) -> Vec<(&'static str, WindowTable<K::Value>)> {
    vec![
        ("allalign", all_align::build(docs, hasher)),
        (
            "monotonic/active/binary",
            monotonic::build(docs, hasher, true, SearchStrategy::Binary),
        ),
        (
            "monotonic/plain/binary",
            monotonic::build(docs, hasher, false, SearchStrategy::Binary),
        ),
        (
            "monotonic/active/linear",
            monotonic::build(docs, hasher, true, SearchStrategy::Linear),
        ),
        ("single", single_column::build(docs, hasher)),
    ]
}

fn sorted_windows<V: WeightValue>(windows: &[Window<V>]) -> Vec<(u32, i32, i32, i32, i32)> {
    let mut keys: Vec<(u32, i32, i32, i32, i32)> =
        windows.iter().map(|w| (w.doc, w.a, w.b, w.c, w.d)).collect();
    keys.sort();
    keys
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixed scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn two_distinct_tokens_agree_across_builders() {
    let docs = vec![vec![3u32, 9]];
    let hasher = IntHasher::new(1, 10, 0);
    for (label, table) in all_tables(&docs, &hasher) {
        check_against_model(&docs, &hasher, &table, label);
    }
}

#[test]
fn repeated_token_respects_running_counts() {
    // With a repeated token the weight changes along the range, so windows
    // must split on occurrence counts, not just token identity.
    let docs = vec![vec![5u32, 5, 5]];
    let hasher = IntHasher::new(2, 10, 0);
    for (label, table) in all_tables(&docs, &hasher) {
        check_against_model(&docs, &hasher, &table, label);
    }
}

#[test]
fn mixed_corpus_integer_kernel() {
    let docs = vec![
        vec![3u32, 9, 3, 3, 1, 9, 2],
        vec![5u32, 5, 5, 5],
        vec![],
        vec![0u32],
    ];
    let hasher = IntHasher::new(3, 10, 42);
    for (label, table) in all_tables(&docs, &hasher) {
        check_against_model(&docs, &hasher, &table, label);
        assert!(validate(&docs, &table).is_clean(), "{}", label);
    }
}

#[test]
fn mixed_corpus_cws_kernel_with_idf() {
    let docs = vec![vec![1u32, 4, 1, 2, 4, 1], vec![0u32, 2, 0, 0]];
    let mut hasher = CwsHasher::new(2, 5, TfMode::LogNorm, 7);
    hasher.idf_from_corpus(&docs);
    for (label, table) in all_tables(&docs, &hasher) {
        check_against_model(&docs, &hasher, &table, label);
    }
}

#[test]
fn augmented_and_square_modes() {
    let docs = vec![vec![2u32, 2, 3, 2, 3]];
    for mode in [TfMode::Boolean, TfMode::Augmented, TfMode::Square] {
        let hasher = CwsHasher::new(2, 4, mode, 11);
        for (label, table) in all_tables(&docs, &hasher) {
            check_against_model(&docs, &hasher, &table, label);
        }
    }
}

#[test]
fn monotonic_backends_emit_identical_multisets() {
    let docs = vec![vec![6u32, 1, 6, 6, 2, 1, 6, 3], vec![4u32, 4, 4]];
    let hasher = IntHasher::new(4, 8, 13);
    for active in [false, true] {
        let binary = monotonic::build(&docs, &hasher, active, SearchStrategy::Binary);
        let linear = monotonic::build(&docs, &hasher, active, SearchStrategy::Linear);
        for hid in 0..4 {
            assert_eq!(
                sorted_windows(&binary.per_hash[hid]),
                sorted_windows(&linear.per_hash[hid]),
                "active={} hid={}",
                active,
                hid
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Property tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn random_corpora_cover_exactly_once_integer() {
    proptest!(|(
        docs in proptest::collection::vec(
            proptest::collection::vec(0u32..6, 0..10),
            1..3
        ),
        seed in 0u64..1000,
    )| {
        let hasher = IntHasher::new(2, 6, seed);
        for (label, table) in all_tables(&docs, &hasher) {
            check_against_model(&docs, &hasher, &table, label);
        }
    });
}

#[test]
fn random_corpora_cover_exactly_once_cws() {
    proptest!(|(
        docs in proptest::collection::vec(
            proptest::collection::vec(0u32..5, 0..8),
            1..3
        ),
        seed in 0u64..1000,
        mode_idx in 0usize..4,
    )| {
        let mode = [TfMode::Raw, TfMode::LogNorm, TfMode::Augmented, TfMode::Square][mode_idx];
        let mut hasher = CwsHasher::new(2, 5, mode, seed);
        if seed % 2 == 0 {
            hasher.idf_from_corpus(&docs);
        }
        for (label, table) in all_tables(&docs, &hasher) {
            check_against_model(&docs, &hasher, &table, label);
        }
    });
}

#[test]
fn random_backend_equivalence() {
    proptest!(|(
        doc in proptest::collection::vec(0u32..4, 0..12),
        seed in 0u64..500,
        active in proptest::bool::ANY,
    )| {
        let docs = vec![doc];
        let hasher = IntHasher::new(2, 4, seed);
        let binary = monotonic::build(&docs, &hasher, active, SearchStrategy::Binary);
        let linear = monotonic::build(&docs, &hasher, active, SearchStrategy::Linear);
        for hid in 0..2 {
            prop_assert_eq!(
                sorted_windows(&binary.per_hash[hid]),
                sorted_windows(&linear.per_hash[hid])
            );
        }
    });
}
