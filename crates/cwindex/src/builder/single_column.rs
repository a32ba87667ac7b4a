//! Per-left-endpoint sweep enumerator.
//!
//! For each start position `i`, sweep the end position rightwards keeping
//! the running minimum and its argmin position. Every time a strictly
//! smaller hash appears, the stretch swept so far becomes a window with
//! `a == b == i`. Simple and quadratic; the baseline the other builders are
//! checked against.

use crate::hash::HashKernel;
use crate::window::Window;

use super::{DocScratch, WindowTable};

/// Enumerate windows for the whole corpus.
pub fn build<K: HashKernel>(docs: &[Vec<u32>], hasher: &K) -> WindowTable<K::Value> {
    let max_len = docs.iter().map(|d| d.len()).max().unwrap_or(0);
    let mut scratch = DocScratch::new(hasher.token_num().max(max_len + 1));
    let mut table = WindowTable::new(hasher.k());

    for hid in 0..hasher.k() {
        for (doc_id, doc) in docs.iter().enumerate() {
            let n = doc.len();
            let max_freq = scratch.count_freqs(doc);
            for i in 0..n {
                // Restart the running counts for ranges beginning at i.
                for j in i..n {
                    scratch.freq[doc[j] as usize] = 0;
                }
                let mut c = i;
                let w = hasher.weight(1, max_freq);
                let mut v = hasher.eval(hid, doc[i], w);
                scratch.freq[doc[i] as usize] += 1;
                for d in i..n.saturating_sub(1) {
                    let t = doc[d + 1];
                    scratch.freq[t as usize] += 1;
                    let w = hasher.weight(scratch.freq[t as usize], max_freq);
                    let cand = hasher.eval(hid, t, w);
                    if cand < v {
                        table.per_hash[hid].push(Window::new(
                            doc_id as u32,
                            v,
                            i as i32,
                            i as i32,
                            c as i32,
                            d as i32,
                        ));
                        c = d + 1;
                        v = cand;
                    }
                }
                table.per_hash[hid].push(Window::new(
                    doc_id as u32,
                    v,
                    i as i32,
                    i as i32,
                    c as i32,
                    (n - 1) as i32,
                ));
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::validate;
    use crate::hash::IntHasher;

    #[test]
    fn windows_are_columns() {
        let docs = vec![vec![1u32, 2, 1, 3]];
        let hasher = IntHasher::new(2, 5, 0);
        let table = build(&docs, &hasher);
        for windows in &table.per_hash {
            for w in windows {
                assert_eq!(w.a, w.b);
            }
        }
        assert!(validate(&docs, &table).is_clean());
    }

    #[test]
    fn repeated_token_doc_covers_cleanly() {
        let docs = vec![vec![5u32, 5, 5]];
        let hasher = IntHasher::new(1, 10, 0);
        let table = build(&docs, &hasher);
        assert!(validate(&docs, &table).is_clean());
    }
}
