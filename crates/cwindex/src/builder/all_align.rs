//! Recursive window enumerator.
//!
//! For each hash function and document, `work(l, le, r)` finds the leftmost
//! argmin position of the hash over `[l, r]`, emits the windows anchored on
//! that minimum occurrence chain, and recurses on the sub-ranges that the
//! emitted rectangles do not cover. `le` bounds how far right the start
//! coordinate `b` may extend; every recursive call shrinks `r - l`, so depth
//! is bounded by the document length.

use crate::hash::HashKernel;
use crate::window::Window;

use super::{DocScratch, WindowTable};

struct Pass<'a, K: HashKernel> {
    hasher: &'a K,
    hid: usize,
    doc_id: u32,
    doc: &'a [u32],
    max_freq: u32,
    freq: &'a mut [u32],
    next: &'a [i32],
    rnext: &'a [i32],
    out: &'a mut Vec<Window<K::Value>>,
}

impl<K: HashKernel> Pass<'_, K> {
    fn work(&mut self, l: i32, le: i32, r: i32) {
        if r < l {
            return;
        }

        // Leftmost argmin of the hash over [l, r], weighting each position
        // by its running count within [l, i].
        let mut mn = None;
        let mut c = l;
        let mut x = 0u32;
        for i in l..=r {
            let t = self.doc[i as usize];
            self.freq[t as usize] += 1;
            let w = self.hasher.weight(self.freq[t as usize], self.max_freq);
            let v = self.hasher.eval(self.hid, t, w);
            let improved = match mn {
                None => true,
                Some(m) => v < m,
            };
            if improved {
                mn = Some(v);
                c = i;
                x = self.freq[t as usize];
            }
        }
        for i in l..=r {
            self.freq[self.doc[i as usize] as usize] -= 1;
        }
        let mn = match mn {
            Some(v) => v,
            None => return,
        };

        // Leftmost occurrence of the argmin token at or after l.
        let mut b = c;
        while self.rnext[b as usize] >= l {
            b = self.rnext[b as usize];
        }

        let mut c = c;
        while c <= r {
            let a = (self.rnext[b as usize] + 1).max(l);
            if le > b {
                self.out.push(Window::new(self.doc_id, mn, a, b, c, r));
                if x == 1 {
                    self.work(a, b - 1, c - 1);
                } else {
                    self.work(a, b, c - 1);
                }
            } else {
                self.out.push(Window::new(self.doc_id, mn, a, le, c, r));
                self.work(a, le, c - 1);
                return;
            }
            if self.next[c as usize] > r {
                self.work(b + 1, le, r);
                return;
            }
            b = self.next[b as usize];
            c = self.next[c as usize];
        }
    }
}

/// Enumerate windows for the whole corpus.
pub fn build<K: HashKernel>(docs: &[Vec<u32>], hasher: &K) -> WindowTable<K::Value> {
    let max_len = docs.iter().map(|d| d.len()).max().unwrap_or(0);
    let mut scratch = DocScratch::new(hasher.token_num().max(max_len + 1));
    let mut table = WindowTable::new(hasher.k());

    for hid in 0..hasher.k() {
        for (doc_id, doc) in docs.iter().enumerate() {
            let n = doc.len() as i32;
            let max_freq = scratch.count_freqs(doc);
            scratch.clear_freqs(doc);
            scratch.build_rnext(doc);
            scratch.build_next(doc);

            let mut pass = Pass {
                hasher,
                hid,
                doc_id: doc_id as u32,
                doc,
                max_freq,
                freq: &mut scratch.freq,
                next: &scratch.next,
                rnext: &scratch.rnext,
                out: &mut table.per_hash[hid],
            };
            pass.work(0, n - 1, n - 1);
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
    fn single_token_doc_gives_one_window() {
        let docs = vec![vec![7u32]];
        let hasher = IntHasher::new(1, 10, 0);
        let table = build(&docs, &hasher);
        assert_eq!(table.per_hash[0].len(), 1);
        let w = table.per_hash[0][0];
        assert_eq!((w.doc, w.a, w.b, w.c, w.d), (0, 0, 0, 0, 0));
        assert_eq!(w.value, hasher.eval(0, 7, 1));
    }

    #[test]
    fn empty_doc_gives_nothing() {
        let docs = vec![vec![]];
        let hasher = IntHasher::new(2, 10, 0);
        let table = build(&docs, &hasher);
        assert_eq!(table.total(), 0);
    }

    #[test]
    fn covers_exactly_once() {
        let docs = vec![vec![3u32, 9, 3, 3, 1, 9], vec![5u32, 5, 5]];
        let hasher = IntHasher::new(3, 10, 42);
        let table = build(&docs, &hasher);
        assert!(validate(&docs, &table).is_clean());
    }
}
