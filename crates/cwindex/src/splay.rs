//! Dominant-interval sets for the monotonic builder.
//!
//! The monotonic builder maintains a dynamic set of `(x, y)` position pairs
//! keyed by `x`. By construction the live set is simultaneously increasing
//! in `x` and in `y` (a dominated pair is removed before its dominator is
//! inserted), which is what makes the floor-by-`y` walk on an `x`-keyed tree
//! sound.
//!
//! Two interchangeable backends implement [`DominantSet`]:
//!
//! - [`SplayTree`]: amortized `O(log n)` per operation,
//! - [`LinearSet`]: naive `O(n)` scans over a sorted vec, kept as the
//!   reference implementation.
//!
//! Both must answer every query identically; the builder's output is
//! compared across backends in the integration tests.
//!
//! Nodes live in an arena and address each other by index, with a sentinel
//! index for "no node". This sidesteps the cyclic parent/child ownership a
//! pointer-based splay tree would need, and deletion is a push onto a free
//! list.

/// Interface shared by the splay-tree and linear-scan backends.
pub trait DominantSet: Default {
    /// Insert `(x, y)`; no-op when `x` is already present.
    fn insert(&mut self, x: i32, y: i32);

    /// Remove the pair keyed `x`. Returns whether it was present.
    fn remove(&mut self, x: i32) -> bool;

    /// Pair with the smallest key `x' >= x`.
    fn ceiling_by_x(&mut self, x: i32) -> Option<(i32, i32)>;

    /// Pair with the largest `y' <= y`.
    fn floor_by_y(&mut self, y: i32) -> Option<(i32, i32)>;

    /// Append all pairs with `lo <= x <= hi` to `out`, ascending by `x`.
    fn range_inorder(&self, lo: i32, hi: i32, out: &mut Vec<(i32, i32)>);
}

const NIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    x: i32,
    y: i32,
    left: u32,
    right: u32,
    parent: u32,
}

/// Arena splay tree keyed by `x`.
#[derive(Debug)]
pub struct SplayTree {
    nodes: Vec<Node>,
    free: Vec<u32>,
    root: u32,
}

impl Default for SplayTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SplayTree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NIL,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root == NIL
    }

    fn alloc(&mut self, x: i32, y: i32) -> u32 {
        let node = Node {
            x,
            y,
            left: NIL,
            right: NIL,
            parent: NIL,
        };
        match self.free.pop() {
            Some(handle) => {
                self.nodes[handle as usize] = node;
                handle
            }
            None => {
                self.nodes.push(node);
                (self.nodes.len() - 1) as u32
            }
        }
    }

    fn release(&mut self, handle: u32) {
        self.free.push(handle);
    }

    /// Rotate `node` above its parent, fixing grandparent links.
    fn rotate(&mut self, node: u32) {
        let p = self.nodes[node as usize].parent;
        if p == NIL {
            return;
        }
        let g = self.nodes[p as usize].parent;
        if self.nodes[p as usize].left == node {
            let nr = self.nodes[node as usize].right;
            self.nodes[p as usize].left = nr;
            if nr != NIL {
                self.nodes[nr as usize].parent = p;
            }
            self.nodes[node as usize].right = p;
            self.nodes[p as usize].parent = node;
        } else {
            let nl = self.nodes[node as usize].left;
            self.nodes[p as usize].right = nl;
            if nl != NIL {
                self.nodes[nl as usize].parent = p;
            }
            self.nodes[node as usize].left = p;
            self.nodes[p as usize].parent = node;
        }
        self.nodes[node as usize].parent = g;
        if g != NIL {
            if self.nodes[g as usize].left == p {
                self.nodes[g as usize].left = node;
            } else {
                self.nodes[g as usize].right = node;
            }
        }
    }

    /// Splay `node` to the root of its tree (zig, zig-zig, zig-zag).
    fn splay(&mut self, node: u32) {
        if node == NIL {
            return;
        }
        loop {
            let p = self.nodes[node as usize].parent;
            if p == NIL {
                break;
            }
            let g = self.nodes[p as usize].parent;
            if g == NIL {
                self.rotate(node);
            } else {
                let node_is_left = self.nodes[p as usize].left == node;
                let p_is_left = self.nodes[g as usize].left == p;
                if node_is_left == p_is_left {
                    // zig-zig: rotate parent first
                    self.rotate(p);
                    self.rotate(node);
                } else {
                    // zig-zag
                    self.rotate(node);
                    self.rotate(node);
                }
            }
        }
        self.root = node;
    }

    fn pair(&self, handle: u32) -> Option<(i32, i32)> {
        if handle == NIL {
            None
        } else {
            let n = &self.nodes[handle as usize];
            Some((n.x, n.y))
        }
    }

    fn range_rec(&self, handle: u32, lo: i32, hi: i32, out: &mut Vec<(i32, i32)>) {
        if handle == NIL {
            return;
        }
        let Node { x, y, left, right, .. } = self.nodes[handle as usize];
        if x >= lo {
            self.range_rec(left, lo, hi, out);
        }
        if x >= lo && x <= hi {
            out.push((x, y));
        }
        if x <= hi {
            self.range_rec(right, lo, hi, out);
        }
    }
}

impl DominantSet for SplayTree {
    fn insert(&mut self, x: i32, y: i32) {
        if self.root == NIL {
            self.root = self.alloc(x, y);
            return;
        }
        let mut cur = self.root;
        let parent;
        loop {
            let cx = self.nodes[cur as usize].x;
            if x < cx {
                let next = self.nodes[cur as usize].left;
                if next == NIL {
                    parent = cur;
                    break;
                }
                cur = next;
            } else if x > cx {
                let next = self.nodes[cur as usize].right;
                if next == NIL {
                    parent = cur;
                    break;
                }
                cur = next;
            } else {
                // key already present; keep the existing pair
                return;
            }
        }
        let node = self.alloc(x, y);
        self.nodes[node as usize].parent = parent;
        if x < self.nodes[parent as usize].x {
            self.nodes[parent as usize].left = node;
        } else {
            self.nodes[parent as usize].right = node;
        }
        self.splay(node);
    }

    fn remove(&mut self, x: i32) -> bool {
        // Exact search, splaying the last touched node either way.
        let mut cur = self.root;
        let mut last = NIL;
        while cur != NIL {
            last = cur;
            let cx = self.nodes[cur as usize].x;
            if x == cx {
                break;
            } else if x < cx {
                cur = self.nodes[cur as usize].left;
            } else {
                cur = self.nodes[cur as usize].right;
            }
        }
        if cur == NIL {
            self.splay(last);
            return false;
        }
        self.splay(cur);

        // Splice: detach both subtrees, then hang the right subtree off the
        // maximum of the left one.
        let old = self.root;
        let left = self.nodes[old as usize].left;
        let right = self.nodes[old as usize].right;
        if left != NIL {
            self.nodes[left as usize].parent = NIL;
        }
        if right != NIL {
            self.nodes[right as usize].parent = NIL;
        }
        self.release(old);

        if left == NIL {
            self.root = right;
            return true;
        }
        let mut max = left;
        loop {
            let next = self.nodes[max as usize].right;
            if next == NIL {
                break;
            }
            max = next;
        }
        self.splay(max);
        self.nodes[max as usize].right = right;
        if right != NIL {
            self.nodes[right as usize].parent = max;
        }
        self.root = max;
        true
    }

    fn ceiling_by_x(&mut self, x: i32) -> Option<(i32, i32)> {
        let mut cur = self.root;
        let mut last = NIL;
        while cur != NIL {
            if self.nodes[cur as usize].x < x {
                cur = self.nodes[cur as usize].right;
            } else {
                last = cur;
                cur = self.nodes[cur as usize].left;
            }
        }
        self.splay(last);
        self.pair(last)
    }

    fn floor_by_y(&mut self, y: i32) -> Option<(i32, i32)> {
        let mut cur = self.root;
        let mut last = NIL;
        while cur != NIL {
            if self.nodes[cur as usize].y > y {
                cur = self.nodes[cur as usize].left;
            } else {
                last = cur;
                cur = self.nodes[cur as usize].right;
            }
        }
        self.splay(last);
        self.pair(last)
    }

    fn range_inorder(&self, lo: i32, hi: i32, out: &mut Vec<(i32, i32)>) {
        self.range_rec(self.root, lo, hi, out);
    }
}

/// Sorted-vec backend with naive scans.
#[derive(Debug, Default)]
pub struct LinearSet {
    pairs: Vec<(i32, i32)>,
}

impl DominantSet for LinearSet {
    fn insert(&mut self, x: i32, y: i32) {
        if let Err(idx) = self.pairs.binary_search_by_key(&x, |p| p.0) {
            self.pairs.insert(idx, (x, y));
        }
    }

    fn remove(&mut self, x: i32) -> bool {
        match self.pairs.binary_search_by_key(&x, |p| p.0) {
            Ok(idx) => {
                self.pairs.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    fn ceiling_by_x(&mut self, x: i32) -> Option<(i32, i32)> {
        self.pairs.iter().find(|p| p.0 >= x).copied()
    }

    fn floor_by_y(&mut self, y: i32) -> Option<(i32, i32)> {
        let mut found = None;
        for &p in &self.pairs {
            if p.1 <= y {
                found = Some(p);
            }
        }
        found
    }

    fn range_inorder(&self, lo: i32, hi: i32, out: &mut Vec<(i32, i32)>) {
        out.extend(self.pairs.iter().filter(|p| p.0 >= lo && p.0 <= hi));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn collect<S: DominantSet>(set: &S) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        set.range_inorder(i32::MIN, i32::MAX, &mut out);
        out
    }

    #[test]
    fn insert_keeps_order() {
        let mut tree = SplayTree::new();
        for x in [5, 1, 9, 3, 7, 0, 8] {
            tree.insert(x, x * 2);
        }
        assert_eq!(
            collect(&tree),
            vec![(0, 0), (1, 2), (3, 6), (5, 10), (7, 14), (8, 16), (9, 18)]
        );
    }

    #[test]
    fn duplicate_insert_keeps_first_pair() {
        let mut tree = SplayTree::new();
        tree.insert(4, 8);
        tree.insert(4, 99);
        assert_eq!(collect(&tree), vec![(4, 8)]);
    }

    #[test]
    fn ceiling_and_floor() {
        let mut tree = SplayTree::new();
        tree.insert(-1, -1);
        tree.insert(10, 10);
        tree.insert(2, 4);
        tree.insert(6, 7);

        assert_eq!(tree.ceiling_by_x(2), Some((2, 4)));
        assert_eq!(tree.ceiling_by_x(3), Some((6, 7)));
        assert_eq!(tree.ceiling_by_x(11), None);
        assert_eq!(tree.floor_by_y(5), Some((2, 4)));
        assert_eq!(tree.floor_by_y(-1), Some((-1, -1)));
        assert_eq!(tree.floor_by_y(-2), None);
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut tree = SplayTree::new();
        tree.insert(1, 1);
        assert!(!tree.remove(2));
        assert!(tree.remove(1));
        assert!(!tree.remove(1));
        assert!(tree.is_empty());
    }

    #[test]
    fn remove_interior_node() {
        let mut tree = SplayTree::new();
        for x in 0..10 {
            tree.insert(x, x);
        }
        assert!(tree.remove(5));
        assert!(tree.remove(0));
        assert!(tree.remove(9));
        assert_eq!(
            collect(&tree),
            vec![(1, 1), (2, 2), (3, 3), (4, 4), (6, 6), (7, 7), (8, 8)]
        );
    }

    #[test]
    fn range_is_inclusive() {
        let mut tree = SplayTree::new();
        for x in [1, 3, 5, 7, 9] {
            tree.insert(x, x);
        }
        let mut out = Vec::new();
        tree.range_inorder(3, 7, &mut out);
        assert_eq!(out, vec![(3, 3), (5, 5), (7, 7)]);
    }

    // Deterministic op-sequence comparison of both backends against a
    // BTreeMap model. Pairs keep x and y co-monotone, matching the invariant
    // the builder maintains.
    #[test]
    fn backends_match_model() {
        let mut splay = SplayTree::new();
        let mut linear = LinearSet::default();
        let mut model: BTreeMap<i32, i32> = BTreeMap::new();

        // Simple LCG so the sequence is fixed without external crates.
        let mut state = 0x2545_f491_4f6c_dd1du64;
        let mut next = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) as i32
        };

        for step in 0..2000 {
            let x = next().rem_euclid(64);
            let y = x * 3 + 1;
            match step % 4 {
                0 | 1 => {
                    splay.insert(x, y);
                    linear.insert(x, y);
                    model.entry(x).or_insert(y);
                }
                2 => {
                    let removed = model.remove(&x).is_some();
                    assert_eq!(splay.remove(x), removed);
                    assert_eq!(linear.remove(x), removed);
                }
                _ => {
                    let probe = next().rem_euclid(200) - 4;
                    let ceiling = model.range(probe..).next().map(|(&k, &v)| (k, v));
                    assert_eq!(splay.ceiling_by_x(probe), ceiling);
                    assert_eq!(linear.ceiling_by_x(probe), ceiling);

                    let floor = model
                        .iter()
                        .filter(|(_, &v)| v <= probe)
                        .next_back()
                        .map(|(&k, &v)| (k, v));
                    assert_eq!(splay.floor_by_y(probe), floor);
                    assert_eq!(linear.floor_by_y(probe), floor);

                    let lo = probe.min(40);
                    let hi = lo + 20;
                    let expected: Vec<(i32, i32)> =
                        model.range(lo..=hi).map(|(&k, &v)| (k, v)).collect();
                    let mut got_splay = Vec::new();
                    splay.range_inorder(lo, hi, &mut got_splay);
                    let mut got_linear = Vec::new();
                    linear.range_inorder(lo, hi, &mut got_linear);
                    assert_eq!(got_splay, expected);
                    assert_eq!(got_linear, expected);
                }
            }
        }
        assert_eq!(collect(&splay), collect(&linear));
    }
}
