//! Disjoint sets over bucket indices.
//!
//! If A matches B and B matches C, then {A, B, C} forms a single group
//! even though A and C were never compared.

/// Union-find with path halving and union by size
#[derive(Debug, Clone)]
pub(crate) struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub(crate) fn same_set(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let (mut root_a, mut root_b) = (self.find(a), self.find(b));
        if root_a == root_b {
            return;
        }
        if self.size[root_a] < self.size[root_b] {
            std::mem::swap(&mut root_a, &mut root_b);
        }
        self.parent[root_b] = root_a;
        self.size[root_a] += self.size[root_b];
    }

    /// Index sets with at least `min_len` members, in first-index order
    pub(crate) fn sets(&mut self, min_len: usize) -> Vec<Vec<usize>> {
        let len = self.parent.len();
        let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); len];
        for i in 0..len {
            let root = self.find(i);
            by_root[root].push(i);
        }
        let mut sets: Vec<Vec<usize>> = by_root
            .into_iter()
            .filter(|set| set.len() >= min_len)
            .collect();
        sets.sort_by_key(|set| set[0]);
        sets
    }
}
