//! graph_simple
// Copyright (c) 2018 10X Genomics, Inc. All rights reserved.
#![deny(missing_docs)]

// Define small undirected graphs as bit matrices, and enumerate their maximal cliques.
//
// The graphs handled here have at most a few dozen vertices (one per candidate mutation
// in a clonotype cluster), so every set is a dense bit vector and the clique search is
// plain Bron–Kerbosch with pivoting, which is exponential in the worst case.

use std::fmt;

pub use bit_set::BitSet;

/// Symmetric adjacency matrix over vertices `0..len()`.
///
/// Self-loops are ordinary entries on the diagonal.  A vertex that carries only a
/// self-loop is still part of the graph, while a vertex with an empty row is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyMatrix {
    rows: Vec<BitSet>,
}

impl AdjacencyMatrix {
    /// Create a graph with `size` vertices and no edges.
    pub fn new(size: usize) -> Self {
        AdjacencyMatrix {
            rows: vec![BitSet::with_capacity(size); size],
        }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the graph has no vertices.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add the edge i-j.  Passing i == j adds a self-loop.
    pub fn set_connected(&mut self, i: usize, j: usize) {
        self.rows[i].insert(j);
        self.rows[j].insert(i);
    }

    /// Remove the edge i-j, if present.
    pub fn set_disconnected(&mut self, i: usize, j: usize) {
        self.rows[i].remove(j);
        self.rows[j].remove(i);
    }

    /// Test for the edge i-j.
    pub fn is_connected(&self, i: usize, j: usize) -> bool {
        self.rows[i].contains(j)
    }

    /// Neighbors of v, not counting v itself.
    fn neighbors(&self, v: usize) -> BitSet {
        let mut n = self.rows[v].clone();
        n.remove(v);
        n
    }

    /// Extract all maximal cliques using the Bron–Kerbosch algorithm with pivoting.
    ///
    /// Vertices whose row is empty are never reported.  A vertex whose only entry is its
    /// self-loop is reported as a singleton clique.  Otherwise self-loops have no effect.
    /// Each maximal clique is returned exactly once, in discovery order.
    pub fn maximal_cliques(&self) -> Vec<BitSet> {
        let n = self.len();
        let neighbors: Vec<BitSet> = (0..n).map(|v| self.neighbors(v)).collect();
        let p: BitSet = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.is_empty())
            .map(|(v, _)| v)
            .collect();
        let mut cliques = Vec::new();
        if p.is_empty() {
            return cliques;
        }
        let mut r = BitSet::with_capacity(n);
        extend_clique(&neighbors, &mut r, p, BitSet::with_capacity(n), &mut cliques);
        cliques
    }
}

fn intersect(a: &BitSet, b: &BitSet) -> BitSet {
    let mut s = a.clone();
    s.intersect_with(b);
    s
}

// r: current clique, p: vertices that may extend it, x: vertices already explored.

fn extend_clique(
    neighbors: &[BitSet],
    r: &mut BitSet,
    mut p: BitSet,
    mut x: BitSet,
    cliques: &mut Vec<BitSet>,
) {
    if p.is_empty() {
        if x.is_empty() {
            cliques.push(r.clone());
        }
        return;
    }

    // Pick the pivot covering the most of p, so that only p \ N(pivot) is branched on.

    let mut pivot = None;
    let mut best = 0;
    for u in p.union(&x) {
        let c = p.intersection(&neighbors[u]).count();
        if pivot.is_none() || c > best {
            pivot = Some(u);
            best = c;
        }
    }
    let branch: Vec<usize> = match pivot {
        Some(u) => p.difference(&neighbors[u]).collect(),
        None => p.iter().collect(),
    };

    for v in branch {
        r.insert(v);
        extend_clique(
            neighbors,
            r,
            intersect(&p, &neighbors[v]),
            intersect(&x, &neighbors[v]),
            cliques,
        );
        r.remove(v);
        p.remove(v);
        x.insert(v);
    }
}

impl fmt::Display for AdjacencyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for j in 0..self.len() {
                f.write_str(if row.contains(j) { "1" } else { "0" })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;
    use std::collections::HashSet;

    fn set_of(elements: &[usize]) -> BitSet {
        elements.iter().copied().collect()
    }

    fn house_graph() -> AdjacencyMatrix {
        let mut m = AdjacencyMatrix::new(6);
        for (a, b) in [(0, 4), (0, 1), (1, 4), (1, 2), (2, 3), (3, 4), (3, 5)] {
            m.set_connected(a, b);
        }
        m
    }

    fn assert_cliques(m: &AdjacencyMatrix, expected: &[&[usize]]) {
        let cliques = m.maximal_cliques();
        let set: HashSet<BitSet> = cliques.iter().cloned().collect();
        assert_eq!(cliques.len(), set.len(), "duplicate cliques in {cliques:?}");
        let want: HashSet<BitSet> = expected.iter().map(|c| set_of(c)).collect();
        assert_eq!(set, want);
    }

    #[test]
    fn test_maximal_cliques() {
        assert_cliques(
            &house_graph(),
            &[&[0, 1, 4], &[1, 2], &[2, 3], &[3, 4], &[3, 5]],
        );
    }

    #[test]
    fn test_self_loops_do_not_change_cliques() {
        let mut m = house_graph();
        for v in 0..6 {
            m.set_connected(v, v);
        }
        assert_cliques(&m, &[&[0, 1, 4], &[1, 2], &[2, 3], &[3, 4], &[3, 5]]);
    }

    #[test]
    fn test_self_loop_makes_singleton_clique() {
        let mut m = house_graph();
        m.set_disconnected(3, 5);
        for v in 0..6 {
            m.set_connected(v, v);
        }
        assert_cliques(&m, &[&[0, 1, 4], &[1, 2], &[2, 3], &[3, 4], &[5]]);
    }

    #[test]
    fn test_isolated_vertex_is_never_reported() {
        let mut m = house_graph();
        m.set_disconnected(3, 5);
        assert_cliques(&m, &[&[0, 1, 4], &[1, 2], &[2, 3], &[3, 4]]);

        let empty = AdjacencyMatrix::new(4);
        assert!(empty.maximal_cliques().is_empty());
        assert!(AdjacencyMatrix::new(0).maximal_cliques().is_empty());
    }

    #[test]
    fn test_only_self_loops() {
        let mut m = AdjacencyMatrix::new(3);
        m.set_connected(0, 0);
        m.set_connected(2, 2);
        assert_cliques(&m, &[&[0], &[2]]);
    }

    #[test]
    fn test_display() {
        let mut m = house_graph();
        assert_eq!(
            m.to_string(),
            "010010\n101010\n010100\n001011\n110100\n000100"
        );
        m.set_connected(5, 5);
        m.set_disconnected(0, 4);
        assert!(m.is_connected(5, 5));
        assert!(!m.is_connected(4, 0));
        assert_eq!(
            m.to_string(),
            "010000\n101010\n010100\n001011\n010100\n000101"
        );
    }

    /// Plant disjoint cliques, then add noise edges such that no vertex gets more than
    /// two of them.  No clique of size >= min_size other than the planted ones can exist.
    fn planted_cliques(
        rng: &mut Xoshiro256StarStar,
        size: usize,
        n_cliques: usize,
        min_size: usize,
        max_size: usize,
        noise_edges: usize,
    ) -> (AdjacencyMatrix, HashSet<BitSet>) {
        let mut order: Vec<usize> = (0..size).collect();
        for i in (1..size).rev() {
            let j = rng.gen_range(0..=i);
            order.swap(i, j);
        }
        let mut m = AdjacencyMatrix::new(size);
        let mut group = vec![usize::MAX; size];
        let mut planted = HashSet::new();
        let mut next = 0;
        for c in 0..n_cliques {
            let len = rng.gen_range(min_size..=max_size);
            let members = &order[next..next + len];
            next += len;
            for (k, &a) in members.iter().enumerate() {
                group[a] = c;
                for &b in &members[k + 1..] {
                    m.set_connected(a, b);
                }
            }
            planted.insert(set_of(members));
        }
        let mut noise = vec![0; size];
        let mut added = 0;
        while added < noise_edges {
            let (a, b) = (rng.gen_range(0..size), rng.gen_range(0..size));
            if a == b
                || (group[a] != usize::MAX && group[a] == group[b])
                || noise[a] >= 2
                || noise[b] >= 2
                || m.is_connected(a, b)
            {
                continue;
            }
            m.set_connected(a, b);
            noise[a] += 1;
            noise[b] += 1;
            added += 1;
        }
        (m, planted)
    }

    #[test]
    fn test_planted_cliques_with_noise() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(0x5eed);
        for _ in 0..50 {
            let (m, planted) = planted_cliques(&mut rng, 150, 10, 10, 14, 30);
            let found: HashSet<BitSet> = m
                .maximal_cliques()
                .into_iter()
                .filter(|c| c.iter().count() >= 10)
                .collect();
            assert_eq!(found, planted);
        }
    }
}
