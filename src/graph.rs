use rayon::prelude::*;

use crate::error::{LouvainError, Result};

/// Dense vertex id, `0 <= id < vertex_count`.
pub type VInt = u32;

/// One input edge: `(source, target, weight)`.
pub type WeightedEdge = (VInt, VInt, f64);

/// Immutable weighted undirected graph in CSR form.
///
/// Every undirected edge `(u, v)` with `u != v` is stored in both adjacency
/// lists. A self-loop of input weight `w` is stored once, in its owner's list,
/// with weight `2w`, so that `degree(v)` is always the plain sum of the list
/// and `total_weight()` (i.e. `2m`) is the sum of all degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct LouvainGraph {
    offsets: Vec<usize>,
    targets: Vec<VInt>,
    weights: Vec<f64>,
    degrees: Vec<f64>,
    self_loops: Vec<f64>,
    edge_count: usize,
    total_weight: f64,
}

impl LouvainGraph {
    /// Build a graph over `vertex_count` vertices from an edge list.
    ///
    /// Parallel edges are merged by summing their weights.
    pub fn from_edges(vertex_count: usize, edges: &[WeightedEdge]) -> Result<Self> {
        if vertex_count > VInt::MAX as usize {
            return Err(LouvainError::InvalidInput(format!(
                "{vertex_count} vertices do not fit the {}-bit vertex id",
                VInt::BITS
            )));
        }
        let mut adj: Vec<Vec<(VInt, f64)>> = vec![Vec::new(); vertex_count];
        for (index, &(u, v, weight)) in edges.iter().enumerate() {
            if u as usize >= vertex_count || v as usize >= vertex_count {
                return Err(LouvainError::InvalidInput(format!(
                    "edge #{index} ({u}, {v}) references a vertex outside [0, {vertex_count})"
                )));
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(LouvainError::InvalidInput(format!(
                    "edge #{index} ({u}, {v}) has invalid weight {weight}"
                )));
            }
            if u == v {
                adj[u as usize].push((u, 2.0 * weight));
            } else {
                adj[u as usize].push((v, weight));
                adj[v as usize].push((u, weight));
            }
        }

        // Sort each list by neighbor and fold duplicates together.
        adj.par_iter_mut().for_each(|list| {
            list.sort_by_key(|&(neighbor, _)| neighbor);
            list.dedup_by(|next, kept| {
                if next.0 == kept.0 {
                    kept.1 += next.1;
                    true
                } else {
                    false
                }
            });
        });

        Ok(Self::from_sorted_adjacency(adj))
    }

    /// Assemble the CSR arrays from per-vertex lists that are already sorted
    /// by neighbor and free of duplicates.
    pub(crate) fn from_sorted_adjacency(adj: Vec<Vec<(VInt, f64)>>) -> Self {
        let vertex_count = adj.len();
        let degrees: Vec<f64> = adj
            .par_iter()
            .map(|list| list.iter().map(|&(_, w)| w).sum::<f64>())
            .collect();
        let self_loops: Vec<f64> = adj
            .par_iter()
            .enumerate()
            .map(|(vertex, list)| {
                list.binary_search_by_key(&(vertex as VInt), |&(neighbor, _)| neighbor)
                    .map(|pos| list[pos].1)
                    .unwrap_or(0.0)
            })
            .collect();

        let entry_count: usize = adj.iter().map(Vec::len).sum();
        let mut offsets = Vec::with_capacity(vertex_count + 1);
        let mut targets = Vec::with_capacity(entry_count);
        let mut weights = Vec::with_capacity(entry_count);
        let mut edge_count = 0usize;
        offsets.push(0);
        for (vertex, list) in adj.into_iter().enumerate() {
            for (neighbor, weight) in list {
                if neighbor as usize >= vertex {
                    edge_count += 1;
                }
                targets.push(neighbor);
                weights.push(weight);
            }
            offsets.push(targets.len());
        }

        let total_weight = degrees.iter().sum();
        LouvainGraph {
            offsets,
            targets,
            weights,
            degrees,
            self_loops,
            edge_count,
            total_weight,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.degrees.len()
    }

    /// Number of distinct undirected edges, self-loops included.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }

    /// Neighbors of `vertex` in ascending id order, with merged weights.
    /// A self-loop shows up as `(vertex, 2w)`.
    #[inline]
    pub fn neighbors(&self, vertex: VInt) -> impl Iterator<Item = (VInt, f64)> + '_ {
        let vertex = vertex as usize;
        let range = self.offsets[vertex]..self.offsets[vertex + 1];
        self.targets[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }

    #[inline]
    pub fn neighbor_count(&self, vertex: VInt) -> usize {
        let vertex = vertex as usize;
        self.offsets[vertex + 1] - self.offsets[vertex]
    }

    /// Weighted degree, self-loops counted twice.
    #[inline]
    pub fn degree(&self, vertex: VInt) -> f64 {
        self.degrees[vertex as usize]
    }

    #[inline]
    pub fn degrees(&self) -> &[f64] {
        &self.degrees
    }

    /// Stored (already doubled) self-loop weight of `vertex`.
    #[inline]
    pub fn self_loop(&self, vertex: VInt) -> f64 {
        self.self_loops[vertex as usize]
    }

    /// Sum of all degrees, i.e. `2m`.
    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Each undirected edge once as `(u, v, w)` with `u <= v`, in input units
    /// (self-loop weights halved back).
    pub fn edges(&self) -> impl Iterator<Item = WeightedEdge> + '_ {
        (0..self.vertex_count() as VInt).flat_map(move |u| {
            self.neighbors(u).filter_map(move |(v, w)| match v.cmp(&u) {
                std::cmp::Ordering::Less => None,
                std::cmp::Ordering::Equal => Some((u, v, w / 2.0)),
                std::cmp::Ordering::Greater => Some((u, v, w)),
            })
        })
    }

    pub(crate) fn print_graph(&self) {
        for vertex in 0..self.vertex_count() as VInt {
            let neighbors: Vec<String> = self
                .neighbors(vertex)
                .map(|(v, w)| format!("{v}:{w}"))
                .collect();
            log::trace!("V{} (deg {}) -> [{}]", vertex, self.degree(vertex), neighbors.join(", "));
        }
    }
}

#[cfg(test)]
mod test_graph {
    use crate::error::LouvainError;
    use crate::graph::{LouvainGraph, VInt};

    #[test]
    fn test_build_triangle() {
        let g = LouvainGraph::from_edges(3, &[(0, 1, 1.0), (1, 2, 1.0), (2, 0, 1.0)]).unwrap();
        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.total_weight(), 6.0);
        for v in 0..3 {
            assert_eq!(g.degree(v), 2.0);
            assert_eq!(g.neighbor_count(v), 2);
        }
        let n2: Vec<_> = g.neighbors(2).collect();
        assert_eq!(n2, vec![(0, 1.0), (1, 1.0)]);
    }

    #[test]
    fn test_merge_parallel_edges() {
        let g = LouvainGraph::from_edges(2, &[(0, 1, 1.5), (1, 0, 2.5), (0, 1, 1.0)]).unwrap();
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.neighbors(0).collect::<Vec<_>>(), vec![(1, 5.0)]);
        assert_eq!(g.neighbors(1).collect::<Vec<_>>(), vec![(0, 5.0)]);
        assert_eq!(g.total_weight(), 10.0);
    }

    #[test]
    fn test_self_loop_counted_twice() {
        let g = LouvainGraph::from_edges(2, &[(0, 0, 1.0), (0, 1, 1.0), (0, 0, 0.5)]).unwrap();
        assert_eq!(g.self_loop(0), 3.0);
        assert_eq!(g.self_loop(1), 0.0);
        assert_eq!(g.degree(0), 4.0);
        assert_eq!(g.degree(1), 1.0);
        assert_eq!(g.total_weight(), 5.0);
        assert_eq!(g.edge_count(), 2);
        let edges: Vec<_> = g.edges().collect();
        assert_eq!(edges, vec![(0, 0, 1.5), (0, 1, 1.0)]);
    }

    #[test]
    fn test_neighbors_sorted() {
        let g = LouvainGraph::from_edges(5, &[(0, 4, 1.0), (0, 2, 1.0), (0, 3, 1.0), (0, 1, 1.0)])
            .unwrap();
        let ids: Vec<_> = g.neighbors(0).map(|(v, _)| v).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_isolated_and_empty() {
        let g = LouvainGraph::from_edges(3, &[(0, 1, 1.0)]).unwrap();
        assert_eq!(g.degree(2), 0.0);
        assert_eq!(g.neighbors(2).count(), 0);

        let empty = LouvainGraph::from_edges(0, &[]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.total_weight(), 0.0);
    }

    #[test]
    fn test_reject_out_of_range() {
        let err = LouvainGraph::from_edges(2, &[(0, 2, 1.0)]).unwrap_err();
        assert!(matches!(err, LouvainError::InvalidInput(_)));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_reject_vertex_count_beyond_id_range() {
        let err = LouvainGraph::from_edges(VInt::MAX as usize + 1, &[]).unwrap_err();
        assert!(matches!(err, LouvainError::InvalidInput(_)));
    }

    #[test]
    fn test_reject_bad_weight() {
        let err = LouvainGraph::from_edges(2, &[(0, 1, -0.5)]).unwrap_err();
        assert!(matches!(err, LouvainError::InvalidInput(_)));
        let err = LouvainGraph::from_edges(2, &[(0, 1, f64::INFINITY)]).unwrap_err();
        assert!(matches!(err, LouvainError::InvalidInput(_)));
    }
}
