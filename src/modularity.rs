//! Modularity of a partition and the marginal gain of single-vertex moves.
//!
//! With `2m` the total weight, `in_c` the internal weight of community `c`
//! (each intra-community edge counted from both endpoints, self-loops at their
//! stored doubled weight) and `tot_c` the degree sum of `c`:
//!
//! ```text
//! Q = Σ_c [ in_c / 2m − γ · (tot_c / 2m)² ]
//! ```

use rayon::prelude::*;

use crate::error::{LouvainError, Result};
use crate::graph::{LouvainGraph, VInt};

/// Per-community sums the gain computation reads in O(1).
///
/// Community ids index the vectors directly, so labels must stay below the
/// vertex count of the level they were built for.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityAggregates {
    degree_sums: Vec<f64>,
    internal: Vec<f64>,
    sizes: Vec<usize>,
}

impl CommunityAggregates {
    /// Aggregates of the partition where every vertex is alone.
    pub fn singletons(graph: &LouvainGraph) -> Self {
        let n = graph.vertex_count();
        CommunityAggregates {
            degree_sums: graph.degrees().to_vec(),
            internal: (0..n).map(|v| graph.self_loop(v as VInt)).collect(),
            sizes: vec![1; n],
        }
    }

    /// Aggregates of an arbitrary assignment.
    pub fn from_assignment(graph: &LouvainGraph, assignment: &[usize]) -> Result<Self> {
        let n = graph.vertex_count();
        if assignment.len() != n {
            return Err(LouvainError::InvalidInput(format!(
                "assignment covers {} vertices, graph has {}",
                assignment.len(),
                n
            )));
        }
        if let Some((vertex, &label)) = assignment.iter().enumerate().find(|(_, &c)| c >= n) {
            return Err(LouvainError::InvalidInput(format!(
                "vertex {vertex} has community label {label}, labels must be below {n}"
            )));
        }

        // Per-vertex internal contributions are independent; the reduction
        // below runs in vertex order so the result does not depend on threads.
        let contributions: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|u| {
                let cu = assignment[u];
                graph
                    .neighbors(u as VInt)
                    .filter(|&(v, _)| assignment[v as usize] == cu)
                    .map(|(_, w)| w)
                    .sum::<f64>()
            })
            .collect();

        let mut aggregates = CommunityAggregates {
            degree_sums: vec![0.0; n],
            internal: vec![0.0; n],
            sizes: vec![0; n],
        };
        for (u, &c) in assignment.iter().enumerate() {
            aggregates.degree_sums[c] += graph.degree(u as VInt);
            aggregates.internal[c] += contributions[u];
            aggregates.sizes[c] += 1;
        }
        Ok(aggregates)
    }

    #[inline]
    pub fn degree_sum(&self, community: usize) -> f64 {
        self.degree_sums[community]
    }

    #[inline]
    pub fn internal_weight(&self, community: usize) -> f64 {
        self.internal[community]
    }

    #[inline]
    pub fn size(&self, community: usize) -> usize {
        self.sizes[community]
    }

    /// Number of non-empty communities.
    pub fn community_count(&self) -> usize {
        self.sizes.iter().filter(|&&s| s > 0).count()
    }

    /// Take a vertex out of `community`.
    ///
    /// `links` is the weight from the vertex to the other members of
    /// `community`, `self_loop` its stored self-loop weight.
    pub(crate) fn remove(&mut self, community: usize, degree: f64, self_loop: f64, links: f64) {
        self.degree_sums[community] -= degree;
        self.internal[community] -= 2.0 * links + self_loop;
        self.sizes[community] -= 1;
        if self.sizes[community] == 0 {
            // Drop accumulated rounding noise once the community is empty.
            self.degree_sums[community] = 0.0;
            self.internal[community] = 0.0;
        }
    }

    /// Put a vertex into `community`; `links` as in [`Self::remove`].
    pub(crate) fn insert(&mut self, community: usize, degree: f64, self_loop: f64, links: f64) {
        self.degree_sums[community] += degree;
        self.internal[community] += 2.0 * links + self_loop;
        self.sizes[community] += 1;
    }

    /// Modularity of the partition these aggregates describe.
    pub fn modularity(&self, total_weight: f64, resolution: f64) -> f64 {
        if total_weight == 0.0 {
            return 0.0;
        }
        self.internal
            .iter()
            .zip(&self.degree_sums)
            .zip(&self.sizes)
            .filter(|(_, &size)| size > 0)
            .map(|((&internal, &tot), _)| {
                let share = tot / total_weight;
                internal / total_weight - resolution * share * share
            })
            .sum()
    }
}

/// Fail with `DegenerateGraph` when edges exist but `2m` is zero, or when the
/// weights overflow to a non-finite `2m`.
pub(crate) fn check_total_weight(graph: &LouvainGraph) -> Result<()> {
    let total = graph.total_weight();
    if (total == 0.0 || !total.is_finite()) && graph.edge_count() > 0 {
        return Err(LouvainError::DegenerateGraph {
            edge_count: graph.edge_count(),
        });
    }
    Ok(())
}

/// Modularity of `assignment` on `graph` with resolution `γ`.
///
/// An edgeless graph has modularity 0. A graph whose edges all weigh zero, or
/// whose total weight is not finite, is rejected with `DegenerateGraph`.
pub fn global_modularity(graph: &LouvainGraph, assignment: &[usize], resolution: f64) -> Result<f64> {
    check_total_weight(graph)?;
    let aggregates = CommunityAggregates::from_assignment(graph, assignment)?;
    Ok(aggregates.modularity(graph.total_weight(), resolution))
}

/// Gain of moving a vertex with degree `degree` from its current community
/// into another, given:
///
/// - `links_from`: weight to the other members of the current community,
/// - `links_to`: weight to the members of the target community,
/// - `tot_from`: degree sum of the current community *without* the vertex,
/// - `tot_to`: degree sum of the target community.
#[inline]
pub fn gain_from_links(
    total_weight: f64,
    resolution: f64,
    degree: f64,
    links_from: f64,
    links_to: f64,
    tot_from: f64,
    tot_to: f64,
) -> f64 {
    2.0 * (links_to - links_from) / total_weight
        - resolution * 2.0 * degree * (tot_to - tot_from) / (total_weight * total_weight)
}

/// Modularity delta of moving `vertex` from `from` (its current community)
/// into `to`, computed in `O(degree(vertex))`.
pub fn move_gain(
    graph: &LouvainGraph,
    assignment: &[usize],
    aggregates: &CommunityAggregates,
    vertex: VInt,
    from: usize,
    to: usize,
    resolution: f64,
) -> f64 {
    debug_assert_eq!(assignment[vertex as usize], from);
    if from == to || graph.total_weight() == 0.0 {
        return 0.0;
    }
    let mut links_from = 0.0;
    let mut links_to = 0.0;
    for (neighbor, weight) in graph.neighbors(vertex) {
        if neighbor == vertex {
            continue;
        }
        let community = assignment[neighbor as usize];
        if community == from {
            links_from += weight;
        } else if community == to {
            links_to += weight;
        }
    }
    let degree = graph.degree(vertex);
    gain_from_links(
        graph.total_weight(),
        resolution,
        degree,
        links_from,
        links_to,
        aggregates.degree_sum(from) - degree,
        aggregates.degree_sum(to),
    )
}
