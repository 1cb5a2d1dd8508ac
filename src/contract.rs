use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::error::{LouvainError, Result};
use crate::graph::{LouvainGraph, VInt};

/// A coarsened graph plus the bookkeeping needed to undo it.
#[derive(Debug, Clone)]
pub struct Contraction {
    /// One vertex per community of the input assignment.
    pub graph: LouvainGraph,
    /// Dense community (new vertex id) of every input vertex.
    pub assignment: Vec<usize>,
    /// Input vertices folded into each new vertex, ascending.
    pub members: Vec<Vec<VInt>>,
}

/// Relabel communities to `0..k`, keeping the relative order of the old labels.
/// Returns the dense assignment and `k`.
///
/// Labels must be below `assignment.len()`.
pub fn renumber(assignment: &[usize]) -> Result<(Vec<usize>, usize)> {
    let n = assignment.len();
    let mut used = vec![false; n];
    for (vertex, &label) in assignment.iter().enumerate() {
        if label >= n {
            return Err(LouvainError::InvalidInput(format!(
                "vertex {vertex} has community label {label}, labels must be below {n}"
            )));
        }
        used[label] = true;
    }
    let mut dense_label = vec![usize::MAX; n];
    let mut next = 0usize;
    for (label, _) in used.iter().enumerate().filter(|(_, &u)| u) {
        dense_label[label] = next;
        next += 1;
    }
    let dense = assignment.iter().map(|&label| dense_label[label]).collect();
    Ok((dense, next))
}

/// Collapse every community of `assignment` into a single vertex.
///
/// Weight between two communities becomes one merged edge. Weight inside a
/// community becomes the new vertex's self-loop: an internal edge is seen
/// from both endpoints and a self-loop already carries its doubled weight, so
/// the stored loop equals the community's internal weight and `2m` is
/// unchanged.
pub fn contract(graph: &LouvainGraph, assignment: &[usize]) -> Result<Contraction> {
    if graph.is_empty() {
        return Err(LouvainError::EmptyCommunitySet);
    }
    if assignment.len() != graph.vertex_count() {
        return Err(LouvainError::InvalidInput(format!(
            "assignment covers {} vertices, graph has {}",
            assignment.len(),
            graph.vertex_count()
        )));
    }

    let (dense, community_count) = renumber(assignment)?;
    let mut members: Vec<Vec<VInt>> = vec![Vec::new(); community_count];
    for (vertex, &community) in dense.iter().enumerate() {
        members[community].push(vertex as VInt);
    }

    let adjacency: Vec<Vec<(VInt, f64)>> = members
        .par_iter()
        .map(|group| {
            let mut merged = BTreeMap::<VInt, f64>::new();
            for &u in group {
                for (v, w) in graph.neighbors(u) {
                    *merged.entry(dense[v as usize] as VInt).or_insert(0.0) += w;
                }
            }
            merged.into_iter().collect()
        })
        .collect();

    Ok(Contraction {
        graph: LouvainGraph::from_sorted_adjacency(adjacency),
        assignment: dense,
        members,
    })
}
