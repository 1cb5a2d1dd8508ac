//! Multi-level Louvain driver (Blondel et al. 2008, "Fast unfolding of
//! communities in large networks").
//!
//! Each level runs the local-move phase on the current graph, then collapses
//! the settled communities into super-vertices. The run ends when a level
//! merges nothing or the level cap is hit. The partition with the highest
//! modularity seen on the way is returned, which is not necessarily the last.

use std::borrow::Cow;

use log::{debug, info, log_enabled, Level};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::LouvainConfig;
use crate::contract::{contract, Contraction};
use crate::error::{LouvainError, Result};
use crate::graph::{LouvainGraph, VInt, WeightedEdge};
use crate::hierarchy::{group_by_labels, Hierarchy};
use crate::local_move::{LocalMoveOptimizer, LocalMoveOutcome};
use crate::modularity::{check_total_weight, global_modularity};

/// Why a run stopped. Both outcomes carry a valid best partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// A level merged nothing, or the level gain threshold was not met.
    Converged,
    /// `max_levels` levels were built.
    LevelCapReached,
}

/// Summary of one optimize + contract round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelStats {
    /// 1-based level number.
    pub level: usize,
    /// Vertices of the graph the level optimized.
    pub vertex_count: usize,
    /// Communities found, i.e. vertices of the next graph.
    pub community_count: usize,
    pub sweeps: usize,
    pub moves: usize,
    pub total_gain: f64,
    /// Modularity of the flattened partition after this level.
    pub modularity: f64,
}

#[derive(Debug, Clone)]
pub struct LouvainResult {
    /// Original vertex → dense community id of the best level.
    pub partition: Vec<usize>,
    pub modularity: f64,
    /// Number of levels composed into `partition`; 0 means singletons.
    pub best_level: usize,
    pub termination: Termination,
    pub hierarchy: Hierarchy,
    pub stats: Vec<LevelStats>,
}

impl LouvainResult {
    pub fn community_count(&self) -> usize {
        self.partition.iter().max().map_or(0, |&max| max + 1)
    }

    /// Members of each community, ordered by smallest member.
    pub fn communities(&self) -> Vec<Vec<VInt>> {
        group_by_labels(&self.partition)
    }

    /// Flattened partition after `depth` levels, see [`Hierarchy::partition_at`].
    pub fn partition_at_level(&self, depth: usize) -> Option<Vec<usize>> {
        self.hierarchy.partition_at(depth)
    }
}

/// Driver phases. Data produced by one phase travels with the next.
enum Phase {
    Initializing,
    Optimizing,
    Contracting(LocalMoveOutcome),
    Converged,
    LevelCapReached,
}

pub struct Louvain {
    config: LouvainConfig,
}

impl Louvain {
    pub fn new(config: LouvainConfig) -> Result<Self> {
        config.validate()?;
        Ok(Louvain { config })
    }

    pub fn config(&self) -> &LouvainConfig {
        &self.config
    }

    /// Build the level-0 graph from `edges` and run.
    pub fn run(&self, vertex_count: usize, edges: &[WeightedEdge]) -> Result<LouvainResult> {
        if vertex_count == 0 {
            return Err(LouvainError::EmptyGraph);
        }
        let graph = LouvainGraph::from_edges(vertex_count, edges)?;
        self.run_graph(&graph)
    }

    /// Run on an already built graph.
    pub fn run_graph(&self, graph: &LouvainGraph) -> Result<LouvainResult> {
        if graph.is_empty() {
            return Err(LouvainError::EmptyGraph);
        }
        check_total_weight(graph)?;
        match self.config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| LouvainError::invalid_config("threads", e.to_string()))?;
                pool.install(|| self.drive(graph))
            }
            None => self.drive(graph),
        }
    }

    fn drive(&self, graph: &LouvainGraph) -> Result<LouvainResult> {
        let config = &self.config;
        let n = graph.vertex_count();
        let mut rng = config.shuffle_seed.map(StdRng::seed_from_u64);

        let mut current: Cow<'_, LouvainGraph> = Cow::Borrowed(graph);
        let mut hierarchy = Hierarchy::new(n);
        let mut flat: Vec<usize> = (0..n).collect();
        let mut stats: Vec<LevelStats> = Vec::new();
        let mut level = 0usize;

        let mut best_partition = flat.clone();
        let mut best_modularity = 0.0;
        let mut best_level = 0usize;
        let mut previous_modularity = 0.0;

        let mut phase = Phase::Initializing;
        let termination = loop {
            phase = match phase {
                Phase::Initializing => {
                    best_modularity = global_modularity(graph, &flat, config.resolution)?;
                    previous_modularity = best_modularity;
                    info!(
                        "louvain start: {} vertices, {} edges, 2m = {}, singleton modularity {:.6}",
                        n,
                        graph.edge_count(),
                        graph.total_weight(),
                        best_modularity
                    );
                    Phase::Optimizing
                }
                Phase::Optimizing => {
                    if log_enabled!(Level::Trace) {
                        current.print_graph();
                    }
                    let order = sweep_order(current.vertex_count(), rng.as_mut());
                    let outcome = LocalMoveOptimizer::new(&current, config).run(&order);
                    debug!(
                        "level {}: {} sweeps, {} moves, {} -> {} communities",
                        level + 1,
                        outcome.sweeps,
                        outcome.moves,
                        current.vertex_count(),
                        outcome.community_count()
                    );
                    if outcome.community_count() == current.vertex_count() {
                        Phase::Converged
                    } else {
                        Phase::Contracting(outcome)
                    }
                }
                Phase::Contracting(outcome) => {
                    let Contraction {
                        graph: next,
                        assignment,
                        members,
                    } = contract(&current, &outcome.assignment)?;
                    for community in flat.iter_mut() {
                        *community = assignment[*community];
                    }
                    let modularity = global_modularity(graph, &flat, config.resolution)?;
                    level += 1;

                    stats.push(LevelStats {
                        level,
                        vertex_count: current.vertex_count(),
                        community_count: next.vertex_count(),
                        sweeps: outcome.sweeps,
                        moves: outcome.moves,
                        total_gain: outcome.total_gain,
                        modularity,
                    });
                    info!(
                        "zooming out: level {}, {} communities left, modularity {:.6}",
                        level,
                        next.vertex_count(),
                        modularity
                    );
                    hierarchy.push(assignment, members);

                    if modularity > best_modularity {
                        best_modularity = modularity;
                        best_partition.clone_from(&flat);
                        best_level = level;
                    }
                    let improvement = modularity - previous_modularity;
                    previous_modularity = modularity;
                    current = Cow::Owned(next);

                    match config.min_modularity_gain {
                        Some(threshold) if improvement <= threshold => {
                            debug!(
                                "level {} improved modularity by {:e}, threshold {:e}",
                                level, improvement, threshold
                            );
                            Phase::Converged
                        }
                        _ if level >= config.max_levels => Phase::LevelCapReached,
                        _ => Phase::Optimizing,
                    }
                }
                Phase::Converged => break Termination::Converged,
                Phase::LevelCapReached => break Termination::LevelCapReached,
            };
        };

        let result = LouvainResult {
            partition: best_partition,
            modularity: best_modularity,
            best_level,
            termination,
            hierarchy,
            stats,
        };
        info!(
            "louvain finished ({:?}) after {} levels: best level {}, {} communities, modularity {:.6}",
            termination,
            level,
            best_level,
            result.community_count(),
            result.modularity
        );
        Ok(result)
    }
}

/// Visiting order of one level: ascending ids, or a seeded permutation.
fn sweep_order(vertex_count: usize, rng: Option<&mut StdRng>) -> Vec<VInt> {
    let mut order: Vec<VInt> = (0..vertex_count as VInt).collect();
    if let Some(rng) = rng {
        order.shuffle(rng);
    }
    order
}

/// Run Louvain on a dense edge list with `config`.
pub fn louvain(vertex_count: usize, edges: &[WeightedEdge], config: LouvainConfig) -> Result<LouvainResult> {
    Louvain::new(config)?.run(vertex_count, edges)
}
