use fixedbitset::FixedBitSet;
use log::{debug, trace};

use crate::config::LouvainConfig;
use crate::graph::{LouvainGraph, VInt};
use crate::modularity::{gain_from_links, CommunityAggregates};

/// Settled state of one level's local-move phase.
#[derive(Debug, Clone)]
pub struct LocalMoveOutcome {
    /// Community of each vertex. Labels are vertex ids of the level and are
    /// not contiguous.
    pub assignment: Vec<usize>,
    pub aggregates: CommunityAggregates,
    /// Sum of the gains of every applied move.
    pub total_gain: f64,
    pub sweeps: usize,
    pub moves: usize,
}

impl LocalMoveOutcome {
    pub fn community_count(&self) -> usize {
        self.aggregates.community_count()
    }
}

/// Phase one of Louvain: greedy single-vertex moves.
///
/// Moves are applied one at a time in the given order, so the outcome only
/// depends on the graph, the order and the config.
pub struct LocalMoveOptimizer<'a> {
    graph: &'a LouvainGraph,
    resolution: f64,
    epsilon: f64,
    max_sweeps: usize,
}

/// Reusable buffers for gathering the communities adjacent to one vertex.
struct NeighborCommunities {
    links: Vec<f64>,
    seen: FixedBitSet,
    touched: Vec<usize>,
}

impl NeighborCommunities {
    fn new(n: usize) -> Self {
        NeighborCommunities {
            links: vec![0.0; n],
            seen: FixedBitSet::with_capacity(n),
            touched: Vec::new(),
        }
    }

    /// Sum the weight from `vertex` to each adjacent community, skipping the
    /// self-loop. Touched communities end up in ascending id order.
    fn gather(&mut self, graph: &LouvainGraph, assignment: &[usize], vertex: VInt) {
        for (neighbor, weight) in graph.neighbors(vertex) {
            if neighbor == vertex {
                continue;
            }
            let community = assignment[neighbor as usize];
            if !self.seen.put(community) {
                self.touched.push(community);
            }
            self.links[community] += weight;
        }
        self.touched.sort_unstable();
    }

    #[inline]
    fn links_to(&self, community: usize) -> f64 {
        if self.seen.contains(community) {
            self.links[community]
        } else {
            0.0
        }
    }

    fn reset(&mut self) {
        for &community in &self.touched {
            self.links[community] = 0.0;
            self.seen.set(community, false);
        }
        self.touched.clear();
    }
}

impl<'a> LocalMoveOptimizer<'a> {
    pub fn new(graph: &'a LouvainGraph, config: &LouvainConfig) -> Self {
        LocalMoveOptimizer {
            graph,
            resolution: config.resolution,
            epsilon: config.epsilon,
            max_sweeps: config.max_sweeps_per_level,
        }
    }

    /// Start from singletons and sweep `order` until a sweep moves nothing or
    /// the sweep cap is hit.
    ///
    /// `order` must list every vertex of the graph exactly once.
    pub fn run(&self, order: &[VInt]) -> LocalMoveOutcome {
        let graph = self.graph;
        let n = graph.vertex_count();
        debug_assert_eq!(order.len(), n);

        let mut assignment: Vec<usize> = (0..n).collect();
        let mut aggregates = CommunityAggregates::singletons(graph);
        let mut scratch = NeighborCommunities::new(n);
        let mut total_gain = 0.0;
        let mut total_moves = 0usize;
        let mut sweeps = 0usize;

        if graph.total_weight() == 0.0 {
            return LocalMoveOutcome {
                assignment,
                aggregates,
                total_gain,
                sweeps,
                moves: total_moves,
            };
        }

        while sweeps < self.max_sweeps {
            sweeps += 1;
            let mut moves = 0usize;
            for &vertex in order {
                if let Some(gain) = self.move_vertex(vertex, &mut assignment, &mut aggregates, &mut scratch) {
                    total_gain += gain;
                    moves += 1;
                }
            }
            total_moves += moves;
            debug!(
                "sweep {}: {} moves, {} communities",
                sweeps,
                moves,
                aggregates.community_count()
            );
            if moves == 0 {
                break;
            }
        }

        LocalMoveOutcome {
            assignment,
            aggregates,
            total_gain,
            sweeps,
            moves: total_moves,
        }
    }

    /// Relocate `vertex` to its best neighboring community. Returns the gain
    /// when the vertex moved.
    fn move_vertex(
        &self,
        vertex: VInt,
        assignment: &mut [usize],
        aggregates: &mut CommunityAggregates,
        scratch: &mut NeighborCommunities,
    ) -> Option<f64> {
        let graph = self.graph;
        let degree = graph.degree(vertex);
        let self_loop = graph.self_loop(vertex);
        let current = assignment[vertex as usize];

        scratch.gather(graph, assignment, vertex);
        let links_from = scratch.links_to(current);
        aggregates.remove(current, degree, self_loop, links_from);
        let tot_from = aggregates.degree_sum(current);

        // Staying put is worth 0. Candidates are visited in ascending id and
        // only a strictly larger gain replaces the best, so the lowest id wins
        // a tie.
        let mut best = current;
        let mut best_gain = 0.0;
        for &candidate in &scratch.touched {
            if candidate == current {
                continue;
            }
            let gain = gain_from_links(
                graph.total_weight(),
                self.resolution,
                degree,
                links_from,
                scratch.links[candidate],
                tot_from,
                aggregates.degree_sum(candidate),
            );
            if gain > best_gain {
                best_gain = gain;
                best = candidate;
            }
        }
        if best_gain <= self.epsilon {
            best = current;
        }

        aggregates.insert(best, degree, self_loop, scratch.links_to(best));
        scratch.reset();

        if best == current {
            return None;
        }
        trace!("move V{} from C{} to C{} (gain {:e})", vertex, current, best, best_gain);
        assignment[vertex as usize] = best;
        Some(best_gain)
    }
}

#[cfg(test)]
mod test_local_move {
    use crate::config::LouvainConfig;
    use crate::graph::{LouvainGraph, VInt};
    use crate::local_move::LocalMoveOptimizer;
    use crate::modularity::{global_modularity, CommunityAggregates};

    fn ascending(n: usize) -> Vec<VInt> {
        (0..n as VInt).collect()
    }

    fn singletons(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_triangle_merges() {
        let g = LouvainGraph::from_edges(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]).unwrap();
        let outcome = LocalMoveOptimizer::new(&g, &LouvainConfig::default()).run(&ascending(3));
        assert_eq!(outcome.assignment, vec![1, 1, 1]);
        assert_eq!(outcome.community_count(), 1);
        assert_eq!(outcome.moves, 2);
        assert_eq!(outcome.sweeps, 2);
    }

    #[test]
    fn test_tie_goes_to_lowest_community() {
        // Vertex 0 sits between 1 and 2 with identical gains to either side.
        let g = LouvainGraph::from_edges(3, &[(0, 2, 1.0), (0, 1, 1.0)]).unwrap();
        let outcome = LocalMoveOptimizer::new(&g, &LouvainConfig::default()).run(&ascending(3));
        assert_eq!(outcome.assignment, vec![1, 1, 1]);
    }

    #[test]
    fn test_disjoint_triangles_stay_apart() {
        let g = LouvainGraph::from_edges(
            6,
            &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0), (3, 4, 1.0), (4, 5, 1.0), (3, 5, 1.0)],
        )
        .unwrap();
        let outcome = LocalMoveOptimizer::new(&g, &LouvainConfig::default()).run(&ascending(6));
        let a = &outcome.assignment;
        assert_eq!(a[0], a[1]);
        assert_eq!(a[1], a[2]);
        assert_eq!(a[3], a[4]);
        assert_eq!(a[4], a[5]);
        assert_ne!(a[0], a[3]);
        assert_eq!(outcome.community_count(), 2);
    }

    #[test]
    fn test_total_gain_matches_modularity_change() {
        let g = LouvainGraph::from_edges(
            7,
            &[
                (0, 1, 2.0),
                (1, 2, 1.0),
                (0, 2, 1.0),
                (2, 3, 0.5),
                (3, 4, 1.0),
                (4, 5, 3.0),
                (3, 5, 1.0),
                (5, 6, 1.0),
                (6, 6, 1.0),
            ],
        )
        .unwrap();
        let outcome = LocalMoveOptimizer::new(&g, &LouvainConfig::default()).run(&ascending(7));
        let before = global_modularity(&g, &singletons(7), 1.0).unwrap();
        let after = global_modularity(&g, &outcome.assignment, 1.0).unwrap();
        assert!((after - before - outcome.total_gain).abs() < 1e-9);
        assert!(outcome.total_gain > 0.0);

        let rebuilt = CommunityAggregates::from_assignment(&g, &outcome.assignment).unwrap();
        assert!((rebuilt.modularity(g.total_weight(), 1.0) - after).abs() < 1e-9);
        assert_eq!(rebuilt.community_count(), outcome.community_count());
    }

    #[test]
    fn test_sweep_cap() {
        let g = LouvainGraph::from_edges(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]).unwrap();
        let config = LouvainConfig::default().with_max_sweeps(1);
        let outcome = LocalMoveOptimizer::new(&g, &config).run(&ascending(3));
        assert_eq!(outcome.sweeps, 1);
        assert_eq!(outcome.moves, 2);
    }

    #[test]
    fn test_isolated_vertex_stays() {
        let g = LouvainGraph::from_edges(3, &[(0, 1, 1.0)]).unwrap();
        let outcome = LocalMoveOptimizer::new(&g, &LouvainConfig::default()).run(&ascending(3));
        assert_eq!(outcome.assignment[2], 2);
        assert_eq!(outcome.assignment[0], outcome.assignment[1]);
    }

    #[test]
    fn test_edgeless_graph_does_not_sweep() {
        let g = LouvainGraph::from_edges(4, &[]).unwrap();
        let outcome = LocalMoveOptimizer::new(&g, &LouvainConfig::default()).run(&ascending(4));
        assert_eq!(outcome.assignment, singletons(4));
        assert_eq!(outcome.sweeps, 0);
    }

    #[test]
    fn test_epsilon_blocks_small_gains() {
        // The first merge in the triangle gains 1/9, below the threshold.
        let g = LouvainGraph::from_edges(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]).unwrap();
        let config = LouvainConfig::default().with_epsilon(0.5);
        let outcome = LocalMoveOptimizer::new(&g, &config).run(&ascending(3));
        assert_eq!(outcome.assignment, singletons(3));
        assert_eq!(outcome.moves, 0);
        assert_eq!(outcome.sweeps, 1);
        assert_eq!(outcome.total_gain, 0.0);

        // Just below the first gain, the merges go through.
        let config = LouvainConfig::default().with_epsilon(0.1);
        let outcome = LocalMoveOptimizer::new(&g, &config).run(&ascending(3));
        assert_eq!(outcome.community_count(), 1);
    }

    #[test]
    fn test_resolution_penalizes_merges() {
        // With γ = 4 the null-model term outweighs the shared edge.
        let g = LouvainGraph::from_edges(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]).unwrap();
        let config = LouvainConfig::default().with_resolution(4.0);
        let outcome = LocalMoveOptimizer::new(&g, &config).run(&ascending(3));
        assert_eq!(outcome.assignment, singletons(3));
        assert_eq!(outcome.moves, 0);
    }

    #[test]
    fn test_order_is_respected() {
        let g = LouvainGraph::from_edges(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]).unwrap();
        let outcome = LocalMoveOptimizer::new(&g, &LouvainConfig::default()).run(&[2, 1, 0]);
        // Vertex 2 moves first and takes the lowest neighboring label.
        assert_eq!(outcome.assignment, vec![0, 0, 0]);
    }
}
