mod common;

use louvain_community::contract::contract;
use louvain_community::local_move::LocalMoveOptimizer;
use louvain_community::{global_modularity, louvain, LouvainConfig, LouvainGraph, Termination, VInt};

use common::{karate_edges, KARATE_VERTICES};

#[test]
fn test_karate_regression() {
    let result = louvain(KARATE_VERTICES, &karate_edges(), LouvainConfig::default()).unwrap();

    assert!((3..=4).contains(&result.community_count()));
    assert!(result.modularity >= 0.38 && result.modularity <= 0.42);
    assert!((result.modularity - 0.418_803_418_803).abs() < 1e-9);
    assert_eq!(result.termination, Termination::Converged);
    assert_eq!(result.best_level, 2);
    assert_eq!(
        result.partition,
        vec![
            1, 1, 1, 1, 0, 0, 0, 1, 3, 1, 0, 1, 1, 1, 3, 3, 0, 1, 3, 1, 3, 1, 3, 2, 2, 2, 3, 2, 2, 3,
            3, 2, 3, 3
        ]
    );

    let levels: Vec<_> = result
        .stats
        .iter()
        .map(|s| (s.vertex_count, s.community_count))
        .collect();
    assert_eq!(levels, vec![(34, 6), (6, 4)]);
    assert!((result.stats[0].modularity - 0.361_357_659_434).abs() < 1e-9);
}

#[test]
fn test_karate_reported_modularity_recomputes() {
    let graph = LouvainGraph::from_edges(KARATE_VERTICES, &karate_edges()).unwrap();
    let result = louvain(KARATE_VERTICES, &karate_edges(), LouvainConfig::default()).unwrap();
    let recomputed = global_modularity(&graph, &result.partition, 1.0).unwrap();
    assert!((recomputed - result.modularity).abs() < 1e-12);
}

#[test]
fn test_karate_level_cap() {
    let config = LouvainConfig::default().with_max_levels(1);
    let result = louvain(KARATE_VERTICES, &karate_edges(), config).unwrap();
    assert_eq!(result.termination, Termination::LevelCapReached);
    assert_eq!(result.community_count(), 6);
    assert_eq!(result.hierarchy.depth(), 1);
    assert!((result.modularity - 0.361_357_659_434).abs() < 1e-9);
}

#[test]
fn test_karate_idempotent() {
    let first = louvain(KARATE_VERTICES, &karate_edges(), LouvainConfig::default()).unwrap();
    let second = louvain(KARATE_VERTICES, &karate_edges(), LouvainConfig::default()).unwrap();
    assert_eq!(first.partition, second.partition);
    assert_eq!(first.modularity.to_bits(), second.modularity.to_bits());
    assert_eq!(first.hierarchy, second.hierarchy);
}

#[test]
fn test_karate_flattening_round_trip() {
    let result = louvain(KARATE_VERTICES, &karate_edges(), LouvainConfig::default()).unwrap();
    let hierarchy = &result.hierarchy;
    let top = hierarchy.depth() - 1;
    let flat = hierarchy.partition_at(hierarchy.depth()).unwrap();

    let mut seen = vec![0usize; KARATE_VERTICES];
    for community in 0..hierarchy.level(top).unwrap().community_count() {
        for vertex in hierarchy.expand(top, community).unwrap() {
            assert_eq!(flat[vertex as usize], community);
            seen[vertex as usize] += 1;
        }
    }
    assert!(seen.iter().all(|&count| count == 1));
}

#[test]
fn test_karate_best_modularity_monotone() {
    let graph = LouvainGraph::from_edges(KARATE_VERTICES, &karate_edges()).unwrap();
    let result = louvain(KARATE_VERTICES, &karate_edges(), LouvainConfig::default()).unwrap();

    let singletons: Vec<usize> = (0..KARATE_VERTICES).collect();
    let mut best = global_modularity(&graph, &singletons, 1.0).unwrap();
    let mut history = vec![best];
    for stats in &result.stats {
        best = best.max(stats.modularity);
        history.push(best);
    }
    assert!(history.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(best, result.modularity);
}

#[test]
fn test_karate_contraction_conserves_weight() {
    let config = LouvainConfig::default();
    let mut graph = LouvainGraph::from_edges(KARATE_VERTICES, &karate_edges()).unwrap();
    let total = graph.total_weight();
    assert_eq!(total, 156.0);

    loop {
        let order: Vec<VInt> = (0..graph.vertex_count() as VInt).collect();
        let outcome = LocalMoveOptimizer::new(&graph, &config).run(&order);
        if outcome.community_count() == graph.vertex_count() {
            break;
        }
        let next = contract(&graph, &outcome.assignment).unwrap();
        assert_eq!(next.graph.total_weight(), total);
        let members: usize = next.members.iter().map(Vec::len).sum();
        assert_eq!(members, graph.vertex_count());
        graph = next.graph;
    }
    assert_eq!(graph.vertex_count(), 4);
}
