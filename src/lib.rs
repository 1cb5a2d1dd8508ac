//! Louvain community detection on weighted undirected graphs.
//!
//! ```no_run
//! use louvain_community::{louvain, LouvainConfig};
//!
//! let edges = [(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0), (3, 4, 1.0), (4, 5, 1.0), (3, 5, 1.0)];
//! let result = louvain(6, &edges, LouvainConfig::default()).unwrap();
//! assert_eq!(result.communities(), vec![vec![0, 1, 2], vec![3, 4, 5]]);
//! ```

pub mod config;
pub mod contract;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod loader;
pub mod local_move;
pub mod logger;
pub mod louvain;
pub mod modularity;

pub use config::LouvainConfig;
pub use error::{LouvainError, Result};
pub use graph::{LouvainGraph, VInt, WeightedEdge};
pub use hierarchy::{Hierarchy, Level};
pub use louvain::{louvain, LevelStats, Louvain, LouvainResult, Termination};
pub use modularity::{global_modularity, move_gain, CommunityAggregates};
