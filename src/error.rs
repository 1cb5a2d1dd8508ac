use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, LouvainError>;

/// Errors raised before or during a Louvain run.
///
/// Hitting a sweep or level cap is not an error, the driver returns the best
/// partition found so far in that case.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LouvainError {
    /// Vertex id outside `[0, V)`, or a negative / non-finite weight.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The graph has no vertices.
    #[error("graph has no vertices")]
    EmptyGraph,

    /// Edges exist but the total weight `2m` is zero or not finite, so
    /// modularity is undefined.
    #[error("degenerate graph: total edge weight is zero or not finite across {edge_count} edges")]
    DegenerateGraph { edge_count: usize },

    /// The contractor was asked to coarsen a graph without vertices.
    #[error("cannot contract a graph with an empty community set")]
    EmptyCommunitySet,

    /// A configuration value is out of its accepted range.
    #[error("invalid config `{name}`: {message}")]
    InvalidConfig {
        name: &'static str,
        message: String,
    },
}

impl LouvainError {
    pub(crate) fn invalid_config(name: &'static str, message: impl Into<String>) -> Self {
        LouvainError::InvalidConfig {
            name,
            message: message.into(),
        }
    }
}
