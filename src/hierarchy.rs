use itertools::Itertools;

use crate::graph::VInt;

/// One coarsening round.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    /// Dense community of each vertex of the level below.
    pub assignment: Vec<usize>,
    /// Vertices of the level below folded into each community, ascending.
    pub members: Vec<Vec<VInt>>,
}

impl Level {
    pub fn community_count(&self) -> usize {
        self.members.len()
    }
}

/// Every level of a run, indexed by level number. Level 0 maps original
/// vertices, level `k` maps the communities of level `k - 1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hierarchy {
    vertex_count: usize,
    levels: Vec<Level>,
}

impl Hierarchy {
    pub fn new(vertex_count: usize) -> Self {
        Hierarchy {
            vertex_count,
            levels: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, assignment: Vec<usize>, members: Vec<Vec<VInt>>) {
        debug_assert_eq!(
            assignment.len(),
            self.levels
                .last()
                .map_or(self.vertex_count, Level::community_count)
        );
        self.levels.push(Level {
            assignment,
            members,
        });
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, level: usize) -> Option<&Level> {
        self.levels.get(level)
    }

    /// Original vertex → community after the first `depth` levels.
    /// Depth 0 is the singleton partition.
    pub fn partition_at(&self, depth: usize) -> Option<Vec<usize>> {
        if depth > self.levels.len() {
            return None;
        }
        let mut flat: Vec<usize> = (0..self.vertex_count).collect();
        for level in &self.levels[..depth] {
            for community in flat.iter_mut() {
                *community = level.assignment[*community];
            }
        }
        Some(flat)
    }

    /// Original vertices represented by `community` of `level`, ascending.
    pub fn expand(&self, level: usize, community: usize) -> Option<Vec<VInt>> {
        let mut frontier = self.levels.get(level)?.members.get(community)?.clone();
        for below in self.levels[..level].iter().rev() {
            frontier = frontier
                .into_iter()
                .flat_map(|vertex| below.members[vertex as usize].iter().copied())
                .collect();
        }
        frontier.sort_unstable();
        Some(frontier)
    }
}

/// Group vertices by label. Communities are ordered by their smallest member
/// and list members in ascending order.
pub fn group_by_labels(labels: &[usize]) -> Vec<Vec<VInt>> {
    let mut groups: Vec<Vec<VInt>> = labels
        .iter()
        .enumerate()
        .map(|(vertex, &label)| (label, vertex as VInt))
        .into_group_map()
        .into_values()
        .collect();
    groups.sort_unstable_by_key(|group| group[0]);
    groups
}
