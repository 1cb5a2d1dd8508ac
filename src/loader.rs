//! Edge-list files with arbitrary vertex ids.
//!
//! Accepted lines (tokens split on whitespace or commas):
//!
//! - `u v` or `u v w`: an edge, weight defaults to `1.0`;
//! - `e u v [w]`: the same, in `.graph` files;
//! - `v id ...`: declares a vertex without edges;
//! - `t ...`, blank lines, `#` and `%` comments: ignored.
//!
//! A first data line that does not start with a number (e.g. a CSV header
//! `src,dst,weight`) is skipped. Ids are renumbered densely in first-seen
//! order so the result can be fed straight to the driver.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

use crate::config::READ_BUFFER_SIZE;
use crate::graph::{VInt, WeightedEdge};

/// An edge list over dense ids plus the way back to the file's ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeListGraph {
    /// `vertex_ids[dense]` is the id used in the file.
    pub vertex_ids: Vec<u64>,
    pub edges: Vec<WeightedEdge>,
}

impl EdgeListGraph {
    pub fn vertex_count(&self) -> usize {
        self.vertex_ids.len()
    }

    #[inline]
    pub fn original_id(&self, vertex: VInt) -> u64 {
        self.vertex_ids[vertex as usize]
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Self::from_reader(BufReader::with_capacity(READ_BUFFER_SIZE, file))
            .with_context(|| format!("failed to read edge list {}", path.display()))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut dense = HashMap::<u64, VInt>::new();
        let mut graph = EdgeListGraph::default();
        let mut seen_data = false;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%') {
                continue;
            }
            let tokens: Vec<&str> = trimmed
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty())
                .collect();
            if tokens.is_empty() {
                continue;
            }

            let fields: &[&str] = match tokens[0] {
                "t" => continue,
                "v" => {
                    let id = parse_id(tokens.get(1).copied(), line_no)?;
                    intern(&mut dense, &mut graph.vertex_ids, id)?;
                    seen_data = true;
                    continue;
                }
                "e" => &tokens[1..],
                first if !seen_data && first.parse::<u64>().is_err() => {
                    // Header row.
                    seen_data = true;
                    continue;
                }
                _ => &tokens[..],
            };
            seen_data = true;

            if fields.len() < 2 || fields.len() > 3 {
                bail!("line {line_no}: expected `u v [weight]`, got `{trimmed}`");
            }
            let u = parse_id(Some(fields[0]), line_no)?;
            let v = parse_id(Some(fields[1]), line_no)?;
            let weight = match fields.get(2) {
                Some(token) => token
                    .parse::<f64>()
                    .map_err(|e| anyhow!("line {line_no}: bad weight `{token}`: {e}"))?,
                None => 1.0,
            };
            let u = intern(&mut dense, &mut graph.vertex_ids, u)?;
            let v = intern(&mut dense, &mut graph.vertex_ids, v)?;
            graph.edges.push((u, v, weight));
        }

        log::debug!(
            "loaded {} vertices and {} edges",
            graph.vertex_count(),
            graph.edges.len()
        );
        Ok(graph)
    }
}

fn parse_id(token: Option<&str>, line_no: usize) -> Result<u64> {
    let token = token.ok_or_else(|| anyhow!("line {line_no}: missing vertex id"))?;
    token
        .parse::<u64>()
        .map_err(|e| anyhow!("line {line_no}: bad vertex id `{token}`: {e}"))
}

fn intern(dense: &mut HashMap<u64, VInt>, vertex_ids: &mut Vec<u64>, id: u64) -> Result<VInt> {
    if let Some(&vertex) = dense.get(&id) {
        return Ok(vertex);
    }
    let vertex = VInt::try_from(vertex_ids.len())
        .map_err(|_| anyhow!("more than {} distinct vertex ids", VInt::MAX))?;
    vertex_ids.push(id);
    dense.insert(id, vertex);
    Ok(vertex)
}
