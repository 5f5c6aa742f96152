//! Region adjacency graph and the block-addressed sources it is read from.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};

/// Source of per-block node id lists.
pub trait NodeSource: Sync {
    /// Node ids of `block_id`, in storage order.
    fn block_nodes(&self, block_id: u64) -> Result<Vec<u64>>;
}

/// Edge queries against the global graph.
pub trait GraphSource: Sync {
    fn n_nodes(&self) -> u64;

    fn n_edges(&self) -> u64;

    /// Endpoints `(u, v)` of an edge, `u < v`.
    fn uv(&self, edge_id: u64) -> Result<(u64, u64)>;

    /// Ids of the edges incident on `node`, ascending.
    fn node_edges(&self, node: u64) -> Result<&[u64]>;
}

/// Undirected graph with edge list `(u, v)`, `u < v`, and a CSR node-to-edge
/// index.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionGraph {
    n_nodes: u64,
    uv_ids: Vec<(u64, u64)>,
    xadj: Vec<usize>,
    edge_index: Vec<u64>,
}

impl RegionGraph {
    /// Build the graph, rejecting self loops, unordered or duplicate edges.
    pub fn new(n_nodes: u64, uv_ids: Vec<(u64, u64)>) -> Result<Self> {
        let mut degree = node_table(n_nodes)?;
        let mut seen = HashSet::with_capacity(uv_ids.len());
        for (edge_id, &(u, v)) in uv_ids.iter().enumerate() {
            if u >= v || v >= n_nodes {
                return Err(Error::InconsistentShape(format!(
                    "edge {edge_id} ({u}, {v}) is not ordered or exceeds {n_nodes} nodes"
                )));
            }
            if !seen.insert((u, v)) {
                return Err(Error::InconsistentShape(format!(
                    "edge {edge_id} ({u}, {v}) is a duplicate"
                )));
            }
            degree[u as usize] += 1;
            degree[v as usize] += 1;
        }

        let mut xadj = Vec::with_capacity(degree.len() + 1);
        xadj.push(0usize);
        let mut count = 0usize;
        for d in &degree {
            count += d;
            xadj.push(count);
        }
        let mut fill = xadj.clone();
        let mut edge_index = vec![0u64; count];
        // Edge ids are visited in ascending order, so every row stays sorted.
        for (edge_id, &(u, v)) in uv_ids.iter().enumerate() {
            for node in [u, v] {
                let slot = &mut fill[node as usize];
                edge_index[*slot] = edge_id as u64;
                *slot += 1;
            }
        }

        Ok(Self {
            n_nodes,
            uv_ids,
            xadj,
            edge_index,
        })
    }

    pub fn uv_ids(&self) -> &[(u64, u64)] {
        &self.uv_ids
    }
}

/// Zeroed per-node table. A node count that cannot be allocated is treated
/// as a corrupt header.
fn node_table(n_nodes: u64) -> Result<Vec<usize>> {
    let too_large = || Error::InconsistentShape(format!("node count {n_nodes} cannot be indexed"));
    let n = usize::try_from(n_nodes).map_err(|_| too_large())?;
    let mut table = Vec::new();
    table.try_reserve_exact(n).map_err(|_| too_large())?;
    table.resize(n, 0);
    Ok(table)
}

impl GraphSource for RegionGraph {
    fn n_nodes(&self) -> u64 {
        self.n_nodes
    }

    fn n_edges(&self) -> u64 {
        self.uv_ids.len() as u64
    }

    fn uv(&self, edge_id: u64) -> Result<(u64, u64)> {
        self.uv_ids.get(edge_id as usize).copied().ok_or_else(|| {
            Error::InconsistentShape(format!(
                "edge id {edge_id} outside of graph with {} edges",
                self.uv_ids.len()
            ))
        })
    }

    fn node_edges(&self, node: u64) -> Result<&[u64]> {
        if node >= self.n_nodes {
            return Err(Error::InconsistentShape(format!(
                "node {node} outside of graph with {} nodes",
                self.n_nodes
            )));
        }
        let n = node as usize;
        Ok(&self.edge_index[self.xadj[n]..self.xadj[n + 1]])
    }
}

/// Block node lists held in memory.
#[derive(Clone, Debug, Default)]
pub struct BlockNodes {
    nodes: BTreeMap<u64, Vec<u64>>,
}

impl BlockNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block_id: u64, nodes: Vec<u64>) {
        self.nodes.insert(block_id, nodes);
    }
}

impl FromIterator<(u64, Vec<u64>)> for BlockNodes {
    fn from_iter<T: IntoIterator<Item = (u64, Vec<u64>)>>(iter: T) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl NodeSource for BlockNodes {
    fn block_nodes(&self, block_id: u64) -> Result<Vec<u64>> {
        self.nodes
            .get(&block_id)
            .cloned()
            .ok_or_else(|| Error::missing(block_id, "no node list stored"))
    }
}
