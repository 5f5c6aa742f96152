//! Extraction of the sub-graph induced by one block.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::block::Block;
use crate::error::{Error, Result};
use crate::graph::{GraphSource, NodeSource};

/// Nodes and edges of one block, with a dense local node numbering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subgraph {
    pub block_id: u64,
    /// Global node ids; the position in this vector is the local id.
    pub nodes: Vec<u64>,
    /// Edges with both endpoints in `nodes`, ascending.
    pub inner_edges: Vec<u64>,
    /// Edges with exactly one endpoint in `nodes`, ascending.
    pub outer_edges: Vec<u64>,
    /// Local endpoints of `inner_edges`, same order.
    pub local_uv: Vec<(usize, usize)>,
}

impl Subgraph {
    pub fn n_local_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Check the local numbering against the inner edges.
    pub fn validate(&self) -> Result<()> {
        if self.local_uv.len() != self.inner_edges.len() {
            return Err(Error::InconsistentShape(format!(
                "block {}: {} local edges for {} inner edges",
                self.block_id,
                self.local_uv.len(),
                self.inner_edges.len()
            )));
        }
        let n = self.nodes.len();
        if let Some(&(u, v)) = self.local_uv.iter().find(|&&(u, v)| u >= n || v >= n) {
            return Err(Error::InconsistentShape(format!(
                "block {}: local edge ({u}, {v}) exceeds {n} local nodes",
                self.block_id
            )));
        }
        Ok(())
    }
}

/// Extract the sub-graph of `block`.
///
/// Node ids are read from `nodes` and deduplicated keeping the first
/// occurrence, which fixes the local numbering. Blocks with zero or one node
/// still report their outer edges.
pub fn extract_subgraph<N, G>(block: &Block, nodes: &N, graph: &G) -> Result<Subgraph>
where
    N: NodeSource + ?Sized,
    G: GraphSource + ?Sized,
{
    let raw_nodes = nodes.block_nodes(block.id)?;

    let mut local_ids: HashMap<u64, usize> = HashMap::with_capacity(raw_nodes.len());
    let mut block_nodes = Vec::with_capacity(raw_nodes.len());
    for node in raw_nodes {
        if let Entry::Vacant(slot) = local_ids.entry(node) {
            slot.insert(block_nodes.len());
            block_nodes.push(node);
        }
    }

    let mut incident = BTreeSet::new();
    for &node in &block_nodes {
        incident.extend(graph.node_edges(node)?.iter().copied());
    }

    let mut inner_edges = Vec::new();
    let mut outer_edges = Vec::new();
    let mut local_uv = Vec::new();
    for edge_id in incident {
        let (u, v) = graph.uv(edge_id)?;
        match (local_ids.get(&u), local_ids.get(&v)) {
            (Some(&lu), Some(&lv)) => {
                inner_edges.push(edge_id);
                local_uv.push((lu, lv));
            }
            (Some(_), None) | (None, Some(_)) => outer_edges.push(edge_id),
            (None, None) => {}
        }
    }

    let subgraph = Subgraph {
        block_id: block.id,
        nodes: block_nodes,
        inner_edges,
        outer_edges,
        local_uv,
    };
    subgraph.validate()?;
    debug!(
        block_id = block.id,
        n_nodes = subgraph.nodes.len(),
        n_inner = subgraph.inner_edges.len(),
        n_outer = subgraph.outer_edges.len(),
        "extracted subgraph"
    );
    Ok(subgraph)
}
