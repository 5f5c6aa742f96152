//! Cut-edge sets produced by block sub-problems and their aggregation.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::solver::LocalSolver;
use crate::subgraph::Subgraph;

/// Deduplicated set of global edge ids marked as cut.
///
/// Merging is a plain set union, so partial sets from independent jobs can be
/// combined in any order and any number of times.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CutEdgeSet {
    edges: HashSet<u64>,
}

impl CutEdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, edge_id: u64) -> bool {
        self.edges.contains(&edge_id)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Union with another partial result.
    pub fn merge(&mut self, other: &CutEdgeSet) {
        self.edges.extend(other.edges.iter().copied());
    }

    /// Edge ids in ascending order, the canonical serialized form.
    pub fn to_sorted_vec(&self) -> Vec<u64> {
        let mut out: Vec<u64> = self.edges.iter().copied().collect();
        out.sort_unstable();
        out
    }
}

impl Extend<u64> for CutEdgeSet {
    fn extend<T: IntoIterator<Item = u64>>(&mut self, iter: T) {
        self.edges.extend(iter);
    }
}

impl FromIterator<u64> for CutEdgeSet {
    fn from_iter<T: IntoIterator<Item = u64>>(iter: T) -> Self {
        Self {
            edges: iter.into_iter().collect(),
        }
    }
}

/// Edges decided by the solved blocks of one scale, or of one job of it.
///
/// An edge may only be contracted when some block saw it as an inner edge
/// and no block cut it. Edges no solved block extracted stay untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScaleSolution {
    /// Cut inner edges plus every outer edge.
    pub cut_edges: CutEdgeSet,
    /// Inner edges of every solved block.
    pub inner_edges: CutEdgeSet,
}

impl ScaleSolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: &ScaleSolution) {
        self.cut_edges.merge(&other.cut_edges);
        self.inner_edges.merge(&other.inner_edges);
    }

    /// Add one block's result.
    pub fn insert_block(&mut self, inner_edges: &[u64], cut_edges: &[u64]) {
        self.inner_edges.extend(inner_edges.iter().copied());
        self.cut_edges.extend(cut_edges.iter().copied());
    }

    pub fn is_merged(&self, edge_id: u64) -> bool {
        self.inner_edges.contains(edge_id) && !self.cut_edges.contains(edge_id)
    }
}

/// Merge per-block or per-job results into one set.
pub fn aggregate<'a, I>(parts: I) -> CutEdgeSet
where
    I: IntoIterator<Item = &'a CutEdgeSet>,
{
    let mut total = CutEdgeSet::new();
    for part in parts {
        total.merge(part);
    }
    total
}

/// `true` for every local edge whose endpoints carry different labels.
pub fn cut_mask(local_uv: &[(usize, usize)], node_labels: &[u64]) -> Result<Vec<bool>> {
    local_uv
        .iter()
        .map(|&(u, v)| match (node_labels.get(u), node_labels.get(v)) {
            (Some(lu), Some(lv)) => Ok(lu != lv),
            _ => Err(Error::InconsistentShape(format!(
                "local edge ({u}, {v}) exceeds {} node labels",
                node_labels.len()
            ))),
        })
        .collect()
}

/// Cut edges contributed by one block: the inner edges the solver cut plus
/// every outer edge, since their status depends on the neighbouring block.
pub fn block_cut_edges(subgraph: &Subgraph, node_labels: &[u64]) -> Result<Vec<u64>> {
    if node_labels.len() != subgraph.n_local_nodes() {
        return Err(Error::InconsistentShape(format!(
            "block {}: {} labels for {} nodes",
            subgraph.block_id,
            node_labels.len(),
            subgraph.n_local_nodes()
        )));
    }
    let mask = cut_mask(&subgraph.local_uv, node_labels)?;
    if mask.len() != subgraph.inner_edges.len() {
        return Err(Error::InconsistentShape(format!(
            "block {}: cut mask of {} for {} inner edges",
            subgraph.block_id,
            mask.len(),
            subgraph.inner_edges.len()
        )));
    }
    let mut cut: Vec<u64> = subgraph
        .inner_edges
        .iter()
        .zip(&mask)
        .filter(|&(_, &is_cut)| is_cut)
        .map(|(&e, _)| e)
        .chain(subgraph.outer_edges.iter().copied())
        .collect();
    cut.sort_unstable();
    cut.dedup();
    Ok(cut)
}

/// Solve the block's sub-problem and return its cut edges.
///
/// `costs` is indexed by global edge id.
pub fn solve_block<S: LocalSolver + ?Sized>(
    subgraph: &Subgraph,
    costs: &[f64],
    solver: &S,
) -> Result<Vec<u64>> {
    if subgraph.n_local_nodes() <= 1 {
        let mut outer = subgraph.outer_edges.clone();
        outer.sort_unstable();
        outer.dedup();
        return Ok(outer);
    }
    subgraph.validate()?;

    let sub_costs = subgraph
        .inner_edges
        .iter()
        .map(|&e| {
            costs.get(e as usize).copied().ok_or_else(|| {
                Error::InconsistentShape(format!(
                    "edge {e} has no cost ({} costs)",
                    costs.len()
                ))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    let labels = solver.solve(subgraph.n_local_nodes(), &subgraph.local_uv, &sub_costs)?;
    block_cut_edges(subgraph, &labels)
}
