//! Scale-wise multicut over doubling block sizes.
//!
//! At every scale each block's sub-problem is solved independently (in
//! parallel), the per-block cut edges are merged, and the problem is
//! contracted along the edges no block cut. The contracted problem is the
//! input of the next scale, whose blocks are twice as large along every axis.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::block::Block;
use crate::blocking::Blocking;
use crate::cut_edges::{aggregate, solve_block, ScaleSolution};
use crate::error::{Error, Result};
use crate::graph::{GraphSource, NodeSource, RegionGraph};
use crate::solver::LocalSolver;
use crate::subgraph::extract_subgraph;

/// Graph, costs and the mapping from initial nodes to the current nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct MulticutProblem {
    pub graph: RegionGraph,
    /// Cost per edge of `graph`.
    pub costs: Vec<f64>,
    /// Current node id of every initial (scale 0) node.
    pub node_labeling: Vec<u64>,
}

impl MulticutProblem {
    /// Scale 0 problem: every initial node is its own node.
    pub fn new(graph: RegionGraph, costs: Vec<f64>) -> Result<Self> {
        let node_labeling = (0..graph.n_nodes()).collect();
        Self::with_labeling(graph, costs, node_labeling)
    }

    pub fn with_labeling(graph: RegionGraph, costs: Vec<f64>, node_labeling: Vec<u64>) -> Result<Self> {
        if costs.len() as u64 != graph.n_edges() {
            return Err(Error::InconsistentShape(format!(
                "{} costs for {} edges",
                costs.len(),
                graph.n_edges()
            )));
        }
        if let Some(&n) = node_labeling.iter().find(|&&n| n >= graph.n_nodes()) {
            return Err(Error::InconsistentShape(format!(
                "node labeling points to node {n} of {}",
                graph.n_nodes()
            )));
        }
        Ok(Self {
            graph,
            costs,
            node_labeling,
        })
    }

    /// Merge the endpoints of every edge `solution` marks as merged: an inner
    /// edge of a solved block that no block cut.
    ///
    /// New node ids follow the order of the smallest old node of each merged
    /// group. Parallel edges between merged groups are joined and their costs
    /// summed.
    pub fn contract(&self, solution: &ScaleSolution) -> Result<MulticutProblem> {
        let n_nodes = self.graph.n_nodes() as usize;
        let mut parent: Vec<usize> = (0..n_nodes).collect();
        for (edge_id, &(u, v)) in self.graph.uv_ids().iter().enumerate() {
            if !solution.is_merged(edge_id as u64) {
                continue;
            }
            let ru = find_root(&mut parent, u as usize);
            let rv = find_root(&mut parent, v as usize);
            if ru != rv {
                parent[ru.max(rv)] = ru.min(rv);
            }
        }

        let mut new_ids: HashMap<usize, u64> = HashMap::new();
        let mut new_node = vec![0u64; n_nodes];
        for node in 0..n_nodes {
            let root = find_root(&mut parent, node);
            let next = new_ids.len() as u64;
            new_node[node] = match new_ids.entry(root) {
                Entry::Occupied(e) => *e.get(),
                Entry::Vacant(e) => *e.insert(next),
            };
        }

        let mut edges: BTreeMap<(u64, u64), f64> = BTreeMap::new();
        for (&(u, v), &c) in self.graph.uv_ids().iter().zip(&self.costs) {
            let (nu, nv) = (new_node[u as usize], new_node[v as usize]);
            if nu != nv {
                *edges.entry((nu.min(nv), nu.max(nv))).or_insert(0.0) += c;
            }
        }

        let (uv_ids, costs): (Vec<(u64, u64)>, Vec<f64>) = edges.into_iter().unzip();
        let graph = RegionGraph::new(new_ids.len() as u64, uv_ids)?;
        let node_labeling = self
            .node_labeling
            .iter()
            .map(|&n| new_node[n as usize])
            .collect();
        MulticutProblem::with_labeling(graph, costs, node_labeling)
    }
}

fn find_root(parent: &mut [usize], node: usize) -> usize {
    let mut root = node;
    while parent[root] != root {
        root = parent[root];
    }
    let mut current = node;
    while parent[current] != root {
        let next = parent[current];
        parent[current] = root;
        current = next;
    }
    root
}

/// Node lists of coarse blocks, assembled from the initial block lists they
/// enclose and mapped to the current node ids.
pub struct ScaledNodes<'a, N: NodeSource + ?Sized> {
    pub initial: &'a N,
    pub initial_blocking: &'a Blocking,
    pub blocking: &'a Blocking,
    pub node_labeling: &'a [u64],
}

impl<N: NodeSource + ?Sized> NodeSource for ScaledNodes<'_, N> {
    fn block_nodes(&self, block_id: u64) -> Result<Vec<u64>> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for fine_id in self.blocking.nested_block_ids(block_id, self.initial_blocking)? {
            for node in self.initial.block_nodes(fine_id)? {
                let mapped = self.node_labeling.get(node as usize).copied().ok_or_else(|| {
                    Error::InconsistentShape(format!(
                        "block {fine_id} lists node {node} outside of the node labeling"
                    ))
                })?;
                if seen.insert(mapped) {
                    nodes.push(mapped);
                }
            }
        }
        Ok(nodes)
    }
}

/// Cut edges of one scale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScaleResult {
    pub scale: u32,
    pub n_blocks: usize,
    /// Cut edge ids of that scale's problem graph, ascending.
    pub cut_edges: Vec<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HierarchyResult {
    pub scales: Vec<ScaleResult>,
    /// Problem the last scale was solved on; its edge ids are the ones in
    /// the last [`ScaleResult`].
    pub problem: MulticutProblem,
}

/// Solve every block of one scale and merge their edge decisions.
pub fn solve_scale<N, S>(
    problem: &MulticutProblem,
    blocks: &[Block],
    nodes: &N,
    solver: &S,
) -> Result<ScaleSolution>
where
    N: NodeSource + ?Sized,
    S: LocalSolver + ?Sized,
{
    let parts = blocks
        .par_iter()
        .map(|block| {
            let subgraph = extract_subgraph(block, nodes, &problem.graph)?;
            let cut = solve_block(&subgraph, &problem.costs, solver)?;
            debug!(block_id = block.id, n_cut = cut.len(), "solved block");
            let mut part = ScaleSolution::new();
            part.insert_block(&subgraph.inner_edges, &cut);
            Ok(part)
        })
        .collect::<Result<Vec<ScaleSolution>>>()?;

    Ok(ScaleSolution {
        cut_edges: aggregate(parts.iter().map(|p| &p.cut_edges)),
        inner_edges: aggregate(parts.iter().map(|p| &p.inner_edges)),
    })
}

/// Driver of the scale loop.
pub struct ScaleHierarchy<'a, S: LocalSolver + ?Sized> {
    pub shape: [usize; 3],
    pub initial_block_shape: [usize; 3],
    /// Last scale to solve; `None` runs until a single block is left.
    pub max_scale: Option<u32>,
    pub roi: Option<([usize; 3], [usize; 3])>,
    pub solver: &'a S,
}

impl<'a, S: LocalSolver + ?Sized> ScaleHierarchy<'a, S> {
    pub fn new(shape: [usize; 3], initial_block_shape: [usize; 3], solver: &'a S) -> Self {
        Self {
            shape,
            initial_block_shape,
            max_scale: None,
            roi: None,
            solver,
        }
    }

    pub fn with_max_scale(mut self, max_scale: u32) -> Self {
        self.max_scale = Some(max_scale);
        self
    }

    pub fn with_roi(mut self, roi_begin: [usize; 3], roi_end: [usize; 3]) -> Self {
        self.roi = Some((roi_begin, roi_end));
        self
    }

    fn blocks_at(&self, blocking: &Blocking) -> Result<Vec<Block>> {
        match self.roi {
            Some((begin, end)) => blocking.blocks_in_roi(begin, end),
            None => Ok(blocking.blocks()),
        }
    }

    /// Run scales `0, 1, ...` starting from `problem`, reading initial block
    /// node lists from `nodes`.
    pub fn run<N: NodeSource + ?Sized>(
        &self,
        mut problem: MulticutProblem,
        nodes: &N,
    ) -> Result<HierarchyResult> {
        let initial_blocking = Blocking::new(self.shape, self.initial_block_shape)?;
        // fail on a bad roi before any block is solved
        self.blocks_at(&initial_blocking)?;

        let mut scales = Vec::new();
        let mut scale = 0u32;
        loop {
            let blocking = Blocking::at_scale(self.shape, self.initial_block_shape, scale)?;
            let blocks = self.blocks_at(&blocking)?;
            let scaled = ScaledNodes {
                initial: nodes,
                initial_blocking: &initial_blocking,
                blocking: &blocking,
                node_labeling: &problem.node_labeling,
            };
            let solution = solve_scale(&problem, &blocks, &scaled, self.solver)?;
            let cut = &solution.cut_edges;
            info!(
                scale,
                n_blocks = blocks.len(),
                n_nodes = problem.graph.n_nodes(),
                n_edges = problem.graph.n_edges(),
                n_cut = cut.len(),
                "solved scale"
            );
            scales.push(ScaleResult {
                scale,
                n_blocks: blocks.len(),
                cut_edges: cut.to_sorted_vec(),
            });

            if blocks.len() <= 1 || self.max_scale == Some(scale) {
                break;
            }
            let next = problem.contract(&solution)?;
            if next.graph.n_edges() == 0 {
                info!(scale, "no edges left after contraction");
                break;
            }
            problem = next;
            scale += 1;
        }
        Ok(HierarchyResult { scales, problem })
    }
}
