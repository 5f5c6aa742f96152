//! Local multicut solvers for block sub-problems.
//!
//! Costs follow the multicut convention: positive costs are attractive,
//! negative costs repulsive, and a solver minimises the summed cost of the
//! edges it cuts.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::str::FromStr;

use crate::error::{Error, Result};

const MOVE_EPS: f64 = 1e-12;

/// Strategy that partitions a small graph into clusters.
pub trait LocalSolver: Sync {
    /// Cluster label per node for the graph with `n_nodes` nodes, edges
    /// `uv` and edge costs `costs`.
    fn solve(&self, n_nodes: usize, uv: &[(usize, usize)], costs: &[f64]) -> Result<Vec<u64>>;
}

/// Registry of the available local solvers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Agglomerator {
    /// Greedy additive edge contraction.
    GreedyAdditive,
    /// Greedy additive edge contraction refined by Kernighan-Lin style
    /// single node moves.
    KernighanLin,
}

impl Agglomerator {
    pub fn key(self) -> &'static str {
        match self {
            Agglomerator::GreedyAdditive => "multicut_gaec",
            Agglomerator::KernighanLin => "multicut_kl",
        }
    }
}

impl FromStr for Agglomerator {
    type Err = Error;

    fn from_str(key: &str) -> Result<Self> {
        match key {
            "multicut_gaec" => Ok(Agglomerator::GreedyAdditive),
            "multicut_kl" => Ok(Agglomerator::KernighanLin),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown agglomerator key {other:?}"
            ))),
        }
    }
}

impl LocalSolver for Agglomerator {
    fn solve(&self, n_nodes: usize, uv: &[(usize, usize)], costs: &[f64]) -> Result<Vec<u64>> {
        match self {
            Agglomerator::GreedyAdditive => GreedyAdditive.solve(n_nodes, uv, costs),
            Agglomerator::KernighanLin => KernighanLin::default().solve(n_nodes, uv, costs),
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct GreedyAdditive;

impl LocalSolver for GreedyAdditive {
    fn solve(&self, n_nodes: usize, uv: &[(usize, usize)], costs: &[f64]) -> Result<Vec<u64>> {
        check_problem(n_nodes, uv, costs)?;
        Ok(dense_labels(&greedy_additive(n_nodes, uv, costs)))
    }
}

#[derive(Copy, Clone, Debug)]
pub struct KernighanLin {
    pub max_sweeps: usize,
}

impl Default for KernighanLin {
    fn default() -> Self {
        Self { max_sweeps: 100 }
    }
}

impl LocalSolver for KernighanLin {
    fn solve(&self, n_nodes: usize, uv: &[(usize, usize)], costs: &[f64]) -> Result<Vec<u64>> {
        check_problem(n_nodes, uv, costs)?;
        let mut labels = greedy_additive(n_nodes, uv, costs);
        refine_node_moves(&mut labels, uv, costs, self.max_sweeps);
        Ok(dense_labels(&labels))
    }
}

/// Summed cost of the edges whose endpoints carry different labels.
pub fn multicut_objective(labels: &[u64], uv: &[(usize, usize)], costs: &[f64]) -> Result<f64> {
    if uv.len() != costs.len() {
        return Err(Error::InconsistentShape(format!(
            "{} edges but {} costs",
            uv.len(),
            costs.len()
        )));
    }
    let mut total = 0.0;
    for (&(u, v), &c) in uv.iter().zip(costs) {
        match (labels.get(u), labels.get(v)) {
            (Some(lu), Some(lv)) => {
                if lu != lv {
                    total += c;
                }
            }
            _ => {
                return Err(Error::InconsistentShape(format!(
                    "edge ({u}, {v}) exceeds {} labels",
                    labels.len()
                )))
            }
        }
    }
    Ok(total)
}

fn check_problem(n_nodes: usize, uv: &[(usize, usize)], costs: &[f64]) -> Result<()> {
    if uv.len() != costs.len() {
        return Err(Error::InconsistentShape(format!(
            "{} edges but {} costs",
            uv.len(),
            costs.len()
        )));
    }
    if let Some(&(u, v)) = uv.iter().find(|&&(u, v)| u >= n_nodes || v >= n_nodes) {
        return Err(Error::InconsistentShape(format!(
            "edge ({u}, {v}) exceeds {n_nodes} nodes"
        )));
    }
    Ok(())
}

/// Contraction candidate, ordered by weight and then by smallest endpoints.
#[derive(Copy, Clone, Debug)]
struct Candidate {
    weight: f64,
    u: usize,
    v: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| other.u.cmp(&self.u))
            .then_with(|| other.v.cmp(&self.v))
    }
}

/// Root node per node after contracting attractive edges greedily.
fn greedy_additive(n_nodes: usize, uv: &[(usize, usize)], costs: &[f64]) -> Vec<usize> {
    let mut adj: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n_nodes];
    for (&(u, v), &c) in uv.iter().zip(costs) {
        if u == v {
            continue;
        }
        *adj[u].entry(v).or_insert(0.0) += c;
        *adj[v].entry(u).or_insert(0.0) += c;
    }

    let mut heap = BinaryHeap::new();
    for (u, row) in adj.iter().enumerate() {
        for (&v, &weight) in row {
            if u < v && weight > 0.0 {
                heap.push(Candidate { weight, u, v });
            }
        }
    }

    let mut parent: Vec<usize> = (0..n_nodes).collect();
    while let Some(c) = heap.pop() {
        if c.weight <= 0.0 {
            break;
        }
        if parent[c.u] != c.u || parent[c.v] != c.v {
            continue;
        }
        // stale entry: the weight changed after it was queued
        match adj[c.u].get(&c.v) {
            Some(w) if w.to_bits() == c.weight.to_bits() => {}
            _ => continue,
        }

        let (keep, gone) = (c.u.min(c.v), c.u.max(c.v));
        let gone_row = std::mem::take(&mut adj[gone]);
        adj[keep].remove(&gone);
        for (other, weight) in gone_row {
            if other == keep {
                continue;
            }
            adj[other].remove(&gone);
            let merged = {
                let entry = adj[keep].entry(other).or_insert(0.0);
                *entry += weight;
                *entry
            };
            adj[other].insert(keep, merged);
            if merged > 0.0 {
                heap.push(Candidate {
                    weight: merged,
                    u: keep.min(other),
                    v: keep.max(other),
                });
            }
        }
        parent[gone] = keep;
    }

    (0..n_nodes).map(|n| find_root(&mut parent, n)).collect()
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

/// Move single nodes to the neighbouring cluster (or a fresh one) with the
/// largest objective decrease until no move improves it.
fn refine_node_moves(labels: &mut [usize], uv: &[(usize, usize)], costs: &[f64], max_sweeps: usize) {
    let n_nodes = labels.len();
    let mut neighbors: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n_nodes];
    for (&(u, v), &c) in uv.iter().zip(costs) {
        if u != v {
            neighbors[u].push((v, c));
            neighbors[v].push((u, c));
        }
    }

    let mut sizes: HashMap<usize, usize> = HashMap::new();
    for &l in labels.iter() {
        *sizes.entry(l).or_insert(0) += 1;
    }
    let mut next_label = labels.iter().copied().max().map_or(0, |m| m + 1);

    for _ in 0..max_sweeps {
        let mut moved = false;
        for x in 0..n_nodes {
            let own = labels[x];
            let mut towards: BTreeMap<usize, f64> = BTreeMap::new();
            for &(y, c) in &neighbors[x] {
                *towards.entry(labels[y]).or_insert(0.0) += c;
            }
            let own_weight = towards.get(&own).copied().unwrap_or(0.0);

            let mut best: Option<(usize, f64)> = None;
            for (&cluster, &weight) in &towards {
                if cluster == own {
                    continue;
                }
                let gain = weight - own_weight;
                if gain > best.map_or(MOVE_EPS, |(_, g)| g) {
                    best = Some((cluster, gain));
                }
            }
            let alone = sizes.get(&own).copied().unwrap_or(0) <= 1;
            if !alone && -own_weight > best.map_or(MOVE_EPS, |(_, g)| g) {
                best = Some((next_label, -own_weight));
                next_label += 1;
            }

            if let Some((target, _)) = best {
                if let Some(s) = sizes.get_mut(&own) {
                    *s -= 1;
                }
                *sizes.entry(target).or_insert(0) += 1;
                labels[x] = target;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
}

/// Relabel to `0..k` in order of first appearance.
fn dense_labels(labels: &[usize]) -> Vec<u64> {
    let mut mapping: HashMap<usize, u64> = HashMap::new();
    labels
        .iter()
        .map(|&l| {
            let next = mapping.len() as u64;
            *mapping.entry(l).or_insert(next)
        })
        .collect()
}
