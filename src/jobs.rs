//! Work units and the reductions over their artifacts.
//!
//! A work unit processes the blocks listed in its [`JobDescriptor`] and
//! writes exactly one artifact. Reductions only read those artifacts, never
//! the graph or the volume.

use std::collections::BTreeSet;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::blocking::Blocking;
use crate::config::{BlockFacesConfig, JobDescriptor, LabelOffsets, SubproblemConfig};
use crate::cut_edges::{solve_block, ScaleSolution};
use crate::error::{Error, Result};
use crate::face::{match_face, FaceAssignment};
use crate::graph::{GraphSource, NodeSource};
use crate::hierarchy::{MulticutProblem, ScaledNodes};
use crate::solver::LocalSolver;
use crate::storage::{ArtifactStore, GraphStore};
use crate::subgraph::extract_subgraph;
use crate::union_find::{Equivalences, LabelUnionFind};
use crate::volume::LabelVolume;

/// Solve the sub-problems of the job's blocks at `scale`.
///
/// `nodes` holds the scale 0 block node lists; `problem` is the problem of
/// `scale`.
pub fn solve_subproblems_job<N, S>(
    job: &JobDescriptor,
    shape: [usize; 3],
    initial_block_shape: [usize; 3],
    scale: u32,
    problem: &MulticutProblem,
    nodes: &N,
    solver: &S,
) -> Result<ScaleSolution>
where
    N: NodeSource + ?Sized,
    S: LocalSolver + ?Sized,
{
    let initial_blocking = Blocking::new(shape, initial_block_shape)?;
    let blocking = Blocking::at_scale(shape, initial_block_shape, scale)?;
    let scaled = ScaledNodes {
        initial: nodes,
        initial_blocking: &initial_blocking,
        blocking: &blocking,
        node_labeling: &problem.node_labeling,
    };

    let parts = job
        .block_ids
        .par_iter()
        .map(|&block_id| {
            let block = blocking.block(block_id)?;
            let subgraph = extract_subgraph(&block, &scaled, &problem.graph)?;
            let cut = solve_block(&subgraph, &problem.costs, solver)?;
            debug!(block_id, n_cut = cut.len(), "solved block");
            Ok((subgraph.inner_edges, cut))
        })
        .collect::<Result<Vec<(Vec<u64>, Vec<u64>)>>>()?;

    let mut solution = ScaleSolution::new();
    for (inner_edges, cut) in &parts {
        solution.insert_block(inner_edges, cut);
    }
    Ok(solution)
}

/// Fail unless every block of the job lies in the configured region of
/// interest at the job's scale.
fn check_job_blocks(config: &SubproblemConfig, job: &JobDescriptor, shape: [usize; 3]) -> Result<()> {
    let blocking = Blocking::at_scale(shape, config.block_shape, config.scale)?;
    let selected = match config.roi(shape) {
        Some((begin, end)) => blocking.blocks_in_roi(begin, end)?,
        None => blocking.blocks(),
    };
    let selected: BTreeSet<u64> = selected.into_iter().map(|b| b.id).collect();
    if let Some(block_id) = job.block_ids.iter().find(|id| !selected.contains(*id)) {
        return Err(Error::InvalidConfiguration(format!(
            "job {} lists block {block_id} outside of the region of interest at scale {}",
            job.job_id, config.scale
        )));
    }
    Ok(())
}

/// Build the scale 0 problem from the stored graph and edge costs.
pub fn init_problem(config: &SubproblemConfig) -> Result<PathBuf> {
    let graph_store = GraphStore::new(&config.graph_path, config.block_prefix.clone());
    let graph = graph_store.load_graph()?;
    let costs = graph_store.load_costs()?;
    let problem = MulticutProblem::new(graph, costs)?;
    let store = ArtifactStore::new(&config.tmp_folder)?;
    let path = store.save_problem(0, &problem)?;
    info!(
        n_nodes = problem.graph.n_nodes(),
        n_edges = problem.graph.n_edges(),
        "stored initial problem"
    );
    Ok(path)
}

/// Run a sub-problem job from its configuration and store its artifact.
pub fn run_subproblems(config: &SubproblemConfig, job: &JobDescriptor) -> Result<PathBuf> {
    info!(job_id = job.job_id, scale = config.scale, n_blocks = job.block_ids.len(), "start processing job");
    let graph_store = GraphStore::new(&config.graph_path, config.block_prefix.clone());
    let shape = graph_store.attributes()?.shape;
    check_job_blocks(config, job, shape)?;
    let store = ArtifactStore::new(&config.tmp_folder)?;
    let problem = store.load_problem(config.scale)?;

    let solution = solve_subproblems_job(
        job,
        shape,
        config.block_shape,
        config.scale,
        &problem,
        &graph_store,
        &config.agglomerator,
    )?;
    let path = store.save_solution(config.scale, job.job_id, &solution)?;
    info!(job_id = job.job_id, n_cut = solution.cut_edges.len(), "job finished");
    Ok(path)
}

/// Merge the artifacts of all jobs of one scale.
pub fn reduce_cut_edges(store: &ArtifactStore, scale: u32, job_ids: &[u64]) -> Result<ScaleSolution> {
    let mut total = ScaleSolution::new();
    for &job_id in job_ids {
        total.merge(&store.load_solution(scale, job_id)?);
    }
    info!(scale, n_jobs = job_ids.len(), n_cut = total.cut_edges.len(), "reduced cut edges");
    Ok(total)
}

/// Contract the problem of `scale` along the merged job results and store it
/// as the problem of `scale + 1`.
pub fn reduce_problem(store: &ArtifactStore, scale: u32, job_ids: &[u64]) -> Result<MulticutProblem> {
    let problem = store.load_problem(scale)?;
    let solution = reduce_cut_edges(store, scale, job_ids)?;
    let next = problem.contract(&solution)?;
    store.save_problem(scale + 1, &next)?;
    Ok(next)
}

/// Label pairs across the lower faces of the job's blocks.
///
/// Empty blocks, and faces towards empty blocks, are skipped. Fails when an
/// assignment reaches `offsets.n_labels`.
pub fn block_faces_job<V: LabelVolume + ?Sized>(
    job: &JobDescriptor,
    blocking: &Blocking,
    volume: &V,
    offsets: &LabelOffsets,
) -> Result<Vec<FaceAssignment>> {
    if volume.shape() != blocking.shape() {
        return Err(Error::InconsistentShape(format!(
            "volume shape {:?} differs from blocking shape {:?}",
            volume.shape(),
            blocking.shape()
        )));
    }

    let parts = job
        .block_ids
        .par_iter()
        .map(|&block_id| {
            if offsets.is_empty_block(block_id) {
                return Ok(Vec::new());
            }
            let mut pairs = Vec::new();
            for face in blocking.faces(block_id, true, &offsets.empty_blocks)? {
                pairs.extend(match_face(volume, &face, offsets)?);
            }
            debug!(block_id, n_pairs = pairs.len(), "processed faces");
            Ok(pairs)
        })
        .collect::<Result<Vec<Vec<FaceAssignment>>>>()?;

    let assignments: BTreeSet<FaceAssignment> = parts.into_iter().flatten().collect();
    if let Some(&(_, max)) = assignments.iter().max_by_key(|&&(_, b)| b) {
        if max >= offsets.n_labels {
            return Err(Error::InconsistentShape(format!(
                "assignment label {max} exceeds label count {}",
                offsets.n_labels
            )));
        }
    }
    Ok(assignments.into_iter().collect())
}

/// Run a block-face job from its configuration and store its artifact.
pub fn run_block_faces<V: LabelVolume + ?Sized>(
    config: &BlockFacesConfig,
    job: &JobDescriptor,
    volume: &V,
) -> Result<PathBuf> {
    info!(job_id = job.job_id, n_blocks = job.block_ids.len(), "start processing job");
    let offsets = LabelOffsets::load(&config.offsets_path)?;
    let blocking = Blocking::new(volume.shape(), config.block_shape)?;
    let assignments = block_faces_job(job, &blocking, volume, &offsets)?;
    if assignments.is_empty() {
        warn!(job_id = job.job_id, "no face assignments");
    }
    let store = ArtifactStore::new(&config.tmp_folder)?;
    let path = store.save_assignments(job.job_id, &assignments)?;
    info!(job_id = job.job_id, n_assignments = assignments.len(), "job finished");
    Ok(path)
}

/// Union the face assignments of all jobs into final equivalences.
pub fn merge_face_assignments(store: &ArtifactStore, job_ids: &[u64], n_labels: u64) -> Result<Equivalences> {
    let mut union_find = LabelUnionFind::new(n_labels);
    for &job_id in job_ids {
        if let Some(pairs) = store.load_assignments(job_id)? {
            union_find.union_pairs(&pairs)?;
        }
    }
    let equivalences = union_find.finalize();
    info!(n_jobs = job_ids.len(), n_merged = equivalences.mapping().len(), "merged assignments");
    Ok(equivalences)
}
