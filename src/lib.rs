pub mod block;
pub mod blocking;
pub mod config;
pub mod cut_edges;
pub mod edge_labels;
pub mod error;
pub mod face;
pub mod graph;
pub mod hierarchy;
pub mod jobs;
pub mod solver;
pub mod storage;
pub mod subgraph;
pub mod union_find;
pub mod utils;
pub mod volume;

pub use block::Block;
pub use blocking::{blocks, scaled_block_shape, Blocking};
pub use config::{BlockFacesConfig, JobDescriptor, LabelOffsets, SubproblemConfig};
pub use cut_edges::{
    aggregate, block_cut_edges, cut_mask, solve_block, CutEdgeSet, ScaleSolution,
};
pub use edge_labels::{edge_labels, IGNORE_EDGE};
pub use error::{Error, Result};
pub use face::{match_blocks, match_face, BlockFace, FaceAssignment, FaceAxis};
pub use graph::{BlockNodes, GraphSource, NodeSource, RegionGraph};
pub use hierarchy::{
    solve_scale, HierarchyResult, MulticutProblem, ScaleHierarchy, ScaleResult, ScaledNodes,
};
pub use jobs::{
    block_faces_job, init_problem, merge_face_assignments, reduce_cut_edges, reduce_problem,
    run_block_faces, run_subproblems, solve_subproblems_job,
};
pub use solver::{multicut_objective, Agglomerator, GreedyAdditive, KernighanLin, LocalSolver};
pub use storage::{ArtifactKey, ArtifactStore, GraphAttributes, GraphStore};
pub use subgraph::{extract_subgraph, Subgraph};
pub use union_find::{Equivalences, LabelUnionFind};
pub use volume::{InMemoryVolume, LabelVolume};
