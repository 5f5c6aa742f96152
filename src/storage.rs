//! On-disk graph storage and per-job result artifacts.
//!
//! Everything is written as unformatted little-endian records (see
//! [`crate::utils::write_record`]). Each artifact file starts with a one byte
//! tag record telling an explicit empty result from a stored array.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cut_edges::ScaleSolution;
use crate::error::{Error, Result};
use crate::face::FaceAssignment;
use crate::graph::{GraphSource, NodeSource, RegionGraph};
use crate::hierarchy::MulticutProblem;
use crate::utils::{
    decode_f64s, decode_pairs, decode_u64s, encode_f64s, encode_pairs, encode_u64s, read_record,
    write_record,
};

const TAG_EMPTY: u8 = 0;
const TAG_DATA: u8 = 1;

/// Names of the artifacts a job produces, derived from structured keys.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    CutEdges { scale: u32, job_id: u64 },
    FaceAssignments { job_id: u64 },
    Problem { scale: u32 },
}

impl ArtifactKey {
    pub fn file_name(&self) -> String {
        match self {
            ArtifactKey::CutEdges { scale, job_id } => format!("subproblem_s{scale}_{job_id}.bin"),
            ArtifactKey::FaceAssignments { job_id } => format!("cc_assignments_{job_id}.bin"),
            ArtifactKey::Problem { scale } => format!("problem_s{scale}.bin"),
        }
    }
}

/// Result artifacts below a job's temporary folder.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self, key: ArtifactKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    pub fn exists(&self, key: ArtifactKey) -> bool {
        self.path(key).exists()
    }

    /// Write all records to a temporary file and move it into place, so a
    /// reader never sees a partial artifact.
    fn write(&self, key: ArtifactKey, records: &[Vec<u8>]) -> Result<PathBuf> {
        let path = self.path(key);
        let tmp = path.with_extension("partial");
        {
            let mut w = BufWriter::new(File::create(&tmp)?);
            for record in records {
                write_record(&mut w, record)?;
            }
            w.flush()?;
        }
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), "wrote artifact");
        Ok(path)
    }

    fn read(&self, key: ArtifactKey) -> Result<(u8, BufReader<File>)> {
        let path = self.path(key);
        let mut r = BufReader::new(File::open(&path)?);
        let tag = read_record(&mut r)?;
        match tag.as_slice() {
            [t] if *t == TAG_EMPTY || *t == TAG_DATA => Ok((*t, r)),
            _ => Err(Error::InconsistentShape(format!(
                "artifact {} has an invalid header",
                path.display()
            ))),
        }
    }

    /// Store a job's cut edges followed by the inner edges of its blocks,
    /// both ascending.
    pub fn save_solution(&self, scale: u32, job_id: u64, solution: &ScaleSolution) -> Result<PathBuf> {
        self.write(
            ArtifactKey::CutEdges { scale, job_id },
            &[
                vec![TAG_DATA],
                encode_u64s(&solution.cut_edges.to_sorted_vec()),
                encode_u64s(&solution.inner_edges.to_sorted_vec()),
            ],
        )
    }

    pub fn load_solution(&self, scale: u32, job_id: u64) -> Result<ScaleSolution> {
        let (tag, mut r) = self.read(ArtifactKey::CutEdges { scale, job_id })?;
        if tag == TAG_EMPTY {
            return Ok(ScaleSolution::new());
        }
        let cut_edges = decode_u64s(&read_record(&mut r)?)?;
        let inner_edges = decode_u64s(&read_record(&mut r)?)?;
        Ok(ScaleSolution {
            cut_edges: cut_edges.into_iter().collect(),
            inner_edges: inner_edges.into_iter().collect(),
        })
    }

    /// Store face assignments; an empty slice is stored as the empty marker.
    pub fn save_assignments(&self, job_id: u64, pairs: &[FaceAssignment]) -> Result<PathBuf> {
        let key = ArtifactKey::FaceAssignments { job_id };
        if pairs.is_empty() {
            self.write(key, &[vec![TAG_EMPTY]])
        } else {
            self.write(key, &[vec![TAG_DATA], encode_pairs(pairs)])
        }
    }

    /// `None` when the job stored the empty marker.
    pub fn load_assignments(&self, job_id: u64) -> Result<Option<Vec<FaceAssignment>>> {
        let (tag, mut r) = self.read(ArtifactKey::FaceAssignments { job_id })?;
        if tag == TAG_EMPTY {
            return Ok(None);
        }
        Ok(Some(decode_pairs(&read_record(&mut r)?)?))
    }

    pub fn save_problem(&self, scale: u32, problem: &MulticutProblem) -> Result<PathBuf> {
        self.write(
            ArtifactKey::Problem { scale },
            &[
                vec![TAG_DATA],
                encode_u64s(&[problem.graph.n_nodes()]),
                encode_pairs(problem.graph.uv_ids()),
                encode_f64s(&problem.costs),
                encode_u64s(&problem.node_labeling),
            ],
        )
    }

    pub fn load_problem(&self, scale: u32) -> Result<MulticutProblem> {
        let (tag, mut r) = self.read(ArtifactKey::Problem { scale })?;
        if tag == TAG_EMPTY {
            return Err(Error::InconsistentShape(format!(
                "problem of scale {scale} is stored empty"
            )));
        }
        let n_nodes = match decode_u64s(&read_record(&mut r)?)?.as_slice() {
            [n] => *n,
            other => {
                return Err(Error::InconsistentShape(format!(
                    "problem header has {} entries",
                    other.len()
                )))
            }
        };
        let uv_ids = decode_pairs(&read_record(&mut r)?)?;
        let costs = decode_f64s(&read_record(&mut r)?)?;
        let node_labeling = decode_u64s(&read_record(&mut r)?)?;
        // every node of a contracted problem holds at least one initial node
        if n_nodes > node_labeling.len() as u64 {
            return Err(Error::InconsistentShape(format!(
                "problem of scale {scale} declares {n_nodes} nodes for {} initial nodes",
                node_labeling.len()
            )));
        }
        MulticutProblem::with_labeling(RegionGraph::new(n_nodes, uv_ids)?, costs, node_labeling)
    }
}

/// Metadata stored next to the graph root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphAttributes {
    /// Shape of the volume the graph was extracted from.
    pub shape: [usize; 3],
    pub n_nodes: u64,
    pub n_edges: u64,
}

/// Region graph on disk: `graph_path/attributes.json`, `graph_path/edges`,
/// the edge costs in `graph_path/costs` and one node list per block at
/// `block_prefix + block_id`.
#[derive(Clone, Debug)]
pub struct GraphStore {
    graph_path: PathBuf,
    block_prefix: String,
}

impl GraphStore {
    pub fn new(graph_path: impl Into<PathBuf>, block_prefix: impl Into<String>) -> Self {
        Self {
            graph_path: graph_path.into(),
            block_prefix: block_prefix.into(),
        }
    }

    pub fn block_path(&self, block_id: u64) -> PathBuf {
        PathBuf::from(format!("{}{}", self.block_prefix, block_id))
    }

    pub fn attributes(&self) -> Result<GraphAttributes> {
        let text = fs::read_to_string(self.graph_path.join("attributes.json"))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn load_graph(&self) -> Result<RegionGraph> {
        let attrs = self.attributes()?;
        let mut r = BufReader::new(File::open(self.graph_path.join("edges"))?);
        let uv_ids = decode_pairs(&read_record(&mut r)?)?;
        if uv_ids.len() as u64 != attrs.n_edges {
            return Err(Error::InconsistentShape(format!(
                "graph stores {} edges, attributes declare {}",
                uv_ids.len(),
                attrs.n_edges
            )));
        }
        RegionGraph::new(attrs.n_nodes, uv_ids)
    }

    /// Edge costs, one per edge of the stored graph.
    pub fn load_costs(&self) -> Result<Vec<f64>> {
        let mut r = BufReader::new(File::open(self.graph_path.join("costs"))?);
        Ok(decode_f64s(&read_record(&mut r)?)?)
    }

    pub fn write_costs(&self, costs: &[f64]) -> Result<()> {
        fs::create_dir_all(&self.graph_path)?;
        let mut w = BufWriter::new(File::create(self.graph_path.join("costs"))?);
        write_record(&mut w, &encode_f64s(costs))?;
        w.flush()?;
        Ok(())
    }

    pub fn write_graph(&self, shape: [usize; 3], graph: &RegionGraph) -> Result<()> {
        fs::create_dir_all(&self.graph_path)?;
        let attrs = GraphAttributes {
            shape,
            n_nodes: graph.n_nodes(),
            n_edges: graph.n_edges(),
        };
        fs::write(
            self.graph_path.join("attributes.json"),
            serde_json::to_string_pretty(&attrs)?,
        )?;
        let mut w = BufWriter::new(File::create(self.graph_path.join("edges"))?);
        write_record(&mut w, &encode_pairs(graph.uv_ids()))?;
        w.flush()?;
        Ok(())
    }

    pub fn write_block_nodes(&self, block_id: u64, nodes: &[u64]) -> Result<()> {
        let path = self.block_path(block_id);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut w = BufWriter::new(File::create(path)?);
        write_record(&mut w, &encode_u64s(nodes))?;
        w.flush()?;
        Ok(())
    }
}

impl NodeSource for GraphStore {
    fn block_nodes(&self, block_id: u64) -> Result<Vec<u64>> {
        let path = self.block_path(block_id);
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                Error::missing(block_id, format!("{} does not exist", path.display()))
            }
            _ => Error::Io(e),
        })?;
        let mut r = BufReader::new(file);
        Ok(decode_u64s(&read_record(&mut r)?)?)
    }
}
