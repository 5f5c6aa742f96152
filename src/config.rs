//! Job descriptors and configuration records.
//!
//! All records are plain JSON. Anything that selects behaviour (block shape,
//! agglomerator) is validated when the record is loaded, before any block is
//! touched.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::solver::Agglomerator;

/// Which blocks a single work unit processes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: u64,
    pub block_ids: Vec<u64>,
}

impl JobDescriptor {
    /// Distribute `block_ids` into at most `n_jobs` contiguous jobs.
    pub fn partition(block_ids: &[u64], n_jobs: usize) -> Vec<JobDescriptor> {
        if block_ids.is_empty() || n_jobs == 0 {
            return Vec::new();
        }
        let n_jobs = n_jobs.min(block_ids.len());
        let per_job = block_ids.len().div_ceil(n_jobs);
        block_ids
            .chunks(per_job)
            .enumerate()
            .map(|(job_id, chunk)| JobDescriptor {
                job_id: job_id as u64,
                block_ids: chunk.to_vec(),
            })
            .collect()
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

#[derive(Clone, Debug, Deserialize)]
struct RawSubproblemConfig {
    block_shape: [i64; 3],
    scale: u32,
    agglomerator_key: String,
    tmp_folder: PathBuf,
    graph_path: PathBuf,
    block_prefix: String,
    #[serde(default)]
    roi_begin: Option<[usize; 3]>,
    #[serde(default)]
    roi_end: Option<[usize; 3]>,
}

/// Configuration of the per-block multicut sub-problem step.
#[derive(Clone, Debug)]
pub struct SubproblemConfig {
    /// Block shape at scale 0.
    pub block_shape: [usize; 3],
    pub scale: u32,
    pub agglomerator: Agglomerator,
    pub tmp_folder: PathBuf,
    pub graph_path: PathBuf,
    pub block_prefix: String,
    pub roi_begin: Option<[usize; 3]>,
    pub roi_end: Option<[usize; 3]>,
}

impl SubproblemConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawSubproblemConfig = serde_json::from_str(text)?;
        Ok(Self {
            block_shape: validate_block_shape(raw.block_shape)?,
            scale: raw.scale,
            agglomerator: raw.agglomerator_key.parse()?,
            tmp_folder: raw.tmp_folder,
            graph_path: raw.graph_path,
            block_prefix: raw.block_prefix,
            roi_begin: raw.roi_begin,
            roi_end: raw.roi_end,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Region of interest in a volume of `shape`; a missing bound defaults
    /// to the volume bound. `None` when neither bound is set.
    pub fn roi(&self, shape: [usize; 3]) -> Option<([usize; 3], [usize; 3])> {
        match (self.roi_begin, self.roi_end) {
            (None, None) => None,
            (begin, end) => Some((begin.unwrap_or([0; 3]), end.unwrap_or(shape))),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct RawBlockFacesConfig {
    block_shape: [i64; 3],
    tmp_folder: PathBuf,
    offsets_path: PathBuf,
}

/// Configuration of the block-face matching step.
#[derive(Clone, Debug)]
pub struct BlockFacesConfig {
    pub block_shape: [usize; 3],
    pub tmp_folder: PathBuf,
    pub offsets_path: PathBuf,
}

impl BlockFacesConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawBlockFacesConfig = serde_json::from_str(text)?;
        Ok(Self {
            block_shape: validate_block_shape(raw.block_shape)?,
            tmp_folder: raw.tmp_folder,
            offsets_path: raw.offsets_path,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Per-block label offsets that make block-local labels globally unique.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelOffsets {
    pub offsets: BTreeMap<u64, u64>,
    #[serde(default)]
    pub empty_blocks: BTreeSet<u64>,
    /// Exclusive upper bound of every offset label.
    pub n_labels: u64,
}

impl LabelOffsets {
    pub fn offset(&self, block_id: u64) -> Result<u64> {
        self.offsets
            .get(&block_id)
            .copied()
            .ok_or_else(|| Error::missing(block_id, "no label offset recorded"))
    }

    pub fn is_empty_block(&self, block_id: u64) -> bool {
        self.empty_blocks.contains(&block_id)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

fn validate_block_shape(block_shape: [i64; 3]) -> Result<[usize; 3]> {
    let mut out = [0usize; 3];
    for (d, &b) in block_shape.iter().enumerate() {
        if b <= 0 {
            return Err(Error::InvalidConfiguration(format!(
                "block shape {block_shape:?} has a non-positive dimension"
            )));
        }
        out[d] = b as usize;
    }
    Ok(out)
}
