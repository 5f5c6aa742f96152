//! Access to labeled volumes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::{s, Array3};

use crate::error::{Error, Result};
use crate::utils::{decode_u64s, encode_u64s, read_record, write_record};

/// Read access to a 3D label volume.
///
/// Chunked on-disk formats implement this outside of the crate; the core only
/// ever asks for rectangular regions.
pub trait LabelVolume: Sync {
    fn shape(&self) -> [usize; 3];

    /// Labels in the half-open region `begin..end`.
    fn read_region(&self, begin: [usize; 3], end: [usize; 3]) -> Result<Array3<u64>>;
}

/// Label volume held fully in memory.
#[derive(Clone, Debug)]
pub struct InMemoryVolume {
    data: Array3<u64>,
}

impl InMemoryVolume {
    pub fn new(data: Array3<u64>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Array3<u64> {
        &self.data
    }

    /// Load a volume stored as a shape record followed by the C-order labels.
    pub fn load(path: &Path) -> Result<Self> {
        let mut r = BufReader::new(File::open(path)?);
        let shape = decode_u64s(&read_record(&mut r)?)?;
        let labels = decode_u64s(&read_record(&mut r)?)?;
        let [s0, s1, s2] = shape.as_slice() else {
            return Err(Error::InconsistentShape(format!(
                "volume header has {} dimensions",
                shape.len()
            )));
        };
        let dims = (*s0 as usize, *s1 as usize, *s2 as usize);
        let data = Array3::from_shape_vec(dims, labels)
            .map_err(|e| Error::InconsistentShape(format!("volume data: {e}")))?;
        Ok(Self { data })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let shape: Vec<u64> = self.data.shape().iter().map(|&d| d as u64).collect();
        let labels: Vec<u64> = self.data.iter().copied().collect();
        let mut w = BufWriter::new(File::create(path)?);
        write_record(&mut w, &encode_u64s(&shape))?;
        write_record(&mut w, &encode_u64s(&labels))?;
        w.flush()?;
        Ok(())
    }
}

impl LabelVolume for InMemoryVolume {
    fn shape(&self) -> [usize; 3] {
        let s = self.data.shape();
        [s[0], s[1], s[2]]
    }

    fn read_region(&self, begin: [usize; 3], end: [usize; 3]) -> Result<Array3<u64>> {
        let shape = self.shape();
        if (0..3).any(|d| begin[d] > end[d] || end[d] > shape[d]) {
            return Err(Error::InconsistentShape(format!(
                "region {begin:?}..{end:?} outside of volume {shape:?}"
            )));
        }
        Ok(self
            .data
            .slice(s![begin[0]..end[0], begin[1]..end[1], begin[2]..end[2]])
            .to_owned())
    }
}
