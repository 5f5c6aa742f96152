//! Regular block decomposition of a volume.
//!
//! The grid is anchored at the volume origin. Block ids enumerate grid
//! positions in C order (last axis fastest), so they depend only on the
//! volume shape and the block shape. Boundary blocks are clipped to the volume.

use std::collections::BTreeSet;

use crate::block::Block;
use crate::error::{Error, Result};
use crate::face::BlockFace;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blocking {
    shape: [usize; 3],
    block_shape: [usize; 3],
    blocks_per_axis: [usize; 3],
}

impl Blocking {
    pub fn new(shape: [usize; 3], block_shape: [usize; 3]) -> Result<Self> {
        if block_shape.iter().any(|&b| b == 0) {
            return Err(Error::InvalidConfiguration(format!(
                "block shape {block_shape:?} has a non-positive dimension"
            )));
        }
        if shape.iter().any(|&s| s == 0) {
            return Err(Error::InvalidConfiguration(format!(
                "volume shape {shape:?} is empty"
            )));
        }
        let mut blocks_per_axis = [0usize; 3];
        for d in 0..3 {
            blocks_per_axis[d] = shape[d].div_ceil(block_shape[d]);
        }
        Ok(Self {
            shape,
            block_shape,
            blocks_per_axis,
        })
    }

    /// Grid for hierarchy level `scale`: block shape is `initial * 2^scale`.
    pub fn at_scale(shape: [usize; 3], initial_block_shape: [usize; 3], scale: u32) -> Result<Self> {
        Self::new(shape, scaled_block_shape(initial_block_shape, scale)?)
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn block_shape(&self) -> [usize; 3] {
        self.block_shape
    }

    pub fn blocks_per_axis(&self) -> [usize; 3] {
        self.blocks_per_axis
    }

    pub fn n_blocks(&self) -> usize {
        self.blocks_per_axis.iter().product()
    }

    pub fn block_position(&self, block_id: u64) -> Result<[usize; 3]> {
        let id = block_id as usize;
        if id >= self.n_blocks() {
            return Err(Error::InvalidConfiguration(format!(
                "block id {block_id} outside of grid with {} blocks",
                self.n_blocks()
            )));
        }
        let [_, n1, n2] = self.blocks_per_axis;
        Ok([id / (n1 * n2), (id / n2) % n1, id % n2])
    }

    pub fn block_id(&self, position: [usize; 3]) -> u64 {
        let [_, n1, n2] = self.blocks_per_axis;
        ((position[0] * n1 + position[1]) * n2 + position[2]) as u64
    }

    pub fn block(&self, block_id: u64) -> Result<Block> {
        let pos = self.block_position(block_id)?;
        let mut begin = [0usize; 3];
        let mut end = [0usize; 3];
        for d in 0..3 {
            begin[d] = pos[d] * self.block_shape[d];
            end[d] = (begin[d] + self.block_shape[d]).min(self.shape[d]);
        }
        Ok(Block::new(block_id, begin, end))
    }

    /// Every block of the grid, in id order.
    pub fn blocks(&self) -> Vec<Block> {
        (0..self.n_blocks() as u64)
            .filter_map(|id| self.block(id).ok())
            .collect()
    }

    /// Blocks that intersect the region of interest, in id order.
    pub fn blocks_in_roi(&self, roi_begin: [usize; 3], roi_end: [usize; 3]) -> Result<Vec<Block>> {
        for d in 0..3 {
            if roi_begin[d] >= roi_end[d] || roi_end[d] > self.shape[d] {
                return Err(Error::InvalidConfiguration(format!(
                    "roi {roi_begin:?}..{roi_end:?} is empty or outside of volume {:?}",
                    self.shape
                )));
            }
        }
        Ok(self
            .blocks()
            .into_iter()
            .filter(|b| b.intersect(roi_begin, roi_end).is_some())
            .collect())
    }

    /// Neighbouring block along `axis`, either below (`lower`) or above.
    pub fn neighbor(&self, block_id: u64, axis: usize, lower: bool) -> Option<u64> {
        let mut pos = self.block_position(block_id).ok()?;
        if lower {
            pos[axis] = pos[axis].checked_sub(1)?;
        } else {
            pos[axis] += 1;
            if pos[axis] >= self.blocks_per_axis[axis] {
                return None;
            }
        }
        Some(self.block_id(pos))
    }

    /// Faces shared by `block_id` and its neighbours.
    ///
    /// With `only_lower` only the faces towards lower neighbours are returned,
    /// so iterating over all blocks visits every face exactly once. Faces
    /// touching a block in `empty_blocks` are skipped.
    pub fn faces(
        &self,
        block_id: u64,
        only_lower: bool,
        empty_blocks: &BTreeSet<u64>,
    ) -> Result<Vec<BlockFace>> {
        let block = self.block(block_id)?;
        let mut faces = Vec::new();
        for axis in 0..3 {
            let directions: &[bool] = if only_lower { &[true] } else { &[true, false] };
            for &lower in directions {
                let Some(other_id) = self.neighbor(block_id, axis, lower) else {
                    continue;
                };
                if empty_blocks.contains(&other_id) {
                    continue;
                }
                let other = self.block(other_id)?;
                let face = if lower {
                    BlockFace::between(&other, &block)?
                } else {
                    BlockFace::between(&block, &other)?
                };
                faces.push(face);
            }
        }
        Ok(faces)
    }

    /// Ids of the blocks of `fine` nested inside `block` of this grid.
    ///
    /// Both grids must share the volume shape and this grid's block shape must
    /// be an integer multiple of the fine one.
    pub fn nested_block_ids(&self, block_id: u64, fine: &Blocking) -> Result<Vec<u64>> {
        let mut factor = [0usize; 3];
        for d in 0..3 {
            if self.shape[d] != fine.shape[d] || self.block_shape[d] % fine.block_shape[d] != 0 {
                return Err(Error::InvalidConfiguration(format!(
                    "block shape {:?} is not a multiple of {:?}",
                    self.block_shape, fine.block_shape
                )));
            }
            factor[d] = self.block_shape[d] / fine.block_shape[d];
        }
        let pos = self.block_position(block_id)?;
        let range = |d: usize| {
            let start = pos[d] * factor[d];
            start..((pos[d] + 1) * factor[d]).min(fine.blocks_per_axis[d])
        };
        let mut ids = Vec::new();
        for p0 in range(0) {
            for p1 in range(1) {
                for p2 in range(2) {
                    ids.push(fine.block_id([p0, p1, p2]));
                }
            }
        }
        Ok(ids)
    }
}

/// `initial * 2^scale`, component-wise.
pub fn scaled_block_shape(initial_block_shape: [usize; 3], scale: u32) -> Result<[usize; 3]> {
    let factor = 1usize.checked_shl(scale).ok_or_else(|| {
        Error::InvalidConfiguration(format!("scale {scale} is too large"))
    })?;
    let mut shape = [0usize; 3];
    for d in 0..3 {
        shape[d] = initial_block_shape[d].checked_mul(factor).ok_or_else(|| {
            Error::InvalidConfiguration(format!("scale {scale} overflows block shape"))
        })?;
    }
    Ok(shape)
}

/// Ordered block descriptors tiling the volume, or only the blocks touching
/// the region of interest when one is given.
pub fn blocks(
    volume_shape: [usize; 3],
    block_shape: [usize; 3],
    roi_begin: Option<[usize; 3]>,
    roi_end: Option<[usize; 3]>,
) -> Result<Vec<Block>> {
    let blocking = Blocking::new(volume_shape, block_shape)?;
    match (roi_begin, roi_end) {
        (None, None) => Ok(blocking.blocks()),
        (begin, end) => {
            blocking.blocks_in_roi(begin.unwrap_or([0; 3]), end.unwrap_or(volume_shape))
        }
    }
}
