//! Faces between adjoining blocks and label matching across them.

use std::collections::BTreeSet;

use ndarray::Axis;
use tracing::debug;

use crate::block::Block;
use crate::blocking::Blocking;
use crate::config::LabelOffsets;
use crate::error::{Error, Result};
use crate::volume::LabelVolume;

/// Pair of globally offset labels seen touching across a face, stored as
/// `(smaller, larger)`.
pub type FaceAssignment = (u64, u64);

/// Enumeration describing which axis a face is orthogonal to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FaceAxis {
    I,
    J,
    K,
}

impl FaceAxis {
    pub fn from_index(axis: usize) -> Option<Self> {
        match axis {
            0 => Some(FaceAxis::I),
            1 => Some(FaceAxis::J),
            2 => Some(FaceAxis::K),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            FaceAxis::I => 0,
            FaceAxis::J => 1,
            FaceAxis::K => 2,
        }
    }
}

/// Shared boundary of two blocks.
///
/// `block_a` is the block on the lower side of the face. `begin..end` spans
/// the two voxel layers touching the face: the last layer of `block_a` and
/// the first layer of `block_b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockFace {
    pub block_a: u64,
    pub block_b: u64,
    pub axis: FaceAxis,
    pub begin: [usize; 3],
    pub end: [usize; 3],
}

impl BlockFace {
    /// Face between `lower` and `upper`, where `upper` follows `lower` along
    /// exactly one axis.
    pub fn between(lower: &Block, upper: &Block) -> Result<Self> {
        let mut touching = None;
        for d in 0..3 {
            if lower.end[d] == upper.begin[d] {
                if touching.is_some() {
                    touching = None;
                    break;
                }
                touching = Some(d);
            }
        }
        let not_adjacent = || {
            Error::InvalidConfiguration(format!(
                "blocks {} and {} do not share a face",
                lower.id, upper.id
            ))
        };
        let axis = touching.ok_or_else(not_adjacent)?;
        if lower.end[axis] == 0 {
            return Err(not_adjacent());
        }

        let mut begin = [0usize; 3];
        let mut end = [0usize; 3];
        for d in 0..3 {
            if d == axis {
                begin[d] = lower.end[d] - 1;
                end[d] = upper.begin[d] + 1;
            } else {
                begin[d] = lower.begin[d].max(upper.begin[d]);
                end[d] = lower.end[d].min(upper.end[d]);
                if begin[d] >= end[d] {
                    return Err(not_adjacent());
                }
            }
        }
        Ok(Self {
            block_a: lower.id,
            block_b: upper.id,
            axis: FaceAxis::from_index(axis).ok_or_else(not_adjacent)?,
            begin,
            end,
        })
    }

    /// Number of voxel positions on one side of the face.
    pub fn area(&self) -> usize {
        (0..3)
            .filter(|&d| d != self.axis.index())
            .map(|d| self.end[d] - self.begin[d])
            .product()
    }
}

/// Label pairs touching across `face`, offset into the global label space.
///
/// Positions where either side is background (0) are ignored. The result is
/// sorted and free of duplicates; an empty vector means the two blocks share
/// no foreground contact.
pub fn match_face<V: LabelVolume + ?Sized>(
    volume: &V,
    face: &BlockFace,
    offsets: &LabelOffsets,
) -> Result<Vec<FaceAssignment>> {
    let off_a = offsets.offset(face.block_a)?;
    let off_b = offsets.offset(face.block_b)?;

    let slab = volume.read_region(face.begin, face.end)?;
    let expected: Vec<usize> = (0..3).map(|d| face.end[d] - face.begin[d]).collect();
    if slab.shape() != expected.as_slice() {
        return Err(Error::InconsistentShape(format!(
            "face {}|{}: read {:?}, expected {:?}",
            face.block_a,
            face.block_b,
            slab.shape(),
            expected
        )));
    }

    let axis = Axis(face.axis.index());
    let labels_a = slab.index_axis(axis, 0);
    let labels_b = slab.index_axis(axis, 1);
    if labels_a.shape() != labels_b.shape() || labels_a.is_empty() {
        return Err(Error::InconsistentShape(format!(
            "face slices {:?} and {:?} of blocks {} and {} differ",
            labels_a.shape(),
            labels_b.shape(),
            face.block_a,
            face.block_b
        )));
    }

    let mut pairs = BTreeSet::new();
    for (&la, &lb) in labels_a.iter().zip(labels_b.iter()) {
        if la == 0 || lb == 0 {
            continue;
        }
        let ga = offset_label(la, off_a, face.block_a)?;
        let gb = offset_label(lb, off_b, face.block_b)?;
        pairs.insert((ga.min(gb), ga.max(gb)));
    }
    debug!(
        block_a = face.block_a,
        block_b = face.block_b,
        n_pairs = pairs.len(),
        "matched face"
    );
    Ok(pairs.into_iter().collect())
}

/// Label pairs across the face shared by two blocks given in either order.
pub fn match_blocks<V: LabelVolume + ?Sized>(
    volume: &V,
    blocking: &Blocking,
    block_a: u64,
    block_b: u64,
    offsets: &LabelOffsets,
) -> Result<Vec<FaceAssignment>> {
    let a = blocking.block(block_a)?;
    let b = blocking.block(block_b)?;
    let face = if (0..3).any(|d| a.end[d] == b.begin[d]) {
        BlockFace::between(&a, &b)?
    } else {
        BlockFace::between(&b, &a)?
    };
    match_face(volume, &face, offsets)
}

fn offset_label(label: u64, offset: u64, block_id: u64) -> Result<u64> {
    label.checked_add(offset).ok_or_else(|| {
        Error::InconsistentShape(format!(
            "label {label} of block {block_id} overflows with offset {offset}"
        ))
    })
}
