//! Ground-truth edge labels derived from node overlaps.

use crate::error::{Error, Result};

/// Label of an edge whose endpoints touch background in the ground truth.
pub const IGNORE_EDGE: i8 = -1;

/// Per-edge labels from a node to ground-truth label mapping.
///
/// An edge is 1 when its endpoints map to different ground-truth labels and 0
/// otherwise. With `ignore_background`, edges with an endpoint mapped to label
/// 0 get [`IGNORE_EDGE`].
pub fn edge_labels(node_labels: &[u64], uv_ids: &[(u64, u64)], ignore_background: bool) -> Result<Vec<i8>> {
    let lookup = |node: u64| {
        node_labels.get(node as usize).copied().ok_or_else(|| {
            Error::InconsistentShape(format!(
                "node {node} has no overlap label ({} labels)",
                node_labels.len()
            ))
        })
    };
    uv_ids
        .iter()
        .map(|&(u, v)| {
            let lu = lookup(u)?;
            let lv = lookup(v)?;
            Ok(if ignore_background && (lu == 0 || lv == 0) {
                IGNORE_EDGE
            } else {
                i8::from(lu != lv)
            })
        })
        .collect()
}
