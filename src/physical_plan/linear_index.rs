//! Mapping of positions inside a read block back to linear dataset indices.
//!
//! Datasets are stored row-major: the outermost axis varies slowest. A block
//! read returns its elements row-major over the block itself, so element `n`
//! of a block sits at some coordinate inside the block that has to be
//! recombined with the block offset and the full dataset extents.
//!
//! The final block along an axis may be shorter than the configured block
//! shape. Its effective extent ("edge span") is whatever remains of the axis
//! past the block offset.

use datafusion::common::{DataFusionError, Result};

/// Effective extent of a block along one axis.
///
/// A block is full when it fits inside the axis. Otherwise it is an edge
/// block and spans whatever remains past `offset`, whether or not `offset`
/// is a multiple of `shape`.
pub fn edge_span(dimension: u64, shape: u64, offset: u64) -> u64 {
    shape.min(dimension.saturating_sub(offset))
}

/// Row-major strides for `extents`: the product of every later extent.
fn row_major_strides(extents: &[u64]) -> Vec<u64> {
    let mut strides = vec![1u64; extents.len()];
    for axis in (0..extents.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * extents[axis + 1];
    }
    strides
}

/// Converts local positions within one block into global linear indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIndexMapper {
    block_offset: Vec<u64>,
    edge_span: Vec<u64>,
    local_strides: Vec<u64>,
    global_strides: Vec<u64>,
}

impl BlockIndexMapper {
    pub fn try_new(dimensions: &[u64], block_shape: &[u64], block_offset: &[u64]) -> Result<Self> {
        if block_shape.len() != dimensions.len() || block_offset.len() != dimensions.len() {
            return Err(DataFusionError::Plan(format!(
                "block shape {:?} and offset {:?} must have one entry per axis of {:?}",
                block_shape, block_offset, dimensions
            )));
        }
        if let Some(axis) = block_shape.iter().position(|&s| s == 0) {
            return Err(DataFusionError::Plan(format!(
                "block shape {:?} has an empty axis {}",
                block_shape, axis
            )));
        }

        let edge_span: Vec<u64> = dimensions
            .iter()
            .zip(block_shape)
            .zip(block_offset)
            .map(|((&dim, &shape), &offset)| edge_span(dim, shape, offset))
            .collect();

        Ok(Self {
            block_offset: block_offset.to_vec(),
            local_strides: row_major_strides(&edge_span),
            global_strides: row_major_strides(dimensions),
            edge_span,
        })
    }

    /// Effective extent of the block along each axis.
    pub fn edge_span(&self) -> &[u64] {
        &self.edge_span
    }

    /// Number of elements in the block once edge spans are applied.
    pub fn block_len(&self) -> u64 {
        self.edge_span.iter().product()
    }

    /// Linear index in the full dataset of the `local`-th element of the block.
    ///
    /// For two axes this is
    /// `(offset[0] + local / span[1]) * dims[1] + offset[1] + local % span[1]`.
    /// The outermost coordinate is not wrapped, so positions past the end of
    /// the block keep counting rows.
    pub fn global_index(&self, local: u64) -> u64 {
        let mut global = 0;
        for axis in 0..self.edge_span.len() {
            let mut coordinate = local / self.local_strides[axis];
            if axis > 0 {
                coordinate %= self.edge_span[axis];
            }
            global += (self.block_offset[axis] + coordinate) * self.global_strides[axis];
        }
        global
    }

    /// Linear indices for local positions `0..count`.
    ///
    /// A block that lies entirely outside the dataset yields nothing.
    pub fn global_indices(&self, count: u64) -> impl Iterator<Item = u64> + '_ {
        let count = if self.block_len() == 0 { 0 } else { count };
        (0..count).map(move |local| self.global_index(local))
    }
}
