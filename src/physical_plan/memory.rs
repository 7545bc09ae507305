//! An in-memory [`DatasetReader`] over row-major Arrow arrays.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, UInt64Array};
use datafusion::common::{DataFusionError, Result};

use super::reader::{DatasetHandle, DatasetReader};
use crate::types::DatasetDescriptor;

/// Counters of the sessions and reads served by a [`MemoryDatasetReader`].
#[derive(Debug, Default)]
pub struct ReaderStats {
    opens: AtomicUsize,
    reads: AtomicUsize,
    closes: AtomicUsize,
}

impl ReaderStats {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Serves datasets from memory, keyed by file id and object path.
#[derive(Debug, Default)]
pub struct MemoryDatasetReader {
    datasets: HashMap<(i64, String), ArrayRef>,
    stats: Arc<ReaderStats>,
    fail_reads: bool,
}

impl MemoryDatasetReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the flattened, row-major contents of `dataset`.
    pub fn with_dataset(mut self, dataset: &DatasetDescriptor, values: ArrayRef) -> Self {
        self.datasets
            .insert((dataset.file_id, dataset.real_path.clone()), values);
        self
    }

    /// Makes every read fail after the session has been opened.
    pub fn with_failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }
}

impl DatasetReader for MemoryDatasetReader {
    fn open(&self, dataset: &DatasetDescriptor) -> Result<Box<dyn DatasetHandle>> {
        let values = self
            .datasets
            .get(&(dataset.file_id, dataset.real_path.clone()))
            .ok_or_else(|| {
                DataFusionError::Execution(format!(
                    "dataset {} not found in file {}",
                    dataset.real_path, dataset.file_id
                ))
            })?;
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryDatasetHandle {
            values: values.clone(),
            dimensions: dataset.dimensions.clone(),
            stats: self.stats.clone(),
            fail_reads: self.fail_reads,
        }))
    }
}

struct MemoryDatasetHandle {
    values: ArrayRef,
    dimensions: Vec<u64>,
    stats: Arc<ReaderStats>,
    fail_reads: bool,
}

impl MemoryDatasetHandle {
    fn begin_read(&self) -> Result<()> {
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(DataFusionError::Execution(
                "injected read failure".to_string(),
            ));
        }
        Ok(())
    }
}

impl DatasetHandle for MemoryDatasetHandle {
    fn read_all(&mut self) -> Result<ArrayRef> {
        self.begin_read()?;
        Ok(self.values.clone())
    }

    fn read_from(&mut self, offset: u64, count: u64) -> Result<ArrayRef> {
        self.begin_read()?;
        let len = self.values.len() as u64;
        if offset.saturating_add(count) > len {
            return Err(DataFusionError::Execution(format!(
                "read of {count} elements at {offset} exceeds dataset length {len}"
            )));
        }
        Ok(self.values.slice(offset as usize, count as usize))
    }

    fn read_block(&mut self, shape: &[u64], offset: &[u64]) -> Result<ArrayRef> {
        self.begin_read()?;
        let positions = block_positions(&self.dimensions, shape, offset)?;
        Ok(arrow::compute::take(
            self.values.as_ref(),
            &UInt64Array::from(positions),
            None,
        )?)
    }

    fn close(&mut self) -> Result<()> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Row-major linear positions of every element in a block, truncated at the
/// end of each axis.
fn block_positions(dimensions: &[u64], shape: &[u64], offset: &[u64]) -> Result<Vec<u64>> {
    if shape.len() != dimensions.len() || offset.len() != dimensions.len() {
        return Err(DataFusionError::Execution(format!(
            "block rank does not match dataset rank {}",
            dimensions.len()
        )));
    }
    let extents: Vec<u64> = dimensions
        .iter()
        .zip(shape)
        .zip(offset)
        .map(|((&dim, &s), &o)| s.min(dim.saturating_sub(o)))
        .collect();
    let total: u64 = extents.iter().product();
    let mut positions = Vec::with_capacity(total as usize);
    if total == 0 {
        return Ok(positions);
    }

    let mut coordinate = vec![0u64; extents.len()];
    loop {
        let linear = (0..dimensions.len()).fold(0, |acc, axis| {
            acc * dimensions[axis] + offset[axis] + coordinate[axis]
        });
        positions.push(linear);

        let mut axis = extents.len();
        loop {
            if axis == 0 {
                return Ok(positions);
            }
            axis -= 1;
            coordinate[axis] += 1;
            if coordinate[axis] < extents[axis] {
                break;
            }
            coordinate[axis] = 0;
        }
    }
}
