//! Execution of a single [`ScanItem`] into a [`RecordBatch`].

use std::sync::Arc;

use arrow::array::{
    new_empty_array, Array, ArrayRef, Int64Array, RecordBatch, RecordBatchOptions,
};
use datafusion::common::{DataFusionError, Result};

use super::catalog::scan_catalog;
use super::{data_schema, to_int64};
use super::linear_index::BlockIndexMapper;
use super::projection::{DataColumn, ResolvedProjection};
use super::reader::{DatasetReader, OpenDataset};
use crate::config::ScanConfig;
use crate::types::{DatasetDescriptor, ScanItem};

/// Turns scan items into rows of `FileID`, `Index` and `Value`, or into a
/// catalog row for the reserved catalog paths.
///
/// The executor holds no per-scan state and can be shared by any number of
/// concurrent partitions. Each call opens its own dataset session and closes
/// it before returning, on success and on failure alike.
#[derive(Debug, Clone)]
pub struct ScanExecutor {
    reader: Arc<dyn DatasetReader>,
    strict_value_type: bool,
}

impl ScanExecutor {
    pub fn new(reader: Arc<dyn DatasetReader>) -> Self {
        Self {
            reader,
            strict_value_type: false,
        }
    }

    pub fn with_config(mut self, config: &ScanConfig) -> Self {
        self.strict_value_type = config.strict_value_type;
        self
    }

    /// Executes `item`, returning all of its rows.
    pub fn execute(&self, item: &ScanItem) -> Result<RecordBatch> {
        log::debug!("Executing scan item {}", item);
        let dataset = item.dataset();
        match item {
            ScanItem::Unbounded { columns, .. } => match dataset.catalog() {
                Some(kind) => scan_catalog(kind, dataset, columns.as_slice()),
                None => self.scan_all(dataset, columns),
            },
            ScanItem::Bounded {
                chunk_size,
                offset,
                columns,
                ..
            } => {
                reject_catalog(item)?;
                self.scan_run(dataset, *offset, *chunk_size, columns)
            }
            ScanItem::BoundedMultiDimensional {
                block_shape,
                block_offset,
                columns,
                ..
            } => {
                reject_catalog(item)?;
                self.scan_block(dataset, block_shape, block_offset, columns)
            }
        }
    }

    fn scan_all(&self, dataset: &DatasetDescriptor, columns: &[String]) -> Result<RecordBatch> {
        let projection = ResolvedProjection::resolve(columns);
        if !projection.wants_value() {
            let count = to_int64(dataset.element_count, "element count")?;
            let indices = Int64Array::from_iter_values(0..count);
            return self.build_batch(dataset, &projection, indices, None);
        }

        let values = self.read(dataset, |session| session.read_all())?;
        let indices = Int64Array::from_iter_values(0..values.len() as i64);
        self.build_batch(dataset, &projection, indices, Some(values))
    }

    fn scan_run(
        &self,
        dataset: &DatasetDescriptor,
        offset: u64,
        chunk_size: u64,
        columns: &[String],
    ) -> Result<RecordBatch> {
        let projection = ResolvedProjection::resolve(columns);
        let count = chunk_size.min(dataset.element_count.saturating_sub(offset));
        let start = to_int64(offset, "offset")?;
        // Every index of the run stays below the element count.
        to_int64(dataset.element_count, "element count")?;
        if !projection.wants_value() {
            let indices = Int64Array::from_iter_values(start..start + count as i64);
            return self.build_batch(dataset, &projection, indices, None);
        }

        let values = self.read(dataset, |session| session.read_from(offset, count))?;
        let indices = Int64Array::from_iter_values(start..start + values.len() as i64);
        self.build_batch(dataset, &projection, indices, Some(values))
    }

    fn scan_block(
        &self,
        dataset: &DatasetDescriptor,
        block_shape: &[u64],
        block_offset: &[u64],
        columns: &[String],
    ) -> Result<RecordBatch> {
        let projection = ResolvedProjection::resolve(columns);
        let mapper = BlockIndexMapper::try_new(&dataset.dimensions, block_shape, block_offset)?;
        to_int64(dataset.element_count, "element count")?;
        if mapper.block_len() == 0 {
            log::debug!("Block at {:?} lies outside {}", block_offset, dataset.real_path);
            let values = projection
                .wants_value()
                .then(|| new_empty_array(&dataset.value_type));
            let indices = Int64Array::from(Vec::<i64>::new());
            return self.build_batch(dataset, &projection, indices, values);
        }
        if !projection.wants_value() {
            let indices = Int64Array::from_iter_values(
                mapper.global_indices(mapper.block_len()).map(|i| i as i64),
            );
            return self.build_batch(dataset, &projection, indices, None);
        }

        let values = self.read(dataset, |session| {
            session.read_block(block_shape, block_offset)
        })?;
        let indices = Int64Array::from_iter_values(
            mapper
                .global_indices(values.len() as u64)
                .map(|i| i as i64),
        );
        self.build_batch(dataset, &projection, indices, Some(values))
    }

    /// Runs `read` inside a dataset session that is closed on every path.
    fn read<F>(&self, dataset: &DatasetDescriptor, read: F) -> Result<ArrayRef>
    where
        F: FnOnce(&mut OpenDataset) -> Result<ArrayRef>,
    {
        let mut session = OpenDataset::open(self.reader.as_ref(), dataset)?;
        let values = read(&mut session)?;
        session.close()?;
        log::trace!(
            "Read {} elements from {}:{}",
            values.len(),
            dataset.file_id,
            dataset.real_path
        );
        self.reconcile_value_type(dataset, values)
    }

    fn reconcile_value_type(
        &self,
        dataset: &DatasetDescriptor,
        values: ArrayRef,
    ) -> Result<ArrayRef> {
        if values.data_type() == &dataset.value_type {
            return Ok(values);
        }
        if self.strict_value_type {
            return Err(DataFusionError::Plan(format!(
                "dataset {} returned {} values, expected {}",
                dataset.real_path,
                values.data_type(),
                dataset.value_type
            )));
        }
        log::debug!(
            "Casting {} values of {} to {}",
            values.data_type(),
            dataset.real_path,
            dataset.value_type
        );
        Ok(arrow::compute::cast(values.as_ref(), &dataset.value_type)?)
    }

    fn build_batch(
        &self,
        dataset: &DatasetDescriptor,
        projection: &ResolvedProjection,
        indices: Int64Array,
        values: Option<ArrayRef>,
    ) -> Result<RecordBatch> {
        let num_rows = indices.len();
        let indices: ArrayRef = Arc::new(indices);
        let columns = projection
            .columns()
            .iter()
            .map(|column| match column {
                DataColumn::FileId => {
                    Ok(Arc::new(Int64Array::from_value(dataset.file_id, num_rows)) as ArrayRef)
                }
                DataColumn::Index => Ok(indices.clone()),
                DataColumn::Value => values.clone().ok_or_else(|| {
                    DataFusionError::Internal("Value column requested without a read".to_string())
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        let schema = data_schema(&dataset.value_type, projection.columns());
        let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
        Ok(RecordBatch::try_new_with_options(schema, columns, &options)?)
    }
}

fn reject_catalog(item: &ScanItem) -> Result<()> {
    match item.dataset().catalog() {
        Some(kind) => Err(DataFusionError::Plan(format!(
            "catalog {:?} only supports unbounded scans, got {}",
            kind, item
        ))),
        None => Ok(()),
    }
}
