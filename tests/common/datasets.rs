use std::sync::Arc;

use datafusion::arrow::array::{ArrayRef, Float64Array, Int8Array};
use datafusion::arrow::datatypes::DataType;
use datafusion_array_provider::physical_plan::memory::MemoryDatasetReader;
use datafusion_array_provider::types::{DatasetDescriptor, ScanItem};

pub const BYTES: [i8; 10] = [-128, -2, -1, 0, 1, 2, 3, 4, 5, 127];

/// A one dimensional dataset of ten signed bytes.
pub fn byte_dataset() -> Arc<DatasetDescriptor> {
    Arc::new(
        DatasetDescriptor::new(
            0,
            "/data/sample.h5",
            "/multi/bytes",
            "int8(signed, 1 byte)",
            DataType::Int8,
            vec![10],
        )
        .with_file_size(2048),
    )
}

/// A 5x7 matrix whose value at linear index `i` is `i / 4`.
pub fn matrix_dataset() -> Arc<DatasetDescriptor> {
    Arc::new(
        DatasetDescriptor::new(
            1,
            "/data/grid.h5",
            "/grid/temperature",
            "float64(IEEE, 8 bytes)",
            DataType::Float64,
            vec![5, 7],
        )
        .with_file_size(4096)
        .with_attribute_name("units"),
    )
}

pub fn reader() -> Arc<MemoryDatasetReader> {
    let bytes: ArrayRef = Arc::new(Int8Array::from(BYTES.to_vec()));
    let matrix: ArrayRef = Arc::new(Float64Array::from_iter_values(
        (0..35).map(|i| i as f64 / 4.0),
    ));
    Arc::new(
        MemoryDatasetReader::new()
            .with_dataset(&byte_dataset(), bytes)
            .with_dataset(&matrix_dataset(), matrix),
    )
}

pub fn unbounded(dataset: &Arc<DatasetDescriptor>) -> ScanItem {
    ScanItem::Unbounded {
        dataset: dataset.clone(),
        chunk_size: dataset.element_count,
        columns: vec![],
    }
}

/// Splits `[0, element_count)` into runs of `chunk_size`.
pub fn runs(dataset: &Arc<DatasetDescriptor>, chunk_size: u64) -> Vec<ScanItem> {
    (0..dataset.element_count)
        .step_by(chunk_size as usize)
        .map(|offset| ScanItem::Bounded {
            dataset: dataset.clone(),
            chunk_size,
            offset,
            columns: vec![],
        })
        .collect()
}

/// Tiles a two dimensional dataset with blocks of `shape`.
pub fn blocks(dataset: &Arc<DatasetDescriptor>, shape: [u64; 2]) -> Vec<ScanItem> {
    let mut items = Vec::new();
    for row in (0..dataset.dimensions[0]).step_by(shape[0] as usize) {
        for col in (0..dataset.dimensions[1]).step_by(shape[1] as usize) {
            items.push(ScanItem::BoundedMultiDimensional {
                dataset: dataset.clone(),
                chunk_size: shape[0] * shape[1],
                block_shape: shape.to_vec(),
                block_offset: vec![row, col],
                columns: vec![],
            });
        }
    }
    items
}
