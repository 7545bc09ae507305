//! Metadata-only scans of the reserved catalog paths.
//!
//! A catalog scan never opens the dataset. It turns the descriptor itself
//! into exactly one row, whatever columns are requested.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, ListArray, RecordBatch, RecordBatchOptions, StringArray};
use arrow::datatypes::{DataType, Field, Int64Type};
use datafusion::common::Result;

use super::{catalog_schema, to_int64};
use crate::types::{CatalogKind, DatasetDescriptor};

/// A column exposed by one or more catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogField {
    FileId,
    FilePath,
    FileSize,
    DatasetPath,
    ObjectPath,
    AttributeName,
    ElementType,
    Dimensions,
    ElementCount,
}

const FILE_FIELDS: [CatalogField; 3] = [
    CatalogField::FileId,
    CatalogField::FilePath,
    CatalogField::FileSize,
];

const DATASET_FIELDS: [CatalogField; 5] = [
    CatalogField::FileId,
    CatalogField::DatasetPath,
    CatalogField::ElementType,
    CatalogField::Dimensions,
    CatalogField::ElementCount,
];

const ATTRIBUTE_FIELDS: [CatalogField; 5] = [
    CatalogField::FileId,
    CatalogField::ObjectPath,
    CatalogField::AttributeName,
    CatalogField::ElementType,
    CatalogField::Dimensions,
];

impl CatalogField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FileId => "FileID",
            Self::FilePath => "FilePath",
            Self::FileSize => "FileSize",
            Self::DatasetPath => "DatasetPath",
            Self::ObjectPath => "ObjectPath",
            Self::AttributeName => "AttributeName",
            Self::ElementType => "ElementType",
            Self::Dimensions => "Dimensions",
            Self::ElementCount => "ElementCount",
        }
    }

    pub fn field(&self) -> Field {
        match self {
            Self::FileId | Self::FileSize | Self::ElementCount => {
                Field::new(self.name(), DataType::Int64, false)
            }
            Self::FilePath | Self::DatasetPath | Self::ObjectPath | Self::ElementType => {
                Field::new(self.name(), DataType::Utf8, false)
            }
            Self::AttributeName => Field::new(self.name(), DataType::Utf8, true),
            Self::Dimensions => Field::new(
                self.name(),
                DataType::List(Arc::new(Field::new("item", DataType::Int64, true))),
                false,
            ),
        }
    }

    /// All fields of a catalog in their fixed output order.
    pub fn defaults(kind: CatalogKind) -> &'static [CatalogField] {
        match kind {
            CatalogKind::Files => &FILE_FIELDS,
            CatalogKind::Datasets => &DATASET_FIELDS,
            CatalogKind::Attributes => &ATTRIBUTE_FIELDS,
        }
    }

    /// Resolves requested names against the fields of `kind`.
    ///
    /// Names the catalog does not expose are dropped; an empty request
    /// yields every field.
    pub fn resolve<S: AsRef<str>>(kind: CatalogKind, requested: &[S]) -> Vec<CatalogField> {
        let available = Self::defaults(kind);
        if requested.is_empty() {
            return available.to_vec();
        }
        let mut fields = Vec::with_capacity(requested.len());
        for name in requested {
            let name = name.as_ref();
            match available.iter().find(|f| f.name() == name) {
                Some(field) if !fields.contains(field) => fields.push(*field),
                Some(_) => {}
                None => log::trace!("Catalog {:?} has no column {:?}", kind, name),
            }
        }
        fields
    }

    fn value(&self, dataset: &DatasetDescriptor) -> Result<ArrayRef> {
        let array: ArrayRef = match self {
            Self::FileId => Arc::new(Int64Array::from(vec![dataset.file_id])),
            Self::FilePath => Arc::new(StringArray::from(vec![dataset.file_name.as_str()])),
            Self::FileSize => Arc::new(Int64Array::from(vec![to_int64(
                dataset.file_size,
                "file size",
            )?])),
            Self::DatasetPath | Self::ObjectPath => {
                Arc::new(StringArray::from(vec![dataset.real_path.as_str()]))
            }
            Self::AttributeName => Arc::new(StringArray::from(vec![dataset
                .attribute_name
                .as_deref()])),
            Self::ElementType => Arc::new(StringArray::from(vec![dataset.element_type_name()])),
            Self::Dimensions => {
                let dimensions = dataset
                    .dimensions
                    .iter()
                    .map(|d| to_int64(*d, "dimension").map(Some))
                    .collect::<Result<Vec<_>>>()?;
                Arc::new(ListArray::from_iter_primitive::<Int64Type, _, _>(vec![
                    Some(dimensions),
                ]))
            }
            Self::ElementCount => Arc::new(Int64Array::from(vec![to_int64(
                dataset.element_count,
                "element count",
            )?])),
        };
        Ok(array)
    }
}

/// Builds the single catalog row describing `dataset`.
pub fn scan_catalog<S: AsRef<str>>(
    kind: CatalogKind,
    dataset: &DatasetDescriptor,
    requested: &[S],
) -> Result<RecordBatch> {
    let fields = CatalogField::resolve(kind, requested);
    log::debug!(
        "Catalog scan {:?} for file {} with columns {:?}",
        kind,
        dataset.file_id,
        fields
    );
    let columns = fields
        .iter()
        .map(|f| f.value(dataset))
        .collect::<Result<Vec<_>>>()?;
    let options = RecordBatchOptions::new().with_row_count(Some(1));
    Ok(RecordBatch::try_new_with_options(
        catalog_schema(&fields),
        columns,
        &options,
    )?)
}
