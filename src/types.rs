//! Common type definitions used throughout the crate.

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::DataType;

/// Reserved path that lists the files taking part in a scan.
pub const FILE_CATALOG_PATH: &str = "catalog://files";
/// Reserved path that lists the datasets found in a file.
pub const DATASET_CATALOG_PATH: &str = "catalog://datasets";
/// Reserved path that lists the attributes attached to objects in a file.
pub const ATTRIBUTE_CATALOG_PATH: &str = "catalog://attributes";

/// The three metadata-only listings addressable through a reserved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Files,
    Datasets,
    Attributes,
}

impl CatalogKind {
    /// Maps a descriptor path onto a catalog, if the path is one of the reserved tags.
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            FILE_CATALOG_PATH => Some(Self::Files),
            DATASET_CATALOG_PATH => Some(Self::Datasets),
            ATTRIBUTE_CATALOG_PATH => Some(Self::Attributes),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Files => FILE_CATALOG_PATH,
            Self::Datasets => DATASET_CATALOG_PATH,
            Self::Attributes => ATTRIBUTE_CATALOG_PATH,
        }
    }
}

/// Static metadata about one array-like object inside a file.
///
/// Descriptors are produced by schema discovery upstream of this crate and
/// are only ever read here. `element_count` equals the product of
/// `dimensions` whenever `dimensions` is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescriptor {
    /// Identifier of the file within the scanned file set.
    pub file_id: i64,
    /// Path of the file on disk.
    pub file_name: String,
    /// Size of the file in bytes.
    pub file_size: u64,
    /// Logical path of the object inside the file.
    pub real_path: String,
    /// Either `real_path` or one of the reserved catalog paths.
    pub path: String,
    /// Native element type label, e.g. `int8(signed, 1 byte)`.
    pub element_type: String,
    /// Arrow type used for the `Value` column.
    pub value_type: DataType,
    /// Extent of each axis, outermost first.
    pub dimensions: Vec<u64>,
    pub element_count: u64,
    pub attribute_name: Option<String>,
}

impl DatasetDescriptor {
    /// Creates a descriptor for a real dataset. `element_count` is derived
    /// from `dimensions`.
    pub fn new(
        file_id: i64,
        file_name: impl Into<String>,
        real_path: impl Into<String>,
        element_type: impl Into<String>,
        value_type: DataType,
        dimensions: Vec<u64>,
    ) -> Self {
        let real_path = real_path.into();
        let element_count = dimensions.iter().product();
        Self {
            file_id,
            file_name: file_name.into(),
            file_size: 0,
            path: real_path.clone(),
            real_path,
            element_type: element_type.into(),
            value_type,
            dimensions,
            element_count,
            attribute_name: None,
        }
    }

    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }

    pub fn with_attribute_name(mut self, attribute_name: impl Into<String>) -> Self {
        self.attribute_name = Some(attribute_name.into());
        self
    }

    /// Re-targets this descriptor at one of the virtual catalogs, keeping
    /// every other field so the catalog row can describe it.
    pub fn as_catalog(mut self, kind: CatalogKind) -> Self {
        self.path = kind.path().to_string();
        self
    }

    /// Returns the catalog this descriptor addresses, or `None` for real data.
    pub fn catalog(&self) -> Option<CatalogKind> {
        CatalogKind::from_path(&self.path)
    }

    /// The element type label up to, but not including, its first `(`.
    pub fn element_type_name(&self) -> &str {
        match self.element_type.find('(') {
            Some(pos) => &self.element_type[..pos],
            None => &self.element_type,
        }
    }
}

/// One unit of scan work, built by an upstream planner and consumed once.
///
/// `chunk_size` is advisory for full scans and is the element count of a
/// [`ScanItem::Bounded`] run. An empty `columns` list asks for the default
/// columns.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanItem {
    /// The whole dataset.
    Unbounded {
        dataset: Arc<DatasetDescriptor>,
        chunk_size: u64,
        columns: Vec<String>,
    },
    /// A contiguous run of `chunk_size` elements starting at linear `offset`.
    Bounded {
        dataset: Arc<DatasetDescriptor>,
        chunk_size: u64,
        offset: u64,
        columns: Vec<String>,
    },
    /// One rectangular block. `block_shape` and `block_offset` have one entry
    /// per axis of the dataset.
    BoundedMultiDimensional {
        dataset: Arc<DatasetDescriptor>,
        chunk_size: u64,
        block_shape: Vec<u64>,
        block_offset: Vec<u64>,
        columns: Vec<String>,
    },
}

impl ScanItem {
    pub fn dataset(&self) -> &Arc<DatasetDescriptor> {
        match self {
            ScanItem::Unbounded { dataset, .. }
            | ScanItem::Bounded { dataset, .. }
            | ScanItem::BoundedMultiDimensional { dataset, .. } => dataset,
        }
    }

    pub fn chunk_size(&self) -> u64 {
        match self {
            ScanItem::Unbounded { chunk_size, .. }
            | ScanItem::Bounded { chunk_size, .. }
            | ScanItem::BoundedMultiDimensional { chunk_size, .. } => *chunk_size,
        }
    }

    pub fn columns(&self) -> &[String] {
        match self {
            ScanItem::Unbounded { columns, .. }
            | ScanItem::Bounded { columns, .. }
            | ScanItem::BoundedMultiDimensional { columns, .. } => columns,
        }
    }

    /// Returns the same item asking for a different set of output columns.
    pub fn with_columns(self, new_columns: Vec<String>) -> Self {
        match self {
            ScanItem::Unbounded {
                dataset,
                chunk_size,
                ..
            } => ScanItem::Unbounded {
                dataset,
                chunk_size,
                columns: new_columns,
            },
            ScanItem::Bounded {
                dataset,
                chunk_size,
                offset,
                ..
            } => ScanItem::Bounded {
                dataset,
                chunk_size,
                offset,
                columns: new_columns,
            },
            ScanItem::BoundedMultiDimensional {
                dataset,
                chunk_size,
                block_shape,
                block_offset,
                ..
            } => ScanItem::BoundedMultiDimensional {
                dataset,
                chunk_size,
                block_shape,
                block_offset,
                columns: new_columns,
            },
        }
    }
}

impl fmt::Display for ScanItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanItem::Unbounded { dataset, .. } => {
                write!(f, "Unbounded({}:{})", dataset.file_id, dataset.path)
            }
            ScanItem::Bounded {
                dataset,
                chunk_size,
                offset,
                ..
            } => write!(
                f,
                "Bounded({}:{}, offset={}, len={})",
                dataset.file_id, dataset.path, offset, chunk_size
            ),
            ScanItem::BoundedMultiDimensional {
                dataset,
                block_shape,
                block_offset,
                ..
            } => write!(
                f,
                "Block({}:{}, shape={:?}, offset={:?})",
                dataset.file_id, dataset.path, block_shape, block_offset
            ),
        }
    }
}
