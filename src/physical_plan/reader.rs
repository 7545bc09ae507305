//! The native dataset reader consumed by scans.

use arrow::array::ArrayRef;
use datafusion::common::{DataFusionError, Result};

use crate::types::DatasetDescriptor;

/// Opens read sessions on datasets.
///
/// Implementations wrap whatever native library understands the file format.
/// Retrying transient failures, if wanted, belongs here and not in the scan.
pub trait DatasetReader: Send + Sync + std::fmt::Debug {
    /// Opens a read session for `dataset`.
    ///
    /// The returned handle must be closed by the caller, see [`OpenDataset`].
    fn open(&self, dataset: &DatasetDescriptor) -> Result<Box<dyn DatasetHandle>>;
}

/// An open read session on one dataset.
///
/// Every read returns elements in row-major order as a single Arrow array.
pub trait DatasetHandle: Send {
    /// Reads every element of the dataset.
    fn read_all(&mut self) -> Result<ArrayRef>;

    /// Reads `count` elements starting at linear element `offset`.
    fn read_from(&mut self, offset: u64, count: u64) -> Result<ArrayRef>;

    /// Reads the rectangular block at `offset` with extent `shape`.
    ///
    /// A block that runs past the end of an axis is truncated to the
    /// elements that exist, and elements come back row-major over the
    /// truncated block.
    fn read_block(&mut self, shape: &[u64], offset: &[u64]) -> Result<ArrayRef>;

    /// Releases the native resources held by this session.
    fn close(&mut self) -> Result<()>;
}

/// A dataset session that is closed exactly once.
///
/// [`OpenDataset::close`] reports close failures to the caller. A guard
/// dropped while still open (for example when a read fails and `?` returns
/// early) closes the session itself and logs any failure.
pub struct OpenDataset {
    handle: Option<Box<dyn DatasetHandle>>,
    label: String,
}

impl OpenDataset {
    pub fn open(reader: &dyn DatasetReader, dataset: &DatasetDescriptor) -> Result<Self> {
        let label = format!("{}:{}", dataset.file_name, dataset.real_path);
        log::trace!("Opening dataset {}", label);
        let handle = reader.open(dataset)?;
        Ok(Self {
            handle: Some(handle),
            label,
        })
    }

    fn handle(&mut self) -> Result<&mut Box<dyn DatasetHandle>> {
        self.handle
            .as_mut()
            .ok_or_else(|| DataFusionError::Internal(format!("dataset {} is closed", self.label)))
    }

    pub fn read_all(&mut self) -> Result<ArrayRef> {
        self.handle()?.read_all()
    }

    pub fn read_from(&mut self, offset: u64, count: u64) -> Result<ArrayRef> {
        self.handle()?.read_from(offset, count)
    }

    pub fn read_block(&mut self, shape: &[u64], offset: &[u64]) -> Result<ArrayRef> {
        self.handle()?.read_block(shape, offset)
    }

    pub fn close(mut self) -> Result<()> {
        match self.handle.take() {
            Some(mut handle) => {
                log::trace!("Closing dataset {}", self.label);
                handle.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for OpenDataset {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.close() {
                log::warn!("Failed to close dataset {}: {}", self.label, e);
            }
        }
    }
}

impl std::fmt::Debug for OpenDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("OpenDataset")
            .field("label", &self.label)
            .field("open", &self.handle.is_some())
            .finish()
    }
}
