//! Tuning knobs for array scans.

/// Options shared by [`crate::provider::ArrayTableProvider`] and the scan plan it builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanConfig {
    /// Maximum rows per emitted batch. Falls back to the session batch size.
    pub batch_size: Option<usize>,
    /// Fail instead of casting when a reader returns values whose type
    /// differs from the descriptor's value type.
    pub strict_value_type: bool,
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_strict_value_type(mut self, strict: bool) -> Self {
        self.strict_value_type = strict;
        self
    }

    /// The batch size to use given the session default.
    pub fn batch_size_or(&self, session_batch_size: usize) -> usize {
        self.batch_size.unwrap_or(session_batch_size).max(1)
    }
}
