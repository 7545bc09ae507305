//! Resolution of requested column names for real-data scans.

use arrow::datatypes::{DataType, Field};

use super::{FILE_ID_COLUMN_NAME, INDEX_COLUMN_NAME, VALUE_COLUMN_NAME};

/// A column a real-data scan knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataColumn {
    FileId,
    Index,
    Value,
}

impl DataColumn {
    /// Output order used when no columns are requested.
    pub const DEFAULT_ORDER: [DataColumn; 3] =
        [DataColumn::FileId, DataColumn::Index, DataColumn::Value];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            FILE_ID_COLUMN_NAME => Some(Self::FileId),
            INDEX_COLUMN_NAME => Some(Self::Index),
            VALUE_COLUMN_NAME => Some(Self::Value),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FileId => FILE_ID_COLUMN_NAME,
            Self::Index => INDEX_COLUMN_NAME,
            Self::Value => VALUE_COLUMN_NAME,
        }
    }

    pub fn field(&self, value_type: &DataType) -> Field {
        match self {
            Self::FileId | Self::Index => Field::new(self.name(), DataType::Int64, false),
            Self::Value => Field::new(self.name(), value_type.clone(), true),
        }
    }
}

/// The outcome of resolving a requested column list.
///
/// `columns` is the effective output order: the request order with unknown
/// names dropped, or [`DataColumn::DEFAULT_ORDER`] for an empty request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProjection {
    columns: Vec<DataColumn>,
}

impl ResolvedProjection {
    pub fn resolve<S: AsRef<str>>(requested: &[S]) -> Self {
        if requested.is_empty() {
            return Self {
                columns: DataColumn::DEFAULT_ORDER.to_vec(),
            };
        }
        let mut columns = Vec::with_capacity(requested.len());
        for name in requested {
            match DataColumn::from_name(name.as_ref()) {
                Some(column) if !columns.contains(&column) => columns.push(column),
                Some(_) => {}
                None => log::trace!("Ignoring unknown column {:?}", name.as_ref()),
            }
        }
        Self { columns }
    }

    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    /// Whether array data has to be read at all.
    pub fn wants_value(&self) -> bool {
        self.columns.contains(&DataColumn::Value)
    }

    pub fn wants_index(&self) -> bool {
        self.columns.contains(&DataColumn::Index)
    }

    pub fn wants_id(&self) -> bool {
        self.columns.contains(&DataColumn::FileId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_request_uses_default_order() {
        let empty: [&str; 0] = [];
        let projection = ResolvedProjection::resolve(&empty);
        assert_eq!(
            projection.columns(),
            &[DataColumn::FileId, DataColumn::Index, DataColumn::Value]
        );
        assert!(projection.wants_value() && projection.wants_index() && projection.wants_id());
    }

    #[test]
    fn test_pairs_follow_request_order() {
        let projection = ResolvedProjection::resolve(&["Index", "FileID"]);
        assert_eq!(projection.columns(), &[DataColumn::Index, DataColumn::FileId]);
        assert!(!projection.wants_value());

        let projection = ResolvedProjection::resolve(&["FileID", "Index"]);
        assert_eq!(projection.columns(), &[DataColumn::FileId, DataColumn::Index]);

        let projection = ResolvedProjection::resolve(&["Value", "Index"]);
        assert_eq!(projection.columns(), &[DataColumn::Value, DataColumn::Index]);

        let projection = ResolvedProjection::resolve(&["FileID", "Value"]);
        assert_eq!(projection.columns(), &[DataColumn::FileId, DataColumn::Value]);
    }

    #[test]
    fn test_full_request_in_custom_order() {
        let projection = ResolvedProjection::resolve(&["Value", "FileID", "Index"]);
        assert_eq!(
            projection.columns(),
            &[DataColumn::Value, DataColumn::FileId, DataColumn::Index]
        );
    }

    #[test]
    fn test_unknown_names_are_dropped() {
        let projection = ResolvedProjection::resolve(&["bogus", "Index", "value"]);
        assert_eq!(projection.columns(), &[DataColumn::Index]);
        assert!(!projection.wants_value());
        assert!(!projection.wants_id());

        let projection = ResolvedProjection::resolve(&["nothing"]);
        assert!(projection.columns().is_empty());
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let projection = ResolvedProjection::resolve(&["Index", "Value", "Index"]);
        assert_eq!(projection.columns(), &[DataColumn::Index, DataColumn::Value]);
    }
}
