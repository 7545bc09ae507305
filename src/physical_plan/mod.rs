pub mod catalog;
pub mod exec;
pub mod executor;
pub mod linear_index;
pub mod memory;
pub mod projection;
pub mod reader;

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::common::{DataFusionError, Result};
use datafusion::physical_expr::{EquivalenceProperties, LexOrdering, PhysicalSortExpr};
use datafusion::physical_plan::execution_plan::{Boundedness, EmissionType};
use datafusion::physical_plan::expressions::Column as PhysicalColumn;
use datafusion::physical_plan::{Partitioning, PlanProperties};

use crate::types::{CatalogKind, DatasetDescriptor, ScanItem};
use catalog::CatalogField;
use projection::{DataColumn, ResolvedProjection};

pub const FILE_ID_COLUMN_NAME: &str = "FileID";
pub const INDEX_COLUMN_NAME: &str = "Index";
pub const VALUE_COLUMN_NAME: &str = "Value";

/// Creates `PlanProperties` for a scan with one partition per scan item.
///
/// Every partition emits rows in ascending linear index order, so when the
/// `Index` column is part of the output it is advertised as the ordering.
pub fn create_plan_properties_for_array_scan(
    schema: SchemaRef,
    partitions: usize,
) -> PlanProperties {
    let mut eq_properties = EquivalenceProperties::new(schema.clone());
    if let Ok(position) = schema.index_of(INDEX_COLUMN_NAME) {
        eq_properties.add_new_ordering(LexOrdering::new(vec![PhysicalSortExpr::new_default(
            Arc::new(PhysicalColumn::new(INDEX_COLUMN_NAME, position)),
        )
        .asc()]));
    }
    PlanProperties::new(
        eq_properties,
        Partitioning::UnknownPartitioning(partitions.max(1)),
        EmissionType::Incremental,
        Boundedness::Bounded,
    )
}

/// Creates the schema of a real-data scan producing `columns` in that order.
pub fn data_schema(value_type: &DataType, columns: &[DataColumn]) -> SchemaRef {
    let fields: Vec<Field> = columns.iter().map(|c| c.field(value_type)).collect();
    Arc::new(Schema::new(fields))
}

/// Creates the schema of a catalog scan producing `fields` in that order.
pub fn catalog_schema(fields: &[CatalogField]) -> SchemaRef {
    Arc::new(Schema::new(
        fields.iter().map(|f| f.field()).collect::<Vec<_>>(),
    ))
}

/// The full, unprojected schema a scan of `dataset` produces.
pub fn full_schema(dataset: &DatasetDescriptor) -> SchemaRef {
    match dataset.catalog() {
        Some(kind) => catalog_schema(CatalogField::defaults(kind)),
        None => data_schema(&dataset.value_type, &DataColumn::DEFAULT_ORDER),
    }
}

/// The schema of the rows `item` produces given its requested columns.
pub fn scan_item_schema(item: &ScanItem) -> SchemaRef {
    let dataset = item.dataset();
    match dataset.catalog() {
        Some(kind) => catalog_schema(&CatalogField::resolve(kind, item.columns())),
        None => data_schema(
            &dataset.value_type,
            ResolvedProjection::resolve(item.columns()).columns(),
        ),
    }
}

/// The column that is cheapest to produce for a given kind of scan. Used
/// when the host asks for row counts only.
pub fn cheapest_column(catalog: Option<CatalogKind>) -> &'static str {
    match catalog {
        Some(_) => FILE_ID_COLUMN_NAME,
        None => INDEX_COLUMN_NAME,
    }
}

/// Converts an unsigned count or position into an `Int64` column value.
pub fn to_int64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| {
        DataFusionError::Execution(format!("{} {} does not fit in Int64", what, value))
    })
}
