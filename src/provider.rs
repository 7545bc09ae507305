use std::any::Any;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use async_trait::async_trait;
use datafusion::catalog::Session;
use datafusion::datasource::{TableProvider, TableType};
use datafusion::logical_expr::Expr;
use datafusion::physical_plan::ExecutionPlan;
use datafusion_common::{DataFusionError, Result};

use crate::config::ScanConfig;
use crate::physical_plan::exec::scan::ArrayScanExec;
use crate::physical_plan::reader::DatasetReader;
use crate::physical_plan::{cheapest_column, full_schema};
use crate::types::ScanItem;

/// A DataFusion `TableProvider` over a fixed set of planned scan items.
///
/// Deciding which files and blocks become scan items happens upstream; the
/// provider only turns the host's projection into requested columns and
/// hands the items to an [`ArrayScanExec`]. All items must describe the same
/// kind of table: real datasets sharing one value type, or one catalog.
#[derive(Debug)]
pub struct ArrayTableProvider {
    schema: SchemaRef,
    items: Vec<ScanItem>,
    reader: Arc<dyn DatasetReader>,
    config: ScanConfig,
}

impl ArrayTableProvider {
    pub fn try_new(items: Vec<ScanItem>, reader: Arc<dyn DatasetReader>) -> Result<Self> {
        let first = items.first().ok_or_else(|| {
            DataFusionError::Plan("ArrayTableProvider requires at least one scan item".to_string())
        })?;
        let schema = full_schema(first.dataset());
        for item in &items {
            let item_schema = full_schema(item.dataset());
            if item_schema != schema {
                return Err(DataFusionError::Plan(format!(
                    "scan item {} has schema {:?}, expected {:?}",
                    item, item_schema, schema
                )));
            }
        }
        Ok(Self {
            schema,
            items,
            reader,
            config: ScanConfig::default(),
        })
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn items(&self) -> &[ScanItem] {
        &self.items
    }

    /// Column names to request for a host projection, plus the projection
    /// still to apply on the scanned rows.
    fn requested_columns(
        &self,
        projection: Option<&Vec<usize>>,
    ) -> (Vec<String>, Option<Vec<usize>>) {
        match projection {
            None => (
                self.schema
                    .fields()
                    .iter()
                    .map(|f| f.name().clone())
                    .collect(),
                None,
            ),
            // Row counts only: scan something that needs no array data.
            Some(indices) if indices.is_empty() => {
                let catalog = self.items[0].dataset().catalog();
                (vec![cheapest_column(catalog).to_string()], Some(vec![]))
            }
            Some(indices) => (
                indices
                    .iter()
                    .map(|&i| self.schema.field(i).name().clone())
                    .collect(),
                None,
            ),
        }
    }
}

#[async_trait]
impl TableProvider for ArrayTableProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn table_type(&self) -> TableType {
        TableType::Base
    }

    async fn scan(
        &self,
        _state: &dyn Session,
        projection: Option<&Vec<usize>>,
        _filters: &[Expr],
        _limit: Option<usize>,
    ) -> Result<Arc<dyn ExecutionPlan>> {
        let (columns, post_projection) = self.requested_columns(projection);
        log::debug!(
            "Planning scan of {} items with columns {:?}",
            self.items.len(),
            columns
        );
        let items = self
            .items
            .iter()
            .cloned()
            .map(|item| item.with_columns(columns.clone()))
            .collect();
        Ok(Arc::new(ArrayScanExec::try_new(
            items,
            self.reader.clone(),
            self.config.clone(),
            post_projection,
        )?))
    }
}
