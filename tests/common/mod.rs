pub mod datasets;

use std::sync::Arc;

use datafusion::arrow::array::{Array, Int64Array, RecordBatch};
use datafusion::execution::context::SessionContext;
use datafusion_array_provider::physical_plan::reader::DatasetReader;
use datafusion_array_provider::provider::ArrayTableProvider;
use datafusion_array_provider::types::ScanItem;

/// Helper function to setup test environment
pub async fn setup_test_env() -> SessionContext {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();

    SessionContext::new()
}

pub fn register(
    ctx: &SessionContext,
    name: &str,
    items: Vec<ScanItem>,
    reader: Arc<dyn DatasetReader>,
) {
    let provider = ArrayTableProvider::try_new(items, reader).unwrap();
    ctx.register_table(name, Arc::new(provider)).unwrap();
}

pub async fn run(ctx: &SessionContext, sql: &str) -> Vec<RecordBatch> {
    ctx.sql(sql).await.unwrap().collect().await.unwrap()
}

pub fn int64_column(results: &[RecordBatch], column: usize) -> Vec<i64> {
    let mut values = Vec::new();
    for batch in results {
        let array = batch
            .column(column)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        values.extend(array.iter().flatten());
    }
    values
}

pub fn row_count(results: &[RecordBatch]) -> usize {
    results.iter().map(|b| b.num_rows()).sum()
}
