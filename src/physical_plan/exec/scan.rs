use std::any::Any;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use datafusion::common::runtime::SpawnedTask;
use datafusion::error::{DataFusionError, Result};
use datafusion::execution::context::TaskContext;
use datafusion::execution::SendableRecordBatchStream;
use datafusion::physical_plan::metrics::{BaselineMetrics, ExecutionPlanMetricsSet, MetricsSet};
use datafusion::physical_plan::{
    DisplayAs, DisplayFormatType, ExecutionPlan, PlanProperties, RecordBatchStream,
};
use futures::future::BoxFuture;
use futures::stream::Stream;
use futures::{Future, FutureExt};

use crate::config::ScanConfig;
use crate::physical_plan::executor::ScanExecutor;
use crate::physical_plan::reader::DatasetReader;
use crate::physical_plan::{create_plan_properties_for_array_scan, scan_item_schema};
use crate::types::ScanItem;

/// Physical plan node that scans array datasets, one partition per [`ScanItem`].
///
/// Every item of the plan must produce the same schema. An optional
/// projection is applied to each item's rows after execution, which lets the
/// plan expose zero columns while still reporting row counts.
#[derive(Debug)]
pub struct ArrayScanExec {
    items: Arc<Vec<ScanItem>>,
    executor: ScanExecutor,
    config: ScanConfig,
    projection: Option<Vec<usize>>,
    schema: SchemaRef,
    plan_properties: PlanProperties,
    metrics: ExecutionPlanMetricsSet,
}

impl ArrayScanExec {
    /// Create a new `ArrayScanExec` plan.
    pub fn try_new(
        items: Vec<ScanItem>,
        reader: Arc<dyn DatasetReader>,
        config: ScanConfig,
        projection: Option<Vec<usize>>,
    ) -> Result<Self> {
        let first = items.first().ok_or_else(|| {
            DataFusionError::Plan("ArrayScanExec requires at least one scan item".to_string())
        })?;
        let item_schema = scan_item_schema(first);
        if let Some(other) = items.iter().find(|i| scan_item_schema(i) != item_schema) {
            return Err(DataFusionError::Plan(format!(
                "scan item {} does not produce schema {:?}",
                other, item_schema
            )));
        }

        let schema = match &projection {
            Some(indices) => Arc::new(item_schema.project(indices)?),
            None => item_schema,
        };
        let plan_properties = create_plan_properties_for_array_scan(schema.clone(), items.len());

        Ok(Self {
            items: Arc::new(items),
            executor: ScanExecutor::new(reader).with_config(&config),
            config,
            projection,
            schema,
            plan_properties,
            metrics: ExecutionPlanMetricsSet::new(),
        })
    }

    pub fn items(&self) -> &[ScanItem] {
        &self.items
    }
}

impl DisplayAs for ArrayScanExec {
    fn fmt_as(&self, t: DisplayFormatType, f: &mut fmt::Formatter) -> fmt::Result {
        let columns: Vec<&str> = self
            .schema
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .collect();
        match t {
            DisplayFormatType::Default => write!(
                f,
                "ArrayScanExec: items={}, columns=[{}]",
                self.items.len(),
                columns.join(", ")
            ),
            DisplayFormatType::Verbose => {
                let items: Vec<String> = self.items.iter().map(|i| i.to_string()).collect();
                write!(
                    f,
                    "ArrayScanExec: items=[{}], columns=[{}]",
                    items.join(", "),
                    columns.join(", ")
                )
            }
            DisplayFormatType::TreeRender => write!(f, "ArrayScanExec"),
        }
    }
}

impl ExecutionPlan for ArrayScanExec {
    fn name(&self) -> &str {
        "ArrayScanExec"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn properties(&self) -> &PlanProperties {
        &self.plan_properties
    }

    fn children(&self) -> Vec<&Arc<dyn ExecutionPlan>> {
        vec![]
    }

    fn with_new_children(
        self: Arc<Self>,
        _children: Vec<Arc<dyn ExecutionPlan>>,
    ) -> Result<Arc<dyn ExecutionPlan>> {
        Ok(self)
    }

    fn execute(
        &self,
        partition: usize,
        context: Arc<TaskContext>,
    ) -> Result<SendableRecordBatchStream> {
        let item = self.items.get(partition).ok_or_else(|| {
            DataFusionError::Internal(format!(
                "ArrayScanExec has {} partitions, tried to execute partition {}",
                self.items.len(),
                partition
            ))
        })?;
        let batch_size = self
            .config
            .batch_size_or(context.session_config().batch_size());

        Ok(Box::pin(ScanItemStream::new(
            item.clone(),
            self.executor.clone(),
            self.projection.clone(),
            self.schema.clone(),
            batch_size,
            BaselineMetrics::new(&self.metrics, partition),
        )))
    }

    fn metrics(&self) -> Option<MetricsSet> {
        Some(self.metrics.clone_inner())
    }
}

/// A stream that executes one scan item on a blocking thread when first
/// polled and then hands out its rows in slices of at most `batch_size`.
pub struct ScanItemStream {
    schema: SchemaRef,
    projection: Option<Vec<usize>>,
    batch_size: usize,
    baseline_metrics: BaselineMetrics,
    state: ScanState,
}

/// The state of a `ScanItemStream`.
enum ScanState {
    /// The item has not been started yet.
    Pending {
        item: ScanItem,
        executor: ScanExecutor,
    },
    /// The item is being executed off the async runtime.
    Executing(BoxFuture<'static, Result<RecordBatch>>),
    /// Slicing the executed rows; `offset` is the next row to emit.
    Emitting { batch: RecordBatch, offset: usize },
    /// Exhausted or failed.
    Done,
}

impl ScanItemStream {
    pub fn new(
        item: ScanItem,
        executor: ScanExecutor,
        projection: Option<Vec<usize>>,
        schema: SchemaRef,
        batch_size: usize,
        baseline_metrics: BaselineMetrics,
    ) -> Self {
        Self {
            schema,
            projection,
            batch_size: batch_size.max(1),
            baseline_metrics,
            state: ScanState::Pending { item, executor },
        }
    }

    /// Dataset reads are synchronous, so the item runs on the blocking pool.
    fn spawn(
        &self,
        item: ScanItem,
        executor: ScanExecutor,
    ) -> BoxFuture<'static, Result<RecordBatch>> {
        let elapsed_compute = self.baseline_metrics.elapsed_compute().clone();
        let projection = self.projection.clone();
        let task = SpawnedTask::spawn_blocking(move || -> Result<RecordBatch> {
            let _timer = elapsed_compute.timer();
            let batch = executor.execute(&item)?;
            match projection {
                Some(indices) => Ok(batch.project(&indices)?),
                None => Ok(batch),
            }
        });
        async move {
            task.join()
                .await
                .map_err(DataFusionError::ExecutionJoin)
                .and_then(|result| result)
        }
        .boxed()
    }
}

impl Stream for ScanItemStream {
    type Item = Result<RecordBatch>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let state = std::mem::replace(&mut self.state, ScanState::Done);

            match state {
                ScanState::Pending { item, executor } => {
                    let fut = self.spawn(item, executor);
                    self.state = ScanState::Executing(fut);
                    continue;
                }
                ScanState::Executing(mut fut) => match fut.as_mut().poll(cx) {
                    Poll::Ready(Ok(batch)) => {
                        self.state = ScanState::Emitting { batch, offset: 0 };
                        continue;
                    }
                    Poll::Ready(Err(e)) => {
                        return self.baseline_metrics.record_poll(Poll::Ready(Some(Err(e))));
                    }
                    Poll::Pending => {
                        self.state = ScanState::Executing(fut);
                        return self.baseline_metrics.record_poll(Poll::Pending);
                    }
                },
                ScanState::Emitting { batch, offset } => {
                    if offset >= batch.num_rows() {
                        return self.baseline_metrics.record_poll(Poll::Ready(None));
                    }
                    let len = self.batch_size.min(batch.num_rows() - offset);
                    let slice = batch.slice(offset, len);
                    self.state = ScanState::Emitting {
                        batch,
                        offset: offset + len,
                    };
                    return self
                        .baseline_metrics
                        .record_poll(Poll::Ready(Some(Ok(slice))));
                }
                ScanState::Done => {
                    return self.baseline_metrics.record_poll(Poll::Ready(None));
                }
            }
        }
    }
}

impl fmt::Debug for ScanItemStream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ScanItemStream")
            .field("schema", &self.schema)
            .field("batch_size", &self.batch_size)
            .field("baseline_metrics", &self.baseline_metrics)
            .finish()
    }
}

impl RecordBatchStream for ScanItemStream {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical_plan::memory::MemoryDatasetReader;
    use crate::physical_plan::reader::DatasetHandle;
    use crate::types::{CatalogKind, DatasetDescriptor};
    use std::sync::Mutex;
    use std::thread::ThreadId;
    use arrow::array::{Array, Float64Array, Int64Array};
    use arrow::datatypes::DataType;
    use datafusion::physical_plan::displayable;

    fn dataset() -> Arc<DatasetDescriptor> {
        Arc::new(DatasetDescriptor::new(
            1,
            "/tmp/grid.h5",
            "/grid",
            "float64",
            DataType::Float64,
            vec![4, 4],
        ))
    }

    fn reader(ds: &DatasetDescriptor) -> Arc<MemoryDatasetReader> {
        let values = Float64Array::from_iter_values((0..16).map(|v| v as f64 / 2.0));
        Arc::new(MemoryDatasetReader::new().with_dataset(ds, Arc::new(values)))
    }

    fn blocks(ds: &Arc<DatasetDescriptor>) -> Vec<ScanItem> {
        let mut items = Vec::new();
        for row in [0, 2] {
            for col in [0, 2] {
                items.push(ScanItem::BoundedMultiDimensional {
                    dataset: ds.clone(),
                    chunk_size: 4,
                    block_shape: vec![2, 2],
                    block_offset: vec![row, col],
                    columns: vec![],
                });
            }
        }
        items
    }

    fn indices(batches: &[RecordBatch], column: usize) -> Vec<i64> {
        batches
            .iter()
            .flat_map(|b| {
                b.column(column)
                    .as_any()
                    .downcast_ref::<Int64Array>()
                    .unwrap()
                    .values()
                    .to_vec()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_one_partition_per_item() -> Result<()> {
        let ds = dataset();
        let exec = ArrayScanExec::try_new(blocks(&ds), reader(&ds), ScanConfig::default(), None)?;
        assert_eq!(exec.properties().output_partitioning().partition_count(), 4);

        let task_ctx = Arc::new(TaskContext::default());
        let mut all = Vec::new();
        for partition in 0..4 {
            let stream = exec.execute(partition, task_ctx.clone())?;
            let batches = datafusion::physical_plan::common::collect(stream).await?;
            all.extend(indices(&batches, 1));
        }
        all.sort();
        assert_eq!(all, (0..16).collect::<Vec<_>>());
        Ok(())
    }

    #[tokio::test]
    async fn test_rows_are_sliced_to_batch_size() -> Result<()> {
        let ds = dataset();
        let item = ScanItem::Unbounded {
            dataset: ds.clone(),
            chunk_size: 16,
            columns: vec!["Index".to_string()],
        };
        let config = ScanConfig::new().with_batch_size(5);
        let exec = ArrayScanExec::try_new(vec![item], reader(&ds), config, None)?;

        let stream = exec.execute(0, Arc::new(TaskContext::default()))?;
        let batches = datafusion::physical_plan::common::collect(stream).await?;
        let sizes: Vec<usize> = batches.iter().map(|b| b.num_rows()).collect();
        assert_eq!(sizes, vec![5, 5, 5, 1]);
        assert_eq!(indices(&batches, 0), (0..16).collect::<Vec<_>>());

        let metrics = exec.metrics().unwrap();
        assert_eq!(metrics.output_rows(), Some(16));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_projection_keeps_row_count() -> Result<()> {
        let ds = dataset();
        let item = ScanItem::Unbounded {
            dataset: ds.clone(),
            chunk_size: 16,
            columns: vec!["Index".to_string()],
        };
        let exec = ArrayScanExec::try_new(
            vec![item],
            reader(&ds),
            ScanConfig::default(),
            Some(vec![]),
        )?;
        assert_eq!(exec.schema().fields().len(), 0);

        let stream = exec.execute(0, Arc::new(TaskContext::default()))?;
        let batches = datafusion::physical_plan::common::collect(stream).await?;
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 16);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_partition() {
        let ds = dataset();
        let exec =
            ArrayScanExec::try_new(blocks(&ds), reader(&ds), ScanConfig::default(), None).unwrap();
        match exec.execute(4, Arc::new(TaskContext::default())) {
            Err(e) => assert!(
                e.to_string().contains("tried to execute partition 4"),
                "unexpected error message: {}",
                e
            ),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn test_read_error_surfaces_in_stream() -> Result<()> {
        let ds = dataset();
        let reader = Arc::new(
            MemoryDatasetReader::new()
                .with_dataset(&ds, Arc::new(Float64Array::from(vec![0.0; 16])))
                .with_failing_reads(),
        );
        let exec =
            ArrayScanExec::try_new(blocks(&ds), reader.clone(), ScanConfig::default(), None)?;
        let stream = exec.execute(0, Arc::new(TaskContext::default()))?;
        let result = datafusion::physical_plan::common::collect(stream).await;
        assert!(result.is_err());
        assert_eq!(reader.stats().closes(), 1);
        Ok(())
    }

    /// Remembers which thread opened each session.
    #[derive(Debug)]
    struct ThreadRecordingReader {
        inner: MemoryDatasetReader,
        threads: Mutex<Vec<ThreadId>>,
    }

    impl DatasetReader for ThreadRecordingReader {
        fn open(&self, dataset: &DatasetDescriptor) -> Result<Box<dyn DatasetHandle>> {
            self.threads
                .lock()
                .unwrap()
                .push(std::thread::current().id());
            self.inner.open(dataset)
        }
    }

    #[tokio::test]
    async fn test_reads_run_off_the_polling_thread() -> Result<()> {
        let ds = dataset();
        let values = Float64Array::from_iter_values((0..16).map(|v| v as f64));
        let reader = Arc::new(ThreadRecordingReader {
            inner: MemoryDatasetReader::new().with_dataset(&ds, Arc::new(values)),
            threads: Mutex::new(Vec::new()),
        });
        let exec = ArrayScanExec::try_new(blocks(&ds), reader.clone(), ScanConfig::default(), None)?;

        let stream = exec.execute(0, Arc::new(TaskContext::default()))?;
        let batches = datafusion::physical_plan::common::collect(stream).await?;
        assert_eq!(indices(&batches, 1), vec![0, 1, 4, 5]);

        let threads = reader.threads.lock().unwrap().clone();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], std::thread::current().id());
        Ok(())
    }

    #[test]
    fn test_requires_items_with_one_schema() {
        let ds = dataset();
        let err = ArrayScanExec::try_new(vec![], reader(&ds), ScanConfig::default(), None)
            .unwrap_err();
        assert!(err.to_string().contains("at least one scan item"), "{err}");

        let catalog = Arc::new((*ds).clone().as_catalog(CatalogKind::Files));
        let mixed = vec![
            ScanItem::Unbounded {
                dataset: ds.clone(),
                chunk_size: 0,
                columns: vec![],
            },
            ScanItem::Unbounded {
                dataset: catalog,
                chunk_size: 0,
                columns: vec![],
            },
        ];
        let err = ArrayScanExec::try_new(mixed, reader(&ds), ScanConfig::default(), None)
            .unwrap_err();
        assert!(err.to_string().contains("does not produce schema"), "{err}");
    }

    #[test]
    fn test_display() -> Result<()> {
        let ds = dataset();
        let exec = ArrayScanExec::try_new(blocks(&ds), reader(&ds), ScanConfig::default(), None)?;
        let rendered = displayable(&exec).one_line().to_string();
        assert!(
            rendered.contains("ArrayScanExec: items=4, columns=[FileID, Index, Value]"),
            "{rendered}"
        );
        Ok(())
    }
}
