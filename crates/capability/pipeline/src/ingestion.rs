use crate::batcher::batch_event;
use crate::{BatchWriter, OverflowPolicy, PipelineConfig, PipelineError};
use domain::{Event, SinkConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, Semaphore, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

struct PipelineInner {
    sender: mpsc::Sender<Event>,
    shutdown: watch::Sender<bool>,
    permits: Arc<Semaphore>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    config: PipelineConfig,
}

/// 事件接入流水线。
///
/// `ingest` 只负责入队；后台分发任务按并发上限为每个事件启动一个写入任务。
/// 队列满时按 [`OverflowPolicy`] 拒绝或等待。
#[derive(Clone)]
pub struct IngestionPipeline {
    inner: Arc<PipelineInner>,
}

impl IngestionPipeline {
    /// 启动后台分发任务。必须在 tokio 运行时内调用。
    pub fn spawn(
        writer: Arc<dyn BatchWriter>,
        sink: SinkConfig,
        config: PipelineConfig,
    ) -> Self {
        let config = config.sanitized();
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let permits = Arc::new(Semaphore::new(config.max_concurrent_writes));
        let dispatcher = tokio::spawn(dispatch(
            receiver,
            shutdown_rx,
            permits.clone(),
            writer,
            Arc::new(sink),
        ));
        info!(
            target: "edgex.pipeline",
            queue_capacity = config.queue_capacity,
            max_concurrent_writes = config.max_concurrent_writes,
            overflow = ?config.overflow,
            "pipeline_started"
        );
        Self {
            inner: Arc::new(PipelineInner {
                sender,
                shutdown,
                permits,
                dispatcher: Mutex::new(Some(dispatcher)),
                config,
            }),
        }
    }

    /// 交付一个事件。返回 `Ok` 只表示已入队，不代表已写入。
    pub async fn ingest(&self, event: Event) -> Result<(), PipelineError> {
        if *self.inner.shutdown.borrow() {
            edgex_telemetry::record_event_rejected();
            return Err(PipelineError::Closed);
        }
        let readings = event.readings.len();
        let result = match self.inner.config.overflow {
            OverflowPolicy::Reject => self.inner.sender.try_send(event).map_err(|err| match err {
                TrySendError::Full(_) => PipelineError::Backpressure("queue full".to_string()),
                TrySendError::Closed(_) => PipelineError::Closed,
            }),
            OverflowPolicy::Wait => self
                .inner
                .sender
                .send(event)
                .await
                .map_err(|_| PipelineError::Closed),
        };
        match &result {
            Ok(()) => edgex_telemetry::record_event_received(readings),
            Err(err) => {
                edgex_telemetry::record_event_rejected();
                warn!(target: "edgex.pipeline", readings, error = %err, "event_rejected");
            }
        }
        result
    }

    /// 停止接收新事件，处理完已入队事件并等待在途写入结束。
    ///
    /// 超过 `grace` 仍未完成时返回 `ShutdownTimeout`，剩余任务不会被取消。
    pub async fn shutdown(&self, grace: Duration) -> Result<(), PipelineError> {
        self.inner.shutdown.send_replace(true);
        let dispatcher = self.inner.dispatcher.lock().await.take();
        let permits = self.inner.permits.clone();
        let all = self.inner.config.max_concurrent_writes as u32;
        let drain = async move {
            if let Some(handle) = dispatcher {
                let _ = handle.await;
            }
            let _ = permits.acquire_many(all).await;
        };
        match tokio::time::timeout(grace, drain).await {
            Ok(()) => {
                info!(target: "edgex.pipeline", "pipeline_stopped");
                Ok(())
            }
            Err(_) => {
                warn!(
                    target: "edgex.pipeline",
                    grace_ms = grace.as_millis() as u64,
                    "pipeline_shutdown_timeout"
                );
                Err(PipelineError::ShutdownTimeout)
            }
        }
    }
}

async fn dispatch(
    mut receiver: mpsc::Receiver<Event>,
    mut shutdown: watch::Receiver<bool>,
    permits: Arc<Semaphore>,
    writer: Arc<dyn BatchWriter>,
    sink: Arc<SinkConfig>,
) {
    loop {
        tokio::select! {
            next = receiver.recv() => match next {
                Some(event) => spawn_write(event, &permits, &writer, &sink).await,
                None => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    receiver.close();
    while let Some(event) = receiver.recv().await {
        spawn_write(event, &permits, &writer, &sink).await;
    }
}

async fn spawn_write(
    event: Event,
    permits: &Arc<Semaphore>,
    writer: &Arc<dyn BatchWriter>,
    sink: &Arc<SinkConfig>,
) {
    let Ok(permit) = permits.clone().acquire_owned().await else {
        return;
    };
    let writer = writer.clone();
    let sink = sink.clone();
    tokio::spawn(async move {
        process_event(event, writer.as_ref(), &sink).await;
        drop(permit);
    });
}

/// 处理单个事件：构造批次并写入。
///
/// 构造失败与写入失败只记录日志和指标，返回成功写入的点位数量。
pub async fn process_event(event: Event, writer: &dyn BatchWriter, sink: &SinkConfig) -> usize {
    let batched = batch_event(&event, sink);
    for failure in &batched.failures {
        edgex_telemetry::record_build_failure();
        warn!(
            target: "edgex.pipeline",
            index = failure.index,
            device = %failure.device,
            name = %failure.name,
            id = %failure.id,
            error = %failure.error,
            "reading_skipped"
        );
    }
    let points = batched.batch.len();
    edgex_telemetry::record_points_built(points);
    if batched.batch.is_empty() {
        edgex_telemetry::record_empty_batch();
        info!(
            target: "edgex.pipeline",
            device = %event.device,
            readings = event.readings.len(),
            "empty_batch_skipped"
        );
        return 0;
    }

    let started = Instant::now();
    let result = writer.write(&batched.batch).await;
    edgex_telemetry::record_write_latency_ms(started.elapsed().as_millis() as u64);
    match result {
        Ok(()) => {
            edgex_telemetry::record_batch_written(points);
            info!(
                target: "edgex.pipeline",
                device = %event.device,
                points,
                skipped = batched.failures.len(),
                "batch_written"
            );
            points
        }
        Err(err) => {
            edgex_telemetry::record_write_failure();
            warn!(
                target: "edgex.pipeline",
                device = %event.device,
                points,
                error = %err,
                "batch_write_failed"
            );
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoopWriter;
    use async_trait::async_trait;
    use domain::{Batch, Reading, WritePrecision};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct RecordingWriter {
        batches: Mutex<Vec<Batch>>,
    }

    #[async_trait]
    impl BatchWriter for RecordingWriter {
        async fn write(&self, batch: &Batch) -> Result<(), PipelineError> {
            self.batches.lock().await.push(batch.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FailingWriter {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl BatchWriter for FailingWriter {
        async fn write(&self, _batch: &Batch) -> Result<(), PipelineError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(PipelineError::Writer("forced failure".to_string()))
        }
    }

    /// 写入前等待闸门放行。
    struct GatedWriter {
        gate: Semaphore,
        started: Notify,
        written: AtomicUsize,
    }

    impl GatedWriter {
        fn new() -> Self {
            Self {
                gate: Semaphore::new(0),
                started: Notify::new(),
                written: AtomicUsize::new(0),
            }
        }

        fn open(&self) {
            self.gate.add_permits(1);
        }
    }

    #[async_trait]
    impl BatchWriter for GatedWriter {
        async fn write(&self, _batch: &Batch) -> Result<(), PipelineError> {
            self.started.notify_one();
            let _pass = self
                .gate
                .acquire()
                .await
                .map_err(|err| PipelineError::Writer(err.to_string()))?;
            self.written.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sink() -> SinkConfig {
        SinkConfig::new("edgex", WritePrecision::Nanoseconds)
    }

    fn event(device: &str) -> Event {
        Event::new(
            device,
            vec![Reading {
                device: device.to_string(),
                name: "temp".to_string(),
                id: "r1".to_string(),
                value: "23".to_string(),
                origin: 1000,
            }],
        )
    }

    fn config(queue_capacity: usize, overflow: OverflowPolicy) -> PipelineConfig {
        PipelineConfig {
            queue_capacity,
            max_concurrent_writes: 1,
            overflow,
        }
    }

    const GRACE: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn concurrent_events_are_all_written() {
        let writer = Arc::new(RecordingWriter::default());
        let pipeline = IngestionPipeline::spawn(writer.clone(), sink(), PipelineConfig::default());

        let first = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.ingest(event("sensorA")).await }
        });
        let second = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.ingest(event("sensorB")).await }
        });
        first.await.expect("join").expect("ingest a");
        second.await.expect("join").expect("ingest b");
        pipeline.shutdown(GRACE).await.expect("shutdown");

        let batches = writer.batches.lock().await;
        let mut devices: Vec<_> = batches
            .iter()
            .map(|batch| batch.points[0].measurement.clone())
            .collect();
        devices.sort();
        assert_eq!(devices, vec!["sensorA", "sensorB"]);
    }

    #[tokio::test]
    async fn write_failure_is_not_propagated() {
        let writer = Arc::new(FailingWriter::default());
        let pipeline = IngestionPipeline::spawn(writer.clone(), sink(), PipelineConfig::default());
        pipeline.ingest(event("sensorA")).await.expect("accepted");
        pipeline.shutdown(GRACE).await.expect("shutdown");
        assert_eq!(writer.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_batch_skips_writer() {
        let writer = Arc::new(RecordingWriter::default());
        let pipeline = IngestionPipeline::spawn(writer.clone(), sink(), PipelineConfig::default());
        pipeline.ingest(event("")).await.expect("accepted");
        pipeline.shutdown(GRACE).await.expect("shutdown");
        assert!(writer.batches.lock().await.is_empty());
    }

    #[tokio::test]
    async fn full_queue_rejects_when_policy_is_reject() {
        let writer = Arc::new(GatedWriter::new());
        let pipeline = IngestionPipeline::spawn(
            writer.clone(),
            sink(),
            config(1, OverflowPolicy::Reject),
        );
        pipeline.ingest(event("sensorA")).await.expect("first");
        writer.started.notified().await;

        let mut accepted = 1;
        let mut rejected = 0;
        for _ in 0..4 {
            match pipeline.ingest(event("sensorA")).await {
                Ok(()) => accepted += 1,
                Err(PipelineError::Backpressure(_)) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        // 一个在写、一个等待并发许可、一个在队列中，其余必然被拒绝。
        assert!(rejected >= 2, "rejected = {rejected}");

        writer.open();
        pipeline.shutdown(GRACE).await.expect("shutdown");
        assert_eq!(writer.written.load(Ordering::SeqCst), accepted);
    }

    #[tokio::test]
    async fn full_queue_waits_when_policy_is_wait() {
        let writer = Arc::new(GatedWriter::new());
        let pipeline =
            IngestionPipeline::spawn(writer.clone(), sink(), config(1, OverflowPolicy::Wait));
        pipeline.ingest(event("sensorA")).await.expect("first");
        writer.started.notified().await;
        pipeline.ingest(event("sensorA")).await.expect("second");
        pipeline.ingest(event("sensorA")).await.expect("third");

        let blocked = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.ingest(event("sensorA")).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        writer.open();
        blocked.await.expect("join").expect("fourth");
        pipeline.shutdown(GRACE).await.expect("shutdown");
        assert_eq!(writer.written.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn shutdown_drains_queued_events() {
        let writer = Arc::new(RecordingWriter::default());
        let pipeline = IngestionPipeline::spawn(
            writer.clone(),
            sink(),
            PipelineConfig {
                queue_capacity: 16,
                max_concurrent_writes: 2,
                overflow: OverflowPolicy::Reject,
            },
        );
        for index in 0..10 {
            pipeline
                .ingest(event(&format!("sensor{index}")))
                .await
                .expect("accepted");
        }
        pipeline.shutdown(GRACE).await.expect("shutdown");
        assert_eq!(writer.batches.lock().await.len(), 10);
    }

    #[tokio::test]
    async fn ingest_after_shutdown_is_closed() {
        let pipeline =
            IngestionPipeline::spawn(Arc::new(NoopWriter), sink(), PipelineConfig::default());
        pipeline.shutdown(GRACE).await.expect("shutdown");
        let err = pipeline
            .ingest(event("sensorA"))
            .await
            .expect_err("closed");
        assert!(matches!(err, PipelineError::Closed));
    }

    #[tokio::test]
    async fn shutdown_times_out_on_stuck_write() {
        let writer = Arc::new(GatedWriter::new());
        let pipeline = IngestionPipeline::spawn(
            writer.clone(),
            sink(),
            config(1, OverflowPolicy::Reject),
        );
        pipeline.ingest(event("sensorA")).await.expect("accepted");
        writer.started.notified().await;
        let err = pipeline
            .shutdown(Duration::from_millis(20))
            .await
            .expect_err("timeout");
        assert!(matches!(err, PipelineError::ShutdownTimeout));
    }

    #[tokio::test]
    async fn process_event_returns_written_points() {
        let writer = RecordingWriter::default();
        let mut event = event("sensorA");
        event.readings.push(Reading {
            device: "sensorA".to_string(),
            name: "time".to_string(),
            id: "r2".to_string(),
            value: "1".to_string(),
            origin: 1000,
        });
        let written = process_event(event, &writer, &sink()).await;
        assert_eq!(written, 1);
        assert_eq!(writer.batches.lock().await[0].len(), 1);
    }
}
