//! 事件流水线：Event -> Batch -> 异步写入。
//!
//! HTTP 与 MQTT 接入只负责把事件交给 [`IngestionPipeline`]，
//! 点位构造与写入在后台任务中完成，写入结果不会回传给调用方。

mod batcher;
mod ingestion;

use async_trait::async_trait;
use domain::Batch;
use edgex_storage::TimeSeriesStore;
use std::sync::Arc;

pub use batcher::{BatchedEvent, ReadingFailure, batch_event};
pub use ingestion::{IngestionPipeline, process_event};

/// Pipeline 处理错误。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("writer error: {0}")]
    Writer(String),
    #[error("backpressure: {0}")]
    Backpressure(String),
    #[error("pipeline closed")]
    Closed,
    #[error("shutdown timed out with writes still in flight")]
    ShutdownTimeout,
}

/// 队列满时的处理策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// 立即拒绝（返回 `Backpressure`）。
    #[default]
    Reject,
    /// 等待队列出现空位。
    Wait,
}

/// Pipeline 参数。
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 待处理事件队列容量。
    pub queue_capacity: usize,
    /// 同时进行的写入上限。
    pub max_concurrent_writes: usize,
    pub overflow: OverflowPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_concurrent_writes: 16,
            overflow: OverflowPolicy::Reject,
        }
    }
}

const MAX_CONCURRENT_WRITES_LIMIT: usize = 65_536;

impl PipelineConfig {
    fn sanitized(mut self) -> Self {
        if self.queue_capacity == 0 {
            self.queue_capacity = 1;
        }
        self.max_concurrent_writes = self
            .max_concurrent_writes
            .clamp(1, MAX_CONCURRENT_WRITES_LIMIT);
        self
    }
}

/// 批次写入器抽象。
#[async_trait]
pub trait BatchWriter: Send + Sync {
    async fn write(&self, batch: &Batch) -> Result<(), PipelineError>;
}

/// 空写入器（用于接线与测试）。
#[derive(Debug, Default)]
pub struct NoopWriter;

#[async_trait]
impl BatchWriter for NoopWriter {
    async fn write(&self, _batch: &Batch) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// 基于存储层的写入器。
#[derive(Clone)]
pub struct StorageBatchWriter {
    store: Arc<dyn TimeSeriesStore>,
}

impl StorageBatchWriter {
    pub fn new(store: Arc<dyn TimeSeriesStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchWriter for StorageBatchWriter {
    async fn write(&self, batch: &Batch) -> Result<(), PipelineError> {
        self.store
            .write_batch(batch)
            .await
            .map_err(|err| PipelineError::Writer(err.to_string()))
    }
}
