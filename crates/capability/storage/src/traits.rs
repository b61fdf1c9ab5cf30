//! 存储接口 Trait 定义

use crate::error::StorageError;
use async_trait::async_trait;
use domain::Batch;

/// 时序存储接口。
///
/// 每个事件调用一次；批次内的点位顺序可能被后端重排。
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    async fn write_batch(&self, batch: &Batch) -> Result<(), StorageError>;
}
