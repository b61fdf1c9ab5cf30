//! 时序写入内存实现
//!
//! 仅用于本地测试和占位。

use crate::error::StorageError;
use crate::traits::TimeSeriesStore;
use domain::{Batch, Point};
use std::sync::RwLock;

/// 时序写入内存存储
#[derive(Default)]
pub struct InMemoryTimeSeriesStore {
    batches: RwLock<Vec<Batch>>,
}

impl InMemoryTimeSeriesStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入的批次数量
    pub fn batch_count(&self) -> usize {
        self.batches.read().map(|b| b.len()).unwrap_or(0)
    }

    /// 已写入的全部批次（按写入顺序）
    pub fn batches(&self) -> Vec<Batch> {
        self.batches.read().map(|b| b.clone()).unwrap_or_default()
    }

    /// 已写入的全部点位
    pub fn points(&self) -> Vec<Point> {
        self.batches()
            .into_iter()
            .flat_map(|batch| batch.points)
            .collect()
    }
}

#[async_trait::async_trait]
impl TimeSeriesStore for InMemoryTimeSeriesStore {
    async fn write_batch(&self, batch: &Batch) -> Result<(), StorageError> {
        let mut batches = self
            .batches
            .write()
            .map_err(|_| StorageError::Other("lock failed".to_string()))?;
        batches.push(batch.clone());
        Ok(())
    }
}
