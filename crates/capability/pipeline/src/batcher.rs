use domain::{Batch, Event, SinkConfig};
use edgex_normalize::{BuildError, build_point};

/// 单条读数构造失败的记录。
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingFailure {
    /// 读数在事件中的下标。
    pub index: usize,
    pub device: String,
    pub name: String,
    pub id: String,
    pub error: BuildError,
}

/// 事件分批结果。
#[derive(Debug, Clone)]
pub struct BatchedEvent {
    pub batch: Batch,
    pub failures: Vec<ReadingFailure>,
}

/// 事件 -> 批次。
///
/// 按读数顺序构造点位；失败的读数被跳过并记录，不影响其余读数。
pub fn batch_event(event: &Event, config: &SinkConfig) -> BatchedEvent {
    let mut batch = Batch::new(config.clone());
    let mut failures = Vec::new();
    for (index, reading) in event.readings.iter().enumerate() {
        match build_point(reading) {
            Ok(point) => batch.push(point),
            Err(error) => failures.push(ReadingFailure {
                index,
                device: reading.device.clone(),
                name: reading.name.clone(),
                id: reading.id.clone(),
                error,
            }),
        }
    }
    BatchedEvent { batch, failures }
}
