//! 稳定的 DTO 与 API 响应契约。

use domain::{Event, Reading};
use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// EdgeX 事件报文（export-distro REST 推送 / MQTT 消息体）。
///
/// 仅解析入库所需字段，其余字段（created、modified、pushed 等）忽略。
#[derive(Debug, Clone, Deserialize)]
pub struct EventDto {
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub readings: Vec<ReadingDto>,
}

/// EdgeX 读数报文。
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingDto {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub device: Option<String>,
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub origin: i64,
}

impl EventDto {
    /// 转换为领域事件；读数未携带 device 时继承事件的 device。
    pub fn into_event(self) -> Event {
        let device = self.device;
        let readings = self
            .readings
            .into_iter()
            .map(|reading| Reading {
                device: reading.device.unwrap_or_else(|| device.clone()),
                name: reading.name,
                id: reading.id,
                value: reading.value,
                origin: reading.origin,
            })
            .collect();
        Event { device, readings }
    }
}

/// 接收确认。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAck {
    pub accepted_readings: usize,
}

/// 指标快照返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub events_received: u64,
    pub readings_received: u64,
    pub points_built: u64,
    pub build_failures: u64,
    pub empty_batches: u64,
    pub batches_written: u64,
    pub points_written: u64,
    pub write_failures: u64,
    pub events_rejected: u64,
    pub write_latency_ms_total: u64,
    pub write_latency_ms_count: u64,
}
