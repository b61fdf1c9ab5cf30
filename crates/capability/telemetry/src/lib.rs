//! 追踪、请求 ID 生成与进程级计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
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

/// 进程级计数器。
#[derive(Default)]
pub struct TelemetryMetrics {
    events_received: AtomicU64,
    readings_received: AtomicU64,
    points_built: AtomicU64,
    build_failures: AtomicU64,
    empty_batches: AtomicU64,
    batches_written: AtomicU64,
    points_written: AtomicU64,
    write_failures: AtomicU64,
    events_rejected: AtomicU64,
    write_latency_ms_total: AtomicU64,
    write_latency_ms_count: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            readings_received: self.readings_received.load(Ordering::Relaxed),
            points_built: self.points_built.load(Ordering::Relaxed),
            build_failures: self.build_failures.load(Ordering::Relaxed),
            empty_batches: self.empty_batches.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            points_written: self.points_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            write_latency_ms_total: self.write_latency_ms_total.load(Ordering::Relaxed),
            write_latency_ms_count: self.write_latency_ms_count.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录已交付流水线的事件及其读数数量。
pub fn record_event_received(readings: usize) {
    let metrics = metrics();
    metrics.events_received.fetch_add(1, Ordering::Relaxed);
    metrics
        .readings_received
        .fetch_add(readings as u64, Ordering::Relaxed);
}

/// 记录构造成功的点位数量。
pub fn record_points_built(count: usize) {
    metrics()
        .points_built
        .fetch_add(count as u64, Ordering::Relaxed);
}

/// 记录读数构造失败次数。
pub fn record_build_failure() {
    metrics().build_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录跳过的空批次。
pub fn record_empty_batch() {
    metrics().empty_batches.fetch_add(1, Ordering::Relaxed);
}

/// 记录写入成功的批次。
pub fn record_batch_written(points: usize) {
    let metrics = metrics();
    metrics.batches_written.fetch_add(1, Ordering::Relaxed);
    metrics
        .points_written
        .fetch_add(points as u64, Ordering::Relaxed);
}

/// 记录写入失败次数。
pub fn record_write_failure() {
    metrics().write_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录因队列满或已关停而被拒绝的事件。
pub fn record_event_rejected() {
    metrics().events_rejected.fetch_add(1, Ordering::Relaxed);
}

/// 记录写入延迟（毫秒）。
pub fn record_write_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .write_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .write_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
