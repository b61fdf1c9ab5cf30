//! Telemetry 指标快照。
//!
//! - GET /metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use edgex_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            events_received: snapshot.events_received,
            readings_received: snapshot.readings_received,
            points_built: snapshot.points_built,
            build_failures: snapshot.build_failures,
            empty_batches: snapshot.empty_batches,
            batches_written: snapshot.batches_written,
            points_written: snapshot.points_written,
            write_failures: snapshot.write_failures,
            events_rejected: snapshot.events_rejected,
            write_latency_ms_total: snapshot.write_latency_ms_total,
            write_latency_ms_count: snapshot.write_latency_ms_count,
        })),
    )
        .into_response()
}
