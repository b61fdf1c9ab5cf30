//! EdgeX 事件推送（export-distro REST 目的地）。
//!
//! - POST /edgex

use crate::AppState;
use crate::utils::response::{bad_request_error, unavailable_error};
use api_contract::{ApiResponse, IngestAck};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use edgex_ingest::decode_event;
use tracing::{info, warn};

/// 解码事件并交给流水线；写入在后台完成。
pub async fn post_event(State(state): State<AppState>, body: Bytes) -> Response {
    let event = match decode_event(&body) {
        Ok(event) => event,
        Err(err) => {
            warn!(target: "edgex.http", error = %err, body_len = body.len(), "event_decode_failed");
            return bad_request_error(err.to_string());
        }
    };
    let device = event.device.clone();
    let accepted_readings = event.readings.len();
    info!(
        target: "edgex.http",
        device = %device,
        readings = accepted_readings,
        "event_received"
    );

    match state.pipeline.ingest(event).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(IngestAck { accepted_readings })),
        )
            .into_response(),
        Err(err) => unavailable_error(err),
    }
}
