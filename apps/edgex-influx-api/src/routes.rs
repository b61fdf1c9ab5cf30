//! 路由定义
//!
//! - 事件推送：POST /edgex（其他方法由路由返回 405）
//! - 健康检查：GET /health
//! - 指标快照：GET /metrics

use super::AppState;
use super::handlers::*;
use crate::middleware::request_context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// 创建应用路由（含请求追踪中间件）。
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/edgex", post(post_event))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(request_context))
}
