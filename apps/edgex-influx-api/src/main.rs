//! EdgeX -> InfluxDB 接入服务：HTTP 推送 / MQTT 订阅 -> 流水线 -> InfluxDB。

mod handlers;
mod ingest;
mod middleware;
mod registration;
mod routes;
mod utils;

use domain::SinkConfig;
use edgex_config::{AppConfig, OverflowMode};
use edgex_pipeline::{IngestionPipeline, OverflowPolicy, PipelineConfig, StorageBatchWriter};
use edgex_storage::{InfluxConfig, InfluxHttpStore};
use edgex_telemetry::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 路由共享状态。
#[derive(Clone)]
pub struct AppState {
    pub pipeline: IngestionPipeline,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    config.validate()?;
    init_tracing();

    let store = InfluxHttpStore::new(InfluxConfig {
        host: config.db_host.clone(),
        port: config.db_port,
        username: config.db_username.clone(),
        password: config.db_password.clone(),
        timeout: Duration::from_millis(config.db_timeout_ms),
    })?;
    info!(
        target: "edgex.http",
        url = %store.base_url(),
        db = %config.db_name,
        precision = config.db_precision.as_str(),
        "influx_store_ready"
    );

    let writer = StorageBatchWriter::new(Arc::new(store));
    let sink = SinkConfig::new(config.db_name.clone(), config.db_precision);
    let pipeline = IngestionPipeline::spawn(Arc::new(writer), sink, pipeline_config(&config));

    // export-distro 需要在服务可达前拿到注册信息
    if config.register_enabled {
        registration::register_rest_endpoint(&registration::RegistrationConfig::from_app(
            &config,
        ))
        .await?;
    }

    let ingest_task = ingest::spawn_ingest(&config, pipeline.clone());

    let app = routes::create_router(AppState {
        pipeline: pipeline.clone(),
    });
    let addr = config.http_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(target: "edgex.http", addr = %addr, "http_listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ingest_task.abort();
    if let Err(err) = pipeline
        .shutdown(Duration::from_millis(config.shutdown_grace_ms))
        .await
    {
        warn!(target: "edgex.http", error = %err, "pipeline_shutdown_incomplete");
        return Err(err.into());
    }
    Ok(())
}

fn pipeline_config(config: &AppConfig) -> PipelineConfig {
    PipelineConfig {
        queue_capacity: config.queue_capacity,
        max_concurrent_writes: config.max_concurrent_writes,
        overflow: match config.overflow {
            OverflowMode::Reject => OverflowPolicy::Reject,
            OverflowMode::Wait => OverflowPolicy::Wait,
        },
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target: "edgex.http", error = %err, "signal_listener_failed");
        std::future::pending::<()>().await;
    }
    info!(target: "edgex.http", "shutdown_requested");
}
