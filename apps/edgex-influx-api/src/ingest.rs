//! 采集链路装配模块
//!
//! 把采集源（MQTT 或空操作源）接到事件流水线上。HTTP 推送不经过这里，
//! 由 `handlers::events` 直接调用流水线。

use edgex_config::AppConfig;
use edgex_ingest::{EventHandler, IngestError, MqttSource, MqttSourceConfig, NoopSource, Source};
use edgex_pipeline::IngestionPipeline;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 流水线处理器：把采集源解码出的事件交给流水线。
struct PipelineHandler {
    pipeline: IngestionPipeline,
}

#[async_trait::async_trait]
impl EventHandler for PipelineHandler {
    async fn handle(&self, event: domain::Event) -> Result<(), IngestError> {
        self.pipeline
            .ingest(event)
            .await
            .map_err(|err| IngestError::Handler(err.to_string()))
    }
}

/// 未配置 client id 时生成一个。
fn mqtt_client_id(config: &AppConfig) -> String {
    match config.mqtt_client_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("edgex-influx-{}", uuid::Uuid::new_v4().simple()),
    }
}

/// 启动采集任务
///
/// 根据配置选择 MQTT 采集源或空操作源。MQTT 源断线自动重连，
/// 只在配置错误时退出。
pub fn spawn_ingest(
    config: &AppConfig,
    pipeline: IngestionPipeline,
) -> tokio::task::JoinHandle<()> {
    let handler = Arc::new(PipelineHandler { pipeline });

    let source: Arc<dyn Source> = if config.mqtt_enabled {
        let mqtt_config = MqttSourceConfig {
            host: config.mqtt_host.clone(),
            port: config.mqtt_port,
            topic: config.mqtt_topic.clone(),
            client_id: mqtt_client_id(config),
            username: config.mqtt_username.clone(),
            password: config.mqtt_password.clone(),
            qos: config.mqtt_qos,
            tls: config.mqtt_tls,
            ca_file: config.mqtt_ca_file.as_ref().map(PathBuf::from),
            reconnect_delay: Duration::from_millis(config.mqtt_reconnect_ms),
        };
        info!(
            target: "edgex.ingest",
            host = %mqtt_config.host,
            port = mqtt_config.port,
            topic = %mqtt_config.topic,
            client_id = %mqtt_config.client_id,
            tls = mqtt_config.tls,
            "ingest_source_mqtt"
        );
        Arc::new(MqttSource::new(mqtt_config))
    } else {
        info!(target: "edgex.ingest", "ingest_source_noop");
        Arc::new(NoopSource)
    };

    tokio::spawn(async move {
        if let Err(err) = source.run(handler).await {
            warn!(target: "edgex.ingest", error = %err, "ingest_stopped");
        }
    })
}
