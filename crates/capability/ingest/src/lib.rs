//! 事件接入：把外部报文解码为领域事件并交给处理器。

use api_contract::EventDto;
use async_trait::async_trait;
use domain::Event;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 采集错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("decode error: {0}")]
    Decode(String),
    #[error("handler error: {0}")]
    Handler(String),
    #[error("source error: {0}")]
    Source(String),
}

/// 事件处理器。
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event) -> Result<(), IngestError>;
}

/// 采集源抽象。
#[async_trait]
pub trait Source: Send + Sync {
    async fn run(&self, handler: Arc<dyn EventHandler>) -> Result<(), IngestError>;
}

/// 占位源（用于接线与测试）。
#[derive(Debug, Default)]
pub struct NoopSource;

#[async_trait]
impl Source for NoopSource {
    async fn run(&self, _handler: Arc<dyn EventHandler>) -> Result<(), IngestError> {
        Ok(())
    }
}

/// 解码 EdgeX 事件 JSON。
pub fn decode_event(payload: &[u8]) -> Result<Event, IngestError> {
    serde_json::from_slice::<EventDto>(payload)
        .map(EventDto::into_event)
        .map_err(|err| IngestError::Decode(err.to_string()))
}

/// MQTT QoS 等级映射。
pub fn qos_from_level(level: u8) -> Result<rumqttc::QoS, IngestError> {
    match level {
        0 => Ok(rumqttc::QoS::AtMostOnce),
        1 => Ok(rumqttc::QoS::AtLeastOnce),
        2 => Ok(rumqttc::QoS::ExactlyOnce),
        other => Err(IngestError::Source(format!("unsupported qos: {other}"))),
    }
}

/// MQTT 采集源配置。
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub qos: u8,
    pub tls: bool,
    /// PEM 格式 CA，仅在 `tls` 开启时使用。
    pub ca_file: Option<PathBuf>,
    /// 断线后的首次重连间隔，之后按倍数退避。
    pub reconnect_delay: Duration,
}

/// 重连退避上限。
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// MQTT 采集源：订阅 EdgeX 导出主题。
///
/// 断线后按退避间隔重连，每次 ConnAck 后重新订阅。
#[derive(Debug, Clone)]
pub struct MqttSource {
    config: MqttSourceConfig,
}

impl MqttSource {
    pub fn new(config: MqttSourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MqttSourceConfig {
        &self.config
    }

    fn options(&self) -> Result<rumqttc::MqttOptions, IngestError> {
        let mut options = rumqttc::MqttOptions::new(
            self.config.client_id.clone(),
            self.config.host.clone(),
            self.config.port,
        );
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(true);
        if let (Some(username), Some(password)) =
            (self.config.username.as_ref(), self.config.password.as_ref())
        {
            options.set_credentials(username, password);
        }
        if self.config.tls {
            options.set_transport(tls_transport(self.config.ca_file.as_deref())?);
        }
        Ok(options)
    }
}

fn tls_transport(ca_file: Option<&Path>) -> Result<rumqttc::Transport, IngestError> {
    match ca_file {
        Some(path) => {
            let ca = std::fs::read(path).map_err(|err| {
                IngestError::Source(format!("read ca file {}: {err}", path.display()))
            })?;
            Ok(rumqttc::Transport::tls(ca, None, None))
        }
        None => Ok(rumqttc::Transport::tls_with_default_config()),
    }
}

#[async_trait]
impl Source for MqttSource {
    async fn run(&self, handler: Arc<dyn EventHandler>) -> Result<(), IngestError> {
        let qos = qos_from_level(self.config.qos)?;
        let options = self.options()?;
        let (client, mut eventloop) = rumqttc::AsyncClient::new(options, 10);
        let base_delay = self.config.reconnect_delay.max(Duration::from_millis(1));
        let mut delay = base_delay;

        loop {
            match eventloop.poll().await {
                Ok(rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_))) => {
                    delay = base_delay;
                    // 在事件循环内部只能用 try_subscribe，await 会等待自身
                    client
                        .try_subscribe(self.config.topic.clone(), qos)
                        .map_err(|err| IngestError::Source(err.to_string()))?;
                    info!(
                        target: "edgex.ingest",
                        host = %self.config.host,
                        port = self.config.port,
                        topic = %self.config.topic,
                        tls = self.config.tls,
                        "mqtt_subscribed"
                    );
                }
                Ok(rumqttc::Event::Incoming(rumqttc::Packet::Publish(publish))) => {
                    let event = match decode_event(&publish.payload) {
                        Ok(event) => event,
                        Err(err) => {
                            warn!(
                                target: "edgex.ingest",
                                topic = %publish.topic,
                                error = %err,
                                "mqtt_payload_skipped"
                            );
                            continue;
                        }
                    };
                    debug!(
                        target: "edgex.ingest",
                        device = %event.device,
                        readings = event.readings.len(),
                        "event_received"
                    );
                    if let Err(err) = handler.handle(event).await {
                        warn!(target: "edgex.ingest", error = %err, "event_handler_failed");
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        target: "edgex.ingest",
                        host = %self.config.host,
                        port = self.config.port,
                        error = %err,
                        retry_in_ms = delay.as_millis() as u64,
                        "mqtt_connection_lost"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_RECONNECT_DELAY);
                }
            }
        }
    }
}
