//! 向 EdgeX export-distro 注册 REST 目的地。
//!
//! 流程：可选删除旧注册 -> 探测本机对 export-distro 可见的地址 -> POST 注册报文。

use edgex_config::AppConfig;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::net::IpAddr;
use tracing::{info, warn};

/// 在 export-distro 中登记的注册名。
pub const REGISTRATION_NAME: &str = "edgex-influx";

/// 注册错误。
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("address discovery failed: {0}")]
    Address(String),
    #[error("registration rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for RegistrationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// 注册所需参数。
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    pub export_host: String,
    pub export_port: u16,
    /// 本服务监听端口，写入注册报文。
    pub http_port: u16,
    pub clean: bool,
}

impl RegistrationConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            export_host: config.export_host.clone(),
            export_port: config.export_port,
            http_port: config.http_port,
            clean: config.clean_register,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "http://{}:{}/api/v1/registration",
            self.export_host, self.export_port
        )
    }
}

/// REST 目的地注册报文。
pub fn registration_body(address: &str, port: u16) -> Value {
    json!({
        "name": REGISTRATION_NAME,
        "enable": true,
        "format": "JSON",
        "destination": "REST_ENDPOINT",
        "addressable": {
            "name": format!("{REGISTRATION_NAME}-rest"),
            "protocol": "HTTP",
            "method": "POST",
            "address": address,
            "port": port,
            "path": "/edgex"
        }
    })
}

/// 探测连接 export-distro 时使用的本机地址；回环地址统一为 `localhost`。
///
/// UDP connect 不发送数据，只让内核选出路由对应的本地地址。
pub async fn local_address_for(host: &str, port: u16) -> Result<String, RegistrationError> {
    let socket = tokio::net::UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|err| RegistrationError::Address(err.to_string()))?;
    socket
        .connect((host, port))
        .await
        .map_err(|err| RegistrationError::Address(err.to_string()))?;
    let local = socket
        .local_addr()
        .map_err(|err| RegistrationError::Address(err.to_string()))?;
    Ok(display_address(local.ip()))
}

fn display_address(ip: IpAddr) -> String {
    if ip.is_loopback() {
        "localhost".to_string()
    } else {
        ip.to_string()
    }
}

/// 执行注册；export-distro 未返回 201 时视为失败。
pub async fn register_rest_endpoint(config: &RegistrationConfig) -> Result<(), RegistrationError> {
    let client = Client::builder().build()?;
    let endpoint = config.endpoint();

    if config.clean {
        let response = client
            .delete(format!("{endpoint}/name/{REGISTRATION_NAME}"))
            .send()
            .await?;
        // 旧注册不存在时 export-distro 返回 404，忽略即可
        info!(
            target: "edgex.registration",
            status = response.status().as_u16(),
            "previous_registration_deleted"
        );
    }

    let address = local_address_for(&config.export_host, config.export_port).await?;
    let body = registration_body(&address, config.http_port);
    let response = client.post(&endpoint).json(&body).send().await?;
    let status = response.status();
    if status != StatusCode::CREATED {
        let body = response.text().await.unwrap_or_default();
        warn!(
            target: "edgex.registration",
            status = status.as_u16(),
            body = %body,
            "registration_rejected"
        );
        return Err(RegistrationError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    info!(
        target: "edgex.registration",
        address = %address,
        port = config.http_port,
        "registration_created"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Bytes,
        extract::State,
        http::{HeaderMap, Method, StatusCode as AxumStatus, header::CONTENT_TYPE},
        routing::{delete, post},
    };
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorded {
        calls: Arc<Mutex<Vec<(Method, String)>>>,
        bodies: Arc<Mutex<Vec<String>>>,
        content_types: Arc<Mutex<Vec<String>>>,
    }

    async fn spawn_export_distro(create_status: AxumStatus) -> (u16, Recorded) {
        let recorded = Recorded::default();
        let app = Router::new()
            .route(
                "/api/v1/registration",
                post(move |State(rec): State<Recorded>, headers: HeaderMap, body: Bytes| async move {
                    rec.content_types.lock().expect("lock").push(
                        headers
                            .get(CONTENT_TYPE)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string(),
                    );
                    rec.calls
                        .lock()
                        .expect("lock")
                        .push((Method::POST, "/api/v1/registration".to_string()));
                    rec.bodies
                        .lock()
                        .expect("lock")
                        .push(String::from_utf8_lossy(&body).to_string());
                    create_status
                }),
            )
            .route(
                "/api/v1/registration/name/:name",
                delete(
                    |State(rec): State<Recorded>,
                     axum::extract::Path(name): axum::extract::Path<String>| async move {
                        rec.calls
                            .lock()
                            .expect("lock")
                            .push((Method::DELETE, name));
                        AxumStatus::NOT_FOUND
                    },
                ),
            )
            .with_state(recorded.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (port, recorded)
    }

    fn config(port: u16, clean: bool) -> RegistrationConfig {
        RegistrationConfig {
            export_host: "127.0.0.1".to_string(),
            export_port: port,
            http_port: 8080,
            clean,
        }
    }

    #[test]
    fn body_describes_rest_destination() {
        let body = registration_body("10.0.0.5", 9000);
        assert_eq!(body["destination"], "REST_ENDPOINT");
        assert_eq!(body["format"], "JSON");
        assert_eq!(body["addressable"]["method"], "POST");
        assert_eq!(body["addressable"]["address"], "10.0.0.5");
        assert_eq!(body["addressable"]["port"], 9000);
        assert_eq!(body["addressable"]["path"], "/edgex");
    }

    #[test]
    fn loopback_becomes_localhost() {
        assert_eq!(display_address("127.0.0.1".parse().expect("ip")), "localhost");
        assert_eq!(display_address("::1".parse().expect("ip")), "localhost");
        assert_eq!(display_address("192.168.1.7".parse().expect("ip")), "192.168.1.7");
    }

    #[tokio::test]
    async fn registers_after_cleaning_previous() {
        let (port, recorded) = spawn_export_distro(AxumStatus::CREATED).await;
        register_rest_endpoint(&config(port, true))
            .await
            .expect("register");

        let calls = recorded.calls.lock().expect("lock").clone();
        assert_eq!(
            calls,
            vec![
                (Method::DELETE, REGISTRATION_NAME.to_string()),
                (Method::POST, "/api/v1/registration".to_string()),
            ]
        );
        let bodies = recorded.bodies.lock().expect("lock").clone();
        let body: Value = serde_json::from_str(&bodies[0]).expect("json");
        assert_eq!(body["addressable"]["address"], "localhost");
        assert_eq!(body["addressable"]["port"], 8080);
        let content_types = recorded.content_types.lock().expect("lock").clone();
        assert_eq!(content_types, vec!["application/json".to_string()]);
    }

    #[tokio::test]
    async fn skips_delete_when_not_cleaning() {
        let (port, recorded) = spawn_export_distro(AxumStatus::CREATED).await;
        register_rest_endpoint(&config(port, false))
            .await
            .expect("register");
        let calls = recorded.calls.lock().expect("lock").clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Method::POST);
    }

    #[tokio::test]
    async fn non_created_status_is_rejected() {
        let (port, _recorded) = spawn_export_distro(AxumStatus::OK).await;
        let err = register_rest_endpoint(&config(port, false))
            .await
            .expect_err("rejected");
        assert!(matches!(err, RegistrationError::Rejected { status: 200, .. }));
    }
}
