//! InfluxDB 1.x HTTP 写入实现
//!
//! `POST http://{host}:{port}/write?db={database}&precision={precision}`，请求体为行协议。
//! reqwest::Client 内部带连接池，可在多个写入任务间共享。

use crate::error::StorageError;
use crate::line_protocol::encode_batch;
use crate::traits::TimeSeriesStore;
use async_trait::async_trait;
use domain::Batch;
use reqwest::{Client, Url};
use std::time::Duration;

/// InfluxDB 连接配置。
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

/// 基于 HTTP 的 InfluxDB 写入存储。
#[derive(Clone)]
pub struct InfluxHttpStore {
    client: Client,
    base_url: Url,
    credentials: Option<(String, String)>,
}

impl InfluxHttpStore {
    pub fn new(config: InfluxConfig) -> Result<Self, StorageError> {
        let base_url = Url::parse(&format!("http://{}:{}/write", config.host, config.port))
            .map_err(|err| StorageError::Config(err.to_string()))?;
        let client = Client::builder().timeout(config.timeout).build()?;
        let credentials = match (config.username, config.password) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        };
        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// 写入地址（不含查询参数）。
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn write_url(&self, batch: &Batch) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("db", &batch.config.database)
            .append_pair("precision", batch.config.precision.as_str());
        url
    }
}

#[async_trait]
impl TimeSeriesStore for InfluxHttpStore {
    async fn write_batch(&self, batch: &Batch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut request = self
            .client
            .post(self.write_url(batch))
            .body(encode_batch(batch));
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(())
    }
}
