//! 应用运行配置加载。

use domain::WritePrecision;
use std::env;
use std::str::FromStr;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 流水线队列满时的处理方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowMode {
    #[default]
    Reject,
    Wait,
}

impl FromStr for OverflowMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "reject" => Ok(OverflowMode::Reject),
            "wait" => Ok(OverflowMode::Wait),
            other => Err(other.to_string()),
        }
    }
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_host: String,
    pub http_port: u16,
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_precision: WritePrecision,
    pub db_username: Option<String>,
    pub db_password: Option<String>,
    pub db_timeout_ms: u64,
    pub register_enabled: bool,
    pub clean_register: bool,
    pub export_host: String,
    pub export_port: u16,
    pub mqtt_enabled: bool,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_topic: String,
    /// 未配置时由应用生成。
    pub mqtt_client_id: Option<String>,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_qos: u8,
    pub mqtt_tls: bool,
    /// PEM 格式 CA；未配置时使用系统根证书。
    pub mqtt_ca_file: Option<String>,
    /// 断线重连的初始间隔。
    pub mqtt_reconnect_ms: u64,
    pub queue_capacity: usize,
    pub max_concurrent_writes: usize,
    pub overflow: OverflowMode,
    pub shutdown_grace_ms: u64,
}

impl AppConfig {
    /// 从环境变量读取配置（不做校验）。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置，便于测试。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup: &lookup };
        let precision_raw = env.read_or("EDGEX_INFLUX_DB_PRECISION", "ns");
        let db_precision = precision_raw.parse::<WritePrecision>().map_err(|_| {
            ConfigError::Invalid("EDGEX_INFLUX_DB_PRECISION".to_string(), precision_raw)
        })?;
        let overflow_raw = env.read_or("EDGEX_INFLUX_OVERFLOW", "reject");
        let overflow = overflow_raw
            .parse::<OverflowMode>()
            .map_err(|_| ConfigError::Invalid("EDGEX_INFLUX_OVERFLOW".to_string(), overflow_raw))?;

        Ok(Self {
            http_host: env.read_or("EDGEX_INFLUX_HTTP_HOST", "0.0.0.0"),
            http_port: env.read_with_default("EDGEX_INFLUX_HTTP_PORT", 8080)?,
            db_host: env.read_or("EDGEX_INFLUX_DB_HOST", "localhost"),
            db_port: env.read_with_default("EDGEX_INFLUX_DB_PORT", 8086)?,
            db_name: env.read_or("EDGEX_INFLUX_DB_NAME", "edgex"),
            db_precision,
            db_username: env.read_optional("EDGEX_INFLUX_DB_USERNAME"),
            db_password: env.read_optional("EDGEX_INFLUX_DB_PASSWORD"),
            db_timeout_ms: env.read_with_default("EDGEX_INFLUX_DB_TIMEOUT_MS", 10_000)?,
            register_enabled: env.read_bool_with_default("EDGEX_INFLUX_REGISTER", false),
            clean_register: env.read_bool_with_default("EDGEX_INFLUX_CLEAN_REGISTER", true),
            export_host: env.read_or("EDGEX_INFLUX_EXPORT_HOST", "localhost"),
            export_port: env.read_with_default("EDGEX_INFLUX_EXPORT_PORT", 48071)?,
            mqtt_enabled: env.read_bool_with_default("EDGEX_INFLUX_MQTT", false),
            mqtt_host: env.read_or("EDGEX_INFLUX_MQTT_HOST", "localhost"),
            mqtt_port: env.read_with_default("EDGEX_INFLUX_MQTT_PORT", 1883)?,
            mqtt_topic: env.read_or("EDGEX_INFLUX_MQTT_TOPIC", "EdgeXDataTopic"),
            mqtt_client_id: env.read_optional("EDGEX_INFLUX_MQTT_CLIENT_ID"),
            mqtt_username: env.read_optional("EDGEX_INFLUX_MQTT_USERNAME"),
            mqtt_password: env.read_optional("EDGEX_INFLUX_MQTT_PASSWORD"),
            mqtt_qos: env.read_with_default("EDGEX_INFLUX_MQTT_QOS", 0)?,
            mqtt_tls: env.read_bool_with_default("EDGEX_INFLUX_MQTT_TLS", false),
            mqtt_ca_file: env.read_optional("EDGEX_INFLUX_MQTT_CA_FILE"),
            mqtt_reconnect_ms: env.read_with_default("EDGEX_INFLUX_MQTT_RECONNECT_MS", 1_000)?,
            queue_capacity: env.read_with_default("EDGEX_INFLUX_QUEUE_CAPACITY", 1024)?,
            max_concurrent_writes: env.read_with_default("EDGEX_INFLUX_MAX_CONCURRENT_WRITES", 16)?,
            overflow,
            shutdown_grace_ms: env.read_with_default("EDGEX_INFLUX_SHUTDOWN_GRACE_MS", 5_000)?,
        })
    }

    /// 校验取值范围。
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.http_port > 0, "EDGEX_INFLUX_HTTP_PORT", self.http_port)?;
        ensure(self.db_port > 0, "EDGEX_INFLUX_DB_PORT", self.db_port)?;
        if self.db_name.trim().is_empty() {
            return Err(ConfigError::Missing("EDGEX_INFLUX_DB_NAME".to_string()));
        }
        ensure(
            self.db_timeout_ms > 0,
            "EDGEX_INFLUX_DB_TIMEOUT_MS",
            self.db_timeout_ms,
        )?;
        if self.register_enabled {
            ensure(self.export_port > 0, "EDGEX_INFLUX_EXPORT_PORT", self.export_port)?;
        }
        if self.mqtt_enabled {
            ensure(self.mqtt_port > 0, "EDGEX_INFLUX_MQTT_PORT", self.mqtt_port)?;
            if self.mqtt_topic.is_empty() {
                return Err(ConfigError::Missing("EDGEX_INFLUX_MQTT_TOPIC".to_string()));
            }
            ensure(
                self.mqtt_reconnect_ms > 0,
                "EDGEX_INFLUX_MQTT_RECONNECT_MS",
                self.mqtt_reconnect_ms,
            )?;
            if let (false, Some(ca_file)) = (self.mqtt_tls, self.mqtt_ca_file.as_ref()) {
                return Err(ConfigError::Invalid(
                    "EDGEX_INFLUX_MQTT_CA_FILE".to_string(),
                    format!("{ca_file} (EDGEX_INFLUX_MQTT_TLS is off)"),
                ));
            }
        }
        ensure(self.mqtt_qos <= 2, "EDGEX_INFLUX_MQTT_QOS", self.mqtt_qos)?;
        ensure(
            self.queue_capacity > 0,
            "EDGEX_INFLUX_QUEUE_CAPACITY",
            self.queue_capacity,
        )?;
        ensure(
            self.max_concurrent_writes > 0,
            "EDGEX_INFLUX_MAX_CONCURRENT_WRITES",
            self.max_concurrent_writes,
        )?;
        Ok(())
    }

    /// HTTP 监听地址。
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

fn ensure(ok: bool, key: &str, value: impl ToString) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid(key.to_string(), value.to_string()))
    }
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn read_or(&self, key: &str, default: &str) -> String {
        (self.lookup)(key).unwrap_or_else(|| default.to_string())
    }

    fn read_with_default<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        let value = match (self.lookup)(key) {
            Some(value) => value,
            None => return Ok(default),
        };
        value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value))
    }

    fn read_optional(&self, key: &str) -> Option<String> {
        match (self.lookup)(key) {
            Some(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn read_bool_with_default(&self, key: &str, default: bool) -> bool {
        match (self.lookup)(key) {
            Some(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
            None => default,
        }
    }
}
